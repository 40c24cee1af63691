//! Text-to-value converters and the ordered registry that resolves them.
//!
//! Resolution walks converters in registration order and picks the first one
//! whose `supports` accepts the requested type and context, so hosts register
//! specialisations before the general-purpose built-ins.

use std::sync::Arc;

use serde_json::Value;

use super::descriptor::{RawOptions, ValueType};
use crate::error::{Error, Result};

/// Outcome of a single converter parse; the error is a human-readable reason.
pub type ParseResult = std::result::Result<Value, String>;

/// One completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub value: String,
    /// Optional group heading for display.
    pub heading: Option<String>,
}

impl Completion {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
            heading: None,
        }
    }

    #[must_use]
    pub fn with_heading(mut self, heading: &str) -> Self {
        self.heading = Some(heading.to_string());
        self
    }
}

/// Input handed to a converter when it is asked for candidates.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub partial: &'a str,
    pub value_type: &'a ValueType,
    pub context: Option<&'a str>,
    /// Options already present on the command line.
    pub existing: &'a RawOptions,
}

/// Candidate values filtered by the partial text.
///
/// Finite and restartable: every call to [`Completions::iter`] starts a new
/// lazy pass over the same candidates.
#[derive(Debug, Clone, Default)]
pub struct Completions {
    candidates: Arc<[Completion]>,
    partial: String,
}

impl Completions {
    pub fn new(candidates: Vec<Completion>, partial: &str) -> Self {
        Self {
            candidates: candidates.into(),
            partial: partial.to_string(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Completion> + '_ {
        self.candidates
            .iter()
            .filter(|c| c.value.starts_with(&self.partial))
    }

    pub fn values(&self) -> Vec<String> {
        self.iter().map(|c| c.value.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'a> IntoIterator for &'a Completions {
    type Item = &'a Completion;
    type IntoIter = Box<dyn Iterator<Item = &'a Completion> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Pluggable converter between option text and typed values.
pub trait Converter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn supports(&self, value_type: &ValueType, context: Option<&str>) -> bool;

    fn parse(&self, text: &str, value_type: &ValueType, context: Option<&str>) -> ParseResult;

    /// Candidate values for the request. The registry filters them by prefix.
    fn completions(&self, _request: &CompletionRequest<'_>) -> Vec<Completion> {
        Vec::new()
    }
}

/// Ordered set of converters; first match wins.
///
/// Registered converters are consulted in registration order, then the
/// fallback chain (the built-ins when created with
/// [`ConverterRegistry::with_builtins`]).
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn Converter>>,
    fallbacks: Vec<Arc<dyn Converter>>,
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|c| c.name()))
            .finish()
    }
}

impl ConverterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry whose fallback chain is the built-in converters.
    pub fn with_builtins() -> Self {
        Self {
            converters: Vec::new(),
            fallbacks: builtin_converters(),
        }
    }

    /// Add a converter after every converter registered before it, ahead of the fallbacks.
    pub fn register(&mut self, converter: Arc<dyn Converter>) {
        self.converters.push(converter);
    }

    pub fn len(&self) -> usize {
        self.converters.len() + self.fallbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty() && self.fallbacks.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<dyn Converter>> {
        self.converters.iter().chain(&self.fallbacks)
    }

    /// First converter supporting the type and context.
    pub fn resolve(&self, value_type: &ValueType, context: Option<&str>) -> Option<&Arc<dyn Converter>> {
        self.iter().find(|c| c.supports(value_type, context))
    }

    /// Convert `text`, failing when no converter resolves or the parse fails.
    pub fn convert(&self, text: &str, value_type: &ValueType, context: Option<&str>) -> Result<Value> {
        let conversion_error = |reason: String| Error::Conversion {
            value: text.to_string(),
            value_type: value_type.to_string(),
            reason,
        };
        let converter = self
            .resolve(value_type, context)
            .ok_or_else(|| conversion_error(format!("no converter registered for {value_type}")))?;
        converter
            .parse(text, value_type, context)
            .map_err(conversion_error)
    }

    /// Completion candidates from the resolved converter, empty when none resolves.
    pub fn complete(
        &self,
        partial: &str,
        value_type: &ValueType,
        existing: &RawOptions,
        context: Option<&str>,
    ) -> Completions {
        let Some(converter) = self.resolve(value_type, context) else {
            return Completions::empty();
        };
        let request = CompletionRequest {
            partial,
            value_type,
            context,
            existing,
        };
        Completions::new(converter.completions(&request), partial)
    }
}

/// Built-in converters in their default resolution order.
pub fn builtin_converters() -> Vec<Arc<dyn Converter>> {
    vec![
        Arc::new(StringConverter),
        Arc::new(IntegerConverter),
        Arc::new(FloatConverter),
        Arc::new(BooleanConverter),
    ]
}

/// Identity conversion for string options.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl Converter for StringConverter {
    fn name(&self) -> &str {
        "string"
    }

    fn supports(&self, value_type: &ValueType, _context: Option<&str>) -> bool {
        *value_type == ValueType::String
    }

    fn parse(&self, text: &str, _value_type: &ValueType, _context: Option<&str>) -> ParseResult {
        Ok(Value::String(text.to_string()))
    }
}

/// Signed 64-bit integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerConverter;

impl Converter for IntegerConverter {
    fn name(&self) -> &str {
        "integer"
    }

    fn supports(&self, value_type: &ValueType, _context: Option<&str>) -> bool {
        *value_type == ValueType::Integer
    }

    fn parse(&self, text: &str, _value_type: &ValueType, _context: Option<&str>) -> ParseResult {
        text.trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| e.to_string())
    }
}

/// Finite 64-bit floats.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatConverter;

impl Converter for FloatConverter {
    fn name(&self) -> &str {
        "float"
    }

    fn supports(&self, value_type: &ValueType, _context: Option<&str>) -> bool {
        *value_type == ValueType::Float
    }

    fn parse(&self, text: &str, _value_type: &ValueType, _context: Option<&str>) -> ParseResult {
        let n = text.trim().parse::<f64>().map_err(|e| e.to_string())?;
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .ok_or_else(|| "value is not a finite number".to_string())
    }
}

/// Booleans, accepting the usual yes/no spellings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl Converter for BooleanConverter {
    fn name(&self) -> &str {
        "boolean"
    }

    fn supports(&self, value_type: &ValueType, _context: Option<&str>) -> bool {
        *value_type == ValueType::Boolean
    }

    fn parse(&self, text: &str, _value_type: &ValueType, _context: Option<&str>) -> ParseResult {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            other => Err(format!("'{other}' is not a boolean")),
        }
    }

    fn completions(&self, _request: &CompletionRequest<'_>) -> Vec<Completion> {
        vec![Completion::new("true"), Completion::new("false")]
    }
}

/// String values restricted to a fixed set, selected by context tag.
#[derive(Debug, Clone)]
pub struct ChoiceConverter {
    context: String,
    choices: Vec<String>,
}

impl ChoiceConverter {
    pub fn new<I, S>(context: &str, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            context: context.to_string(),
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

impl Converter for ChoiceConverter {
    fn name(&self) -> &str {
        &self.context
    }

    fn supports(&self, value_type: &ValueType, context: Option<&str>) -> bool {
        *value_type == ValueType::String && context == Some(self.context.as_str())
    }

    fn parse(&self, text: &str, _value_type: &ValueType, _context: Option<&str>) -> ParseResult {
        if self.choices.iter().any(|c| c == text) {
            Ok(Value::String(text.to_string()))
        } else {
            Err(format!("expected one of: {}", self.choices.join(", ")))
        }
    }

    fn completions(&self, _request: &CompletionRequest<'_>) -> Vec<Completion> {
        self.choices
            .iter()
            .map(|c| Completion::new(c).with_heading(&self.context))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Upper-cases strings; stands in for a host specialisation.
    struct ShoutConverter;

    impl Converter for ShoutConverter {
        fn name(&self) -> &str {
            "shout"
        }

        fn supports(&self, value_type: &ValueType, _context: Option<&str>) -> bool {
            *value_type == ValueType::String
        }

        fn parse(&self, text: &str, _: &ValueType, _: Option<&str>) -> ParseResult {
            Ok(Value::String(text.to_uppercase()))
        }
    }

    #[test]
    fn test_resolve_is_first_match() {
        let mut registry = ConverterRegistry::new();
        registry.register(Arc::new(ShoutConverter));
        for converter in builtin_converters() {
            registry.register(converter);
        }
        let resolved = registry.resolve(&ValueType::String, None).unwrap();
        assert_eq!(resolved.name(), "shout");
        assert_eq!(
            registry.convert("quiet", &ValueType::String, None).unwrap(),
            json!("QUIET")
        );
    }

    #[test]
    fn test_registered_converters_precede_builtins() {
        let mut registry = ConverterRegistry::with_builtins();
        registry.register(Arc::new(ShoutConverter));
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.resolve(&ValueType::String, None).unwrap().name(), "shout");
        assert_eq!(registry.resolve(&ValueType::Integer, None).unwrap().name(), "integer");
    }

    #[test]
    fn test_builtin_conversions() {
        let registry = ConverterRegistry::with_builtins();
        assert_eq!(registry.convert("42", &ValueType::Integer, None).unwrap(), json!(42));
        assert_eq!(registry.convert("2.5", &ValueType::Float, None).unwrap(), json!(2.5));
        assert_eq!(registry.convert("Yes", &ValueType::Boolean, None).unwrap(), json!(true));
        assert_eq!(registry.convert("off", &ValueType::Boolean, None).unwrap(), json!(false));
        assert_eq!(registry.convert("x y", &ValueType::String, None).unwrap(), json!("x y"));
    }

    #[test]
    fn test_parse_failure_is_conversion_error() {
        let registry = ConverterRegistry::with_builtins();
        let err = registry.convert("forty", &ValueType::Integer, None).unwrap_err();
        match err {
            Error::Conversion {
                value, value_type, ..
            } => {
                assert_eq!(value, "forty");
                assert_eq!(value_type, "integer");
            }
            other => panic!("expected conversion error, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_type_is_conversion_error() {
        let registry = ConverterRegistry::with_builtins();
        let err = registry
            .convert("eu-west", &ValueType::Custom("region".into()), None)
            .unwrap_err();
        assert!(err.to_string().contains("no converter registered for region"));
    }

    #[test]
    fn test_float_rejects_non_finite() {
        let registry = ConverterRegistry::with_builtins();
        assert!(registry.convert("NaN", &ValueType::Float, None).is_err());
        assert!(registry.convert("inf", &ValueType::Float, None).is_err());
    }

    #[test]
    fn test_choice_converter_scoped_by_context() {
        let mut registry = ConverterRegistry::new();
        registry.register(Arc::new(ChoiceConverter::new("log-level", ["info", "debug", "warn"])));
        for converter in builtin_converters() {
            registry.register(converter);
        }

        assert!(registry.convert("loud", &ValueType::String, Some("log-level")).is_err());
        assert_eq!(
            registry.convert("loud", &ValueType::String, None).unwrap(),
            json!("loud")
        );

        let existing = RawOptions::new();
        let completions = registry.complete("d", &ValueType::String, &existing, Some("log-level"));
        assert_eq!(completions.values(), vec!["debug".to_string()]);
    }

    #[test]
    fn test_completions_are_restartable() {
        let registry = ConverterRegistry::with_builtins();
        let completions = registry.complete("", &ValueType::Boolean, &RawOptions::new(), None);
        let first: Vec<_> = completions.iter().map(|c| c.value.as_str()).collect();
        let second: Vec<_> = (&completions).into_iter().map(|c| c.value.as_str()).collect();
        assert_eq!(first, vec!["true", "false"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_complete_without_converter_is_empty() {
        let registry = ConverterRegistry::new();
        let completions = registry.complete("a", &ValueType::String, &RawOptions::new(), None);
        assert!(completions.is_empty());
    }
}
