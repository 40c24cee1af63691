//! Static command and option metadata, independent of how it was declared.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type an option's text is converted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    /// Host-defined type, resolved by a host-registered converter.
    Custom(String),
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::Boolean => f.write_str("boolean"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Resource a command touches, for permission checks done elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Cluster,
    Data,
}

/// Kind of access a command performs on its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Manage,
    Write,
    Read,
}

/// Permission a command requires. Recorded by the registry, never enforced by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub resource: Resource,
    pub operation: Operation,
}

impl Permission {
    pub const fn new(resource: Resource, operation: Operation) -> Self {
        Self {
            resource,
            operation,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resource = match self.resource {
            Resource::Cluster => "CLUSTER",
            Resource::Data => "DATA",
        };
        let operation = match self.operation {
            Operation::Manage => "MANAGE",
            Operation::Write => "WRITE",
            Operation::Read => "READ",
        };
        write!(f, "{resource}:{operation}")
    }
}

/// Callable behind a command.
pub type Handler = Arc<dyn Fn(&ParsedOptions) -> anyhow::Result<Value> + Send + Sync>;

/// No-argument check gating whether a command may currently run.
pub type Availability = Arc<dyn Fn() -> bool + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&ParsedOptions) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Execution target of a command: the declaring provider and operation plus its handler.
#[derive(Clone)]
pub struct CommandTarget {
    pub provider: String,
    pub operation: String,
    handler: Handler,
}

impl CommandTarget {
    pub fn new(provider: &str, operation: &str, handler: Handler) -> Self {
        Self {
            provider: provider.to_string(),
            operation: operation.to_string(),
            handler,
        }
    }

    /// Run the command with already-resolved options.
    pub fn invoke(&self, options: &ParsedOptions) -> anyhow::Result<Value> {
        (self.handler)(options)
    }
}

impl fmt::Debug for CommandTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTarget")
            .field("provider", &self.provider)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

/// Metadata for one command parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDescriptor {
    /// First entry is the primary name, the rest are synonyms.
    pub names: Vec<String>,
    pub value_type: ValueType,
    pub help: String,
    pub mandatory: bool,
    /// Substituted when the option is omitted.
    pub unspecified_default: Option<String>,
    /// Substituted when the option is present without a value.
    pub specified_default: Option<String>,
    /// Tag handed to converters.
    pub context: Option<String>,
    /// Splits one token into an ordered list of values.
    pub value_separator: Option<char>,
}

impl OptionDescriptor {
    pub fn primary_name(&self) -> &str {
        self.names.first().map_or("", String::as_str)
    }

    pub fn answers_to(&self, key: &str) -> bool {
        self.names.iter().any(|n| n == key)
    }
}

/// Metadata for one invocable command.
#[derive(Clone)]
pub struct CommandDescriptor {
    /// First entry is the primary name, the rest are aliases.
    pub names: Vec<String>,
    pub help: String,
    pub options: Vec<OptionDescriptor>,
    pub target: CommandTarget,
    pub availability: Option<Availability>,
    pub required_permission: Option<Permission>,
    pub shell_only: bool,
    pub related_topics: Vec<String>,
}

impl CommandDescriptor {
    pub fn primary_name(&self) -> &str {
        self.names.first().map_or("", String::as_str)
    }

    pub fn aliases(&self) -> &[String] {
        self.names.get(1..).unwrap_or_default()
    }

    pub fn provider(&self) -> &str {
        &self.target.provider
    }

    /// Two descriptors are the same command when they come from the same
    /// provider operation.
    pub fn same_command(&self, other: &Self) -> bool {
        self.target.provider == other.target.provider
            && self.target.operation == other.target.operation
    }

    /// Find the option answering to `key` under any of its names.
    pub fn option(&self, key: &str) -> Option<&OptionDescriptor> {
        self.options.iter().find(|o| o.answers_to(key))
    }

    /// Evaluate the availability predicate. Commands without one are always available.
    pub fn is_available(&self) -> bool {
        self.availability.as_ref().is_none_or(|pred| pred())
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("names", &self.names)
            .field("help", &self.help)
            .field("options", &self.options)
            .field("target", &self.target)
            .field("has_availability", &self.availability.is_some())
            .field("required_permission", &self.required_permission)
            .field("shell_only", &self.shell_only)
            .field("related_topics", &self.related_topics)
            .finish()
    }
}

/// Raw option tokens as handed over by the tokenizer.
///
/// Keys are option names exactly as typed; `None` means the flag was given
/// without a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOptions(BTreeMap<String, Option<String>>);

impl RawOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` with a value.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), Some(value.to_string()));
        self
    }

    /// Add `key` as a bare flag.
    #[must_use]
    pub fn with_flag(mut self, key: &str) -> Self {
        self.0.insert(key.to_string(), None);
        self
    }

    pub fn insert(&mut self, key: String, value: Option<String>) {
        self.0.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0.get(key).map(Option::as_deref)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for RawOptions {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Converted option values keyed by each option's primary name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedOptions(BTreeMap<String, Value>);

impl ParsedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: &str, value: Value) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn descriptor(availability: Option<Availability>) -> CommandDescriptor {
        CommandDescriptor {
            names: vec!["list members".to_string(), "lm".to_string()],
            help: "List members".to_string(),
            options: vec![OptionDescriptor {
                names: vec!["group".to_string(), "g".to_string()],
                value_type: ValueType::String,
                help: String::new(),
                mandatory: false,
                unspecified_default: None,
                specified_default: None,
                context: None,
                value_separator: None,
            }],
            target: CommandTarget::new("cluster", "list_members", handler(|_| Ok(Value::Null))),
            availability,
            required_permission: Some(Permission::new(Resource::Cluster, Operation::Read)),
            shell_only: false,
            related_topics: Vec::new(),
        }
    }

    #[test]
    fn test_primary_name_and_aliases() {
        let d = descriptor(None);
        assert_eq!(d.primary_name(), "list members");
        assert_eq!(d.aliases(), &["lm".to_string()]);
        assert_eq!(d.provider(), "cluster");
    }

    #[test]
    fn test_option_lookup_by_synonym() {
        let d = descriptor(None);
        assert_eq!(d.option("g").map(OptionDescriptor::primary_name), Some("group"));
        assert!(d.option("missing").is_none());
    }

    #[test]
    fn test_availability_defaults_to_true() {
        assert!(descriptor(None).is_available());
    }

    #[test]
    fn test_availability_is_live() {
        let flag = Arc::new(AtomicBool::new(false));
        let probe = Arc::clone(&flag);
        let d = descriptor(Some(Arc::new(move || probe.load(Ordering::SeqCst))));
        assert!(!d.is_available());
        flag.store(true, Ordering::SeqCst);
        assert!(d.is_available());
    }

    #[test]
    fn test_permission_display_and_serde() {
        let p = Permission::new(Resource::Data, Operation::Write);
        assert_eq!(p.to_string(), "DATA:WRITE");
        assert_eq!(
            serde_json::to_value(p).unwrap_or_default(),
            json!({"resource": "data", "operation": "write"})
        );
    }

    #[test]
    fn test_raw_options_builder() {
        let raw = RawOptions::new().with("opt1", "x").with_flag("verbose");
        assert_eq!(raw.get("opt1"), Some(Some("x")));
        assert_eq!(raw.get("verbose"), Some(None));
        assert_eq!(raw.get("absent"), None);
        assert_eq!(raw.keys().collect::<Vec<_>>(), vec!["opt1", "verbose"]);
    }
}
