//! Providers reachable by the `adminsh` binary.
//!
//! Only the built-in commands are wired in directly; everything else in the
//! catalog becomes visible only when the plugin manifest enables it.

use std::sync::Arc;

use adminsh_core::commands::{
    AvailabilityDecl, CommandDecl, CommandProvider, Completion, CompletionRequest, Converter,
    OptionMeta, ParamDecl, ProviderCatalog, ValueType, handler,
};
use serde_json::{Map, Value};

/// Context tag for options naming an environment variable.
const ENV_VAR_CONTEXT: &str = "env-var";

/// Every provider the binary can load as a plugin.
pub fn plugin_catalog() -> ProviderCatalog {
    ProviderCatalog::new().with("env", || Arc::new(EnvCommands))
}

/// Commands for inspecting the shell's environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCommands;

impl CommandProvider for EnvCommands {
    fn id(&self) -> &str {
        "env"
    }

    fn commands(&self) -> Vec<CommandDecl> {
        vec![
            CommandDecl::new(
                "getEnv",
                handler(|options| {
                    let name = options.get_str("name").unwrap_or_default();
                    Ok(std::env::var(name).map_or(Value::Null, Value::String))
                }),
            )
            .help("Print the value of an environment variable")
            .param(
                ParamDecl::new("name", ValueType::String).option(
                    OptionMeta::new()
                        .keys(["name", "n"])
                        .mandatory()
                        .context(ENV_VAR_CONTEXT)
                        .help("Variable name"),
                ),
            ),
            CommandDecl::new(
                "listEnv",
                handler(|options| {
                    let prefix = options.get_str("prefix").unwrap_or_default();
                    let vars: Map<String, Value> = std::env::vars()
                        .filter(|(k, _)| k.starts_with(prefix))
                        .map(|(k, v)| (k, Value::String(v)))
                        .collect();
                    Ok(Value::Object(vars))
                }),
            )
            .help("List environment variables")
            .param(
                ParamDecl::new("prefix", ValueType::String).option(
                    OptionMeta::new()
                        .unspecified_default("")
                        .help("Only list variables starting with this prefix"),
                ),
            ),
        ]
    }

    fn availability(&self) -> Vec<AvailabilityDecl> {
        // Hidden when the process environment has been wiped.
        vec![AvailabilityDecl::all(|| std::env::vars_os().next().is_some())]
    }

    fn converters(&self) -> Vec<Arc<dyn Converter>> {
        vec![Arc::new(EnvVarConverter)]
    }
}

/// Environment variable names; completes from the live environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvVarConverter;

impl Converter for EnvVarConverter {
    fn name(&self) -> &str {
        ENV_VAR_CONTEXT
    }

    fn supports(&self, value_type: &ValueType, context: Option<&str>) -> bool {
        *value_type == ValueType::String && context == Some(ENV_VAR_CONTEXT)
    }

    fn parse(
        &self,
        text: &str,
        _value_type: &ValueType,
        _context: Option<&str>,
    ) -> Result<Value, String> {
        if text.is_empty() || text.contains('=') || text.contains('\0') {
            return Err(format!("'{text}' is not a valid variable name"));
        }
        Ok(Value::String(text.to_string()))
    }

    fn completions(&self, _request: &CompletionRequest<'_>) -> Vec<Completion> {
        let mut names: Vec<String> = std::env::vars().map(|(k, _)| k).collect();
        names.sort();
        names.iter().map(|n| Completion::new(n)).collect()
    }
}
