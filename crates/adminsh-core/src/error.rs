//! Error types for `adminsh` core library.

use thiserror::Error;

/// Result type alias using `adminsh` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for command registration and dispatch.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed provider declaration
    #[error("Invalid declaration in provider '{provider}': {reason}")]
    Scan { provider: String, reason: String },

    /// Command names already bound to another descriptor
    #[error("Provider '{provider}' conflicts on command names: {}", names.join(", "))]
    CommandConflict { provider: String, names: Vec<String> },

    /// Provider id already taken by a provider declaring different commands
    #[error("Provider id '{0}' is already registered by a different provider")]
    ProviderIdInUse(String),

    /// Text could not be converted to the option's type
    #[error("Cannot convert '{value}' to {value_type}: {reason}")]
    Conversion {
        value: String,
        value_type: String,
        reason: String,
    },

    /// Mandatory option absent with no applicable default
    #[error("Command '{command}' requires option '{option}'")]
    MissingMandatoryOption { command: String, option: String },

    /// Option flag given without a value and without a specified default
    #[error("Option '{option}' of command '{command}' requires a value")]
    MissingOptionValue { command: String, option: String },

    /// Raw token names no option of the command
    #[error("Command '{command}' has no option '{option}'")]
    UnknownOption { command: String, option: String },

    /// Same option supplied under more than one of its names
    #[error("Option '{option}' of command '{command}' was given more than once")]
    DuplicateOption { command: String, option: String },

    /// Dispatch requested for a name that is not registered
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Registration attempted on a manager that has been cleared
    #[error("Command manager instance has been cleared")]
    InstanceCleared,

    /// Plugin enumeration error
    #[error("Plugin discovery error: {0}")]
    Plugin(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn scan(provider: &str, reason: impl Into<String>) -> Self {
        Self::Scan {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }
}
