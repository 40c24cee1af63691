//! Builder-style declarations that command providers hand to the scanner.
//!
//! Declarations are deliberately loose: missing names, missing option keys
//! and contradictory defaults are only caught when the scanner turns them
//! into descriptors.

use std::sync::Arc;

use super::descriptor::{Availability, Handler, Permission, ValueType};

/// Declaration of one command operation.
#[derive(Clone)]
pub struct CommandDecl {
    /// Identifier of the operation; the default command name is derived from it.
    pub operation: String,
    /// Explicit names. `None` derives one from `operation`.
    pub names: Option<Vec<String>>,
    pub help: String,
    pub params: Vec<ParamDecl>,
    pub handler: Handler,
    pub shell_only: bool,
    pub related_topics: Vec<String>,
    pub permission: Option<Permission>,
}

impl CommandDecl {
    pub fn new(operation: &str, handler: Handler) -> Self {
        Self {
            operation: operation.to_string(),
            names: None,
            help: String::new(),
            params: Vec::new(),
            handler,
            shell_only: false,
            related_topics: Vec::new(),
            permission: None,
        }
    }

    /// Set the command names; the first is the primary name.
    #[must_use]
    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }

    #[must_use]
    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub const fn shell_only(mut self) -> Self {
        self.shell_only = true;
        self
    }

    #[must_use]
    pub fn related_topic(mut self, topic: &str) -> Self {
        self.related_topics.push(topic.to_string());
        self
    }

    #[must_use]
    pub const fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }
}

/// Declaration of one operation parameter.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub ident: String,
    pub value_type: ValueType,
    pub option: Option<OptionMeta>,
}

impl ParamDecl {
    pub fn new(ident: &str, value_type: ValueType) -> Self {
        Self {
            ident: ident.to_string(),
            value_type,
            option: None,
        }
    }

    #[must_use]
    pub fn option(mut self, meta: OptionMeta) -> Self {
        self.option = Some(meta);
        self
    }
}

/// Option metadata attached to a parameter.
#[derive(Debug, Clone, Default)]
pub struct OptionMeta {
    /// Option keys; the first is the primary name. `None` uses the parameter identifier.
    pub keys: Option<Vec<String>>,
    pub help: String,
    pub mandatory: bool,
    pub unspecified_default: Option<String>,
    pub specified_default: Option<String>,
    pub context: Option<String>,
    pub value_separator: Option<char>,
}

impl OptionMeta {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }

    #[must_use]
    pub const fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    #[must_use]
    pub fn unspecified_default(mut self, value: &str) -> Self {
        self.unspecified_default = Some(value.to_string());
        self
    }

    #[must_use]
    pub fn specified_default(mut self, value: &str) -> Self {
        self.specified_default = Some(value.to_string());
        self
    }

    #[must_use]
    pub fn context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    #[must_use]
    pub const fn value_separator(mut self, separator: char) -> Self {
        self.value_separator = Some(separator);
        self
    }
}

/// Availability predicate together with the commands it gates.
#[derive(Clone)]
pub struct AvailabilityDecl {
    /// Primary command names this predicate applies to; empty means every command of the provider.
    pub targets: Vec<String>,
    pub predicate: Availability,
}

impl AvailabilityDecl {
    /// Gate every command of the provider.
    pub fn all<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            targets: Vec::new(),
            predicate: Arc::new(predicate),
        }
    }

    /// Gate only the named commands.
    pub fn for_commands<I, S, F>(targets: I, predicate: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn applies_to(&self, primary_name: &str) -> bool {
        self.targets.is_empty() || self.targets.iter().any(|t| t == primary_name)
    }
}
