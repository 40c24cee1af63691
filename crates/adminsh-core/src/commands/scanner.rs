//! Turns provider declarations into validated command descriptors.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::converter::Converter;
use super::declare::{AvailabilityDecl, CommandDecl, ParamDecl};
use super::descriptor::{CommandDescriptor, CommandTarget, OptionDescriptor};
use crate::error::{Error, Result};

/// Lower-to-upper camel-case transitions (`testParam` -> `test Param`).
#[allow(clippy::expect_used)]
static CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("static regex is valid"));

/// Explicit word separators in operation identifiers.
#[allow(clippy::expect_used)]
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\-\s]+").expect("static regex is valid"));

/// A cohesive group of related commands registered together.
pub trait CommandProvider: Send + Sync {
    /// Identity of the provider. Adding a provider whose id is already
    /// registered is a no-op.
    fn id(&self) -> &str;

    fn commands(&self) -> Vec<CommandDecl>;

    /// Availability predicates, matched against commands in declaration order.
    fn availability(&self) -> Vec<AvailabilityDecl> {
        Vec::new()
    }

    /// Converters contributed by this provider.
    fn converters(&self) -> Vec<Arc<dyn Converter>> {
        Vec::new()
    }
}

/// Everything a scan extracts from one provider.
#[derive(Default)]
pub struct ScanOutput {
    pub commands: Vec<CommandDescriptor>,
    pub converters: Vec<Arc<dyn Converter>>,
}

/// Derive a command name from an operation identifier.
///
/// Words are split at `_`, `-`, whitespace and lower-to-upper camel-case
/// transitions, lower-cased and joined with single spaces.
pub fn default_command_name(operation: &str) -> String {
    let spaced = CAMEL_BOUNDARY.replace_all(operation, "$1 $2");
    SEPARATORS
        .split(&spaced)
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scan one provider into command descriptors plus its converters.
pub fn scan(provider: &dyn CommandProvider) -> Result<ScanOutput> {
    let provider_id = provider.id();
    if provider_id.trim().is_empty() {
        return Err(Error::scan(provider_id, "provider id is empty"));
    }

    let indicators = provider.availability();
    let commands = provider
        .commands()
        .into_iter()
        .map(|decl| scan_command(provider_id, decl, &indicators))
        .collect::<Result<Vec<_>>>()?;

    Ok(ScanOutput {
        commands,
        converters: provider.converters(),
    })
}

fn scan_command(
    provider_id: &str,
    decl: CommandDecl,
    indicators: &[AvailabilityDecl],
) -> Result<CommandDescriptor> {
    let names = match decl.names {
        Some(names) => names,
        None => vec![default_command_name(&decl.operation)],
    };
    if names.is_empty() {
        return Err(Error::scan(
            provider_id,
            format!("command '{}' declares no names", decl.operation),
        ));
    }
    check_names(provider_id, &decl.operation, "command name", &names)?;

    let options = decl
        .params
        .into_iter()
        .map(|param| scan_param(provider_id, &names[0], param))
        .collect::<Result<Vec<_>>>()?;

    let option_keys: Vec<String> = options.iter().flat_map(|o| o.names.clone()).collect();
    check_names(provider_id, &names[0], "option key", &option_keys)?;

    let availability = indicators
        .iter()
        .find(|ind| ind.applies_to(&names[0]))
        .map(|ind| Arc::clone(&ind.predicate));

    Ok(CommandDescriptor {
        target: CommandTarget::new(provider_id, &decl.operation, decl.handler),
        names,
        help: decl.help,
        options,
        availability,
        required_permission: decl.permission,
        shell_only: decl.shell_only,
        related_topics: decl.related_topics,
    })
}

fn scan_param(provider_id: &str, command: &str, param: ParamDecl) -> Result<OptionDescriptor> {
    let Some(meta) = param.option else {
        return Ok(OptionDescriptor {
            names: vec![param.ident],
            value_type: param.value_type,
            help: String::new(),
            mandatory: false,
            unspecified_default: None,
            specified_default: None,
            context: None,
            value_separator: None,
        });
    };

    let names = meta.keys.unwrap_or_else(|| vec![param.ident.clone()]);
    if names.is_empty() {
        return Err(Error::scan(
            provider_id,
            format!("option '{}' of '{command}' declares no keys", param.ident),
        ));
    }
    if meta.mandatory && meta.unspecified_default.is_some() {
        return Err(Error::scan(
            provider_id,
            format!(
                "option '{}' of '{command}' is mandatory but declares an unspecified default",
                names[0]
            ),
        ));
    }

    Ok(OptionDescriptor {
        names,
        value_type: param.value_type,
        help: meta.help,
        mandatory: meta.mandatory,
        unspecified_default: meta.unspecified_default,
        specified_default: meta.specified_default,
        context: meta.context,
        value_separator: meta.value_separator,
    })
}

/// Reject blank and repeated names within one declaration.
fn check_names(provider_id: &str, owner: &str, what: &str, names: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(Error::scan(provider_id, format!("'{owner}' has a blank {what}")));
        }
        if !seen.insert(name.as_str()) {
            return Err(Error::scan(
                provider_id,
                format!("'{owner}' repeats {what} '{name}'"),
            ));
        }
    }
    Ok(())
}
