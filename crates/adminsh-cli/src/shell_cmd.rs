//! CLI subcommands for inspecting and invoking registered commands.

use std::fmt::Write as _;

use adminsh_core::commands::{CommandDescriptor, CommandManager, OptionDescriptor, RawOptions};
use anyhow::{Result, bail};
use serde_json::Value;

/// Command registry subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum ShellAction {
    /// List every command with its aliases and current availability.
    List,

    /// Show names, permission and options of one command.
    Describe {
        /// Command name or alias
        command: String,
    },

    /// Resolve options and invoke a command, printing its JSON result.
    Run {
        /// Command name or alias
        command: String,

        /// Option with a value, as `key=value` (repeatable)
        #[arg(short = 'o', long = "option", value_parser = parse_option_arg)]
        options: Vec<(String, String)>,

        /// Option given without a value (repeatable)
        #[arg(short = 'f', long = "flag")]
        flags: Vec<String>,
    },

    /// Print completion candidates for one option of a command.
    Complete {
        /// Command name or alias
        command: String,

        /// Option name
        option: String,

        /// Text typed so far
        #[arg(default_value = "")]
        partial: String,
    },
}

/// Parse a `key=value` option argument.
pub fn parse_option_arg(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{arg}'")),
    }
}

/// Build the raw token map handed to the registry.
pub fn raw_options(options: Vec<(String, String)>, flags: Vec<String>) -> RawOptions {
    options
        .into_iter()
        .map(|(k, v)| (k, Some(v)))
        .chain(flags.into_iter().map(|k| (k, None)))
        .collect()
}

/// Execute a registry subcommand and return the text to print.
pub fn execute(manager: &CommandManager, action: ShellAction) -> Result<String> {
    match action {
        ShellAction::List => Ok(render_list(manager)),
        ShellAction::Describe { command } => {
            let Some(descriptor) = manager.get_command_target(&command) else {
                bail!("Unknown command: {command}");
            };
            Ok(render_describe(&descriptor, manager.is_available(&command)))
        }
        ShellAction::Run {
            command,
            options,
            flags,
        } => {
            let result = run_command(manager, &command, &raw_options(options, flags))?;
            Ok(serde_json::to_string_pretty(&result)?)
        }
        ShellAction::Complete {
            command,
            option,
            partial,
        } => {
            let completions =
                manager.complete_option(&command, &option, &partial, &RawOptions::new());
            Ok(completions.values().join("\n"))
        }
    }
}

/// Resolve options and invoke `command` if it is currently available.
pub fn run_command(manager: &CommandManager, command: &str, raw: &RawOptions) -> Result<Value> {
    let Some(descriptor) = manager.get_command_target(command) else {
        bail!("Unknown command: {command}");
    };
    if !manager.is_available(command) {
        bail!("Command '{command}' is not available right now");
    }
    let options = manager.parse_options(command, raw)?;
    descriptor.target.invoke(&options)
}

fn render_list(manager: &CommandManager) -> String {
    let mut out = String::new();
    for descriptor in manager.descriptors() {
        let name = descriptor.primary_name();
        let marker = if manager.is_available(name) { ' ' } else { '!' };
        let _ = write!(out, "{marker} {name}");
        if !descriptor.aliases().is_empty() {
            let _ = write!(out, " ({})", descriptor.aliases().join(", "));
        }
        let _ = writeln!(out, "  {}", descriptor.help);
    }
    out
}

fn render_describe(descriptor: &CommandDescriptor, available: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "NAME\n    {}", descriptor.primary_name());
    if !descriptor.aliases().is_empty() {
        let _ = writeln!(out, "ALIASES\n    {}", descriptor.aliases().join(", "));
    }
    if !descriptor.help.is_empty() {
        let _ = writeln!(out, "DESCRIPTION\n    {}", descriptor.help);
    }
    let _ = writeln!(out, "PROVIDER\n    {}", descriptor.provider());
    if let Some(permission) = descriptor.required_permission {
        let _ = writeln!(out, "PERMISSION\n    {permission}");
    }
    let _ = writeln!(out, "AVAILABLE\n    {available}");
    if descriptor.shell_only {
        let _ = writeln!(out, "SHELL ONLY\n    true");
    }
    if !descriptor.related_topics.is_empty() {
        let _ = writeln!(out, "TOPICS\n    {}", descriptor.related_topics.join(", "));
    }
    if !descriptor.options.is_empty() {
        let _ = writeln!(out, "PARAMETERS");
        for option in &descriptor.options {
            render_option(&mut out, option);
        }
    }
    out
}

fn render_option(out: &mut String, option: &OptionDescriptor) {
    let _ = writeln!(out, "    {} ({})", option.names.join(", "), option.value_type);
    if !option.help.is_empty() {
        let _ = writeln!(out, "        {}", option.help);
    }
    let _ = writeln!(out, "        Required: {}", option.mandatory);
    if let Some(default) = &option.specified_default {
        let _ = writeln!(out, "        Default (if the option is specified without value): {default}");
    }
    if let Some(default) = &option.unspecified_default {
        let _ = writeln!(out, "        Default (if the option is not specified): {default}");
    }
    if let Some(separator) = option.value_separator {
        let _ = writeln!(out, "        Separator: '{separator}'");
    }
}
