use std::time::Duration;

use serde_json::{Value, json};

use super::declare::{CommandDecl, OptionMeta, ParamDecl};
use super::descriptor::{Operation, Permission, Resource, ValueType, handler};
use super::scanner::CommandProvider;

/// Longest pause `sleep` accepts, in seconds.
const MAX_SLEEP_SECS: i64 = 60;

/// Built-in shell commands. Hosts opt in by adding this provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCommands;

impl CommandProvider for BuiltinCommands {
    fn id(&self) -> &str {
        "builtin"
    }

    fn commands(&self) -> Vec<CommandDecl> {
        vec![
            CommandDecl::new(
                "version",
                handler(|_| Ok(json!({ "version": env!("CARGO_PKG_VERSION") }))),
            )
            .names(["version"])
            .help("Display the shell version")
            .related_topic("adminsh"),
            CommandDecl::new(
                "echo",
                handler(|options| {
                    Ok(options
                        .get("string")
                        .cloned()
                        .unwrap_or(Value::Null))
                }),
            )
            .names(["echo"])
            .help("Echo the given text")
            .related_topic("adminsh")
            .param(
                ParamDecl::new("string", ValueType::String).option(
                    OptionMeta::new()
                        .mandatory()
                        .help("Text to echo"),
                ),
            ),
            CommandDecl::new(
                "sleep",
                handler(|options| {
                    let secs = options.get_i64("time").unwrap_or(0).clamp(0, MAX_SLEEP_SECS);
                    std::thread::sleep(Duration::from_secs(secs.unsigned_abs()));
                    Ok(json!({ "slept_secs": secs }))
                }),
            )
            .names(["sleep"])
            .help("Pause the shell for a number of seconds")
            .shell_only()
            .related_topic("adminsh")
            .permission(Permission::new(Resource::Cluster, Operation::Read))
            .param(
                ParamDecl::new("time", ValueType::Integer).option(
                    OptionMeta::new()
                        .unspecified_default("3")
                        .help("Seconds to sleep, at most 60"),
                ),
            ),
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::descriptor::RawOptions;
    use crate::commands::manager::{CommandManager, ManagerConfig};
    use std::sync::Arc;

    fn manager() -> CommandManager {
        CommandManager::new(ManagerConfig::new().with_provider(Arc::new(BuiltinCommands)))
    }

    #[test]
    fn test_builtin_commands_list() {
        let names = manager().get_commands();
        assert!(names.contains("version"));
        assert!(names.contains("echo"));
        assert!(names.contains("sleep"));
    }

    #[test]
    fn test_echo_returns_its_argument() {
        let manager = manager();
        let echo = manager.get_command_target("echo").unwrap();
        let options = manager
            .parse_options("echo", &RawOptions::new().with("string", "hello"))
            .unwrap();
        assert_eq!(echo.target.invoke(&options).unwrap(), json!("hello"));
    }

    #[test]
    fn test_sleep_defaults_to_three_seconds() {
        let manager = manager();
        let options = manager.parse_options("sleep", &RawOptions::new()).unwrap();
        assert_eq!(options.get_i64("time"), Some(3));
        let sleep = manager.get_command_target("sleep").unwrap();
        assert!(sleep.shell_only);
        assert_eq!(
            sleep.required_permission,
            Some(Permission::new(Resource::Cluster, Operation::Read))
        );
    }

    #[test]
    fn test_sleep_zero_returns_immediately() {
        let manager = manager();
        let options = manager
            .parse_options("sleep", &RawOptions::new().with("time", "0"))
            .unwrap();
        let sleep = manager.get_command_target("sleep").unwrap();
        assert_eq!(sleep.target.invoke(&options).unwrap(), json!({ "slept_secs": 0 }));
    }
}
