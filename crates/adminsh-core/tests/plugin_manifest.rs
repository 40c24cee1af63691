#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! Manifest-driven plugin discovery through the command manager.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use serial_test::serial;
use tempfile::TempDir;

use adminsh_core::commands::{
    BuiltinCommands, CommandDecl, CommandManager, CommandProvider, ManagerConfig,
    ManifestLocator, ProviderCatalog, handler,
};

struct MockPlugin {
    id: &'static str,
    command: &'static str,
}

impl CommandProvider for MockPlugin {
    fn id(&self) -> &str {
        self.id
    }

    fn commands(&self) -> Vec<CommandDecl> {
        vec![CommandDecl::new(self.id, handler(|_| Ok(Value::Null))).names([self.command])]
    }
}

fn catalog() -> ProviderCatalog {
    ProviderCatalog::new()
        .with("mock-plugin", || {
            Arc::new(MockPlugin {
                id: "mock-plugin",
                command: "mock plugin command",
            })
        })
        .with("mock-plugin-unlisted", || {
            Arc::new(MockPlugin {
                id: "mock-plugin-unlisted",
                command: "mock plugin command unlisted",
            })
        })
        .with("mock-plugin-clash", || {
            Arc::new(MockPlugin {
                id: "mock-plugin-clash",
                command: "echo",
            })
        })
}

fn write_manifest(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("plugins.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn config(manifest: &Path) -> ManagerConfig {
    ManagerConfig::new()
        .with_provider(Arc::new(BuiltinCommands))
        .with_plugin_locator(Arc::new(ManifestLocator::new(manifest, catalog())))
}

#[test]
#[serial]
fn test_only_listed_plugins_become_visible() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        dir.path(),
        r#"
[[providers]]
id = "mock-plugin"
"#,
    );

    let manager = CommandManager::get_instance(config(&manifest));
    let commands = manager.get_commands();
    CommandManager::clear_instance();

    assert!(commands.contains("mock plugin command"), "Should find listed plugin.");
    assert!(
        !commands.contains("mock plugin command unlisted"),
        "Should not find unlisted plugin."
    );
}

#[test]
fn test_plugins_deferred_until_requested() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        dir.path(),
        r#"
[[providers]]
id = "mock-plugin"

[[providers]]
id = "mock-plugin-unlisted"
enabled = false
"#,
    );

    let manager = CommandManager::new(config(&manifest).load_plugins(false));
    assert!(!manager.get_commands().contains("mock plugin command"));

    assert_eq!(manager.load_plugin_commands().unwrap(), 1);
    let markers = manager.get_command_markers();
    assert!(markers.contains("builtin"));
    assert!(markers.contains("mock-plugin"));
    assert!(!markers.contains("mock-plugin-unlisted"));
}

#[test]
fn test_conflicting_plugin_is_skipped() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        dir.path(),
        r#"
[[providers]]
id = "mock-plugin-clash"

[[providers]]
id = "mock-plugin"
"#,
    );

    let manager = CommandManager::new(config(&manifest));
    let markers = manager.get_command_markers();
    assert!(!markers.contains("mock-plugin-clash"));
    assert!(markers.contains("mock-plugin"));
    let echo = manager.get_command_target("echo").unwrap();
    assert_eq!(echo.provider(), "builtin");
}

#[test]
fn test_malformed_manifest_leaves_direct_providers() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(dir.path(), "providers = 12");

    let manager = CommandManager::new(config(&manifest));
    assert!(manager.get_commands().contains("version"));
    assert_eq!(manager.get_command_markers().len(), 1);
    assert_eq!(manager.load_plugin_commands().unwrap(), 0);
}
