//! Configuration resolution for adminsh.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`<config dir>/adminsh/settings.json`)
//! 3. Project config (path supplied by the caller)
//! 4. Environment variables
//!
//! CLI arguments are applied on top by the binary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete adminsh configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub plugins: PluginSettings,
}

/// Shell front-end configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShellConfig {
    pub log_level: String,
    pub log_json: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

/// Plugin provider discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PluginSettings {
    /// Load manifest-listed plugin providers when the manager is created.
    pub load_on_startup: bool,
    /// TOML manifest selecting which catalog providers are plugins.
    pub manifest_path: Option<PathBuf>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            load_on_startup: true,
            manifest_path: None,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_file: Option<&Path>) -> Result<Config> {
    let global = global_config_path().filter(|path| path.exists());
    let mut config = resolve_layers(global.as_deref().into_iter().chain(project_file))?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("adminsh").join("settings.json"))
}

/// Fold config files over the defaults, later files winning key by key.
fn resolve_layers<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;
    for path in paths {
        merge_layer(&mut merged, load_layer(path)?);
    }
    Ok(serde_json::from_value(merged)?)
}

/// Read one config file as raw JSON, rejecting content that is not a valid [`Config`].
fn load_layer(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let layer: Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    Config::deserialize(&layer).map_err(|e| {
        Error::Config(format!("Invalid config file {}: {}", path.display(), e))
    })?;
    Ok(layer)
}

/// Only keys present in `overlay` replace values in `base`; objects merge recursively.
fn merge_layer(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_layer(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("ADMINSH_LOG_LEVEL") {
        config.shell.log_level = val;
    }
    if let Some(val) = var("ADMINSH_PLUGIN_MANIFEST") {
        config.plugins.manifest_path = Some(PathBuf::from(val));
    }
    if let Some(val) = var("ADMINSH_LOAD_PLUGINS")
        && let Ok(flag) = val.parse()
    {
        config.plugins.load_on_startup = flag;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn default_config_loads_plugins_on_startup() {
        let config = Config::default();
        assert!(config.plugins.load_on_startup);
        assert!(config.plugins.manifest_path.is_none());
        assert_eq!(config.shell.log_level, "info");
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn project_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "settings.json",
            r#"{"plugins": {"load_on_startup": false, "manifest_path": "/etc/adminsh/plugins.toml"}}"#,
        );

        let config = resolve_layers([path.as_path()]).unwrap();
        assert!(!config.plugins.load_on_startup);
        assert_eq!(
            config.plugins.manifest_path,
            Some(PathBuf::from("/etc/adminsh/plugins.toml"))
        );
        assert_eq!(config.shell.log_level, "info");
    }

    #[test]
    fn later_layer_only_replaces_keys_it_sets() {
        let dir = TempDir::new().unwrap();
        let global = write(
            &dir,
            "global.json",
            r#"{"shell": {"log_level": "debug"}, "plugins": {"load_on_startup": false}}"#,
        );
        let project = write(&dir, "project.json", r#"{"plugins": {"manifest_path": "p.toml"}}"#);

        let config = resolve_layers([global.as_path(), project.as_path()]).unwrap();
        assert_eq!(config.shell.log_level, "debug");
        assert!(!config.shell.log_json);
        assert!(!config.plugins.load_on_startup);
        assert_eq!(config.plugins.manifest_path, Some(PathBuf::from("p.toml")));
    }

    #[test]
    fn later_layer_wins_on_shared_keys() {
        let dir = TempDir::new().unwrap();
        let global = write(&dir, "global.json", r#"{"shell": {"log_level": "debug", "log_json": true}}"#);
        let project = write(&dir, "project.json", r#"{"shell": {"log_level": "warn"}}"#);

        let config = resolve_layers([global.as_path(), project.as_path()]).unwrap();
        assert_eq!(config.shell.log_level, "warn");
        assert!(config.shell.log_json);
    }

    #[test]
    fn no_layers_yields_defaults() {
        let config = resolve_layers(std::iter::empty()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "settings.json", "{not json");
        let err = load_layer(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("settings.json"));
    }

    #[test]
    fn mistyped_field_is_rejected_with_the_path() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "settings.json", r#"{"plugins": {"load_on_startup": "yes"}}"#);
        let err = resolve_layers([path.as_path()]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("settings.json"));
    }

    #[test]
    fn env_overrides_apply_last() {
        let vars: HashMap<&str, &str> = [
            ("ADMINSH_LOG_LEVEL", "debug"),
            ("ADMINSH_PLUGIN_MANIFEST", "plugins.toml"),
            ("ADMINSH_LOAD_PLUGINS", "false"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.shell.log_level, "debug");
        assert_eq!(
            config.plugins.manifest_path,
            Some(PathBuf::from("plugins.toml"))
        );
        assert!(!config.plugins.load_on_startup);
    }

    #[test]
    fn unparsable_load_flag_is_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| {
            (k == "ADMINSH_LOAD_PLUGINS").then(|| "maybe".to_string())
        });
        assert!(config.plugins.load_on_startup);
    }
}
