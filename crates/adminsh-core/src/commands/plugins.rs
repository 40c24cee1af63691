//! Discovery of plugin command providers.
//!
//! The manager never goes looking for providers itself: it trusts exactly
//! what the injected [`PluginLocator`] enumerates. Production wiring uses
//! [`ManifestLocator`], which enables catalog providers listed in a TOML
//! manifest; providers that are reachable but unlisted never surface.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::scanner::CommandProvider;
use crate::error::{Error, Result};

/// Enumerates provider modules contributed by the hosting environment.
pub trait PluginLocator: Send + Sync {
    fn enumerate(&self) -> Result<Vec<Arc<dyn CommandProvider>>>;
}

/// Locator over a fixed list of providers.
#[derive(Clone, Default)]
pub struct StaticLocator {
    providers: Vec<Arc<dyn CommandProvider>>,
}

impl StaticLocator {
    pub fn new(providers: Vec<Arc<dyn CommandProvider>>) -> Self {
        Self { providers }
    }
}

impl PluginLocator for StaticLocator {
    fn enumerate(&self) -> Result<Vec<Arc<dyn CommandProvider>>> {
        Ok(self.providers.clone())
    }
}

type ProviderFactory = Arc<dyn Fn() -> Arc<dyn CommandProvider> + Send + Sync>;

/// Every provider the host can reach, keyed by id.
#[derive(Clone, Default)]
pub struct ProviderCatalog {
    factories: BTreeMap<String, ProviderFactory>,
}

impl fmt::Debug for ProviderCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl ProviderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a provider reachable under `id`. A later registration replaces an earlier one.
    #[must_use]
    pub fn with<F>(mut self, id: &str, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn CommandProvider> + Send + Sync + 'static,
    {
        self.factories.insert(id.to_string(), Arc::new(factory));
        self
    }

    pub fn instantiate(&self, id: &str) -> Option<Arc<dyn CommandProvider>> {
        self.factories.get(id).map(|factory| factory())
    }
}

/// One provider entry in the plugin manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

const fn enabled_by_default() -> bool {
    true
}

/// Plugin manifest file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    #[serde(default)]
    pub providers: Vec<ManifestEntry>,
}

impl PluginManifest {
    /// Load a manifest. A missing or empty file is an empty manifest.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(Error::Plugin(format!(
                    "Failed to read plugin manifest {}: {e}",
                    path.display()
                )));
            }
        };
        Self::parse(&content).map_err(|e| {
            Error::Plugin(format!("Failed to parse plugin manifest {}: {e}", path.display()))
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        toml::from_str(content)
    }

    /// Ids of enabled entries, in manifest order.
    pub fn enabled_ids(&self) -> impl Iterator<Item = &str> {
        self.providers
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.id.as_str())
    }
}

/// Locator enabling the catalog providers a manifest file lists.
#[derive(Debug, Clone)]
pub struct ManifestLocator {
    manifest_path: PathBuf,
    catalog: ProviderCatalog,
}

impl ManifestLocator {
    pub fn new(manifest_path: impl Into<PathBuf>, catalog: ProviderCatalog) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            catalog,
        }
    }
}

impl PluginLocator for ManifestLocator {
    fn enumerate(&self) -> Result<Vec<Arc<dyn CommandProvider>>> {
        let manifest = PluginManifest::load(&self.manifest_path)?;
        let mut providers = Vec::new();
        for id in manifest.enabled_ids() {
            match self.catalog.instantiate(id) {
                Some(provider) => providers.push(provider),
                None => warn!(
                    provider = id,
                    manifest = %self.manifest_path.display(),
                    "Manifest lists a provider that is not in the catalog"
                ),
            }
        }
        Ok(providers)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::declare::CommandDecl;
    use crate::commands::descriptor::handler;
    use serde_json::Value;
    use tempfile::TempDir;

    struct Named(&'static str);

    impl CommandProvider for Named {
        fn id(&self) -> &str {
            self.0
        }

        fn commands(&self) -> Vec<CommandDecl> {
            vec![CommandDecl::new(self.0, handler(|_| Ok(Value::Null)))]
        }
    }

    fn catalog() -> ProviderCatalog {
        ProviderCatalog::new()
            .with("listed", || Arc::new(Named("listed")))
            .with("unlisted", || Arc::new(Named("unlisted")))
            .with("disabled", || Arc::new(Named("disabled")))
    }

    fn ids(providers: &[Arc<dyn CommandProvider>]) -> Vec<String> {
        providers.iter().map(|p| p.id().to_string()).collect()
    }

    #[test]
    fn test_manifest_selects_listed_enabled_providers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plugins.toml");
        std::fs::write(
            &path,
            r#"
[[providers]]
id = "listed"

[[providers]]
id = "disabled"
enabled = false

[[providers]]
id = "not-in-catalog"
"#,
        )
        .unwrap();

        let locator = ManifestLocator::new(&path, catalog());
        let providers = locator.enumerate().unwrap();
        assert_eq!(ids(&providers), vec!["listed"]);
    }

    #[test]
    fn test_missing_manifest_enumerates_nothing() {
        let dir = TempDir::new().unwrap();
        let locator = ManifestLocator::new(dir.path().join("absent.toml"), catalog());
        assert!(locator.enumerate().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_manifest_is_plugin_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plugins.toml");
        std::fs::write(&path, "[[providers]\nid = ").unwrap();
        let err = ManifestLocator::new(&path, catalog()).enumerate().err().unwrap();
        assert!(matches!(err, Error::Plugin(_)));
    }

    #[test]
    fn test_enabled_defaults_to_true() {
        let manifest = PluginManifest::parse(
            r#"
[[providers]]
id = "listed"

[[providers]]
id = "disabled"
enabled = false
"#,
        )
        .unwrap();
        assert!(manifest.providers[0].enabled);
        assert_eq!(manifest.enabled_ids().collect::<Vec<_>>(), vec!["listed"]);
    }

    #[test]
    fn test_static_locator_returns_its_list() {
        let locator = StaticLocator::new(vec![Arc::new(Named("a")), Arc::new(Named("b"))]);
        assert_eq!(ids(&locator.enumerate().unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = catalog();
        assert!(catalog.instantiate("nope").is_none());
        assert_eq!(catalog.instantiate("listed").map(|p| p.id().to_string()), Some("listed".into()));
    }
}
