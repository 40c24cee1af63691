//! The command registry: provider aggregation, name index, dispatch helpers
//! and the process-wide instance lifecycle.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::converter::{Completion, Completions, Converter, ConverterRegistry};
use super::descriptor::{CommandDescriptor, OptionDescriptor, ParsedOptions, RawOptions, ValueType};
use super::plugins::PluginLocator;
use super::scanner::{CommandProvider, scan};
use crate::error::{Error, Result};

/// The single live manager, if any.
static INSTANCE: Mutex<Option<Arc<CommandManager>>> = Mutex::new(None);

/// Lifecycle of one manager instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Scanning,
    Ready,
    Cleared,
}

/// Construction parameters for a [`CommandManager`].
#[derive(Clone)]
pub struct ManagerConfig {
    pub providers: Vec<Arc<dyn CommandProvider>>,
    /// Registered ahead of the built-in converters.
    pub converters: Vec<Arc<dyn Converter>>,
    pub plugin_locator: Option<Arc<dyn PluginLocator>>,
    pub load_plugins: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            converters: Vec::new(),
            plugin_locator: None,
            load_plugins: true,
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn CommandProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converters.push(converter);
        self
    }

    #[must_use]
    pub fn with_plugin_locator(mut self, locator: Arc<dyn PluginLocator>) -> Self {
        self.plugin_locator = Some(locator);
        self
    }

    #[must_use]
    pub const fn load_plugins(mut self, load: bool) -> Self {
        self.load_plugins = load;
        self
    }
}

struct Registry {
    state: LifecycleState,
    index: HashMap<String, Arc<CommandDescriptor>>,
    providers: BTreeMap<String, Arc<dyn CommandProvider>>,
    converters: ConverterRegistry,
    plugins_loaded: bool,
}

impl Registry {
    /// Whether `commands` are exactly the commands registered under `provider_id`.
    fn holds_exactly(&self, provider_id: &str, commands: &[CommandDescriptor]) -> bool {
        let registered: BTreeSet<&str> = self
            .index
            .values()
            .filter(|d| d.provider() == provider_id)
            .map(|d| d.target.operation.as_str())
            .collect();
        registered.len() == commands.len()
            && commands.iter().all(|command| {
                command.names.iter().all(|name| {
                    self.index
                        .get(name)
                        .is_some_and(|d| d.same_command(command) && d.names == command.names)
                })
            })
    }
}

/// Registry of every command the shell can dispatch.
pub struct CommandManager {
    registry: RwLock<Registry>,
    plugin_locator: Option<Arc<dyn PluginLocator>>,
}

impl std::fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.read();
        f.debug_struct("CommandManager")
            .field("state", &registry.state)
            .field("providers", &registry.providers.keys().collect::<Vec<_>>())
            .field("commands", &registry.index.len())
            .field("plugins_loaded", &registry.plugins_loaded)
            .finish_non_exhaustive()
    }
}

impl CommandManager {
    /// Return the live manager, creating and scanning it on first use.
    ///
    /// `config` is only consulted when no instance is alive. Concurrent first
    /// callers block until the single instance is fully scanned.
    pub fn get_instance(config: ManagerConfig) -> Arc<Self> {
        let mut slot = INSTANCE.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slot.as_ref() {
            return Arc::clone(existing);
        }
        let manager = Arc::new(Self::new(config));
        *slot = Some(Arc::clone(&manager));
        manager
    }

    /// Release the live manager. The next [`CommandManager::get_instance`] starts fresh.
    pub fn clear_instance() {
        let released = INSTANCE
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(manager) = released {
            manager.clear();
            info!("Command manager instance cleared");
        }
    }

    /// Build a standalone manager outside the process-wide slot.
    pub fn new(config: ManagerConfig) -> Self {
        let mut converters = ConverterRegistry::with_builtins();
        for converter in config.converters {
            converters.register(converter);
        }

        let manager = Self {
            registry: RwLock::new(Registry {
                state: LifecycleState::Uninitialized,
                index: HashMap::new(),
                providers: BTreeMap::new(),
                converters,
                plugins_loaded: false,
            }),
            plugin_locator: config.plugin_locator,
        };

        manager.write().state = LifecycleState::Scanning;
        for provider in config.providers {
            if let Err(e) = manager.register(&provider) {
                warn!(provider = provider.id(), error = %e, "Skipping command provider");
            }
        }
        manager.write().state = LifecycleState::Ready;

        if config.load_plugins
            && let Err(e) = manager.load_plugin_commands()
        {
            warn!(error = %e, "Plugin command discovery failed");
        }

        {
            let registry = manager.read();
            info!(
                providers = registry.providers.len(),
                commands = registry.index.len(),
                "Command manager ready"
            );
        }
        manager
    }

    pub fn state(&self) -> LifecycleState {
        self.read().state
    }

    /// Register every command of `provider`, all or nothing.
    ///
    /// Re-adding a registered provider, or a fresh instance of it declaring
    /// the same commands, is a no-op. Any other provider reusing a registered
    /// id is rejected.
    pub fn add(&self, provider: Arc<dyn CommandProvider>) -> Result<()> {
        self.register(&provider)
    }

    /// Enumerate plugin providers and register each. Runs at most once per instance.
    ///
    /// Returns the number of plugin providers registered by this call.
    pub fn load_plugin_commands(&self) -> Result<usize> {
        {
            let mut registry = self.write();
            if registry.state == LifecycleState::Cleared {
                return Err(Error::InstanceCleared);
            }
            if registry.plugins_loaded {
                debug!("Plugin commands already loaded");
                return Ok(0);
            }
            registry.plugins_loaded = true;
        }

        let Some(locator) = &self.plugin_locator else {
            return Ok(0);
        };
        let providers = locator.enumerate()?;

        self.write().state = LifecycleState::Scanning;
        let mut loaded = 0;
        for provider in providers {
            match self.register(&provider) {
                Ok(()) => loaded += 1,
                Err(e) => warn!(provider = provider.id(), error = %e, "Skipping plugin provider"),
            }
        }
        {
            let mut registry = self.write();
            if registry.state == LifecycleState::Scanning {
                registry.state = LifecycleState::Ready;
            }
        }

        info!(plugins = loaded, "Plugin commands loaded");
        Ok(loaded)
    }

    /// Ids of every registered provider.
    pub fn get_command_markers(&self) -> BTreeSet<String> {
        self.read().providers.keys().cloned().collect()
    }

    /// Every registered command name, primary names and aliases alike.
    pub fn get_commands(&self) -> BTreeSet<String> {
        self.read().index.keys().cloned().collect()
    }

    /// Exact-match lookup by primary name or alias.
    pub fn get_command_target(&self, name: &str) -> Option<Arc<CommandDescriptor>> {
        self.read().index.get(name).cloned()
    }

    /// Registered descriptors, one per command, ordered by primary name.
    pub fn descriptors(&self) -> Vec<Arc<CommandDescriptor>> {
        let registry = self.read();
        let mut seen = BTreeSet::new();
        let mut descriptors: Vec<_> = registry
            .index
            .values()
            .filter(|d| seen.insert((d.provider().to_string(), d.target.operation.clone())))
            .cloned()
            .collect();
        descriptors.sort_by(|a, b| a.primary_name().cmp(b.primary_name()));
        descriptors
    }

    /// Whether `name` is registered and its availability predicate currently allows it.
    ///
    /// The predicate runs on every call, outside the registry lock.
    pub fn is_available(&self, name: &str) -> bool {
        let Some(descriptor) = self.get_command_target(name) else {
            return false;
        };
        let available = descriptor.is_available();
        debug!(command = name, available, "Availability checked");
        available
    }

    /// Resolve raw option tokens into converted values for command `name`.
    pub fn parse_options(&self, name: &str, raw: &RawOptions) -> Result<ParsedOptions> {
        let descriptor = self
            .get_command_target(name)
            .ok_or_else(|| Error::UnknownCommand(name.to_string()))?;

        if let Some(unknown) = raw.keys().find(|key| descriptor.option(key).is_none()) {
            return Err(Error::UnknownOption {
                command: name.to_string(),
                option: unknown.to_string(),
            });
        }

        let converters = self.read().converters.clone();
        let mut parsed = ParsedOptions::new();
        for option in &descriptor.options {
            let given: Vec<&str> = option
                .names
                .iter()
                .map(String::as_str)
                .filter(|n| raw.contains(n))
                .collect();
            if given.len() > 1 {
                return Err(Error::DuplicateOption {
                    command: name.to_string(),
                    option: option.primary_name().to_string(),
                });
            }

            let text = match given.first().and_then(|key| raw.get(key)) {
                Some(Some(text)) => text.to_string(),
                Some(None) => match &option.specified_default {
                    Some(default) => default.clone(),
                    None if option.value_type == ValueType::Boolean => "true".to_string(),
                    None => {
                        return Err(Error::MissingOptionValue {
                            command: name.to_string(),
                            option: option.primary_name().to_string(),
                        });
                    }
                },
                None if option.mandatory => {
                    return Err(Error::MissingMandatoryOption {
                        command: name.to_string(),
                        option: option.primary_name().to_string(),
                    });
                }
                None => match &option.unspecified_default {
                    Some(default) => default.clone(),
                    None => continue,
                },
            };

            let value = convert_option(&converters, option, &text)?;
            parsed.insert(option.primary_name(), value);
        }
        Ok(parsed)
    }

    /// Completion candidates for one option of a command.
    pub fn complete_option(
        &self,
        command: &str,
        option_key: &str,
        partial: &str,
        existing: &RawOptions,
    ) -> Completions {
        let Some(descriptor) = self.get_command_target(command) else {
            return Completions::empty();
        };
        let Some(option) = descriptor.option(option_key) else {
            return Completions::empty();
        };
        let converters = self.read().converters.clone();
        converters.complete(
            partial,
            &option.value_type,
            existing,
            option.context.as_deref(),
        )
    }

    /// Command names starting with `partial` whose commands are currently available.
    pub fn complete_command(&self, partial: &str) -> Completions {
        let candidates: Vec<(String, Arc<CommandDescriptor>)> = self
            .read()
            .index
            .iter()
            .filter(|(name, _)| name.starts_with(partial))
            .map(|(name, d)| (name.clone(), Arc::clone(d)))
            .collect();
        let mut names: Vec<Completion> = candidates
            .into_iter()
            .filter(|(_, d)| d.is_available())
            .map(|(name, _)| Completion::new(&name))
            .collect();
        names.sort_by(|a, b| a.value.cmp(&b.value));
        Completions::new(names, partial)
    }

    fn register(&self, provider: &Arc<dyn CommandProvider>) -> Result<()> {
        let provider_id = provider.id().to_string();
        if self
            .read()
            .providers
            .get(&provider_id)
            .is_some_and(|existing| Arc::ptr_eq(existing, provider))
        {
            debug!(provider = %provider_id, "Provider already registered");
            return Ok(());
        }

        let output = scan(provider.as_ref())?;

        let mut registry = self.write();
        if registry.state == LifecycleState::Cleared {
            return Err(Error::InstanceCleared);
        }
        if let Some(existing) = registry.providers.get(&provider_id) {
            if Arc::ptr_eq(existing, provider)
                || registry.holds_exactly(&provider_id, &output.commands)
            {
                debug!(provider = %provider_id, "Provider already registered");
                return Ok(());
            }
            return Err(Error::ProviderIdInUse(provider_id));
        }

        let mut staged: HashMap<&str, &CommandDescriptor> = HashMap::new();
        let mut conflicts = BTreeSet::new();
        for descriptor in &output.commands {
            for name in &descriptor.names {
                if staged.insert(name, descriptor).is_some() {
                    conflicts.insert(name.clone());
                    continue;
                }
                if registry.index.contains_key(name) {
                    conflicts.insert(name.clone());
                }
            }
        }
        if !conflicts.is_empty() {
            return Err(Error::CommandConflict {
                provider: provider_id,
                names: conflicts.into_iter().collect(),
            });
        }

        let command_count = output.commands.len();
        for descriptor in output.commands {
            let descriptor = Arc::new(descriptor);
            for name in &descriptor.names {
                registry
                    .index
                    .entry(name.clone())
                    .or_insert_with(|| Arc::clone(&descriptor));
            }
        }
        for converter in output.converters {
            registry.converters.register(converter);
        }
        registry.providers.insert(provider_id.clone(), Arc::clone(provider));

        info!(provider = %provider_id, commands = command_count, "Registered command provider");
        Ok(())
    }

    fn clear(&self) {
        let mut registry = self.write();
        registry.state = LifecycleState::Cleared;
        registry.index.clear();
        registry.providers.clear();
        registry.converters = ConverterRegistry::new();
        registry.plugins_loaded = false;
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Split on the option's separator, then convert every piece.
fn convert_option(converters: &ConverterRegistry, option: &OptionDescriptor, text: &str) -> Result<Value> {
    let context = option.context.as_deref();
    match option.value_separator {
        Some(_) if text.is_empty() => Ok(Value::Array(Vec::new())),
        Some(separator) => text
            .split(separator)
            .map(|piece| converters.convert(piece, &option.value_type, context))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        None => converters.convert(text, &option.value_type, context),
    }
}
