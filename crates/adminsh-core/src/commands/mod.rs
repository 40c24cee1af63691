pub mod builtin;
pub mod converter;
pub mod declare;
pub mod descriptor;
pub mod manager;
pub mod plugins;
pub mod scanner;

pub use builtin::BuiltinCommands;
pub use converter::{
    ChoiceConverter, Completion, CompletionRequest, Completions, Converter, ConverterRegistry,
};
pub use declare::{AvailabilityDecl, CommandDecl, OptionMeta, ParamDecl};
pub use descriptor::{
    CommandDescriptor, CommandTarget, Operation, OptionDescriptor, ParsedOptions, Permission,
    RawOptions, Resource, ValueType, handler,
};
pub use manager::{CommandManager, LifecycleState, ManagerConfig};
pub use plugins::{ManifestLocator, PluginLocator, PluginManifest, ProviderCatalog, StaticLocator};
pub use scanner::{CommandProvider, default_command_name, scan};
