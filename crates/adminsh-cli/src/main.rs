//! adminsh CLI
//!
//! Non-interactive front end over the command registry: lists, describes,
//! completes and invokes the commands contributed by the built-in provider
//! and by manifest-enabled plugins.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::debug;

use adminsh_cli::catalog::plugin_catalog;
use adminsh_cli::shell_cmd::{self, ShellAction};
use adminsh_core::commands::{BuiltinCommands, CommandManager, ManagerConfig, ManifestLocator};
use adminsh_core::config::load_config;
use adminsh_core::tracing_init::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "adminsh")]
#[command(version, about = "Administrative shell command registry", long_about = None)]
struct Cli {
    /// Project settings file layered over the global settings
    #[arg(long, env = "ADMINSH_CONFIG")]
    config: Option<PathBuf>,

    /// Plugin manifest (overrides the configured one)
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Skip plugin discovery
    #[arg(long)]
    no_plugins: bool,

    /// Emit JSON log lines on stderr
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    action: ShellAction,
}

#[allow(clippy::print_stdout)]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    init_tracing(
        &format!("adminsh={0},adminsh_cli={0},adminsh_core={0}", config.shell.log_level),
        cli.log_json || config.shell.log_json,
    );

    let mut manager_config = ManagerConfig::new()
        .with_provider(Arc::new(BuiltinCommands))
        .load_plugins(config.plugins.load_on_startup && !cli.no_plugins);
    if let Some(manifest) = cli.manifest.or(config.plugins.manifest_path) {
        debug!(manifest = %manifest.display(), "Using plugin manifest");
        manager_config = manager_config
            .with_plugin_locator(Arc::new(ManifestLocator::new(manifest, plugin_catalog())));
    }

    let manager = CommandManager::get_instance(manager_config);
    let output = shell_cmd::execute(&manager, cli.action);
    CommandManager::clear_instance();

    let output = output?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
