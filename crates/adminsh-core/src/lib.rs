//! `adminsh` Core Library
//!
//! Command registry and dispatch engine for the administrative shell:
//! - Command and option descriptors built from provider declarations
//! - Pluggable text-to-value converters with completion hooks
//! - Manifest-driven plugin provider discovery
//! - The process-wide `CommandManager` lifecycle
//! - Configuration resolution and tracing setup

pub mod commands;
pub mod config;
pub mod error;
pub mod tracing_init;

pub use commands::{CommandDescriptor, CommandManager, CommandProvider, ManagerConfig};
pub use config::Config;
pub use error::{Error, Result};
