//! adminsh CLI Library
//!
//! Wiring and rendering for the `adminsh` binary: the plugin catalog the
//! binary can reach and the subcommands that inspect and invoke commands.

pub mod catalog;
pub mod shell_cmd;
