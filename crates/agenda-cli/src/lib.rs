//! CLI, configuration file and secret references.
//!
//! This crate provides the `agenda` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use config::AgendaConfig;
pub use error::{CliError, CliResult};
