//! Subcommand implementations.

pub mod config;
pub mod date;
pub mod send;
