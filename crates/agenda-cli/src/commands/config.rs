//! Configuration commands.

use std::path::Path;

use crate::config::AgendaConfig;
use crate::error::CliResult;

/// Dump the current configuration to stdout.
pub fn dump(config: &AgendaConfig, path: &Path) -> CliResult<()> {
    println!("# config.toml ({})", path.display());
    println!("{}", config.to_toml()?);
    Ok(())
}

/// Validate the configuration, including every user's token reference.
pub fn validate(config: &AgendaConfig) -> CliResult<()> {
    config.validate()?;

    #[cfg(feature = "google")]
    if !config.users.is_empty() {
        let credentials = config.credentials()?;
        println!("Resolved tokens for {} user(s).", credentials.len());
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> CliResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
