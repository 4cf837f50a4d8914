//! agenda CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use agenda_cli::cli::{Cli, Command, ConfigAction};
use agenda_cli::commands;
use agenda_cli::config::AgendaConfig;
use agenda_cli::error::CliResult;
use agenda_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<bool> {
    let path = cli.config.clone().unwrap_or_else(AgendaConfig::default_path);
    let config = if cli.config.is_some() {
        AgendaConfig::load_from(&path)?
    } else {
        AgendaConfig::load()?
    };
    let now = cli.now();

    match cli.command {
        Command::Send { ref user, ref message } => {
            let message = message.join(" ");
            commands::send::run(&config, cli.offline, cli.json, user, &message, now).await
        }
        Command::Date { ref text } => {
            commands::date::run(config.offset()?, &text.join(" "), now, cli.json)?;
            Ok(true)
        }
        Command::Config { ref action } => {
            match action {
                ConfigAction::Dump => commands::config::dump(&config, &path)?,
                ConfigAction::Validate => commands::config::validate(&config)?,
                ConfigAction::Path => commands::config::path(&path)?,
            }
            Ok(true)
        }
    }
}
