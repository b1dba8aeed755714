//! drzob CLI entry point.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use drzob_core::{TracingConfig, init_tracing};
use tracing::error;

use drzob_client::cli::{Cli, Command, ConfigAction};
use drzob_client::commands;
use drzob_client::config::ClientConfig;
use drzob_client::context::AppContext;
use drzob_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = match load_config(&cli, &config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tracing_config = if cli.debug || config.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: failed to initialize logging: {}", e);
    }

    match run(cli, config, &config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

/// Loads `--config` when given, otherwise the default file if it exists.
fn load_config(cli: &Cli, path: &Path) -> ClientResult<ClientConfig> {
    if cli.config.is_some() {
        ClientConfig::load_from(path)
    } else {
        ClientConfig::load()
    }
}

/// Shows user-facing failures verbatim and logs Google failures.
fn report(e: &ClientError) {
    if e.is_user_facing() {
        eprintln!("{}", e);
    } else if let Some(google) = e.as_google() {
        error!("A Google Apps error occurred: {}", google);
    } else {
        eprintln!("error: {}", e);
    }
}

async fn run(cli: Cli, config: ClientConfig, config_path: &Path) -> ClientResult<()> {
    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Dump => commands::config::dump(&config, config_path),
            ConfigAction::Path => commands::config::path(config_path),
        };
    }

    let ctx = AppContext::new(&cli, &config)?;

    match cli.command {
        Command::AddEvent(args) => commands::calendar::add_event(&ctx, args).await.map(|_| ()),
        Command::Contacts => commands::contacts::list(&ctx).await,
        Command::Status => commands::status::status(&ctx).await.map(|_| ()),
        Command::Logout => commands::status::logout(&ctx),
        Command::Config { .. } => Ok(()),
    }
}
