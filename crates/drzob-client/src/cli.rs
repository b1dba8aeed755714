//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use drzob_google::DEFAULT_EVENT_DESCRIPTION;

/// drzob - Google Calendar and Contacts from the command line
#[derive(Debug, Parser)]
#[command(name = "drzob")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// OAuth client ID (from Google Cloud Console)
    #[arg(long, env = "GOOGLE_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret (from Google Cloud Console)
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Path to Google Cloud Console credentials JSON file
    ///
    /// Alternative to providing client_id and client_secret separately.
    #[arg(long, env = "GOOGLE_CREDENTIALS_FILE", global = true)]
    pub credentials_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, short, env = "DRZOB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Insert a test event into the DrZob calendar
    AddEvent(AddEventArgs),

    /// Print the display name of every contact
    Contacts,

    /// Show whether a token is cached
    Status,

    /// Remove the cached token
    Logout,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for `add-event`.
#[derive(Debug, Args)]
pub struct AddEventArgs {
    /// Display name of the target calendar [default: from config, or DrZob]
    #[arg(long)]
    pub calendar: Option<String>,

    /// Event summary and description
    #[arg(long, default_value = DEFAULT_EVENT_DESCRIPTION)]
    pub description: String,

    /// Start hour today, local time
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(0..24))]
    pub from_hour: u32,

    /// End hour today, local time
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..24))]
    pub to_hour: u32,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the effective configuration
    Dump,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_event_defaults() {
        let cli = Cli::try_parse_from(["drzob", "add-event"]).unwrap();
        let Command::AddEvent(args) = cli.command else {
            panic!("expected add-event");
        };
        assert_eq!(args.calendar, None);
        assert_eq!(args.description, "Test event for DrZob");
        assert_eq!(args.from_hour, 4);
        assert_eq!(args.to_hour, 6);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "drzob",
            "contacts",
            "--client-id",
            "id",
            "--client-secret",
            "secret",
            "-v",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Contacts));
        assert_eq!(cli.client_id.as_deref(), Some("id"));
        assert_eq!(cli.client_secret.as_deref(), Some("secret"));
        assert!(cli.debug);
    }

    #[test]
    fn hour_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["drzob", "add-event", "--to-hour", "24"]).is_err());
    }

    #[test]
    fn config_subcommands() {
        let cli = Cli::try_parse_from(["drzob", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Path
            }
        ));
    }
}
