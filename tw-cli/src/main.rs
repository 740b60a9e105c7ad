//! Twinflow CLI - Drive the screen controllers from a terminal.
//!
//! Every workflow command builds the matching controller against the local
//! SQLite backend, fires one trigger and renders the observer callbacks,
//! with a spinner between `show_progress` and `hide_progress`.

mod commands;

use std::path::Path;

use clap::{Parser, Subcommand};
use tracing::info;

use tw_core::config::{AppConfig, ConfigHandle};
use tw_core::error::TwResult;
use tw_core::logging;

/// Twinflow - spaces, contacts and rooms from the command line.
#[derive(Parser)]
#[command(
    name = "twinflow",
    version,
    about = "Twinflow workflow CLI",
    long_about = "A command-line front end for the Twinflow screen controllers.\n\
                  Runs every workflow against a local SQLite backend."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Start with the backend offline (see backend.online_after_ms).
    #[arg(long, global = true)]
    offline: bool,

    /// Print sequencer step events.
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

/// Runtime switches shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub format: OutputFormat,
    pub offline: bool,
    pub trace: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show backend and local database status.
    Status,
    /// Database management commands.
    Db {
        #[command(subcommand)]
        action: commands::db::DbAction,
    },
    /// List and create spaces.
    Space {
        #[command(subcommand)]
        action: commands::space::SpaceAction,
    },
    /// Manage profiles.
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// List, show, rename and delete contacts.
    Contact {
        #[command(subcommand)]
        action: commands::contact::ContactAction,
    },
    /// Account migration from another device.
    Migration {
        #[command(subcommand)]
        action: commands::migration::MigrationAction,
    },
    /// Notifications of the current space.
    Notifications {
        #[command(subcommand)]
        action: commands::notifications::NotificationsAction,
    },
    /// Subscription products.
    Subscription {
        #[command(subcommand)]
        action: commands::subscription::SubscriptionAction,
    },
    /// Room configuration.
    Room {
        #[command(subcommand)]
        action: commands::room::RoomAction,
    },
}

fn load_config(path: Option<&str>) -> TwResult<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from_file(Path::new(path)),
        None => AppConfig::load_default(),
    }
}

#[tokio::main]
async fn main() -> TwResult<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    // Initialize logging
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let log_dir = config.effective_log_dir()?;
    let _guard = logging::init_logging(&log_level, &log_dir, config.logging.json_output)?;

    let config_handle = ConfigHandle::new(config);
    let options = RunOptions {
        format: cli.format,
        offline: cli.offline,
        trace: cli.trace,
    };

    info!("Twinflow CLI v{}", tw_core::constants::APP_VERSION);

    // Dispatch to command handlers
    match cli.command {
        Commands::Status => commands::status::run(config_handle, options).await,
        Commands::Db { action } => commands::db::run(config_handle, action, options).await,
        Commands::Space { action } => commands::space::run(config_handle, action, options).await,
        Commands::Profile { action } => {
            commands::profile::run(config_handle, action, options).await
        }
        Commands::Contact { action } => {
            commands::contact::run(config_handle, action, options).await
        }
        Commands::Migration { action } => {
            commands::migration::run(config_handle, action, options).await
        }
        Commands::Notifications { action } => {
            commands::notifications::run(config_handle, action, options).await
        }
        Commands::Subscription { action } => {
            commands::subscription::run(config_handle, action, options).await
        }
        Commands::Room { action } => commands::room::run(config_handle, action, options).await,
    }
}
