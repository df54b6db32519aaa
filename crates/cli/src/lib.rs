//! Hooksmith CLI library
//!
//! All CLI logic lives here so it can be exercised from tests.

pub mod cmd;
pub mod command;
pub mod common;
pub mod error;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use command::Command;
use common::RuntimeContext;

/// Hooksmith - keeps generated shell startup hooks up to date
#[derive(Parser)]
#[command(name = "hooksmith")]
#[command(about = "Generate and cache Nushell startup hooks")]
#[command(version)]
#[command(long_about = "Generate and cache Nushell startup hooks

Hooks are declared in hooks.toml. `hooksmith sync` regenerates only the
hooks whose declaration, tracked files or day changed, writes them into
Nushell's autoload directory and keeps registered plugins in step with
their binaries.

Run `hooksmith sync` from your Nushell config to keep hooks current.")]
pub struct Cli {
    /// Path to the hooks configuration file
    #[arg(long, env = "HOOKSMITH_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output (shows DEBUG level logs)
    #[arg(short, long)]
    pub verbose: bool,

    /// Append logs to a file
    #[arg(long, env = "HOOKSMITH_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Bring generated hooks and plugins in line with the configuration
    Sync(cmd::sync::SyncCommand),

    /// Show the state of every configured hook
    Status(cmd::status::StatusCommand),

    /// List configured hook names
    List(cmd::status::ListCommand),

    /// Delete generated artifacts and manifest entries
    Clean(cmd::clean::CleanCommand),

    /// Regenerate hooks regardless of detected changes
    Regenerate(cmd::regenerate::RegenerateCommand),

    /// Show plugin hooks and whether they are registered
    Plugins(cmd::plugins::PluginsCommand),

    /// Reinstall plugins regardless of detected changes
    #[command(name = "update-plugin")]
    UpdatePlugin(cmd::plugins::UpdatePluginCommand),

    /// Record how long each hook takes to generate
    #[command(subcommand)]
    Time(TimeCommands),
}

impl Commands {
    /// Runs during shell startup, so only warnings reach stderr
    pub fn is_quiet(&self) -> bool {
        matches!(self, Self::Sync(_))
    }
}

/// Timing instrumentation commands
#[derive(Subcommand)]
pub enum TimeCommands {
    /// Start recording generation times, clearing previous records
    Start,
    /// Stop recording
    Stop,
    /// Show recorded generation times, slowest first
    List(cmd::time::TimeListCommand),
}

fn execute_command(command: Commands, context: &RuntimeContext) -> Result<()> {
    match command {
        Commands::Sync(sync_cmd) => {
            sync_cmd.execute(context)?;
        }
        Commands::Status(status_cmd) => {
            status_cmd.execute(context)?;
        }
        Commands::List(list_cmd) => {
            list_cmd.execute(context)?;
        }
        Commands::Clean(clean_cmd) => {
            clean_cmd.execute(context)?;
        }
        Commands::Regenerate(regenerate_cmd) => {
            regenerate_cmd.execute(context)?;
        }
        Commands::Plugins(plugins_cmd) => {
            plugins_cmd.execute(context)?;
        }
        Commands::UpdatePlugin(update_cmd) => {
            update_cmd.execute(context)?;
        }
        Commands::Time(time_cmd) => match time_cmd {
            TimeCommands::Start => cmd::time::start(&context.timings())?,
            TimeCommands::Stop => {
                cmd::time::stop(&context.timings())?;
            }
            TimeCommands::List(list_cmd) => {
                list_cmd.execute(context)?;
            }
        },
    }

    Ok(())
}

/// Run the CLI
///
/// # Errors
///
/// Returns an error if:
/// - Logging initialization fails
/// - Configuration loading fails
/// - Command execution fails
pub fn run(cli: Cli) -> Result<()> {
    hooksmith_config::logging::init(
        cli.verbose,
        cli.command.is_quiet(),
        cli.log_file.as_deref(),
    )?;

    // A host shell started by the plugin registry runs its startup files,
    // which would call back into `sync`
    if matches!(cli.command, Commands::Sync(_)) && cmd::sync::is_nested() {
        tracing::debug!("Skipping nested sync");
        return Ok(());
    }

    let context = RuntimeContext::load(cli.config.as_deref())?;
    execute_command(cli.command, &context)
}
