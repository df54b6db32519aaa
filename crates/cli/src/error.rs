//! Error types for CLI commands

use thiserror::Error;

/// Errors that can occur during command execution
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CommandError {
    /// Hook name not present in the configuration
    #[error("Unknown hook '{0}'. Run `hooksmith list` to see configured hooks")]
    UnknownHook(String),

    /// Hook exists but does not register a plugin
    #[error("Hook '{0}' is not a plugin hook")]
    NotAPlugin(String),

    /// Neither a name nor `--all` was given
    #[error("Specify a hook name or --all")]
    MissingTarget,

    /// Error from the configuration or engine crates
    #[error(transparent)]
    Hooksmith(#[from] hooksmith_core::Error),

    /// JSON output could not be produced
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for command operations
pub type Result<T> = std::result::Result<T, CommandError>;
