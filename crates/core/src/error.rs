//! Base error types for hooksmith
//!
//! This module provides the foundation error types that all crates can use.

use std::path::PathBuf;
use thiserror::Error;

/// Base error type for shared functionality
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Hook name outside `[A-Za-z0-9_:-]+`
    #[error(
        "Invalid hook name '{name}': names may only contain letters, digits, '_', ':' and '-'"
    )]
    InvalidHookName {
        /// Rejected name
        name: String,
    },

    /// Hook configuration error
    #[error("Hook configuration error: {0}")]
    HookConfig(String),

    /// Manifest could not be read or written
    #[error("Manifest error at {}: {message}", path.display())]
    Persistence {
        /// Manifest file
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Generated artifact could not be written or removed
    #[error("Artifact error at {}: {source}", path.display())]
    Artifact {
        /// Artifact file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Plugin binary could not be located
    #[error("Plugin '{name}' could not be resolved: {reason}")]
    PluginNotFound {
        /// Plugin name or path as configured
        name: String,
        /// Why it could not be found
        reason: String,
    },

    /// Host plugin registry rejected an operation
    #[error("Plugin registry error: {0}")]
    PluginRegistry(String),

    /// Generic error message
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Build a persistence error for `path`
    pub fn persistence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
