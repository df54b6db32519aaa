//! Configuration management for hooksmith
//!
//! This crate handles:
//! - Loading the desired hook set from `hooks.toml`
//! - XDG directory management
//! - Logging initialization

pub mod config;
pub mod dirs;
pub mod logging;

// Re-export error types from core
pub use hooksmith_core::{Error, Result};

// Re-export main types
pub use config::{Config, GeneralConfig, HookDefinition, OneOrMany};
pub use dirs::{config_dir, data_dir, default_artifact_dir, expand_tilde, state_dir};
