//! XDG directory utilities
//!
//! This module provides XDG-compliant directory paths for hooksmith.
//! It follows the XDG Base Directory specification using the `xdg` crate:
//! - `XDG_DATA_HOME` defaults to ~/.local/share
//! - `XDG_CONFIG_HOME` defaults to ~/.config
//! - `XDG_STATE_HOME` defaults to ~/.local/state

use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

/// Get the hooksmith config directory
///
/// Returns `$XDG_CONFIG_HOME/hooksmith` or `~/.config/hooksmith`
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    BaseDirectories::with_prefix("hooksmith").get_config_home()
}

/// Get the hooksmith data directory (manifest lives here)
///
/// Returns `$XDG_DATA_HOME/hooksmith` or `~/.local/share/hooksmith`
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    BaseDirectories::with_prefix("hooksmith").get_data_home()
}

/// Get the hooksmith state directory (timing records live here)
///
/// Returns `$XDG_STATE_HOME/hooksmith` or `~/.local/state/hooksmith`
#[must_use]
pub fn state_dir() -> Option<PathBuf> {
    BaseDirectories::with_prefix("hooksmith").get_state_home()
}

/// Get the default config file path
///
/// Returns `$XDG_CONFIG_HOME/hooksmith/hooks.toml`
#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    config_dir().map(|d| d.join("hooks.toml"))
}

/// Get the directory Nushell autoloads at startup
///
/// Returns `$XDG_DATA_HOME/nushell/vendor/autoload`. Every file written here is
/// sourced by the shell when it starts, which is what makes the generated
/// `hooks__<name>.nu` files take effect.
#[must_use]
pub fn default_artifact_dir() -> Option<PathBuf> {
    BaseDirectories::with_prefix("nushell")
        .get_data_home()
        .map(|d| d.join("vendor").join("autoload"))
}

/// Expand a leading `~` to the home directory
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    if !path.as_os_str().as_encoded_bytes().starts_with(b"~") {
        return path.to_path_buf();
    }

    let Some(home) = ::dirs::home_dir() else {
        return path.to_path_buf();
    };

    match path.to_str() {
        Some("~") => home,
        Some(s) if s.starts_with("~/") => home.join(&s[2..]),
        _ => path.to_path_buf(),
    }
}
