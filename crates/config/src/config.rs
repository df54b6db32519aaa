//! Configuration management
//!
//! This module loads the desired hook set from `hooks.toml`.
//!
//! ```toml
//! [general]
//! timeout = 30
//!
//! [hooks.starship]
//! command = "starship init nu"
//! depends = "starship"
//!
//! [hooks.zoxide]
//! args = ["zoxide", "init", "nushell"]
//! module = true
//! ```

use crate::Result;
use crate::dirs;
use hooksmith_core::{Error, HookName};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// General configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneralConfig {
    /// Default generator timeout in seconds (0 = no timeout)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Directory the host shell autoloads generated hooks from
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,

    /// Directory holding the manifest
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Host shell binary used to add and remove plugins
    #[serde(default = "default_plugin_host")]
    pub plugin_host: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            artifact_dir: None,
            data_dir: None,
            plugin_host: default_plugin_host(),
        }
    }
}

impl GeneralConfig {
    /// Default timeout as a `Duration`, `None` when disabled
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }

    /// Resolve the artifact directory (configured or XDG default)
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is configured and the XDG default cannot be determined
    pub fn artifact_dir(&self) -> Result<PathBuf> {
        self.artifact_dir
            .as_deref()
            .map(dirs::expand_tilde)
            .or_else(dirs::default_artifact_dir)
            .ok_or_else(|| Error::Message("Could not determine artifact directory".to_string()))
    }

    /// Resolve the data directory (configured or XDG default)
    ///
    /// # Errors
    ///
    /// Returns an error if no directory is configured and the XDG default cannot be determined
    pub fn data_dir(&self) -> Result<PathBuf> {
        self.data_dir
            .as_deref()
            .map(dirs::expand_tilde)
            .or_else(dirs::data_dir)
            .ok_or_else(|| Error::Message("Could not determine data directory".to_string()))
    }
}

/// A string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// A single value
    One(String),
    /// Several values
    Many(Vec<String>),
}

impl OneOrMany {
    /// Flatten into a list
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

/// A single hook as written in `hooks.toml`
///
/// Exactly one of `command`, `args` or `text` produces the hook output.
/// Plugin hooks may omit all three.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HookDefinition {
    /// Whether the hook is active (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Command line whose stdout becomes the hook output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Explicit argument vector whose stdout becomes the hook output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    /// Literal hook output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Executables that must be on `PATH` for the hook to be active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends: Option<OneOrMany>,

    /// Environment variables for the producer
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,

    /// Write output as a module and `use` it
    #[serde(default)]
    pub module: bool,

    /// Write the module but do not load it
    #[serde(default)]
    pub lazy: bool,

    /// Expose the module as a loadable/unloadable overlay
    #[serde(default)]
    pub overlay: bool,

    /// Closure source run when the artifact is loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_load: Option<String>,

    /// Static value mixed into the change hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Files whose content changes trigger regeneration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_files: Option<OneOrMany>,

    /// Plugin binary name, resolved on `PATH`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,

    /// Explicit plugin binary path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_path: Option<PathBuf>,

    /// Generator timeout in seconds, overriding `general.timeout` (0 = none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl HookDefinition {
    /// Whether this definition describes a plugin hook
    #[must_use]
    pub fn is_plugin(&self) -> bool {
        self.plugin.is_some() || self.plugin_path.is_some()
    }

    /// Validate the definition
    ///
    /// Checks for:
    /// - At most one of `command`, `args`, `text` (exactly one unless a plugin)
    /// - Not both `plugin` and `pluginPath`
    /// - Non-empty command and argument list
    /// - Valid environment variable names
    ///
    /// Load-strategy combinations are checked when the hook spec is built.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails
    pub fn validate(&self, name: &str) -> Result<()> {
        let producers = [
            self.command.is_some(),
            self.args.is_some(),
            self.text.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        match producers {
            0 if !self.is_plugin() => {
                return Err(Error::HookConfig(format!(
                    "Hook '{name}' must have one of 'command', 'args' or 'text'"
                )));
            }
            0 | 1 => {}
            _ => {
                return Err(Error::HookConfig(format!(
                    "Hook '{name}' can only have one of 'command', 'args' or 'text'"
                )));
            }
        }

        if self.plugin.is_some() && self.plugin_path.is_some() {
            return Err(Error::HookConfig(format!(
                "Hook '{name}' cannot have both 'plugin' and 'pluginPath'"
            )));
        }

        if let Some(cmd) = &self.command
            && cmd.trim().is_empty()
        {
            return Err(Error::HookConfig(format!(
                "Hook '{name}' has empty 'command' field"
            )));
        }

        if let Some(args) = &self.args
            && args.first().is_none_or(|p| p.trim().is_empty())
        {
            return Err(Error::HookConfig(format!(
                "Hook '{name}' has empty 'args' field"
            )));
        }

        for key in self.env.keys() {
            let starts_ok = key
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
            if !starts_ok || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::HookConfig(format!(
                    "Hook '{name}' has invalid environment variable name '{key}'"
                )));
            }
        }

        Ok(())
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Desired hooks, in file order
    #[serde(default)]
    pub hooks: IndexMap<String, HookDefinition>,
}

impl Config {
    /// Load and validate configuration from a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, is not valid TOML, or fails validation
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::HookConfig(format!(
                "Configuration file not found: {}\n\
                 \n\
                 Create it with, for example:\n\
                 \n\
                 [hooks.starship]\n\
                 command = \"starship init nu\"\n\
                 depends = \"starship\"",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            Error::HookConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), "Loading hook configuration");
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or any hook is invalid
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::HookConfig(format!("Failed to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every hook name and definition
    ///
    /// # Errors
    ///
    /// Returns the first invalid name or definition
    pub fn validate(&self) -> Result<()> {
        for (name, definition) in &self.hooks {
            HookName::new(name.as_str())?;
            definition.validate(name)?;
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_plugin_host() -> String {
    "nu".to_string()
}

fn default_enabled() -> bool {
    true
}
