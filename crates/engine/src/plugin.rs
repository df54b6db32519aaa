//! Plugin registration
//!
//! Plugin hooks register a binary with the host shell's plugin registry.
//! A plugin is (re)installed when its binary's content changes; a binary
//! whose metadata moved without a content change only refreshes the
//! recorded stat signature. Install failures are reported and retried on
//! the next pass; they never abort reconciliation.

use crate::fingerprint::{self, ContentHasher};
use crate::hooks::render;
use crate::hooks::spec::PluginLocator;
use crate::manifest::ManifestEntry;
use hooksmith_core::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Prefix Nushell strips from plugin binary names
pub const PLUGIN_PREFIX: &str = "nu_plugin_";

/// Environment variable set on nested host invocations
pub const NESTED_ENV: &str = "HOOKSMITH_NESTED";

/// A plugin known to the host registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Registered name
    pub name: String,
    /// Binary path
    #[serde(alias = "filename")]
    pub path: PathBuf,
    /// Version reported by the plugin
    #[serde(default)]
    pub version: Option<String>,
}

/// Host-shell plugin registry
pub trait PluginRegistry {
    /// List registered plugins
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginRegistry`] if the registry cannot be queried
    fn list(&self) -> Result<Vec<PluginRecord>>;

    /// Whether a plugin is registered
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginRegistry`] if the registry cannot be queried
    fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|p| p.name == name))
    }

    /// Register a plugin binary
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginRegistry`] if the host rejects the plugin
    fn install(&mut self, name: &str, path: &Path) -> Result<()>;

    /// Unregister a plugin; returns whether it was registered
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginRegistry`] if the host fails to remove it
    fn uninstall(&mut self, name: &str) -> Result<bool>;
}

/// Registry backed by the host shell's `plugin` commands
#[derive(Debug, Clone)]
pub struct HostRegistry {
    program: String,
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new("nu")
    }
}

impl HostRegistry {
    /// Registry driven through the given shell binary
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, script: &str) -> Result<std::process::Output> {
        tracing::debug!(program = %self.program, script, "Running host plugin command");
        duct::cmd(self.program.as_str(), ["--commands", script])
            .env(NESTED_ENV, "1")
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|e| {
                Error::PluginRegistry(format!("failed to run '{}': {e}", self.program))
            })
    }
}

fn stderr_text(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

impl PluginRegistry for HostRegistry {
    fn list(&self) -> Result<Vec<PluginRecord>> {
        let output = self.run("plugin list | select name filename version | to json --raw")?;
        if !output.status.success() {
            return Err(Error::PluginRegistry(format!(
                "plugin list failed: {}",
                stderr_text(&output)
            )));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::PluginRegistry(format!("unexpected plugin list output: {e}")))
    }

    fn install(&mut self, name: &str, path: &Path) -> Result<()> {
        let script = format!("plugin add {}", render::quote(&path.to_string_lossy()));
        let output = self.run(&script)?;
        if !output.status.success() {
            return Err(Error::PluginRegistry(format!(
                "plugin add '{name}' failed: {}",
                stderr_text(&output)
            )));
        }
        Ok(())
    }

    fn uninstall(&mut self, name: &str) -> Result<bool> {
        let output = self.run(&format!("plugin rm {}", render::quote(name)))?;
        if output.status.success() {
            return Ok(true);
        }
        // The host reports a missing plugin as a failure
        let stderr = stderr_text(&output);
        if stderr.contains("not found") {
            return Ok(false);
        }
        Err(Error::PluginRegistry(format!(
            "plugin rm '{name}' failed: {stderr}"
        )))
    }
}

/// In-memory registry
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    plugins: IndexMap<String, PluginRecord>,
    failing: HashSet<String>,
    /// Successful installs so far
    pub installs: usize,
    /// Successful uninstalls so far
    pub uninstalls: usize,
}

impl MemoryRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make installs of `name` fail until [`MemoryRegistry::recover`] is called
    pub fn fail_installs(&mut self, name: impl Into<String>) {
        self.failing.insert(name.into());
    }

    /// Let installs of `name` succeed again
    pub fn recover(&mut self, name: &str) {
        self.failing.remove(name);
    }

    /// Look up a registered plugin
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PluginRecord> {
        self.plugins.get(name)
    }

    /// Set the version a registered plugin reports
    pub fn set_version(&mut self, name: &str, version: impl Into<String>) {
        if let Some(record) = self.plugins.get_mut(name) {
            record.version = Some(version.into());
        }
    }
}

impl PluginRegistry for MemoryRegistry {
    fn list(&self) -> Result<Vec<PluginRecord>> {
        Ok(self.plugins.values().cloned().collect())
    }

    fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.plugins.contains_key(name))
    }

    fn install(&mut self, name: &str, path: &Path) -> Result<()> {
        if self.failing.contains(name) {
            return Err(Error::PluginRegistry(format!(
                "plugin add '{name}' failed: rejected"
            )));
        }
        self.plugins.insert(
            name.to_string(),
            PluginRecord {
                name: name.to_string(),
                path: path.to_path_buf(),
                version: None,
            },
        );
        self.installs += 1;
        Ok(())
    }

    fn uninstall(&mut self, name: &str) -> Result<bool> {
        let removed = self.plugins.shift_remove(name).is_some();
        if removed {
            self.uninstalls += 1;
        }
        Ok(removed)
    }
}

/// Name the host registers a plugin binary under
///
/// `nu_plugin_gstat` and `nu_plugin_gstat.exe` both register as `gstat`.
#[must_use]
pub fn registry_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.strip_prefix(PLUGIN_PREFIX)
        .map_or_else(|| stem.clone(), str::to_string)
}

/// Outcome of syncing one plugin hook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginSync {
    /// Name registered with the host
    pub name: String,
    /// The plugin was (re)installed this pass
    pub updated: bool,
    /// Content hash to record
    pub hash: Option<String>,
    /// Stat signature to record
    pub stat: Option<String>,
    /// Install failure, if any
    pub error: Option<String>,
}

/// Keeps plugin hooks registered with the host
pub struct PluginManager<'r, R: PluginRegistry + ?Sized> {
    registry: &'r mut R,
}

impl<'r, R: PluginRegistry + ?Sized> PluginManager<'r, R> {
    /// Manage plugins through a registry
    pub fn new(registry: &'r mut R) -> Self {
        Self { registry }
    }

    /// Resolve a locator to a binary path
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginNotFound`] if the binary is not on `PATH` or the path does not exist
    pub fn resolve(hook: &str, locator: &PluginLocator) -> Result<PathBuf> {
        match locator {
            PluginLocator::Name(name) => which::which(name).map_err(|e| Error::PluginNotFound {
                name: hook.to_string(),
                reason: format!("'{name}' not found on PATH: {e}"),
            }),
            PluginLocator::Path(path) if path.is_file() => Ok(path.clone()),
            PluginLocator::Path(path) => Err(Error::PluginNotFound {
                name: hook.to_string(),
                reason: format!("{} does not exist", path.display()),
            }),
        }
    }

    /// Install or reinstall a plugin if its binary changed
    ///
    /// # Errors
    ///
    /// Returns [`Error::PluginNotFound`] if the binary cannot be resolved.
    /// Registry failures are reported in [`PluginSync::error`] instead.
    pub fn sync<H: ContentHasher>(
        &mut self,
        hook: &str,
        locator: &PluginLocator,
        entry: Option<&ManifestEntry>,
        hasher: &H,
        force: bool,
    ) -> Result<PluginSync> {
        let path = Self::resolve(hook, locator)?;
        let name = registry_name(&path);
        let previous_name = entry.and_then(|e| e.plugin_name.as_deref());

        let check = fingerprint::check_files(
            hasher,
            std::slice::from_ref(&path),
            entry.and_then(|e| e.plugin_stat.as_deref()),
            entry.and_then(|e| e.plugin_hash.as_deref()),
        );

        if !force && !check.content_changed && previous_name == Some(name.as_str()) {
            return Ok(PluginSync {
                name,
                updated: false,
                hash: Some(check.hash),
                stat: Some(check.stat),
                error: None,
            });
        }

        if let Some(previous) = previous_name
            && previous != name
        {
            self.remove(previous);
        }

        match self.reinstall(&name, &path) {
            Ok(()) => {
                tracing::debug!(hook, plugin = %name, path = %path.display(), "Installed plugin");
                Ok(PluginSync {
                    name,
                    updated: true,
                    hash: Some(check.hash),
                    stat: Some(check.stat),
                    error: None,
                })
            }
            Err(e) => {
                tracing::warn!(hook, plugin = %name, error = %e, "Plugin install failed");
                Ok(PluginSync {
                    name,
                    updated: false,
                    hash: entry.and_then(|e| e.plugin_hash.clone()),
                    stat: entry.and_then(|e| e.plugin_stat.clone()),
                    error: Some(e.to_string()),
                })
            }
        }
    }

    fn reinstall(&mut self, name: &str, path: &Path) -> Result<()> {
        if self.registry.uninstall(name)? {
            tracing::debug!(plugin = name, "Removed previous registration");
        }
        self.registry.install(name, path)
    }

    /// Unregister a plugin, logging failures
    ///
    /// Returns whether the plugin was registered.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.registry.uninstall(name) {
            Ok(removed) => {
                if removed {
                    tracing::debug!(plugin = name, "Removed plugin");
                }
                removed
            }
            Err(e) => {
                tracing::warn!(plugin = name, error = %e, "Failed to remove plugin");
                false
            }
        }
    }
}
