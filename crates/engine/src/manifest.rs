//! Manifest persistence
//!
//! The manifest records, per hook, what was last generated: the fast hash,
//! whether a module file exists, and the fingerprints of tracked files and
//! plugin binaries. It is stored as pretty-printed JSON next to the other
//! hooksmith data and replaced atomically.

use crate::system;
use hooksmith_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Manifest file name inside the data directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Recorded state of one hook
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Fast hash of the spec at the last generation
    pub hash: String,

    /// A module file was written
    #[serde(default)]
    pub module: bool,

    /// The hook registers a plugin
    #[serde(default)]
    pub plugin: bool,

    /// Name the host registered the plugin under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,

    /// Content hash of the installed plugin binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_hash: Option<String>,

    /// Stat signature of the installed plugin binary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_stat: Option<String>,

    /// Content hash of the tracked files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_hash: Option<String>,

    /// Stat signature of the tracked files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_stat: Option<String>,
}

/// All recorded hooks, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Create an empty manifest
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.entries.get(name)
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, name: impl Into<String>, entry: ManifestEntry) {
        self.entries.insert(name.into(), entry);
    }

    /// Remove an entry
    pub fn remove(&mut self, name: &str) -> Option<ManifestEntry> {
        self.entries.remove(name)
    }

    /// Whether an entry exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Recorded hook names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over entries, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Loads and saves the manifest file
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    /// Store at an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/manifest.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(MANIFEST_FILE))
    }

    /// Manifest file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the manifest
    ///
    /// A missing file is an empty manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Manifest> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No manifest yet");
                return Ok(Manifest::new());
            }
            Err(e) => return Err(Error::persistence(&self.path, e.to_string())),
        };

        serde_json::from_str(&content).map_err(|e| {
            Error::persistence(
                &self.path,
                format!("{e}. Remove the file to regenerate every hook"),
            )
        })
    }

    /// Atomically write the manifest
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if serialization or the write fails.
    pub fn save(&self, manifest: &Manifest) -> Result<()> {
        let mut json = serde_json::to_string_pretty(manifest)
            .map_err(|e| Error::persistence(&self.path, e.to_string()))?;
        json.push('\n');

        system::write_atomic(&self.path, json.as_bytes())
            .map_err(|e| Error::persistence(&self.path, e.to_string()))?;

        tracing::debug!(path = %self.path.display(), entries = manifest.len(), "Saved manifest");
        Ok(())
    }
}
