//! Generation timing
//!
//! When enabled, every generator run records its wall-clock duration so the
//! operator can find the hooks that slow down startup.

use crate::system;
use chrono::{DateTime, Local};
use hooksmith_core::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timing file name inside the state directory
pub const TIMINGS_FILE: &str = "timings.json";

/// Last recorded run of one hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingRecord {
    /// Generator wall-clock time in milliseconds
    pub elapsed_ms: u64,
    /// When the run finished
    pub recorded_at: DateTime<Local>,
}

/// Timing state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    /// Recording is on
    #[serde(default)]
    pub enabled: bool,
    /// Records by hook name
    #[serde(default)]
    pub records: IndexMap<String, TimingRecord>,
}

impl Timings {
    /// Record a run, replacing the previous one for the hook
    pub fn record(&mut self, hook: &str, elapsed: Duration) {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.records.insert(
            hook.to_string(),
            TimingRecord {
                elapsed_ms,
                recorded_at: Local::now(),
            },
        );
    }

    /// Records sorted slowest first
    #[must_use]
    pub fn slowest_first(&self) -> Vec<(&str, &TimingRecord)> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .map(|(name, record)| (name.as_str(), record))
            .collect();
        records.sort_by(|a, b| b.1.elapsed_ms.cmp(&a.1.elapsed_ms));
        records
    }
}

/// Loads and saves timing state
#[derive(Debug, Clone)]
pub struct TimingStore {
    path: PathBuf,
}

impl TimingStore {
    /// Store at an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/timings.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(TIMINGS_FILE))
    }

    /// Timing file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load timing state; a missing file means disabled
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the file exists but cannot be read or parsed
    pub fn load(&self) -> Result<Timings> {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| Error::persistence(&self.path, e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Timings::default()),
            Err(e) => Err(Error::persistence(&self.path, e.to_string())),
        }
    }

    /// Atomically write timing state
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the write fails
    pub fn save(&self, timings: &Timings) -> Result<()> {
        let json = serde_json::to_vec_pretty(timings)
            .map_err(|e| Error::persistence(&self.path, e.to_string()))?;
        system::write_atomic(&self.path, &json)
            .map_err(|e| Error::persistence(&self.path, e.to_string()))
    }

    /// Turn recording on, clearing previous records
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the state cannot be written
    pub fn start(&self) -> Result<()> {
        self.save(&Timings {
            enabled: true,
            records: IndexMap::new(),
        })
    }

    /// Turn recording off, keeping the records
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the state cannot be read or written
    pub fn stop(&self) -> Result<Timings> {
        let mut timings = self.load()?;
        timings.enabled = false;
        self.save(&timings)?;
        Ok(timings)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_disabled() {
        let temp = TempDir::new().unwrap();
        let store = TimingStore::in_dir(temp.path());
        let timings = store.load().unwrap();
        assert!(!timings.enabled);
        assert!(timings.records.is_empty());
    }

    #[test]
    fn test_start_record_stop() {
        let temp = TempDir::new().unwrap();
        let store = TimingStore::in_dir(temp.path());

        store.start().unwrap();
        let mut timings = store.load().unwrap();
        assert!(timings.enabled);

        timings.record("starship", Duration::from_millis(40));
        timings.record("zoxide", Duration::from_millis(120));
        store.save(&timings).unwrap();

        let stopped = store.stop().unwrap();
        assert!(!stopped.enabled);
        let order: Vec<_> = stopped.slowest_first().into_iter().map(|(n, _)| n).collect();
        assert_eq!(order, ["zoxide", "starship"]);
        assert_eq!(stopped.records["zoxide"].elapsed_ms, 120);
    }

    #[test]
    fn test_start_clears_records() {
        let temp = TempDir::new().unwrap();
        let store = TimingStore::in_dir(temp.path());

        let mut timings = Timings::default();
        timings.record("old", Duration::from_millis(1));
        store.save(&timings).unwrap();

        store.start().unwrap();
        assert!(store.load().unwrap().records.is_empty());
    }
}
