//! Staleness detection
//!
//! A hook is regenerated when any of these hold:
//! - no manifest entry exists
//! - the primary artifact is missing
//! - the fast hash differs (spec changed, or the day rolled over)
//! - the content of a tracked file changed
//! - regeneration was forced
//!
//! When only the stat signature of tracked files moved, the manifest is
//! refreshed without regenerating.

use super::spec::{Depends, EnvSource, HookSpec, LoadStrategy, PluginLocator, Producer};
use crate::fingerprint::{self, Blake3Hasher, ContentHasher, FileCheck};
use crate::manifest::ManifestEntry;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Format of the day mixed into the fast hash
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Why a hook must be regenerated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// Regeneration was requested explicitly
    Forced,
    /// No manifest entry
    New,
    /// Primary artifact is missing from disk
    ArtifactMissing,
    /// Fast hash differs
    SpecChanged,
    /// A tracked file's content changed
    FilesChanged,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Forced => "forced",
            Self::New => "new hook",
            Self::ArtifactMissing => "artifact missing",
            Self::SpecChanged => "spec or day changed",
            Self::FilesChanged => "tracked files changed",
        };
        f.write_str(reason)
    }
}

/// Pass-wide inputs to detection
#[derive(Debug, Clone, Copy)]
pub struct DetectContext {
    /// Current local day
    pub today: NaiveDate,
    /// The primary artifact exists on disk
    pub primary_exists: bool,
    /// Regeneration was requested for this hook
    pub forced: bool,
}

/// Detection outcome for one hook
#[derive(Debug, Clone)]
pub struct Detection {
    /// Fast hash of the current spec
    pub fast_hash: String,
    /// Set when the hook must be regenerated
    pub stale: Option<StaleReason>,
    /// Fingerprints of tracked files, if the hook tracks any
    pub files: Option<FileCheck>,
}

impl Detection {
    /// Whether the hook must be regenerated
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale.is_some()
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
enum ProducerInput<'a> {
    Command(&'a str),
    Args(&'a [String]),
    Callback(&'a str),
}

#[derive(Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
enum DependsInput<'a> {
    Commands(&'a [String]),
    Predicate(&'a str),
}

#[derive(Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
enum EnvInput<'a> {
    Static(BTreeMap<&'a str, &'a str>),
    Callback(&'a str),
}

/// Everything that identifies a spec, in canonical serialized form
#[derive(Serialize)]
struct FastHashInput<'a> {
    day: String,
    enabled: bool,
    producer: ProducerInput<'a>,
    depends: Option<DependsInput<'a>>,
    env: Option<EnvInput<'a>>,
    load: LoadStrategy,
    on_load: Option<&'a str>,
    static_hash: Option<&'a str>,
    hash_fn: Option<(&'a str, Option<String>)>,
    hash_files: &'a [PathBuf],
    plugin: Option<&'a PluginLocator>,
    timeout_ms: Option<u128>,
}

impl<'a> FastHashInput<'a> {
    fn new(spec: &'a HookSpec, day: NaiveDate) -> Self {
        let producer = match spec.producer() {
            Producer::ExternalCommand(cmd) => ProducerInput::Command(cmd),
            Producer::ArgumentList(args) => ProducerInput::Args(args),
            Producer::Callback(callback) => ProducerInput::Callback(callback.fingerprint()),
        };

        let depends = spec.depends().map(|depends| match depends {
            Depends::Commands(commands) => DependsInput::Commands(commands),
            Depends::Predicate(predicate) => DependsInput::Predicate(predicate.fingerprint()),
        });

        let env = spec.env().map(|env| match env {
            EnvSource::Static(vars) => EnvInput::Static(
                vars.iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect(),
            ),
            EnvSource::Callback(callback) => EnvInput::Callback(callback.fingerprint()),
        });

        Self {
            day: day.format(DAY_FORMAT).to_string(),
            enabled: spec.enabled(),
            producer,
            depends,
            env,
            load: spec.load(),
            on_load: spec.on_load(),
            static_hash: spec.static_hash(),
            hash_fn: spec.hash_fn().map(|f| (f.fingerprint(), f.call())),
            hash_files: spec.hash_files(),
            plugin: spec.plugin(),
            timeout_ms: spec.timeout().map(|t| t.as_millis()),
        }
    }
}

/// Decides which hooks are stale
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector<H = Blake3Hasher> {
    hasher: H,
}

impl ChangeDetector {
    /// Detector with the blake3 content hasher
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H: ContentHasher> ChangeDetector<H> {
    /// Detector with a custom content hasher
    pub fn with_hasher(hasher: H) -> Self {
        Self { hasher }
    }

    /// Content hasher in use
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Fast hash of a spec on a given day
    ///
    /// Evaluates the spec's hash function, if any. Two specs that differ in
    /// any field hash differently; the same spec hashes differently on
    /// different days.
    #[must_use]
    pub fn fast_hash(&self, spec: &HookSpec, day: NaiveDate) -> String {
        let input = FastHashInput::new(spec, day);
        match serde_json::to_vec(&input) {
            Ok(bytes) => crate::hash::digest_hex(&bytes),
            // Only string-keyed maps are serialized, so this is unreachable in
            // practice. An empty hash never matches and forces regeneration.
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize fast hash input");
                String::new()
            }
        }
    }

    /// Decide whether a hook is stale
    pub fn detect(
        &self,
        spec: &HookSpec,
        entry: Option<&ManifestEntry>,
        ctx: &DetectContext,
    ) -> Detection {
        let fast_hash = self.fast_hash(spec, ctx.today);

        let files = (!spec.hash_files().is_empty()).then(|| {
            fingerprint::check_files(
                &self.hasher,
                spec.hash_files(),
                entry.and_then(|e| e.files_stat.as_deref()),
                entry.and_then(|e| e.files_hash.as_deref()),
            )
        });

        let stale = if ctx.forced {
            Some(StaleReason::Forced)
        } else if let Some(entry) = entry {
            if !ctx.primary_exists {
                Some(StaleReason::ArtifactMissing)
            } else if fast_hash.is_empty() || !fingerprint::digests_match(&entry.hash, &fast_hash)
            {
                Some(StaleReason::SpecChanged)
            } else if files.as_ref().is_some_and(|f| f.content_changed) {
                Some(StaleReason::FilesChanged)
            } else {
                None
            }
        } else {
            Some(StaleReason::New)
        };

        Detection {
            fast_hash,
            stale,
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::hooks::spec::{Callback, EnvCallback, HashFn, HookEnv, HookSpecBuilder, Predicate};
    use std::collections::HashSet;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn ctx(today: NaiveDate) -> DetectContext {
        DetectContext {
            today,
            primary_exists: true,
            forced: false,
        }
    }

    fn base() -> HookSpecBuilder {
        HookSpec::builder(Producer::ExternalCommand("starship init nu".into()))
    }

    fn recorded(detector: &ChangeDetector, spec: &HookSpec, today: NaiveDate) -> ManifestEntry {
        let detection = detector.detect(spec, None, &ctx(today));
        ManifestEntry {
            hash: detection.fast_hash,
            module: spec.load().is_module(),
            files_hash: detection.files.as_ref().map(|f| f.hash.clone()),
            files_stat: detection.files.as_ref().map(|f| f.stat.clone()),
            ..ManifestEntry::default()
        }
    }

    #[test]
    fn test_fast_hash_stable_within_day() {
        let detector = ChangeDetector::new();
        let spec = base().build().unwrap();
        assert_eq!(
            detector.fast_hash(&spec, day(19)),
            detector.fast_hash(&spec, day(19))
        );
    }

    #[test]
    fn test_fast_hash_rolls_over_daily() {
        let detector = ChangeDetector::new();
        let spec = base().build().unwrap();
        assert_ne!(
            detector.fast_hash(&spec, day(19)),
            detector.fast_hash(&spec, day(20))
        );
    }

    #[test]
    fn test_fast_hash_sensitive_to_every_field() {
        let detector = ChangeDetector::new();
        let variants = vec![
            base().build().unwrap(),
            base().enabled(false).build().unwrap(),
            HookSpec::builder(Producer::ExternalCommand("starship init nushell".into()))
                .build()
                .unwrap(),
            HookSpec::builder(Producer::ArgumentList(vec![
                "starship".into(),
                "init".into(),
                "nu".into(),
            ]))
            .build()
            .unwrap(),
            HookSpec::builder(Producer::Callback(Callback::constant("starship init nu")))
                .build()
                .unwrap(),
            base().depends(Depends::command("starship")).build().unwrap(),
            base()
                .depends(Depends::Predicate(Predicate::new("p", || true)))
                .build()
                .unwrap(),
            base()
                .env(EnvSource::Static(HookEnv::from([(
                    "STARSHIP_CONFIG".to_string(),
                    "a".to_string(),
                )])))
                .build()
                .unwrap(),
            base()
                .env(EnvSource::Callback(EnvCallback::new("env-v1", || Ok(HookEnv::new()))))
                .build()
                .unwrap(),
            base().module(true).build().unwrap(),
            base().module(true).lazy(true).build().unwrap(),
            base().module(true).overlay(true).build().unwrap(),
            base().on_load("{|| print hi }").build().unwrap(),
            base().static_hash("v2").build().unwrap(),
            base()
                .hash_fn(HashFn::new("fn", || "x".to_string()))
                .build()
                .unwrap(),
            base().hash_files(["/etc/hostname"]).build().unwrap(),
            base()
                .plugin(PluginLocator::Name("nu_plugin_gstat".into()))
                .build()
                .unwrap(),
            base()
                .plugin(PluginLocator::Path("/usr/bin/nu_plugin_gstat".into()))
                .build()
                .unwrap(),
            base().timeout(Duration::from_secs(5)).build().unwrap(),
        ];

        let hashes: HashSet<String> = variants
            .iter()
            .map(|spec| detector.fast_hash(spec, day(19)))
            .collect();
        assert_eq!(hashes.len(), variants.len());
    }

    #[test]
    fn test_static_env_order_does_not_matter() {
        let detector = ChangeDetector::new();
        let a = base()
            .env(EnvSource::Static(HookEnv::from([
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "2".to_string()),
            ])))
            .build()
            .unwrap();
        let b = base()
            .env(EnvSource::Static(HookEnv::from([
                ("B".to_string(), "2".to_string()),
                ("A".to_string(), "1".to_string()),
            ])))
            .build()
            .unwrap();
        assert_eq!(detector.fast_hash(&a, day(19)), detector.fast_hash(&b, day(19)));
    }

    #[test]
    fn test_hash_fn_result_is_mixed_in() {
        let detector = ChangeDetector::new();
        let a = base()
            .hash_fn(HashFn::new("version", || "1.0".to_string()))
            .build()
            .unwrap();
        let b = base()
            .hash_fn(HashFn::new("version", || "1.1".to_string()))
            .build()
            .unwrap();
        assert_ne!(detector.fast_hash(&a, day(19)), detector.fast_hash(&b, day(19)));
    }

    #[test]
    fn test_panicking_hash_fn_hashes_stably() {
        let detector = ChangeDetector::new();
        let spec = base()
            .hash_fn(HashFn::new("version", || panic!("no version")))
            .build()
            .unwrap();
        let hash = detector.fast_hash(&spec, day(19));
        assert!(!hash.is_empty());
        assert_eq!(hash, detector.fast_hash(&spec, day(19)));
    }

    #[test]
    fn test_new_hook_is_stale() {
        let detector = ChangeDetector::new();
        let spec = base().build().unwrap();
        let detection = detector.detect(&spec, None, &ctx(day(19)));
        assert_eq!(detection.stale, Some(StaleReason::New));
    }

    #[test]
    fn test_recorded_hook_is_fresh() {
        let detector = ChangeDetector::new();
        let spec = base().build().unwrap();
        let entry = recorded(&detector, &spec, day(19));

        let detection = detector.detect(&spec, Some(&entry), &ctx(day(19)));
        assert!(!detection.is_stale());
    }

    #[test]
    fn test_day_rollover_is_stale() {
        let detector = ChangeDetector::new();
        let spec = base().build().unwrap();
        let entry = recorded(&detector, &spec, day(19));

        let detection = detector.detect(&spec, Some(&entry), &ctx(day(20)));
        assert_eq!(detection.stale, Some(StaleReason::SpecChanged));
    }

    #[test]
    fn test_missing_artifact_is_stale() {
        let detector = ChangeDetector::new();
        let spec = base().build().unwrap();
        let entry = recorded(&detector, &spec, day(19));

        let mut context = ctx(day(19));
        context.primary_exists = false;
        let detection = detector.detect(&spec, Some(&entry), &context);
        assert_eq!(detection.stale, Some(StaleReason::ArtifactMissing));
    }

    #[test]
    fn test_forced_wins() {
        let detector = ChangeDetector::new();
        let spec = base().build().unwrap();
        let entry = recorded(&detector, &spec, day(19));

        let mut context = ctx(day(19));
        context.forced = true;
        let detection = detector.detect(&spec, Some(&entry), &context);
        assert_eq!(detection.stale, Some(StaleReason::Forced));
    }

    #[test]
    fn test_tracked_file_content_change_is_stale() {
        let temp = TempDir::new().unwrap();
        let tracked = temp.path().join("starship.toml");
        fs::write(&tracked, "format = '$all'").unwrap();

        let detector = ChangeDetector::new();
        let spec = base().hash_files([tracked.clone()]).build().unwrap();
        let entry = recorded(&detector, &spec, day(19));
        assert!(!detector.detect(&spec, Some(&entry), &ctx(day(19))).is_stale());

        fs::write(&tracked, "format = '$directory$character'").unwrap();
        let detection = detector.detect(&spec, Some(&entry), &ctx(day(19)));
        assert_eq!(detection.stale, Some(StaleReason::FilesChanged));
    }

    #[test]
    fn test_tracked_file_stat_change_is_refresh_only() {
        let temp = TempDir::new().unwrap();
        let tracked = temp.path().join("starship.toml");
        fs::write(&tracked, "format = '$all'").unwrap();

        let detector = ChangeDetector::new();
        let spec = base().hash_files([tracked]).build().unwrap();
        let mut entry = recorded(&detector, &spec, day(19));
        entry.files_stat = Some("0-0-0".to_string());

        let detection = detector.detect(&spec, Some(&entry), &ctx(day(19)));
        assert!(!detection.is_stale());
        assert!(detection.files.unwrap().is_refresh_only());
    }
}
