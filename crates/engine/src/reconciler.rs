//! Reconciliation
//!
//! One pass diffs the desired hooks against the manifest and brings the
//! artifact directory, the plugin registry and the manifest in line:
//!
//! 1. **Remove** hooks that are recorded but no longer desired, disabled, or
//!    missing their dependency. Artifacts are deleted and plugins unregistered.
//! 2. **Regenerate** stale hooks: run the generator, write artifacts.
//! 3. **Refresh** hooks whose tracked files or plugin binary only changed
//!    metadata: update fingerprints without running the generator.
//!
//! The manifest is written once, after every artifact, and only when it
//! changed. A pass interrupted before that write leaves artifacts newer than
//! the manifest, which the next pass regenerates.

use crate::fingerprint::{Blake3Hasher, ContentHasher};
use crate::hooks::artifact::ArtifactLayout;
use crate::hooks::detector::{ChangeDetector, DetectContext};
use crate::hooks::generator::Generator;
use crate::hooks::spec::{DesiredHooks, HookSpec, LoadStrategy};
use crate::manifest::{Manifest, ManifestEntry, ManifestStore};
use crate::plugin::{PluginManager, PluginRegistry};
use crate::timing::{TimingStore, Timings};
use chrono::{Local, NaiveDate};
use hooksmith_core::{HookName, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Which hooks an operation is forced for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Force {
    /// No hook
    #[default]
    None,
    /// Every hook
    All,
    /// The named hooks
    Only(HashSet<String>),
}

impl Force {
    /// Force only the given hooks
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    /// Whether `name` is forced
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Only(names) => names.contains(name),
        }
    }
}

/// Per-pass options
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Day mixed into fast hashes
    pub today: NaiveDate,
    /// Hooks regenerated regardless of detected changes
    pub regenerate: Force,
    /// Plugins reinstalled regardless of detected changes
    pub reinstall: Force,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            today: Local::now().date_naive(),
            regenerate: Force::None,
            reinstall: Force::None,
        }
    }
}

impl ReconcileOptions {
    /// Options for today with nothing forced
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed day
    #[must_use]
    pub fn on(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Force regeneration
    #[must_use]
    pub fn regenerate(mut self, force: Force) -> Self {
        self.regenerate = force;
        self
    }

    /// Force plugin reinstalls
    #[must_use]
    pub fn reinstall(mut self, force: Force) -> Self {
        self.reinstall = force;
        self
    }
}

/// What a pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Hooks whose artifacts were rewritten
    pub regenerated: Vec<String>,
    /// Hooks whose fingerprints were updated without regeneration
    pub refreshed: Vec<String>,
    /// Hooks whose artifacts and entries were deleted
    pub removed: Vec<String>,
    /// Regenerated hooks that produced an error stub
    pub failed: Vec<String>,
    /// Plugins (re)installed
    pub plugins_updated: Vec<String>,
    /// Plugins whose install failed
    pub plugins_failed: Vec<String>,
    /// The manifest was written
    pub manifest_written: bool,
    /// Number of artifact write operations
    pub artifact_writes: usize,
}

impl ReconcileReport {
    /// A plugin changed; running shells must restart to pick it up
    #[must_use]
    pub fn restart_required(&self) -> bool {
        !self.plugins_updated.is_empty()
    }

    /// Nothing on disk changed
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.artifact_writes == 0 && self.removed.is_empty() && !self.manifest_written
    }
}

/// Hook type shown by status commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    /// Output sourced directly
    Inline,
    /// Module loaded at startup
    Module,
    /// Module loaded on demand
    Lazy,
    /// Module exposed as an overlay
    Overlay,
    /// Registers a plugin binary
    Plugin,
}

impl HookKind {
    fn of(spec: &HookSpec) -> Self {
        if spec.plugin().is_some() {
            return Self::Plugin;
        }
        match spec.load() {
            LoadStrategy::Inline => Self::Inline,
            LoadStrategy::Module => Self::Module,
            LoadStrategy::Lazy => Self::Lazy,
            LoadStrategy::Overlay => Self::Overlay,
        }
    }

    /// Display name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Module => "module",
            Self::Lazy => "lazy",
            Self::Overlay => "overlay",
            Self::Plugin => "plugin",
        }
    }
}

/// Current state of one desired hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookStatus {
    /// Hook name
    pub name: String,
    /// Hook type
    pub kind: HookKind,
    /// Enabled with its dependency met
    pub enabled: bool,
    /// Artifact on disk and recorded in the manifest
    pub active: bool,
    /// Name registered with the host, for plugin hooks
    pub plugin_name: Option<String>,
    /// Registered with the host; `None` if unknown or not a plugin
    pub plugin_installed: Option<bool>,
    /// Version the registered plugin reports
    pub plugin_version: Option<String>,
}

/// Drives reconciliation passes
pub struct Reconciler<'r, R: PluginRegistry + ?Sized, H = Blake3Hasher> {
    store: ManifestStore,
    layout: ArtifactLayout,
    generator: Generator,
    detector: ChangeDetector<H>,
    registry: &'r mut R,
    timings: Option<TimingStore>,
}

impl<'r, R: PluginRegistry + ?Sized> Reconciler<'r, R> {
    /// Create a reconciler with the default generator and hasher
    pub fn new(store: ManifestStore, layout: ArtifactLayout, registry: &'r mut R) -> Self {
        Self {
            store,
            layout,
            generator: Generator::new(),
            detector: ChangeDetector::new(),
            registry,
            timings: None,
        }
    }
}

impl<'r, R: PluginRegistry + ?Sized, H: ContentHasher> Reconciler<'r, R, H> {
    /// Use a configured generator
    #[must_use]
    pub fn with_generator(mut self, generator: Generator) -> Self {
        self.generator = generator;
        self
    }

    /// Use a custom content hasher
    pub fn with_hasher<H2: ContentHasher>(self, hasher: H2) -> Reconciler<'r, R, H2> {
        Reconciler {
            store: self.store,
            layout: self.layout,
            generator: self.generator,
            detector: ChangeDetector::with_hasher(hasher),
            registry: self.registry,
            timings: self.timings,
        }
    }

    /// Record generator timings when enabled in `store`
    #[must_use]
    pub fn with_timings(mut self, store: TimingStore) -> Self {
        self.timings = Some(store);
        self
    }

    /// Artifact layout
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Manifest store
    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Change detector
    pub fn detector(&self) -> &ChangeDetector<H> {
        &self.detector
    }

    /// Run one reconciliation pass
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or written, an
    /// artifact cannot be written or removed, or a plugin binary cannot be
    /// resolved. Producer failures are not errors; they become error stubs.
    #[tracing::instrument(skip_all, fields(hooks = desired.len()))]
    pub fn reconcile(
        &mut self,
        desired: &DesiredHooks,
        options: &ReconcileOptions,
    ) -> Result<ReconcileReport> {
        let started = Instant::now();
        let mut manifest = self.store.load()?;
        let original = manifest.clone();
        let mut report = ReconcileReport::default();
        let mut timings = self.load_timings();

        let active: HashMap<&str, bool> = desired
            .iter()
            .map(|(name, spec)| (name.as_str(), spec.is_active()))
            .collect();

        let mut doomed: Vec<String> = manifest
            .names()
            .filter(|name| !active.get(name).copied().unwrap_or(false))
            .map(str::to_string)
            .collect();
        for (name, _) in desired.iter() {
            if !active[name.as_str()] && !manifest.contains(name.as_str()) && self.layout.exists(name)
            {
                doomed.push(name.to_string());
            }
        }
        for name in doomed {
            if self.remove_hook(&name, &mut manifest)? {
                tracing::debug!(hook = %name, "Removed hook");
                report.removed.push(name);
            }
        }

        for (name, spec) in desired.iter() {
            if !active[name.as_str()] {
                tracing::debug!(hook = %name, "Hook disabled or dependency missing");
                continue;
            }
            self.sync_hook(name, spec, &mut manifest, options, &mut report, timings.as_mut())?;
        }

        if manifest != original {
            self.store.save(&manifest)?;
            report.manifest_written = true;
        }

        if let (Some(store), Some(timings)) = (&self.timings, &timings)
            && !report.regenerated.is_empty()
            && let Err(e) = store.save(timings)
        {
            tracing::warn!(error = %e, "Failed to save timings");
        }

        tracing::debug!(
            regenerated = report.regenerated.len(),
            refreshed = report.refreshed.len(),
            removed = report.removed.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Reconciliation finished"
        );
        Ok(report)
    }

    fn sync_hook(
        &mut self,
        name: &HookName,
        spec: &HookSpec,
        manifest: &mut Manifest,
        options: &ReconcileOptions,
        report: &mut ReconcileReport,
        timings: Option<&mut Timings>,
    ) -> Result<()> {
        let key = name.as_str();
        let previous = manifest.get(key).cloned();
        let ctx = DetectContext {
            today: options.today,
            primary_exists: self.layout.exists(name),
            forced: options.regenerate.contains(key),
        };
        let detection = self.detector.detect(spec, previous.as_ref(), &ctx);
        let mut entry = previous.clone().unwrap_or_default();

        if let Some(reason) = detection.stale {
            tracing::debug!(hook = key, %reason, "Regenerating hook");
            let generation_started = Instant::now();
            let output = self.generator.generate(key, spec);
            let elapsed = generation_started.elapsed();

            // Stubs are written inline so they raise even for lazy modules
            let strategy = if output.is_error_stub() {
                LoadStrategy::Inline
            } else {
                spec.load()
            };
            self.layout.write(name, output.text(), strategy)?;
            report.artifact_writes += 1;

            entry.hash = detection.fast_hash.clone();
            entry.module = strategy.is_module();
            if output.is_error_stub() {
                report.failed.push(key.to_string());
            }
            report.regenerated.push(key.to_string());

            tracing::debug!(hook = key, elapsed_ms = elapsed.as_millis(), "Generated hook");
            if let Some(timings) = timings {
                timings.record(key, elapsed);
            }
        }

        match &detection.files {
            Some(files) => {
                entry.files_stat = Some(files.stat.clone());
                entry.files_hash = Some(files.hash.clone());
            }
            None => {
                entry.files_stat = None;
                entry.files_hash = None;
            }
        }

        if let Some(locator) = spec.plugin() {
            let sync = PluginManager::new(&mut *self.registry).sync(
                key,
                locator,
                previous.as_ref(),
                self.detector.hasher(),
                options.reinstall.contains(key),
            )?;
            entry.plugin = true;
            entry.plugin_name = Some(sync.name);
            entry.plugin_hash = sync.hash;
            entry.plugin_stat = sync.stat;
            if sync.updated {
                report.plugins_updated.push(key.to_string());
            }
            if sync.error.is_some() {
                report.plugins_failed.push(key.to_string());
            }
        } else {
            if entry.plugin {
                let registered = entry.plugin_name.as_deref().unwrap_or(key);
                PluginManager::new(&mut *self.registry).remove(registered);
            }
            entry.plugin = false;
            entry.plugin_name = None;
            entry.plugin_hash = None;
            entry.plugin_stat = None;
        }

        if previous.as_ref() != Some(&entry) {
            if !detection.is_stale() {
                tracing::debug!(hook = key, "Refreshed fingerprints");
                report.refreshed.push(key.to_string());
            }
            manifest.insert(key, entry);
        }
        Ok(())
    }

    /// Delete a hook's artifacts, entry and plugin registration
    fn remove_hook(&mut self, name: &str, manifest: &mut Manifest) -> Result<bool> {
        let entry = manifest.remove(name);

        let removed_files = match HookName::new(name) {
            Ok(hook) => self.layout.remove(&hook)?,
            Err(_) => {
                tracing::warn!(hook = name, "Dropping manifest entry with an invalid name");
                false
            }
        };

        if let Some(entry) = &entry
            && entry.plugin
        {
            let registered = entry.plugin_name.as_deref().unwrap_or(name);
            PluginManager::new(&mut *self.registry).remove(registered);
        }

        Ok(entry.is_some() || removed_files)
    }

    fn load_timings(&self) -> Option<Timings> {
        let store = self.timings.as_ref()?;
        match store.load() {
            Ok(timings) if timings.enabled => Some(timings),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load timings");
                None
            }
        }
    }

    /// Delete the artifacts and manifest entries of the named hooks
    ///
    /// Names are validated before anything is touched. Plugin registrations
    /// are kept; the next pass reinstalls them if needed.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid name, or if the manifest or an
    /// artifact cannot be updated
    pub fn clean(&mut self, names: &[&str]) -> Result<Vec<String>> {
        let hooks = names
            .iter()
            .map(|name| HookName::new(*name))
            .collect::<Result<Vec<_>>>()?;

        let mut manifest = self.store.load()?;
        let mut cleaned = Vec::new();
        for hook in hooks {
            let had_entry = manifest.remove(hook.as_str()).is_some();
            let had_files = self.layout.remove(&hook)?;
            if had_entry || had_files {
                cleaned.push(hook.to_string());
            }
        }

        if !cleaned.is_empty() {
            self.store.save(&manifest)?;
        }
        Ok(cleaned)
    }

    /// Delete every recorded hook's artifacts and the manifest entries
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest or an artifact cannot be updated
    pub fn clean_all(&mut self) -> Result<Vec<String>> {
        let manifest = self.store.load()?;
        let mut cleaned = Vec::new();
        for name in manifest.names() {
            if let Ok(hook) = HookName::new(name) {
                self.layout.remove(&hook)?;
            }
            cleaned.push(name.to_string());
        }

        if !manifest.is_empty() {
            self.store.save(&Manifest::new())?;
        }
        Ok(cleaned)
    }

    /// Status of every desired hook
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read
    pub fn status(&self, desired: &DesiredHooks) -> Result<Vec<HookStatus>> {
        let manifest = self.store.load()?;

        let registered = if desired.iter().any(|(_, spec)| spec.plugin().is_some()) {
            match self.registry.list() {
                Ok(plugins) => Some(
                    plugins
                        .into_iter()
                        .map(|p| (p.name, p.version))
                        .collect::<HashMap<_, _>>(),
                ),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to query plugin registry");
                    None
                }
            }
        } else {
            None
        };

        Ok(desired
            .iter()
            .map(|(name, spec)| {
                let entry: Option<&ManifestEntry> = manifest.get(name.as_str());
                let plugin_name = spec
                    .plugin()
                    .and_then(|_| entry.and_then(|e| e.plugin_name.clone()));
                let plugin_installed = match (&registered, &plugin_name) {
                    (Some(map), Some(plugin)) => Some(map.contains_key(plugin)),
                    (Some(_), None) if spec.plugin().is_some() => Some(false),
                    _ => None,
                };
                let plugin_version = registered
                    .as_ref()
                    .zip(plugin_name.as_ref())
                    .and_then(|(map, plugin)| map.get(plugin).cloned().flatten());
                HookStatus {
                    name: name.to_string(),
                    kind: HookKind::of(spec),
                    enabled: spec.is_active(),
                    active: entry.is_some() && self.layout.exists(name),
                    plugin_name,
                    plugin_installed,
                    plugin_version,
                }
            })
            .collect())
    }
}
