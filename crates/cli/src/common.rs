//! Common utilities and types shared across CLI commands

use crate::error::{CommandError, Result};
use anyhow::Context;
use hooksmith_config::Config;
use hooksmith_engine::hooks::{ArtifactLayout, Generator};
use hooksmith_engine::timing::TimingStore;
use hooksmith_engine::{DesiredHooks, HookSpec, HostRegistry, ManifestStore, Reconciler};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directories a command reads and writes
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    /// Configuration file the desired hooks came from
    pub config_file: PathBuf,
    /// Directory the shell autoloads artifacts from
    pub artifact_dir: PathBuf,
    /// Directory holding the manifest
    pub data_dir: PathBuf,
    /// Directory holding timing records
    pub state_dir: PathBuf,
}

impl ResolvedPaths {
    /// Resolve directories from the configuration, falling back to XDG defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a directory is neither configured nor derivable
    /// from the environment
    pub fn resolve(config_file: &Path, config: &Config) -> Result<Self> {
        let data_dir = config.general.data_dir()?;
        let state_dir = hooksmith_config::state_dir().unwrap_or_else(|| data_dir.clone());
        Ok(Self {
            config_file: config_file.to_path_buf(),
            artifact_dir: config.general.artifact_dir()?,
            data_dir,
            state_dir,
        })
    }
}

/// Runtime context for CLI commands
///
/// Holds the loaded configuration, the desired hooks built from it and the
/// resolved directories. Engine components are created on demand.
pub struct RuntimeContext {
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Desired hooks, in configuration order
    pub desired: DesiredHooks,
    /// Resolved directories
    pub paths: ResolvedPaths,
}

impl RuntimeContext {
    /// Load configuration from `config_path` or the default location
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be located, read or
    /// turned into hook specs
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config_file = match config_path {
            Some(path) => hooksmith_config::expand_tilde(path),
            None => hooksmith_config::dirs::default_config_file()
                .context("Could not determine the configuration directory")?,
        };

        let config = Config::load(&config_file)?;
        let paths = ResolvedPaths::resolve(&config_file, &config)?;
        Ok(Self::from_parts(config, paths)?)
    }

    /// Create a context from a loaded configuration and resolved paths
    ///
    /// # Errors
    ///
    /// Returns an error if a hook definition cannot be turned into a spec
    pub fn from_parts(config: Config, paths: ResolvedPaths) -> Result<Self> {
        let desired = DesiredHooks::try_from(&config)?;
        Ok(Self {
            config: Arc::new(config),
            desired,
            paths,
        })
    }

    /// Manifest store in the data directory
    #[inline]
    pub fn store(&self) -> ManifestStore {
        ManifestStore::in_dir(&self.paths.data_dir)
    }

    /// Artifact layout rooted at the autoload directory
    #[inline]
    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.paths.artifact_dir)
    }

    /// Timing store in the state directory
    #[inline]
    pub fn timings(&self) -> TimingStore {
        TimingStore::in_dir(&self.paths.state_dir)
    }

    /// Generator using the configured default timeout
    pub fn generator(&self) -> Generator {
        Generator::new().with_default_timeout(self.config.general.default_timeout())
    }

    /// Plugin registry backed by the configured host shell
    pub fn registry(&self) -> HostRegistry {
        HostRegistry::new(self.config.general.plugin_host.as_str())
    }

    /// Reconciler wired to this context's directories
    pub fn reconciler<'r>(&self, registry: &'r mut HostRegistry) -> Reconciler<'r, HostRegistry> {
        Reconciler::new(self.store(), self.layout(), registry)
            .with_generator(self.generator())
            .with_timings(self.timings())
    }

    /// Look up a desired hook by name
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownHook`] if no hook has that name
    pub fn hook(&self, name: &str) -> Result<&HookSpec> {
        self.desired
            .get(name)
            .ok_or_else(|| CommandError::UnknownHook(name.to_string()))
    }
}
