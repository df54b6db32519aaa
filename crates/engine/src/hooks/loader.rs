//! Desired-state loading
//!
//! Turns the `[hooks.*]` tables of `hooks.toml` into [`DesiredHooks`].

use super::spec::{
    Callback, Depends, DesiredHooks, EnvSource, HookSpec, PluginLocator, Producer,
};
use hooksmith_config::{Config, HookDefinition, expand_tilde};
use hooksmith_core::{Error, Result};
use std::path::Path;
use std::time::Duration;

/// Builds the desired hook set from configuration
pub struct HookLoader<'a> {
    config: &'a Config,
}

impl<'a> HookLoader<'a> {
    /// Create a loader over a parsed configuration
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Build every configured hook, preserving file order
    ///
    /// # Errors
    ///
    /// Returns an error if any hook name or definition is invalid
    pub fn load(&self) -> Result<DesiredHooks> {
        let mut desired = DesiredHooks::new();
        for (name, definition) in &self.config.hooks {
            let spec = spec_from_definition(name, definition)?;
            desired.insert(name, spec)?;
        }
        tracing::debug!(hooks = desired.len(), "Loaded desired hooks");
        Ok(desired)
    }
}

impl TryFrom<&Config> for DesiredHooks {
    type Error = Error;

    fn try_from(config: &Config) -> Result<Self> {
        HookLoader::new(config).load()
    }
}

/// Build one hook spec from its TOML definition
///
/// # Errors
///
/// Returns [`Error::HookConfig`] if the definition is invalid
pub fn spec_from_definition(name: &str, definition: &HookDefinition) -> Result<HookSpec> {
    definition.validate(name)?;

    let producer = if let Some(cmd) = &definition.command {
        Producer::ExternalCommand(cmd.clone())
    } else if let Some(args) = &definition.args {
        Producer::ArgumentList(args.clone())
    } else {
        // Plugin hooks without shell output fall through to empty text
        Producer::Callback(Callback::constant(
            definition.text.clone().unwrap_or_default(),
        ))
    };

    let mut builder = HookSpec::builder(producer)
        .enabled(definition.enabled)
        .module(definition.module)
        .lazy(definition.lazy)
        .overlay(definition.overlay);

    if let Some(depends) = &definition.depends {
        builder = builder.depends(Depends::Commands(depends.clone().into_vec()));
    }
    if !definition.env.is_empty() {
        builder = builder.env(EnvSource::Static(definition.env.clone()));
    }
    if let Some(closure) = &definition.on_load {
        builder = builder.on_load(closure.clone());
    }
    if let Some(hash) = &definition.hash {
        builder = builder.static_hash(hash.clone());
    }
    if let Some(files) = &definition.hash_files {
        builder = builder.hash_files(
            files
                .clone()
                .into_vec()
                .iter()
                .map(|f| expand_tilde(Path::new(f))),
        );
    }
    if let Some(plugin) = &definition.plugin {
        builder = builder.plugin(PluginLocator::Name(plugin.clone()));
    } else if let Some(path) = &definition.plugin_path {
        builder = builder.plugin(PluginLocator::Path(expand_tilde(path)));
    }
    if let Some(secs) = definition.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder
        .build()
        .map_err(|e| Error::HookConfig(format!("Hook '{name}': {e}")))
}
