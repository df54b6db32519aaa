//! Hook specifications
//!
//! Defines the desired-state types handed to the reconciler once per pass:
//! [`HookSpec`] and the [`DesiredHooks`] map it lives in. Specs are validated
//! when they are built, so an invalid load-strategy combination never reaches
//! the filesystem.

use hooksmith_core::{Error, HookName, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Error type callbacks may return
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Environment handed to producers
pub type HookEnv = IndexMap<String, String>;

/// Result of a callback producer
pub type CallbackResult = std::result::Result<ProducerOutput, BoxError>;

/// A host-side function paired with a fingerprint
///
/// Functions cannot be serialized, so the fingerprint stands in for the
/// function's identity when the fast hash is computed. Change the fingerprint
/// whenever the function's behavior changes.
pub struct Callable<F: ?Sized> {
    fingerprint: String,
    func: Arc<F>,
}

impl<F: ?Sized> Callable<F> {
    /// Identity string used for change detection
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl<F: ?Sized> Clone for Callable<F> {
    fn clone(&self) -> Self {
        Self {
            fingerprint: self.fingerprint.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Callable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

/// Producer callback: receives the resolved hook environment
pub type Callback = Callable<dyn Fn(&HookEnv) -> CallbackResult + Send + Sync>;

/// Result of an environment callback
pub type EnvResult = std::result::Result<HookEnv, BoxError>;

/// Callback producing environment variables
pub type EnvCallback = Callable<dyn Fn() -> EnvResult + Send + Sync>;

/// Dependency predicate
pub type Predicate = Callable<dyn Fn() -> bool + Send + Sync>;

/// Custom hash input
pub type HashFn = Callable<dyn Fn() -> String + Send + Sync>;

impl Callable<dyn Fn(&HookEnv) -> CallbackResult + Send + Sync> {
    /// Wrap a producer function
    pub fn new<F>(fingerprint: impl Into<String>, func: F) -> Self
    where
        F: Fn(&HookEnv) -> CallbackResult + Send + Sync + 'static,
    {
        Self {
            fingerprint: fingerprint.into(),
            func: Arc::new(func),
        }
    }

    /// A producer that always returns `text`; the text is its own fingerprint
    pub fn constant(text: impl Into<String>) -> Self {
        let text = text.into();
        let output = text.clone();
        Self::new(text, move |_| Ok(ProducerOutput::Text(output.clone())))
    }

    /// Invoke the producer
    pub fn call(&self, env: &HookEnv) -> CallbackResult {
        (self.func)(env)
    }
}

impl Callable<dyn Fn() -> EnvResult + Send + Sync> {
    /// Wrap an environment function
    pub fn new<F>(fingerprint: impl Into<String>, func: F) -> Self
    where
        F: Fn() -> EnvResult + Send + Sync + 'static,
    {
        Self {
            fingerprint: fingerprint.into(),
            func: Arc::new(func),
        }
    }

    /// Invoke the function
    pub fn call(&self) -> EnvResult {
        (self.func)()
    }
}

impl Callable<dyn Fn() -> bool + Send + Sync> {
    /// Wrap a predicate
    pub fn new<F>(fingerprint: impl Into<String>, func: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            fingerprint: fingerprint.into(),
            func: Arc::new(func),
        }
    }

    /// Evaluate the predicate; a panicking predicate counts as unmet
    pub fn call(&self) -> bool {
        panic::catch_unwind(AssertUnwindSafe(|| (self.func)())).unwrap_or_else(|_| {
            tracing::warn!(predicate = %self.fingerprint, "Dependency predicate panicked");
            false
        })
    }
}

impl Callable<dyn Fn() -> String + Send + Sync> {
    /// Wrap a hash function
    pub fn new<F>(fingerprint: impl Into<String>, func: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self {
            fingerprint: fingerprint.into(),
            func: Arc::new(func),
        }
    }

    /// Compute the hash input; `None` if the function panicked
    pub fn call(&self) -> Option<String> {
        panic::catch_unwind(AssertUnwindSafe(|| (self.func)()))
            .inspect_err(|_| {
                tracing::warn!(hash_fn = %self.fingerprint, "Hash function panicked");
            })
            .ok()
    }
}

/// What a callback returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerOutput {
    /// Text used as-is
    Text(String),
    /// Lines joined with `\n`
    Lines(Vec<String>),
}

impl ProducerOutput {
    /// Stringify the output
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Lines(lines) => lines.join("\n"),
        }
    }
}

impl From<String> for ProducerOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ProducerOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<String>> for ProducerOutput {
    fn from(lines: Vec<String>) -> Self {
        Self::Lines(lines)
    }
}

/// Where a hook's output comes from
#[derive(Debug, Clone)]
pub enum Producer {
    /// A command line, split with shell quoting rules and run without a shell
    ExternalCommand(String),
    /// Program followed by its arguments
    ArgumentList(Vec<String>),
    /// In-process function
    Callback(Callback),
}

/// Condition for a hook to be active
#[derive(Debug, Clone)]
pub enum Depends {
    /// Every executable must be found on `PATH`
    Commands(Vec<String>),
    /// Custom check
    Predicate(Predicate),
}

impl Depends {
    /// Depend on a single executable
    pub fn command(name: impl Into<String>) -> Self {
        Self::Commands(vec![name.into()])
    }

    /// Check whether the dependency is currently available
    #[must_use]
    pub fn is_met(&self) -> bool {
        match self {
            Self::Commands(commands) => commands.iter().all(|cmd| {
                let found = which::which(cmd).is_ok();
                if !found {
                    tracing::debug!(command = %cmd, "Dependency not found on PATH");
                }
                found
            }),
            Self::Predicate(predicate) => predicate.call(),
        }
    }
}

/// Environment merged into the producer's environment
#[derive(Debug, Clone)]
pub enum EnvSource {
    /// Fixed variables
    Static(HookEnv),
    /// Variables computed at generation time
    Callback(EnvCallback),
}

impl EnvSource {
    /// Resolve to concrete variables
    ///
    /// # Errors
    ///
    /// Returns the callback's error for [`EnvSource::Callback`]
    pub fn resolve(&self) -> EnvResult {
        match self {
            Self::Static(vars) => Ok(vars.clone()),
            Self::Callback(callback) => callback.call(),
        }
    }
}

/// How the host shell loads the generated output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategy {
    /// Output is sourced directly
    Inline,
    /// Output is written as a module and `use`d immediately
    Module,
    /// Output is written as a module that is not loaded
    Lazy,
    /// Output is written as a module with load/unload overlay aliases
    Overlay,
}

impl LoadStrategy {
    /// Map the `(module, lazy, overlay)` flags to a strategy
    ///
    /// # Errors
    ///
    /// Returns [`Error::HookConfig`] for `lazy && overlay` or when either is set without `module`
    pub fn from_flags(module: bool, lazy: bool, overlay: bool) -> Result<Self> {
        match (module, lazy, overlay) {
            (_, true, true) => Err(Error::HookConfig(
                "'lazy' and 'overlay' are mutually exclusive".to_string(),
            )),
            (false, true, false) => Err(Error::HookConfig("'lazy' requires 'module'".to_string())),
            (false, false, true) => Err(Error::HookConfig(
                "'overlay' requires 'module'".to_string(),
            )),
            (false, false, false) => Ok(Self::Inline),
            (true, false, false) => Ok(Self::Module),
            (true, true, false) => Ok(Self::Lazy),
            (true, false, true) => Ok(Self::Overlay),
        }
    }

    /// Whether a separate module file is written
    #[must_use]
    pub fn is_module(self) -> bool {
        !matches!(self, Self::Inline)
    }

    /// Get the string name of this strategy
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Module => "module",
            Self::Lazy => "lazy",
            Self::Overlay => "overlay",
        }
    }
}

/// How to find a plugin binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginLocator {
    /// Executable name looked up on `PATH`
    Name(String),
    /// Explicit path
    Path(PathBuf),
}

/// Desired state of one hook
#[derive(Debug, Clone)]
pub struct HookSpec {
    enabled: bool,
    producer: Producer,
    depends: Option<Depends>,
    env: Option<EnvSource>,
    load: LoadStrategy,
    on_load: Option<String>,
    static_hash: Option<String>,
    hash_fn: Option<HashFn>,
    hash_files: Vec<PathBuf>,
    plugin: Option<PluginLocator>,
    timeout: Option<Duration>,
}

impl HookSpec {
    /// Start building a spec around a producer
    pub fn builder(producer: Producer) -> HookSpecBuilder {
        HookSpecBuilder::new(producer)
    }

    /// Start building a plugin spec that produces no shell output
    pub fn plugin_builder(locator: PluginLocator) -> HookSpecBuilder {
        HookSpecBuilder::new(Producer::Callback(Callback::constant(""))).plugin(locator)
    }

    /// Whether the hook is enabled
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the hook is enabled and its dependency is met
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && self.depends.as_ref().is_none_or(Depends::is_met)
    }

    /// Output producer
    #[must_use]
    pub fn producer(&self) -> &Producer {
        &self.producer
    }

    /// Dependency condition
    #[must_use]
    pub fn depends(&self) -> Option<&Depends> {
        self.depends.as_ref()
    }

    /// Environment source
    #[must_use]
    pub fn env(&self) -> Option<&EnvSource> {
        self.env.as_ref()
    }

    /// Load strategy
    #[must_use]
    pub fn load(&self) -> LoadStrategy {
        self.load
    }

    /// Closure source run when the artifact is loaded
    #[must_use]
    pub fn on_load(&self) -> Option<&str> {
        self.on_load.as_deref()
    }

    /// Static hash input
    #[must_use]
    pub fn static_hash(&self) -> Option<&str> {
        self.static_hash.as_deref()
    }

    /// Custom hash function
    #[must_use]
    pub fn hash_fn(&self) -> Option<&HashFn> {
        self.hash_fn.as_ref()
    }

    /// Files tracked for content changes
    #[must_use]
    pub fn hash_files(&self) -> &[PathBuf] {
        &self.hash_files
    }

    /// Plugin locator, if this is a plugin hook
    #[must_use]
    pub fn plugin(&self) -> Option<&PluginLocator> {
        self.plugin.as_ref()
    }

    /// Per-hook timeout; `Some(Duration::ZERO)` disables the default
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Builder for [`HookSpec`]
///
/// ```
/// use hooksmith_engine::hooks::{HookSpec, Producer};
///
/// let spec = HookSpec::builder(Producer::ExternalCommand("zoxide init nushell".into()))
///     .module(true)
///     .lazy(true)
///     .build()?;
/// assert!(spec.load().is_module());
///
/// let err = HookSpec::builder(Producer::ExternalCommand("zoxide init nushell".into()))
///     .module(true)
///     .lazy(true)
///     .overlay(true)
///     .build();
/// assert!(err.is_err());
/// # Ok::<(), hooksmith_core::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct HookSpecBuilder {
    enabled: bool,
    producer: Producer,
    depends: Option<Depends>,
    env: Option<EnvSource>,
    module: bool,
    lazy: bool,
    overlay: bool,
    on_load: Option<String>,
    static_hash: Option<String>,
    hash_fn: Option<HashFn>,
    hash_files: Vec<PathBuf>,
    plugin: Option<PluginLocator>,
    timeout: Option<Duration>,
}

impl HookSpecBuilder {
    fn new(producer: Producer) -> Self {
        Self {
            enabled: true,
            producer,
            depends: None,
            env: None,
            module: false,
            lazy: false,
            overlay: false,
            on_load: None,
            static_hash: None,
            hash_fn: None,
            hash_files: Vec::new(),
            plugin: None,
            timeout: None,
        }
    }

    /// Enable or disable the hook
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Require a dependency
    #[must_use]
    pub fn depends(mut self, depends: Depends) -> Self {
        self.depends = Some(depends);
        self
    }

    /// Set the environment source
    #[must_use]
    pub fn env(mut self, env: EnvSource) -> Self {
        self.env = Some(env);
        self
    }

    /// Write the output as a module
    #[must_use]
    pub fn module(mut self, module: bool) -> Self {
        self.module = module;
        self
    }

    /// Do not load the module at startup
    #[must_use]
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Expose the module as an overlay
    #[must_use]
    pub fn overlay(mut self, overlay: bool) -> Self {
        self.overlay = overlay;
        self
    }

    /// Closure source appended to run on load
    #[must_use]
    pub fn on_load(mut self, closure: impl Into<String>) -> Self {
        self.on_load = Some(closure.into());
        self
    }

    /// Static value mixed into the fast hash
    #[must_use]
    pub fn static_hash(mut self, hash: impl Into<String>) -> Self {
        self.static_hash = Some(hash.into());
        self
    }

    /// Function whose result is mixed into the fast hash
    #[must_use]
    pub fn hash_fn(mut self, hash_fn: HashFn) -> Self {
        self.hash_fn = Some(hash_fn);
        self
    }

    /// Track files for content changes
    #[must_use]
    pub fn hash_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.hash_files.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Mark as a plugin hook
    #[must_use]
    pub fn plugin(mut self, locator: PluginLocator) -> Self {
        self.plugin = Some(locator);
        self
    }

    /// Override the generator timeout (`Duration::ZERO` = none)
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate and build the spec
    ///
    /// # Errors
    ///
    /// Returns [`Error::HookConfig`] for an invalid load-strategy combination,
    /// an empty or unparseable command, or an empty argument list.
    pub fn build(self) -> Result<HookSpec> {
        let load = LoadStrategy::from_flags(self.module, self.lazy, self.overlay)?;

        match &self.producer {
            Producer::ExternalCommand(cmd) => {
                let parts = shell_words::split(cmd).map_err(|e| {
                    Error::HookConfig(format!("Failed to parse command '{cmd}': {e}"))
                })?;
                if parts.is_empty() {
                    return Err(Error::HookConfig("Empty command".to_string()));
                }
            }
            Producer::ArgumentList(args) => {
                if args.first().is_none_or(|p| p.trim().is_empty()) {
                    return Err(Error::HookConfig("Empty argument list".to_string()));
                }
            }
            Producer::Callback(_) => {}
        }

        if let Some(closure) = &self.on_load
            && closure.trim().is_empty()
        {
            return Err(Error::HookConfig("Empty 'onLoad' closure".to_string()));
        }

        Ok(HookSpec {
            enabled: self.enabled,
            producer: self.producer,
            depends: self.depends,
            env: self.env,
            load,
            on_load: self.on_load,
            static_hash: self.static_hash,
            hash_fn: self.hash_fn,
            hash_files: self.hash_files,
            plugin: self.plugin,
            timeout: self.timeout,
        })
    }
}

/// The desired hook set for one pass, in insertion order
#[derive(Debug, Clone, Default)]
pub struct DesiredHooks {
    hooks: IndexMap<HookName, HookSpec>,
}

impl DesiredHooks {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook, replacing any previous spec with the same name
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHookName`] if `name` is not `[A-Za-z0-9_:-]+`
    pub fn insert(&mut self, name: &str, spec: HookSpec) -> Result<Option<HookSpec>> {
        let name = HookName::new(name)?;
        Ok(self.hooks.insert(name, spec))
    }

    /// Chaining form of [`DesiredHooks::insert`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHookName`] if `name` is invalid
    pub fn with(mut self, name: &str, spec: HookSpec) -> Result<Self> {
        self.insert(name, spec)?;
        Ok(self)
    }

    /// Look up a hook
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HookSpec> {
        self.hooks.get(name)
    }

    /// Whether a hook is desired
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Iterate over `(name, spec)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&HookName, &HookSpec)> {
        self.hooks.iter()
    }

    /// Iterate over names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hooks.keys().map(HookName::as_str)
    }

    /// Number of hooks
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
