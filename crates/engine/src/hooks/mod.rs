//! Hook model and per-hook pipeline
//!
//! ## Module Organization
//!
//! - `spec`: desired-state types (`HookSpec`, `DesiredHooks`) and their builder
//! - `loader`: builds `DesiredHooks` from `hooks.toml`
//! - `detector`: fast hash and staleness decisions
//! - `generator`: runs producers with timeouts, producing text or an error stub
//! - `artifact`: file layout and atomic artifact writes
//! - `render`: Nushell syntax for directives, `onLoad` and error stubs

pub mod artifact;
pub mod detector;
pub mod generator;
pub mod loader;
pub mod render;
pub mod spec;

// Re-export main types for convenience
pub use artifact::{ArtifactLayout, WrittenArtifact};
pub use detector::{ChangeDetector, DetectContext, Detection, StaleReason};
pub use generator::{GeneratedOutput, GenerationError, Generator};
pub use loader::HookLoader;
pub use spec::{
    BoxError, Callable, Callback, CallbackResult, Depends, DesiredHooks, EnvCallback, EnvResult,
    EnvSource, HashFn, HookEnv, HookSpec, HookSpecBuilder, LoadStrategy, PluginLocator, Predicate,
    Producer, ProducerOutput,
};
