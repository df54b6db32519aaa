//! # Hooksmith Engine
//!
//! Reconciles a declarative set of shell startup hooks against generated,
//! cached artifacts on disk.
//!
//! - **Hooks**: specs, change detection, generation and artifact layout
//! - **Manifest**: persisted record of what was last generated
//! - **Plugins**: host plugin registration driven by binary fingerprints
//! - **Reconciler**: one pass that removes, regenerates and refreshes hooks
//! - **Timing**: optional per-hook generation timing

pub mod fingerprint;
pub mod hash;
pub mod hooks;
pub mod manifest;
pub mod plugin;
pub mod reconciler;
pub mod system;
pub mod timing;

// Re-export error types from core
pub use hooksmith_core::{Error, HookName, Result};

// Re-export commonly used types
pub use hooks::{DesiredHooks, HookSpec, Producer};
pub use manifest::{Manifest, ManifestEntry, ManifestStore};
pub use plugin::{HostRegistry, MemoryRegistry, PluginRegistry};
pub use reconciler::{Force, ReconcileOptions, ReconcileReport, Reconciler};
