//! Sync command
//!
//! Runs one reconciliation pass. Meant to be called from the shell's startup
//! files, so it writes nothing to stdout.

use clap::Args;
use hooksmith_engine::plugin::NESTED_ENV;
use hooksmith_engine::{Force, ReconcileOptions, ReconcileReport};
use owo_colors::OwoColorize;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;

/// Sync command
#[derive(Debug, Default, Args)]
pub struct SyncCommand {
    /// Regenerate every hook regardless of detected changes
    #[arg(short, long)]
    pub force: bool,
}

impl Command for SyncCommand {
    type Output = ReconcileReport;

    fn execute(&self, context: &RuntimeContext) -> Result<ReconcileReport> {
        let force = if self.force { Force::All } else { Force::None };
        let options = ReconcileOptions::new().regenerate(force);

        let mut registry = context.registry();
        let report = context
            .reconciler(&mut registry)
            .reconcile(&context.desired, &options)?;

        report_problems(&report);
        Ok(report)
    }
}

/// Whether this process was started by a plugin registry operation
#[must_use]
pub fn is_nested() -> bool {
    std::env::var_os(NESTED_ENV).is_some()
}

/// Print failed hooks and the restart notice to stderr
pub(crate) fn report_problems(report: &ReconcileReport) {
    for name in &report.failed {
        eprintln!(
            "{}: hook '{}' failed to generate; run `hooksmith regenerate {}` after fixing it",
            "Warning".yellow(),
            name,
            name
        );
    }
    for name in &report.plugins_failed {
        eprintln!(
            "{}: plugin for hook '{}' could not be registered; run `hooksmith update-plugin {}` to retry",
            "Warning".yellow(),
            name,
            name
        );
    }
    if report.restart_required() {
        eprintln!(
            "{} Plugins changed ({}). Restart Nushell to load them.",
            "↻".cyan(),
            report.plugins_updated.join(", ").bold()
        );
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::common::tests::context;
    use serial_test::serial;
    use tempfile::TempDir;

    const GREETER: &str = r#"
        [hooks.greeter]
        text = "alias hi = echo hello"
    "#;

    #[test]
    fn test_sync_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, GREETER);

        let first = SyncCommand::default().execute(&ctx).unwrap();
        assert_eq!(first.regenerated, ["greeter"]);
        assert!(temp.path().join("autoload/hooks__greeter.nu").exists());

        let second = SyncCommand::default().execute(&ctx).unwrap();
        assert!(second.is_noop());
    }

    #[test]
    fn test_forced_sync_regenerates_everything() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, GREETER);

        SyncCommand::default().execute(&ctx).unwrap();
        let forced = SyncCommand { force: true }.execute(&ctx).unwrap();
        assert_eq!(forced.regenerated, ["greeter"]);
    }

    #[test]
    #[serial]
    fn test_nested_detection() {
        temp_env::with_var(NESTED_ENV, Some("1"), || assert!(is_nested()));
        temp_env::with_var_unset(NESTED_ENV, || assert!(!is_nested()));
    }
}
