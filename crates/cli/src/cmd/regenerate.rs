//! Regenerate command

use clap::Args;
use hooksmith_engine::{Force, ReconcileOptions, ReconcileReport};
use owo_colors::OwoColorize;

use crate::cmd::sync::report_problems;
use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};

/// Regenerate command
///
/// Runs a full pass with the selected hooks forced stale, so other pending
/// changes are applied as well.
#[derive(Debug, Default, Args)]
pub struct RegenerateCommand {
    /// Hook to regenerate
    #[arg(conflicts_with = "all")]
    pub name: Option<String>,

    /// Regenerate every hook
    #[arg(short, long)]
    pub all: bool,
}

impl RegenerateCommand {
    fn force(&self, context: &RuntimeContext) -> Result<Force> {
        match (&self.name, self.all) {
            (_, true) => Ok(Force::All),
            (Some(name), false) => {
                let spec = context.hook(name)?;
                if !spec.is_active() {
                    println!(
                        "{}: hook '{}' is disabled or its dependency is missing",
                        "Note".yellow(),
                        name
                    );
                }
                Ok(Force::only([name.as_str()]))
            }
            (None, false) => Err(CommandError::MissingTarget),
        }
    }
}

impl Command for RegenerateCommand {
    type Output = ReconcileReport;

    fn execute(&self, context: &RuntimeContext) -> Result<ReconcileReport> {
        let options = ReconcileOptions::new().regenerate(self.force(context)?);

        let mut registry = context.registry();
        let report = context
            .reconciler(&mut registry)
            .reconcile(&context.desired, &options)?;

        for name in &report.regenerated {
            if !report.failed.contains(name) {
                println!("{} {}", "Regenerated".green(), name);
            }
        }
        report_problems(&report);
        Ok(report)
    }
}
