//! Timing commands

use clap::Args;
use hooksmith_engine::timing::{TimingStore, Timings};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;
use crate::output::{self, OutputFormat};

/// Enable recording, clearing previous records
///
/// # Errors
///
/// Returns an error if the timing file cannot be written
pub fn start(store: &TimingStore) -> Result<()> {
    store.start()?;
    println!(
        "{} Timing enabled. Open a new shell, then run {}",
        "✓".green(),
        "hooksmith time list".cyan()
    );
    Ok(())
}

/// Disable recording, keeping the records
///
/// # Errors
///
/// Returns an error if the timing file cannot be read or written
pub fn stop(store: &TimingStore) -> Result<Timings> {
    let timings = store.stop()?;
    println!(
        "{} Timing disabled ({} records kept)",
        "✓".green(),
        timings.records.len()
    );
    Ok(timings)
}

#[derive(Debug, Serialize)]
struct Row<'a> {
    hook: &'a str,
    elapsed_ms: u64,
    recorded_at: String,
}

/// Time list command
#[derive(Debug, Default, Args)]
pub struct TimeListCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl Command for TimeListCommand {
    type Output = Timings;

    fn execute(&self, context: &RuntimeContext) -> Result<Timings> {
        let timings = context.timings().load()?;
        let rows: Vec<Row<'_>> = timings
            .slowest_first()
            .into_iter()
            .map(|(hook, record)| Row {
                hook,
                elapsed_ms: record.elapsed_ms,
                recorded_at: record.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            })
            .collect();

        match self.format {
            OutputFormat::Json => output::print_json(&rows)?,
            OutputFormat::Table if rows.is_empty() => {
                if timings.enabled {
                    println!("{}", "No runs recorded yet.".dimmed());
                } else {
                    println!(
                        "{} Run {} to start recording.",
                        "Timing is off.".yellow(),
                        "hooksmith time start".cyan()
                    );
                }
            }
            OutputFormat::Table => {
                let mut table = output::table(["Hook", "Time (ms)", "Recorded"]);
                for row in &rows {
                    table.add_row([
                        row.hook.to_string(),
                        row.elapsed_ms.to_string(),
                        row.recorded_at.clone(),
                    ]);
                }
                println!("{table}");
                let total: u64 = rows.iter().map(|row| row.elapsed_ms).sum();
                println!("Total: {} ms", total.bold());
            }
        }

        Ok(timings)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::cmd::regenerate::RegenerateCommand;
    use crate::cmd::sync::SyncCommand;
    use crate::common::tests::context;
    use tempfile::TempDir;

    const HOOKS: &str = r#"
        [hooks.greeter]
        text = "alias hi = echo hello"
    "#;

    #[test]
    fn test_timing_lifecycle() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, HOOKS);

        // Nothing recorded while disabled
        SyncCommand::default().execute(&ctx).unwrap();
        assert!(TimeListCommand::default().execute(&ctx).unwrap().records.is_empty());

        start(&ctx.timings()).unwrap();
        RegenerateCommand {
            name: None,
            all: true,
        }
        .execute(&ctx)
        .unwrap();

        let listed = TimeListCommand::default().execute(&ctx).unwrap();
        assert!(listed.enabled);
        assert!(listed.records.contains_key("greeter"));

        let stopped = stop(&ctx.timings()).unwrap();
        assert!(!stopped.enabled);
        assert_eq!(stopped.records.len(), 1);
    }
}
