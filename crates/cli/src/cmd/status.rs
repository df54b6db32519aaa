//! Status and list commands

use clap::Args;
use hooksmith_engine::reconciler::HookStatus;
use owo_colors::OwoColorize;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::Result;
use crate::output::{self, OutputFormat};

/// Status command
#[derive(Debug, Default, Args)]
pub struct StatusCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl Command for StatusCommand {
    type Output = Vec<HookStatus>;

    fn execute(&self, context: &RuntimeContext) -> Result<Vec<HookStatus>> {
        let mut registry = context.registry();
        let statuses = context.reconciler(&mut registry).status(&context.desired)?;

        match self.format {
            OutputFormat::Json => output::print_json(&statuses)?,
            OutputFormat::Table => {
                if statuses.is_empty() {
                    println!("{}", "No hooks configured.".yellow());
                } else {
                    println!("{}", render_table(&statuses));
                }
            }
        }
        Ok(statuses)
    }
}

fn render_table(statuses: &[HookStatus]) -> String {
    let mut table = output::table(["Hook", "Type", "Enabled", "Active", "Plugin"]);
    for status in statuses {
        table.add_row([
            status.name.clone(),
            status.kind.name().to_string(),
            output::flag(status.enabled),
            output::flag(status.active),
            output::optional_flag(status.plugin_installed),
        ]);
    }
    table.to_string()
}

/// List command
#[derive(Debug, Default, Args)]
pub struct ListCommand;

impl Command for ListCommand {
    type Output = Vec<String>;

    fn execute(&self, context: &RuntimeContext) -> Result<Vec<String>> {
        let names: Vec<String> = context.desired.names().map(str::to_string).collect();
        for name in &names {
            println!("{name}");
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::cmd::sync::SyncCommand;
    use crate::common::tests::context;
    use hooksmith_engine::reconciler::HookKind;
    use tempfile::TempDir;

    const HOOKS: &str = r#"
        [hooks.greeter]
        text = "alias hi = echo hello"

        [hooks.tools]
        text = "export def t [] {}"
        module = true
        lazy = true

        [hooks.off]
        text = "x"
        enabled = false
    "#;

    #[test]
    fn test_status_reports_every_hook() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, HOOKS);

        let before = StatusCommand::default().execute(&ctx).unwrap();
        assert!(before.iter().all(|s| !s.active));

        SyncCommand::default().execute(&ctx).unwrap();
        let after = StatusCommand {
            format: OutputFormat::Json,
        }
        .execute(&ctx)
        .unwrap();

        assert_eq!(after.len(), 3);
        assert_eq!(after[0].kind, HookKind::Inline);
        assert!(after[0].active);
        assert_eq!(after[1].kind, HookKind::Lazy);
        assert!(after[1].active);
        assert!(!after[2].enabled);
        assert!(!after[2].active);
    }

    #[test]
    fn test_render_table() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, HOOKS);
        let statuses = StatusCommand::default().execute(&ctx).unwrap();
        let table = render_table(&statuses);
        assert!(table.contains("greeter"));
        assert!(table.contains("lazy"));
    }

    #[test]
    fn test_list_keeps_configuration_order() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, HOOKS);
        let names = ListCommand.execute(&ctx).unwrap();
        assert_eq!(names, ["greeter", "tools", "off"]);
    }
}
