//! Plugin commands

use clap::Args;
use hooksmith_engine::reconciler::{HookKind, HookStatus};
use hooksmith_engine::{Force, ReconcileOptions, ReconcileReport};
use owo_colors::OwoColorize;

use crate::cmd::sync::report_problems;
use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};
use crate::output::{self, OutputFormat};

/// Plugins command
#[derive(Debug, Default, Args)]
pub struct PluginsCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl Command for PluginsCommand {
    type Output = Vec<HookStatus>;

    fn execute(&self, context: &RuntimeContext) -> Result<Vec<HookStatus>> {
        let mut registry = context.registry();
        let plugins: Vec<HookStatus> = context
            .reconciler(&mut registry)
            .status(&context.desired)?
            .into_iter()
            .filter(|status| status.kind == HookKind::Plugin)
            .collect();

        match self.format {
            OutputFormat::Json => output::print_json(&plugins)?,
            OutputFormat::Table if plugins.is_empty() => {
                println!("{}", "No plugin hooks configured.".yellow());
            }
            OutputFormat::Table => {
                let mut table =
                    output::table(["Hook", "Plugin", "Version", "Enabled", "Installed"]);
                for status in &plugins {
                    table.add_row([
                        status.name.clone(),
                        status.plugin_name.clone().unwrap_or_else(|| "-".to_string()),
                        status.plugin_version.clone().unwrap_or_else(|| "-".to_string()),
                        output::flag(status.enabled),
                        output::optional_flag(status.plugin_installed),
                    ]);
                }
                println!("{table}");
            }
        }
        Ok(plugins)
    }
}

/// Update-plugin command
#[derive(Debug, Default, Args)]
pub struct UpdatePluginCommand {
    /// Plugin hook to reinstall; every plugin hook when omitted
    pub name: Option<String>,
}

impl Command for UpdatePluginCommand {
    type Output = ReconcileReport;

    fn execute(&self, context: &RuntimeContext) -> Result<ReconcileReport> {
        let force = match &self.name {
            Some(name) => {
                if context.hook(name)?.plugin().is_none() {
                    return Err(CommandError::NotAPlugin(name.clone()));
                }
                Force::only([name.as_str()])
            }
            None => Force::All,
        };
        let options = ReconcileOptions::new().reinstall(force);

        let mut registry = context.registry();
        let report = context
            .reconciler(&mut registry)
            .reconcile(&context.desired, &options)?;

        if report.plugins_updated.is_empty() && report.plugins_failed.is_empty() {
            println!("{}", "No plugins updated.".dimmed());
        }
        report_problems(&report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::common::tests::context;
    use tempfile::TempDir;

    const HOOKS: &str = r#"
        [hooks.greeter]
        text = "alias hi = echo hello"
    "#;

    #[test]
    fn test_update_plugin_rejects_non_plugin_hook() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, HOOKS);
        let err = UpdatePluginCommand {
            name: Some("greeter".into()),
        }
        .execute(&ctx)
        .unwrap_err();
        assert!(matches!(err, CommandError::NotAPlugin(name) if name == "greeter"));
    }

    #[test]
    fn test_update_plugin_unknown_hook() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, HOOKS);
        let err = UpdatePluginCommand {
            name: Some("gstat".into()),
        }
        .execute(&ctx)
        .unwrap_err();
        assert!(matches!(err, CommandError::UnknownHook(_)));
    }

    #[test]
    fn test_plugins_without_plugin_hooks() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, HOOKS);
        let plugins = PluginsCommand::default().execute(&ctx).unwrap();
        assert!(plugins.is_empty());
    }
}
