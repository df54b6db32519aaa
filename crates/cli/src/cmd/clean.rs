//! Clean command

use clap::Args;
use owo_colors::OwoColorize;

use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};

/// Clean command
///
/// Removes artifacts and manifest entries. Names do not have to be in the
/// configuration, so leftovers of deleted hooks can be cleaned too.
#[derive(Debug, Default, Args)]
pub struct CleanCommand {
    /// Hook to clean
    #[arg(conflicts_with = "all")]
    pub name: Option<String>,

    /// Clean every recorded hook
    #[arg(short, long)]
    pub all: bool,
}

impl Command for CleanCommand {
    type Output = Vec<String>;

    fn execute(&self, context: &RuntimeContext) -> Result<Vec<String>> {
        let mut registry = context.registry();
        let mut reconciler = context.reconciler(&mut registry);

        let cleaned = match (&self.name, self.all) {
            (_, true) => reconciler.clean_all()?,
            (Some(name), false) => reconciler.clean(&[name.as_str()])?,
            (None, false) => return Err(CommandError::MissingTarget),
        };

        if cleaned.is_empty() {
            println!("{}", "Nothing to clean.".dimmed());
        } else {
            for name in &cleaned {
                println!("{} {}", "Cleaned".green(), name);
            }
        }
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::cmd::sync::SyncCommand;
    use crate::common::tests::context;
    use tempfile::TempDir;

    const HOOKS: &str = r#"
        [hooks.greeter]
        text = "alias hi = echo hello"

        [hooks.zoxide]
        text = "export def z [] {}"
        module = true
    "#;

    #[test]
    fn test_clean_one() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, HOOKS);
        SyncCommand::default().execute(&ctx).unwrap();

        let cleaned = CleanCommand {
            name: Some("zoxide".into()),
            all: false,
        }
        .execute(&ctx)
        .unwrap();

        assert_eq!(cleaned, ["zoxide"]);
        assert!(!temp.path().join("autoload/hooks__zoxide.nu").exists());
        assert!(!temp.path().join("autoload/hooks/zoxide.nu").exists());
        assert!(temp.path().join("autoload/hooks__greeter.nu").exists());
    }

    #[test]
    fn test_clean_all() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, HOOKS);
        SyncCommand::default().execute(&ctx).unwrap();

        let cleaned = CleanCommand {
            name: None,
            all: true,
        }
        .execute(&ctx)
        .unwrap();

        assert_eq!(cleaned, ["greeter", "zoxide"]);
        assert!(ctx.store().load().unwrap().is_empty());
    }

    #[test]
    fn test_clean_requires_target() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, HOOKS);
        let err = CleanCommand::default().execute(&ctx).unwrap_err();
        assert!(matches!(err, CommandError::MissingTarget));
    }

    #[test]
    fn test_clean_rejects_invalid_name() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, HOOKS);
        let err = CleanCommand {
            name: Some("../etc".into()),
            all: false,
        }
        .execute(&ctx)
        .unwrap_err();
        assert!(matches!(err, CommandError::Hooksmith(_)));
    }
}
