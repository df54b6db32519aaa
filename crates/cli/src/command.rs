//! Command trait for the hooksmith CLI
//!
//! Every subcommand that needs the loaded configuration implements
//! [`Command`] and receives a [`RuntimeContext`].

use crate::common::RuntimeContext;
use crate::error::Result;

/// A hooksmith subcommand
///
/// # Example
///
/// ```rust,ignore
/// use crate::command::Command;
/// use crate::common::RuntimeContext;
/// use crate::error::Result;
/// use clap::Args;
///
/// #[derive(Debug, Args)]
/// pub struct CountCommand;
///
/// impl Command for CountCommand {
///     type Output = usize;
///
///     fn execute(&self, context: &RuntimeContext) -> Result<usize> {
///         Ok(context.desired.len())
///     }
/// }
/// ```
pub trait Command {
    /// Value returned to the caller, usually `()`
    type Output;

    /// Run the command
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`](crate::error::CommandError) describing what
    /// went wrong
    fn execute(&self, context: &RuntimeContext) -> Result<Self::Output>;
}
