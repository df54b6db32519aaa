//! Table and JSON output for CLI commands

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, ContentArrangement, Table};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Table with the CLI's common styling
pub fn table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<Cell>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Print a value as pretty JSON
///
/// # Errors
///
/// Returns an error if the value cannot be serialized
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render a yes/no flag for a table cell
#[must_use]
pub fn flag(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".dimmed().to_string()
    }
}

/// Render an optional flag, `-` when unknown
#[must_use]
pub fn optional_flag(value: Option<bool>) -> String {
    value.map_or_else(|| "-".dimmed().to_string(), flag)
}
