//! Logging configuration for hooksmith
//!
//! Terminal output goes to stderr so `hooksmith sync` stays quiet on stdout
//! during shell startup. An optional log file receives everything at debug level.

use crate::Result;
use std::path::Path;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Default stderr level
///
/// `verbose` wins over `quiet`; quiet commands only report warnings.
#[must_use]
pub fn default_level(verbose: bool, quiet: bool) -> &'static str {
    match (verbose, quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    }
}

/// Initialize the logging system
///
/// # Arguments
/// * `verbose` - Enable debug level logging (with timestamps)
/// * `quiet` - Only show warnings and errors unless `verbose` is set
/// * `log_file` - Optional path to append logs to
///
/// # Examples
/// ```ignore
/// // Basic usage with info level
/// init(false, false, None)?;
///
/// // Verbose mode with a debug log file
/// init(true, false, Some(Path::new("hooksmith.log")))?;
/// ```
pub fn init(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let level = default_level(verbose, quiet);

    // Allows overriding with RUST_LOG env var
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "hooksmith={level},hooksmith_engine={level},hooksmith_config={level}"
            ))
        })
        .expect("failed to create default env filter");

    let stderr_layer: BoxedLayer = if verbose {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .with_ansi(true)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time() // No timestamps in normal mode
            .compact()
            .with_ansi(true)
            .with_filter(env_filter)
            .boxed()
    };

    let mut layers = vec![stderr_layer];

    if let Some(log_path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        layers.push(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .pretty()
                .with_filter(EnvFilter::try_new("debug").expect("'debug' is a valid filter"))
                .boxed(),
        );
    }

    tracing_subscriber::registry().with(layers).init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(false, false), "info");
        assert_eq!(default_level(false, true), "warn");
        assert_eq!(default_level(true, true), "debug");
        assert_eq!(default_level(true, false), "debug");
    }
}
