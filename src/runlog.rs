//! Logging setup: console output plus the append-only `run.log` in the
//! mirror root.
//!
//! Level priority: `RUST_LOG` env var > quiet flag > verbose flags > `info`.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::MirrorError;

/// Maps the CLI verbosity flags to a default filter directive.
#[must_use]
pub fn default_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Initializes tracing with a console layer and a `run.log` file layer.
///
/// The log file is opened in append mode so successive runs accumulate into
/// one timeline.
pub fn init(output_dir: &Path, verbose: u8, quiet: bool) -> Result<(), MirrorError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose, quiet)));

    let log_path = output_dir.join("run.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|source| MirrorError::io(log_path.clone(), source))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(log_file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_quiet_wins() {
        assert_eq!(default_level(2, true), "error");
    }

    #[test]
    fn test_default_level_verbosity_ladder() {
        assert_eq!(default_level(0, false), "info");
        assert_eq!(default_level(1, false), "debug");
        assert_eq!(default_level(2, false), "trace");
        assert_eq!(default_level(5, false), "trace");
    }
}
