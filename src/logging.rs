//! Diagnostic output setup.
//!
//! Everything goes to stderr so that stdout stays clean for the list
//! commands. `RUST_LOG` wins over every other source of level.

use crate::config::{ConfigError, ConfigResult, LogFormat, LoggingConfig};
use std::io;
use tracing_subscriber::EnvFilter;

/// Command-line adjustments to the configured level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verbosity {
    /// Number of `-v` flags.
    pub verbose: u8,
    /// `-q` was given.
    pub quiet: bool,
}

impl Verbosity {
    /// The level directive to use when `RUST_LOG` is unset.
    pub fn level<'a>(&self, configured: &'a str) -> &'a str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => configured,
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Build the level filter for `config` and `verbosity`.
pub fn filter(config: &LoggingConfig, verbosity: Verbosity) -> ConfigResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let level = verbosity.level(&config.level);
    EnvFilter::try_new(level)
        .map_err(|e| ConfigError::invalid_value("logging.level", format!("'{}': {}", level, e)))
}

/// Install the global subscriber.
///
/// A subscriber that is already installed (for example by a test harness)
/// is left in place.
pub fn init(config: &LoggingConfig, verbosity: Verbosity) -> ConfigResult<()> {
    let builder = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter(config, verbosity)?)
        .with_target(false);

    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Full => builder.try_init(),
    };
    Ok(())
}
