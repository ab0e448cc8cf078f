//! Configuration error types for the config module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors found while loading or validating settings.
///
/// Any of these stops the run before a port is opened.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Baud rate not in the host's supported table
    #[error("Invalid baud rate {0}: not supported on this host (see --list-baud-rates)")]
    UnsupportedBaudRate(u32),

    /// Data bits outside 5-8
    #[error("Invalid data bits {0}: expected 5, 6, 7 or 8")]
    InvalidDataBits(u8),

    /// Stop bits other than 1 or 2
    #[error("Invalid stop bits {0}: expected 1 or 2")]
    InvalidStopBits(u8),

    /// Unknown parity name
    #[error("Invalid parity '{0}': expected n, e or o (none, even, odd)")]
    InvalidParity(String),

    /// A port path was not given
    #[error("Missing required {0} port path")]
    MissingPort(&'static str),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Config file given explicitly but absent
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Failed to read config file
    #[error("Failed to read configuration file '{}': {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Environment variable parse error
    #[error("Failed to parse environment variable '{var}': {message}")]
    EnvParseError { var: String, message: String },
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid_value<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an env parse error
    pub fn env_parse<V: Into<String>, M: Into<String>>(var: V, message: M) -> Self {
        Self::EnvParseError {
            var: var.into(),
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
