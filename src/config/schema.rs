//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! Values are kept in their raw form here and checked by the `validate`
//! methods, so a bad value in a file, the environment or on the command line
//! produces the same error.

use super::error::{ConfigError, ConfigResult};
use crate::mirror::{ControlLines, EngineOptions, DEFAULT_BUFFER_SIZE};
use crate::port::{BaudTable, DataBits, LineSettings, Parity, StopBits};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Accepted readiness-wait bounds in milliseconds.
pub const POLL_INTERVAL_RANGE_MS: RangeInclusive<u64> = 1..=1000;

/// Accepted transfer buffer sizes.
pub const BUFFER_SIZE_RANGE: RangeInclusive<usize> = 1..=65536;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Line settings shared by both ports
    pub line: LineConfig,
    /// Mirror loop tuning
    pub mirror: MirrorConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Line settings section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub baud_rate: u32,
    /// 5 to 8
    pub data_bits: u8,
    /// 1 or 2
    pub stop_bits: u8,
    /// "none", "even", "odd" or their first letters
    pub parity: String,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: "none".to_string(),
        }
    }
}

impl LineConfig {
    /// Check every field against `table` and the allowed ranges.
    pub fn validate(&self, table: &BaudTable) -> ConfigResult<LineSettings> {
        table.symbol(self.baud_rate)?;
        Ok(LineSettings {
            baud_rate: self.baud_rate,
            data_bits: DataBits::try_from(self.data_bits)?,
            stop_bits: StopBits::try_from(self.stop_bits)?,
            parity: self.parity.parse::<Parity>()?,
        })
    }
}

/// Mirror loop section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Bounded readiness wait in milliseconds
    pub poll_interval_ms: u64,
    /// Transfer chunk in bytes
    pub buffer_size: usize,
    /// Handshake line mirroring
    pub control_lines: ControlLines,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 25,
            buffer_size: DEFAULT_BUFFER_SIZE,
            control_lines: ControlLines::Off,
        }
    }
}

impl MirrorConfig {
    pub fn validate(&self) -> ConfigResult<EngineOptions> {
        if !POLL_INTERVAL_RANGE_MS.contains(&self.poll_interval_ms) {
            return Err(ConfigError::invalid_value(
                "mirror.poll_interval_ms",
                format!(
                    "{} is outside {}..={}",
                    self.poll_interval_ms,
                    POLL_INTERVAL_RANGE_MS.start(),
                    POLL_INTERVAL_RANGE_MS.end()
                ),
            ));
        }
        if !BUFFER_SIZE_RANGE.contains(&self.buffer_size) {
            return Err(ConfigError::invalid_value(
                "mirror.buffer_size",
                format!(
                    "{} is outside {}..={}",
                    self.buffer_size,
                    BUFFER_SIZE_RANGE.start(),
                    BUFFER_SIZE_RANGE.end()
                ),
            ));
        }

        Ok(EngineOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            buffer_size: self.buffer_size,
            control_lines: self.control_lines,
        })
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "compact", "pretty", "full"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line records
    #[default]
    Compact,
    /// Multi-line, human-oriented records
    Pretty,
    /// The default `tracing-subscriber` format
    Full,
}
