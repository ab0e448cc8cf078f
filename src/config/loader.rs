//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use crate::mirror::ControlLines;
use clap::ValueEnum;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "TTYMIRROR";

/// Config file name inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config file name looked up in the current directory
const LOCAL_CONFIG_FILE_NAME: &str = "ttymirror.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "TTYMIRROR_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `explicit` (the `--config` flag)
    /// 2. `TTYMIRROR_CONFIG` environment variable
    /// 3. `./ttymirror.toml` (current directory)
    /// 4. `ttymirror/config.toml` in the platform config directory
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables then override any file values.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => resolve_config_path()?,
        };

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Create a loader with default configuration (no file, no environment).
    pub fn with_defaults() -> Self {
        Self {
            config_path: None,
            config: Config::default(),
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
///
/// A path named by `TTYMIRROR_CONFIG` must exist; the implicit locations are
/// skipped when absent.
pub fn resolve_config_path() -> ConfigResult<Option<PathBuf>> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        return Ok(Some(path));
    }

    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Ok(Some(cwd_config));
    }

    Ok(get_default_config_path().filter(|path| path.exists()))
}

/// Get the platform config file path, whether or not it exists.
pub fn get_default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ttymirror").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
pub fn load_from_file(path: &Path) -> ConfigResult<Config> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("Loaded configuration from {}", path.display());

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Apply environment variable overrides to the configuration.
///
/// Variables follow the pattern `TTYMIRROR_<SECTION>_<KEY>`, for example
/// `TTYMIRROR_LINE_BAUD_RATE=115200`. `lookup` resolves a variable name to
/// its value.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| {
        let name = format!("{}_{}", ENV_PREFIX, key);
        lookup(&name).map(|value| (name, value))
    };

    // Line overrides
    if let Some((name, val)) = var("LINE_BAUD_RATE") {
        config.line.baud_rate = parse_number(&name, &val, "Invalid baud rate")?;
    }
    if let Some((name, val)) = var("LINE_DATA_BITS") {
        config.line.data_bits = parse_number(&name, &val, "Invalid data bits")?;
    }
    if let Some((name, val)) = var("LINE_STOP_BITS") {
        config.line.stop_bits = parse_number(&name, &val, "Invalid stop bits")?;
    }
    if let Some((_, val)) = var("LINE_PARITY") {
        config.line.parity = val;
    }

    // Mirror overrides
    if let Some((name, val)) = var("MIRROR_POLL_INTERVAL_MS") {
        config.mirror.poll_interval_ms = parse_number(&name, &val, "Invalid poll interval")?;
    }
    if let Some((name, val)) = var("MIRROR_BUFFER_SIZE") {
        config.mirror.buffer_size = parse_number(&name, &val, "Invalid buffer size")?;
    }
    if let Some((name, val)) = var("MIRROR_CONTROL_LINES") {
        config.mirror.control_lines = ControlLines::from_str(&val, true)
            .map_err(|_| ConfigError::env_parse(name, "Expected off, forward or both"))?;
    }

    // Logging overrides
    if let Some((_, val)) = var("LOGGING_LEVEL") {
        config.logging.level = val;
    }

    Ok(())
}

fn parse_number<T: FromStr>(name: &str, value: &str, message: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(name, format!("{}: '{}'", message, value)))
}
