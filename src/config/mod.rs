//! Configuration module for ttymirror.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the first of these that applies:
//!
//! 1. `--config <path>` on the command line
//! 2. `TTYMIRROR_CONFIG` environment variable (explicit path)
//! 3. `./ttymirror.toml` (current directory)
//! 4. `ttymirror/config.toml` in the platform config directory
//!    (`~/.config` on Linux, `~/Library/Application Support` on macOS)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is `TTYMIRROR_<SECTION>_<KEY>`:
//! - `TTYMIRROR_LINE_BAUD_RATE=115200`
//! - `TTYMIRROR_LINE_PARITY=even`
//! - `TTYMIRROR_MIRROR_CONTROL_LINES=both`
//!
//! Command-line flags win over the environment, which wins over the file.
//! Nothing here is checked until [`LineConfig::validate`] and
//! [`MirrorConfig::validate`] run on the merged result.
//!
//! # Example
//!
//! ```rust,no_run
//! use ttymirror::config::ConfigLoader;
//! use ttymirror::port::BaudTable;
//!
//! let config = ConfigLoader::load(None)?.into_config();
//! let line = config.line.validate(&BaudTable::detect())?;
//! println!("Line settings: {}", line);
//! # Ok::<(), ttymirror::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    apply_env_overrides, get_default_config_path, load_from_file, resolve_config_path,
    ConfigLoader,
};
pub use schema::{
    Config, LineConfig, LogFormat, LoggingConfig, MirrorConfig, BUFFER_SIZE_RANGE,
    POLL_INTERVAL_RANGE_MS,
};
