//! Port-specific error types.
//!
//! Kept separate from the run-level `MirrorError` so that the port layer can be
//! used (and tested) on its own.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while opening, configuring or releasing a port.
#[derive(Debug, Error)]
pub enum PortError {
    /// The device could not be opened (missing, busy, permission denied).
    #[error("Error opening {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Terminal attributes could not be read or applied.
    #[error("Error configuring {}: {source}", path.display())]
    Configure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The requested line speed is not available on this host.
    #[error("Unsupported baud rate {0}")]
    UnsupportedBaudRate(u32),

    /// The port was handed to the mirror loop before line settings were applied.
    #[error("{} is not configured", path.display())]
    NotConfigured { path: PathBuf },

    /// The original terminal attributes could not be put back.
    #[error("Error restoring {}: {source}", path.display())]
    Restore {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PortError {
    pub fn open(path: &Path, source: impl Into<io::Error>) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    pub fn configure(path: &Path, source: impl Into<io::Error>) -> Self {
        Self::Configure {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    pub fn restore(path: &Path, source: impl Into<io::Error>) -> Self {
        Self::Restore {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    /// Path of the device the error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Open { path, .. }
            | Self::Configure { path, .. }
            | Self::Restore { path, .. }
            | Self::NotConfigured { path } => Some(path),
            Self::UnsupportedBaudRate(_) => None,
        }
    }
}
