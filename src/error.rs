use crate::config::ConfigError;
use crate::port::PortError;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

/// A specialized `Result` type for a mirror run.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Everything that can end a run early.
///
/// Would-block conditions never show up here: the engine absorbs them.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Invalid settings, detected before any port is touched.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A port could not be opened or configured.
    #[error(transparent)]
    Port(#[from] PortError),

    /// The readiness wait itself failed.
    #[error("Error polling: {0}")]
    Poll(#[source] nix::Error),

    #[error("Error reading from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error writing to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The device reported a hangup with nothing left to read.
    #[error("{} hung up", path.display())]
    Hangup { path: PathBuf },

    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Error listing serial ports: {0}")]
    Enumerate(#[from] serialport::Error),
}

impl MirrorError {
    pub fn read(path: &Path, source: io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn write(path: &Path, source: io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Process exit status for this failure.
    ///
    /// Settings errors use 2, like command-line usage errors; everything else
    /// uses 1.
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            _ => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}
