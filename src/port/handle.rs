//! Port handle: one open serial device and the attributes it started with.

use super::baud::BaudTable;
use super::error::PortError;
use super::line;
use super::modem::{self, ModemLines};
use super::traits::{LineSettings, SerialEndpoint};
use nix::sys::termios::{tcdrain, tcgetattr, tcsetattr, SetArg, Termios};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where a handle is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    /// Descriptor open, original attributes captured, nothing applied yet.
    Open,
    /// Line settings applied; the handle may join the mirror loop.
    Configured,
    /// Owned by a running mirror loop.
    Active,
}

/// An open serial endpoint.
///
/// Dropping the handle restores the attributes captured at open time and
/// closes the descriptor. Use [`PortHandle::close`] to see restoration errors.
pub struct PortHandle {
    file: File,
    path: PathBuf,
    original: Termios,
    current: Termios,
    state: PortState,
    restored: bool,
}

impl PortHandle {
    /// Open `path` read/write, without becoming its controlling terminal, in
    /// non-blocking mode.
    ///
    /// # Example
    /// ```no_run
    /// use ttymirror::port::{BaudTable, LineSettings, PortHandle};
    ///
    /// let mut port = PortHandle::open("/dev/ttyUSB0")?;
    /// port.configure(&LineSettings::default(), &BaudTable::detect())?;
    /// # Ok::<(), ttymirror::port::PortError>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PortError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| PortError::open(path, e))?;

        let original = tcgetattr(&file).map_err(|e| PortError::open(path, e))?;
        debug!("Opened {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
            current: original.clone(),
            original,
            state: PortState::Open,
            restored: false,
        })
    }

    /// Apply line settings to the live descriptor.
    pub fn configure(
        &mut self,
        settings: &LineSettings,
        table: &BaudTable,
    ) -> Result<(), PortError> {
        self.current = line::configure(&self.file, &self.path, &self.original, settings, table)?;
        self.state = PortState::Configured;
        debug!("Configured {} as {}", self.path.display(), settings);
        Ok(())
    }

    pub fn state(&self) -> PortState {
        self.state
    }

    /// Attributes captured when the port was opened.
    pub fn original_attributes(&self) -> &Termios {
        &self.original
    }

    /// Attributes currently applied.
    pub fn current_attributes(&self) -> &Termios {
        &self.current
    }

    /// Restore the original attributes and release the descriptor.
    pub fn close(mut self) -> Result<(), PortError> {
        self.restore()
    }

    fn restore(&mut self) -> Result<(), PortError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        debug!("Restoring {}", self.path.display());
        tcsetattr(&self.file, SetArg::TCSANOW, &self.original)
            .map_err(|e| PortError::restore(&self.path, e))
    }
}

impl SerialEndpoint for PortHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn activate(&mut self) -> Result<(), PortError> {
        if self.state == PortState::Open {
            return Err(PortError::NotConfigured {
                path: self.path.clone(),
            });
        }
        self.state = PortState::Active;
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write_chunk(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn drain(&mut self) -> io::Result<()> {
        loop {
            match tcdrain(&self.file) {
                Ok(()) => return Ok(()),
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn modem_status(&mut self) -> io::Result<ModemLines> {
        modem::get(&self.file)
    }

    fn set_modem_lines(&mut self, assert: ModemLines, deassert: ModemLines) -> io::Result<()> {
        modem::set(&self.file, assert, deassert)
    }
}

impl AsFd for PortHandle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl Drop for PortHandle {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!("{}", e);
        }
    }
}

impl std::fmt::Debug for PortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortHandle")
            .field("path", &self.path)
            .field("state", &self.state)
            .finish()
    }
}
