//! Mock serial endpoint for testing.
//!
//! `MockEndpoint` is backed by a Unix socket pair so that it has a real
//! descriptor the mirror engine can wait on. Bytes queued with
//! [`MockEndpoint::enqueue_read`] become readable through that descriptor;
//! bytes written by the engine are captured in a write log. Modem lines,
//! short writes, read failures and hangups can be simulated.

use super::modem::ModemLines;
use super::traits::SerialEndpoint;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Inner state of the mock endpoint, shared between clones.
#[derive(Debug, Default)]
struct MockEndpointState {
    /// Log of every accepted write, one entry per call.
    write_log: Vec<Vec<u8>>,
    /// Maximum bytes accepted by a single write call.
    write_limit: Option<usize>,
    /// Number of upcoming writes that report `WouldBlock`.
    blocked_writes: usize,
    /// Error returned by the next read instead of data.
    read_error: Option<io::ErrorKind>,
    /// Status lines reported to `modem_status`.
    modem_inputs: ModemLines,
    /// Output lines driven through `set_modem_lines`.
    modem_outputs: ModemLines,
    /// Whether modem ioctls fail as on a pseudo-terminal.
    modem_unsupported: bool,
    /// Number of drain calls.
    drains: usize,
}

/// Mock serial endpoint.
///
/// # Example
/// ```
/// use ttymirror::port::{MockEndpoint, SerialEndpoint};
///
/// let mut port = MockEndpoint::new("MOCK0");
/// port.enqueue_read(b"Hello");
///
/// let mut buffer = [0u8; 16];
/// let n = port.read_chunk(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"Hello");
///
/// port.write_chunk(b"Response").unwrap();
/// assert_eq!(port.written(), b"Response");
/// ```
#[derive(Clone)]
pub struct MockEndpoint {
    path: PathBuf,
    /// End the endpoint reads from.
    stream: Arc<UnixStream>,
    /// End the test feeds.
    feeder: Arc<UnixStream>,
    state: Arc<Mutex<MockEndpointState>>,
}

impl MockEndpoint {
    /// Create a new mock endpoint with the given name.
    ///
    /// # Panics
    /// If the socket pair cannot be created.
    pub fn new(name: impl Into<PathBuf>) -> Self {
        let (stream, feeder) = UnixStream::pair().unwrap_or_else(|e| panic!("socketpair: {e}"));
        stream
            .set_nonblocking(true)
            .unwrap_or_else(|e| panic!("set_nonblocking: {e}"));

        Self {
            path: name.into(),
            stream: Arc::new(stream),
            feeder: Arc::new(feeder),
            state: Arc::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockEndpointState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `data` readable on the endpoint.
    ///
    /// # Panics
    /// If the socket buffer is full.
    pub fn enqueue_read(&self, data: &[u8]) {
        (&*self.feeder)
            .write_all(data)
            .unwrap_or_else(|e| panic!("feeding mock endpoint: {e}"));
    }

    /// Every byte written so far, concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.state().write_log.concat()
    }

    /// Each write call's payload, in order.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state().write_log.clone()
    }

    /// Simulate the device going away: queued bytes stay readable, after
    /// which reads return end-of-file and the descriptor reports a hangup.
    pub fn hang_up(&self) {
        let _ = self.feeder.shutdown(Shutdown::Both);
    }

    /// Accept at most `limit` bytes per write call.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.state().write_limit = limit;
    }

    /// Report `WouldBlock` for the next `count` writes.
    pub fn block_writes(&self, count: usize) {
        self.state().blocked_writes = count;
    }

    /// Fail the next read with `kind`.
    pub fn fail_next_read(&self, kind: io::ErrorKind) {
        self.state().read_error = Some(kind);
    }

    pub fn set_modem_inputs(&self, lines: ModemLines) {
        self.state().modem_inputs = lines;
    }

    pub fn modem_outputs(&self) -> ModemLines {
        self.state().modem_outputs
    }

    /// Make modem ioctls fail with `ENOTTY`.
    pub fn set_modem_unsupported(&self, unsupported: bool) {
        self.state().modem_unsupported = unsupported;
    }

    pub fn drain_count(&self) -> usize {
        self.state().drains
    }
}

impl SerialEndpoint for MockEndpoint {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(kind) = self.state().read_error.take() {
            return Err(io::Error::new(kind, "simulated read failure"));
        }
        (&*self.stream).read(buf)
    }

    fn write_chunk(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.blocked_writes > 0 {
            state.blocked_writes -= 1;
            return Err(io::ErrorKind::WouldBlock.into());
        }

        let accepted = state.write_limit.map_or(data.len(), |limit| limit.min(data.len()));
        state.write_log.push(data[..accepted].to_vec());
        Ok(accepted)
    }

    fn drain(&mut self) -> io::Result<()> {
        self.state().drains += 1;
        Ok(())
    }

    fn modem_status(&mut self) -> io::Result<ModemLines> {
        let state = self.state();
        if state.modem_unsupported {
            return Err(io::Error::from_raw_os_error(libc::ENOTTY));
        }
        Ok(state.modem_inputs | state.modem_outputs)
    }

    fn set_modem_lines(&mut self, assert: ModemLines, deassert: ModemLines) -> io::Result<()> {
        let mut state = self.state();
        if state.modem_unsupported {
            return Err(io::Error::from_raw_os_error(libc::ENOTTY));
        }
        state.modem_outputs = (state.modem_outputs | assert) & !deassert;
        Ok(())
    }
}

impl AsFd for MockEndpoint {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

impl std::fmt::Debug for MockEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEndpoint")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_and_read() {
        let mut port = MockEndpoint::new("MOCK0");
        port.enqueue_read(b"Hello");

        let mut buffer = [0u8; 10];
        let n = port.read_chunk(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"Hello");
    }

    #[test]
    fn test_empty_read_would_block() {
        let mut port = MockEndpoint::new("MOCK0");
        let mut buffer = [0u8; 10];
        let err = port.read_chunk(&mut buffer).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_hang_up_drains_then_reports_eof() {
        let mut port = MockEndpoint::new("MOCK0");
        port.enqueue_read(b"tail");
        port.hang_up();

        let mut buffer = [0u8; 10];
        assert_eq!(port.read_chunk(&mut buffer).unwrap(), 4);
        assert_eq!(port.read_chunk(&mut buffer).unwrap(), 0);
    }

    #[test]
    fn test_write_logging() {
        let mut port = MockEndpoint::new("MOCK0");
        port.write_chunk(b"Test1").unwrap();
        port.write_chunk(b"Test2").unwrap();

        let log = port.get_write_log();
        assert_eq!(log, vec![b"Test1".to_vec(), b"Test2".to_vec()]);
        assert_eq!(port.written(), b"Test1Test2");
    }

    #[test]
    fn test_write_limit() {
        let mut port = MockEndpoint::new("MOCK0");
        port.set_write_limit(Some(3));
        assert_eq!(port.write_chunk(b"abcdef").unwrap(), 3);
        assert_eq!(port.written(), b"abc");
    }

    #[test]
    fn test_blocked_write() {
        let mut port = MockEndpoint::new("MOCK0");
        port.block_writes(1);
        let err = port.write_chunk(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert_eq!(port.write_chunk(b"x").unwrap(), 1);
    }

    #[test]
    fn test_injected_read_error() {
        let mut port = MockEndpoint::new("MOCK0");
        port.enqueue_read(b"data");
        port.fail_next_read(io::ErrorKind::BrokenPipe);

        let mut buffer = [0u8; 10];
        let err = port.read_chunk(&mut buffer).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(port.read_chunk(&mut buffer).unwrap(), 4);
    }

    #[test]
    fn test_modem_lines() {
        let mut port = MockEndpoint::new("MOCK0");
        port.set_modem_inputs(ModemLines::CTS);
        port.set_modem_lines(ModemLines::RTS | ModemLines::DTR, ModemLines::EMPTY)
            .unwrap();
        port.set_modem_lines(ModemLines::EMPTY, ModemLines::DTR).unwrap();

        assert_eq!(port.modem_outputs(), ModemLines::RTS);
        assert_eq!(
            port.modem_status().unwrap(),
            ModemLines::CTS | ModemLines::RTS
        );
    }

    #[test]
    fn test_modem_unsupported() {
        let mut port = MockEndpoint::new("MOCK0");
        port.set_modem_unsupported(true);
        let err = port.modem_status().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTTY));
    }

    #[test]
    fn test_clones_share_state() {
        let port = MockEndpoint::new("MOCK0");
        let mut engine_side = port.clone();
        engine_side.write_chunk(b"shared").unwrap();
        assert_eq!(port.written(), b"shared");
    }
}
