//! The mirror engine: a single-threaded loop that waits for either port to
//! become readable and copies what arrived to the other one.

use super::control::{ControlLines, ControlMirror};
use crate::error::MirrorError;
use crate::lifecycle::ShutdownSignal;
use crate::port::{PortError, SerialEndpoint};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Default bounded wait per cycle.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Default transfer chunk.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Tunables for one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Upper bound on each readiness wait.
    pub poll_interval: Duration,
    /// Size of the transfer buffer; at most this many bytes move per read.
    pub buffer_size: usize,
    pub control_lines: ControlLines,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            buffer_size: DEFAULT_BUFFER_SIZE,
            control_lines: ControlLines::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Running,
    Terminating,
}

/// Bytes moved during one wakeup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub source_to_mirror: usize,
    pub mirror_to_source: usize,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        self.source_to_mirror == 0 && self.mirror_to_source == 0
    }
}

/// Running totals for a mirror session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub source_to_mirror: u64,
    pub mirror_to_source: u64,
    pub cycles: u64,
}

impl TransferStats {
    fn record(&mut self, report: CycleReport) {
        self.cycles += 1;
        self.source_to_mirror += report.source_to_mirror as u64;
        self.mirror_to_source += report.mirror_to_source as u64;
    }
}

/// Readiness of one descriptor after a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Idle,
    Readable,
    /// The peer went away; whatever is still buffered can be read once.
    HungUp,
}

impl Readiness {
    fn of(fd: &PollFd<'_>) -> Result<Self, MirrorError> {
        let revents = fd.revents().unwrap_or(PollFlags::empty());
        if revents.contains(PollFlags::POLLNVAL) {
            return Err(MirrorError::Poll(Errno::EBADF));
        }
        // A hung-up tty also reports POLLIN; its reads then return nothing.
        if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR) {
            Ok(Self::HungUp)
        } else if revents.contains(PollFlags::POLLIN) {
            Ok(Self::Readable)
        } else {
            Ok(Self::Idle)
        }
    }
}

/// Bidirectional byte pump between two endpoints.
pub struct MirrorEngine<S, M> {
    source: S,
    mirror: M,
    buffer: Box<[u8]>,
    poll_timeout: PollTimeout,
    control: ControlMirror,
    shutdown: ShutdownSignal,
    state: EngineState,
    stats: TransferStats,
}

impl<S, M> MirrorEngine<S, M>
where
    S: SerialEndpoint,
    M: SerialEndpoint,
{
    /// Take ownership of both endpoints.
    ///
    /// Fails with [`PortError::NotConfigured`] if either endpoint has not had
    /// its line settings applied.
    pub fn new(
        mut source: S,
        mut mirror: M,
        options: EngineOptions,
        shutdown: ShutdownSignal,
    ) -> Result<Self, PortError> {
        source.activate()?;
        mirror.activate()?;

        let millis = u16::try_from(options.poll_interval.as_millis()).unwrap_or(u16::MAX);
        Ok(Self {
            source,
            mirror,
            buffer: vec![0u8; options.buffer_size.max(1)].into_boxed_slice(),
            poll_timeout: PollTimeout::from(millis),
            control: ControlMirror::new(options.control_lines),
            shutdown,
            state: EngineState::Running,
            stats: TransferStats::default(),
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Loop until shutdown is requested or a fatal error occurs.
    pub fn run(&mut self) -> Result<TransferStats, MirrorError> {
        info!(
            "Mirroring {} <-> {}",
            self.source.path().display(),
            self.mirror.path().display()
        );

        while self.state == EngineState::Running {
            if self.shutdown.is_requested() {
                debug!("Shutdown requested, leaving mirror loop");
                self.state = EngineState::Terminating;
                break;
            }
            self.run_once()?;
        }

        info!(
            "Mirrored {} bytes {} -> {} and {} bytes back",
            self.stats.source_to_mirror,
            self.source.path().display(),
            self.mirror.path().display(),
            self.stats.mirror_to_source
        );
        Ok(self.stats)
    }

    /// One wakeup: wait, service each readable side, then the control lines.
    pub fn run_once(&mut self) -> Result<CycleReport, MirrorError> {
        let (source_ready, mirror_ready) = self.wait()?;
        let mut report = CycleReport::default();

        if source_ready != Readiness::Idle {
            report.source_to_mirror = self.pump(Direction::SourceToMirror, source_ready)?;
        }
        if mirror_ready != Readiness::Idle {
            report.mirror_to_source = self.pump(Direction::MirrorToSource, mirror_ready)?;
        }

        if self.control.is_active() {
            self.control.tick(&mut self.source, &mut self.mirror);
        }

        self.stats.record(report);
        Ok(report)
    }

    /// Hand the endpoints back, e.g. for an orderly close.
    pub fn into_endpoints(self) -> (S, M) {
        (self.source, self.mirror)
    }

    fn wait(&self) -> Result<(Readiness, Readiness), MirrorError> {
        let mut fds = [
            PollFd::new(self.source.as_fd(), PollFlags::POLLIN),
            PollFd::new(self.mirror.as_fd(), PollFlags::POLLIN),
        ];

        match poll(&mut fds, self.poll_timeout) {
            Ok(0) | Err(Errno::EINTR) => Ok((Readiness::Idle, Readiness::Idle)),
            Ok(_) => Ok((Readiness::of(&fds[0])?, Readiness::of(&fds[1])?)),
            Err(e) => Err(MirrorError::Poll(e)),
        }
    }

    fn pump(&mut self, direction: Direction, readiness: Readiness) -> Result<usize, MirrorError> {
        let moved = match direction {
            Direction::SourceToMirror => transfer(
                &mut self.source,
                &mut self.mirror,
                &mut self.buffer,
                &self.shutdown,
                self.poll_timeout,
            )?,
            Direction::MirrorToSource => transfer(
                &mut self.mirror,
                &mut self.source,
                &mut self.buffer,
                &self.shutdown,
                self.poll_timeout,
            )?,
        };

        if moved == 0 && readiness == Readiness::HungUp {
            let path = match direction {
                Direction::SourceToMirror => self.source.path(),
                Direction::MirrorToSource => self.mirror.path(),
            };
            return Err(MirrorError::Hangup {
                path: path.to_path_buf(),
            });
        }
        Ok(moved)
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    SourceToMirror,
    MirrorToSource,
}

/// Move at most one buffer's worth from `src` to `dst`.
///
/// Returns the number of bytes moved. A read that yields nothing, or would
/// block, moves nothing and is not an error.
pub fn transfer<S, D>(
    src: &mut S,
    dst: &mut D,
    buffer: &mut [u8],
    shutdown: &ShutdownSignal,
    poll_timeout: PollTimeout,
) -> Result<usize, MirrorError>
where
    S: SerialEndpoint + ?Sized,
    D: SerialEndpoint + ?Sized,
{
    let count = match src.read_chunk(buffer) {
        Ok(count) => count,
        Err(e) if is_transient(&e) => return Ok(0),
        Err(e) => return Err(MirrorError::read(src.path(), e)),
    };
    if count == 0 {
        return Ok(0);
    }

    let written = write_all(dst, &buffer[..count], shutdown, poll_timeout)?;
    dst.drain().map_err(|e| MirrorError::write(dst.path(), e))?;
    trace!(
        "{} -> {}: {} bytes",
        src.path().display(),
        dst.path().display(),
        written
    );
    Ok(written)
}

/// Write all of `data`, resubmitting the remainder after short writes.
///
/// Stops early only if shutdown is requested while the destination cannot
/// accept more; the bytes left over are reported and dropped.
fn write_all<D>(
    dst: &mut D,
    mut data: &[u8],
    shutdown: &ShutdownSignal,
    poll_timeout: PollTimeout,
) -> Result<usize, MirrorError>
where
    D: SerialEndpoint + ?Sized,
{
    let total = data.len();
    while !data.is_empty() {
        match dst.write_chunk(data) {
            Ok(0) => {
                return Err(MirrorError::write(
                    dst.path(),
                    io::ErrorKind::WriteZero.into(),
                ))
            }
            Ok(n) => data = &data[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                if shutdown.is_requested() {
                    warn!(
                        "Dropping {} unsent bytes for {} at shutdown",
                        data.len(),
                        dst.path().display()
                    );
                    return Ok(total - data.len());
                }
                dst.drain().map_err(|e| MirrorError::write(dst.path(), e))?;
                wait_writable(dst, poll_timeout)?;
            }
            Err(e) => return Err(MirrorError::write(dst.path(), e)),
        }
    }
    Ok(total)
}

fn wait_writable<D>(dst: &D, poll_timeout: PollTimeout) -> Result<(), MirrorError>
where
    D: SerialEndpoint + ?Sized,
{
    let mut fds = [PollFd::new(dst.as_fd(), PollFlags::POLLOUT)];
    match poll(&mut fds, poll_timeout) {
        Ok(_) | Err(Errno::EINTR) => Ok(()),
        Err(e) => Err(MirrorError::Poll(e)),
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{MockEndpoint, ModemLines};
    use pretty_assertions::assert_eq;

    type MockEngine = MirrorEngine<MockEndpoint, MockEndpoint>;

    fn engine(options: EngineOptions) -> (MockEngine, MockEndpoint, MockEndpoint) {
        let source = MockEndpoint::new("SRC");
        let mirror = MockEndpoint::new("MIR");
        let engine = MirrorEngine::new(
            source.clone(),
            mirror.clone(),
            options,
            ShutdownSignal::new(),
        )
        .unwrap();
        (engine, source, mirror)
    }

    #[test]
    fn test_source_to_mirror() {
        let (mut engine, source, mirror) = engine(EngineOptions::default());
        source.enqueue_read(b"PING");

        let report = engine.run_once().unwrap();
        assert_eq!(report.source_to_mirror, 4);
        assert_eq!(report.mirror_to_source, 0);
        assert_eq!(mirror.written(), b"PING");
        assert_eq!(mirror.drain_count(), 1);
        assert!(source.written().is_empty());
    }

    #[test]
    fn test_both_directions_in_one_cycle() {
        let (mut engine, source, mirror) = engine(EngineOptions::default());
        source.enqueue_read(b"from-source");
        mirror.enqueue_read(b"from-mirror");

        let report = engine.run_once().unwrap();
        assert_eq!(report.source_to_mirror, 11);
        assert_eq!(report.mirror_to_source, 11);
        assert_eq!(mirror.written(), b"from-source");
        assert_eq!(source.written(), b"from-mirror");
    }

    #[test]
    fn test_idle_cycle_does_nothing() {
        let (mut engine, source, mirror) = engine(EngineOptions {
            poll_interval: Duration::from_millis(1),
            ..EngineOptions::default()
        });

        let report = engine.run_once().unwrap();
        assert!(report.is_idle());
        assert!(source.get_write_log().is_empty());
        assert!(mirror.get_write_log().is_empty());
        assert_eq!(engine.stats().cycles, 1);
    }

    #[test]
    fn test_payload_larger_than_buffer_spans_cycles() {
        let (mut engine, source, mirror) = engine(EngineOptions {
            buffer_size: 8,
            ..EngineOptions::default()
        });
        let payload: Vec<u8> = (0..=255u8).cycle().take(100).collect();
        source.enqueue_read(&payload);

        let mut cycles = 0;
        while mirror.written().len() < payload.len() {
            let report = engine.run_once().unwrap();
            assert!(report.source_to_mirror <= 8);
            cycles += 1;
            assert!(cycles < 100, "payload never completed");
        }
        assert_eq!(mirror.written(), payload);
        assert!(mirror.get_write_log().iter().all(|chunk| chunk.len() <= 8));
        assert_eq!(engine.stats().source_to_mirror, 100);
    }

    #[test]
    fn test_would_block_read_is_absorbed() {
        let (mut engine, source, mirror) = engine(EngineOptions::default());
        source.enqueue_read(b"x");
        source.fail_next_read(io::ErrorKind::WouldBlock);

        let report = engine.run_once().unwrap();
        assert!(report.is_idle());
        assert_eq!(engine.stats().source_to_mirror, 0);
        assert!(mirror.written().is_empty());

        engine.run_once().unwrap();
        assert_eq!(mirror.written(), b"x");
    }

    #[test]
    fn test_read_failure_is_fatal() {
        let (mut engine, source, _mirror) = engine(EngineOptions::default());
        source.enqueue_read(b"x");
        source.fail_next_read(io::ErrorKind::BrokenPipe);

        let err = engine.run_once().unwrap_err();
        match err {
            MirrorError::Read { path, source } => {
                assert_eq!(path, std::path::Path::new("SRC"));
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("Expected Read error, got: {:?}", other),
        }
    }

    #[test]
    fn test_hangup_after_last_bytes_is_fatal() {
        let (mut engine, source, mirror) = engine(EngineOptions {
            poll_interval: Duration::from_millis(1000),
            ..EngineOptions::default()
        });
        source.enqueue_read(b"BYE");
        source.hang_up();

        let report = engine.run_once().unwrap();
        assert_eq!(report.source_to_mirror, 3);
        assert_eq!(mirror.written(), b"BYE");

        let err = engine.run_once().unwrap_err();
        match err {
            MirrorError::Hangup { path } => assert_eq!(path, std::path::Path::new("SRC")),
            other => panic!("Expected Hangup, got: {:?}", other),
        }
    }

    #[test]
    fn test_mirror_hangup_ends_run() {
        let (mut engine, _source, mirror) = engine(EngineOptions::default());
        mirror.hang_up();

        let err = engine.run().unwrap_err();
        assert!(matches!(err, MirrorError::Hangup { ref path } if path.as_os_str() == "MIR"));
        assert_eq!(engine.stats().cycles, 0);
    }

    #[test]
    fn test_short_writes_are_resubmitted() {
        let (mut engine, source, mirror) = engine(EngineOptions::default());
        mirror.set_write_limit(Some(3));
        source.enqueue_read(b"abcdefgh");

        let report = engine.run_once().unwrap();
        assert_eq!(report.source_to_mirror, 8);
        assert_eq!(mirror.written(), b"abcdefgh");
        assert_eq!(mirror.get_write_log().len(), 3);
    }

    #[test]
    fn test_blocked_write_drains_and_retries() {
        let (mut engine, source, mirror) = engine(EngineOptions::default());
        mirror.block_writes(2);
        source.enqueue_read(b"data");

        engine.run_once().unwrap();
        assert_eq!(mirror.written(), b"data");
        assert_eq!(mirror.drain_count(), 3);
    }

    #[test]
    fn test_zero_length_write_is_fatal() {
        let (mut engine, source, mirror) = engine(EngineOptions::default());
        mirror.set_write_limit(Some(0));
        source.enqueue_read(b"data");

        let err = engine.run_once().unwrap_err();
        assert!(matches!(err, MirrorError::Write { .. }));
    }

    #[test]
    fn test_shutdown_stops_run() {
        let (mut engine, source, mirror) = engine(EngineOptions::default());
        source.enqueue_read(b"never moved");
        engine.shutdown.request();

        let stats = engine.run().unwrap();
        assert_eq!(engine.state(), EngineState::Terminating);
        assert_eq!(stats.cycles, 0);
        assert!(mirror.written().is_empty());
    }

    #[test]
    fn test_run_exits_after_flag_set_mid_loop() {
        let source = MockEndpoint::new("SRC");
        let mirror = MockEndpoint::new("MIR");
        let shutdown = ShutdownSignal::new();
        let mut engine = MirrorEngine::new(
            source.clone(),
            mirror.clone(),
            EngineOptions {
                poll_interval: Duration::from_millis(5),
                ..EngineOptions::default()
            },
            shutdown.clone(),
        )
        .unwrap();
        source.enqueue_read(b"hello");

        let flag = shutdown.clone();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            flag.request();
        });

        let stats = engine.run().unwrap();
        stopper.join().unwrap();
        assert_eq!(stats.source_to_mirror, 5);
        assert_eq!(mirror.written(), b"hello");
    }

    #[test]
    fn test_control_lines_follow_data_cadence() {
        let (mut engine, source, mirror) = engine(EngineOptions {
            poll_interval: Duration::from_millis(1),
            control_lines: ControlLines::Forward,
            ..EngineOptions::default()
        });
        source.set_modem_inputs(ModemLines::CTS | ModemLines::DSR);

        engine.run_once().unwrap();
        assert_eq!(mirror.modem_outputs(), ModemLines::RTS | ModemLines::DTR);

        source.set_modem_inputs(ModemLines::EMPTY);
        engine.run_once().unwrap();
        assert_eq!(mirror.modem_outputs(), ModemLines::EMPTY);
    }

    #[test]
    fn test_into_endpoints() {
        let (engine, _source, _mirror) = engine(EngineOptions {
            buffer_size: 16,
            ..EngineOptions::default()
        });
        assert_eq!(engine.buffer_capacity(), 16);
        let (source, mirror) = engine.into_endpoints();
        assert_eq!(source.path(), std::path::Path::new("SRC"));
        assert_eq!(mirror.path(), std::path::Path::new("MIR"));
    }
}
