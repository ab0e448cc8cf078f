//! Startup and shutdown: signal handling, opening the port pair, and putting
//! both ports back the way they were found.
//!
//! The signal handler never touches the ports. It only raises a
//! [`ShutdownSignal`]; the mirror loop notices the flag within one poll
//! interval, returns, and the ports are closed from the main thread.

use crate::error::MirrorResult;
use crate::mirror::{EngineOptions, MirrorEngine, TransferStats};
use crate::port::{BaudTable, LineSettings, PortError, PortHandle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cross-thread "please stop" flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Route SIGINT, SIGTERM and SIGHUP to `signal`.
///
/// Can only be called once per process.
pub fn install_handler(signal: &ShutdownSignal) -> Result<(), ctrlc::Error> {
    let signal = signal.clone();
    ctrlc::set_handler(move || signal.request())?;
    debug!("Termination signal handler installed");
    Ok(())
}

/// Validated settings for one run: two paths, two line configurations and
/// the engine tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub source: PathBuf,
    pub mirror: PathBuf,
    pub source_line: LineSettings,
    pub mirror_line: LineSettings,
    pub engine: EngineOptions,
}

/// The two configured ports of a run.
#[derive(Debug)]
pub struct PortPair {
    pub source: PortHandle,
    pub mirror: PortHandle,
}

impl PortPair {
    /// Open and configure the source, then the mirror.
    ///
    /// If the mirror fails, the source is restored before the error is
    /// returned.
    pub fn open(settings: &RunSettings, table: &BaudTable) -> Result<Self, PortError> {
        let source = open_configured(&settings.source, &settings.source_line, table)?;

        match open_configured(&settings.mirror, &settings.mirror_line, table) {
            Ok(mirror) => Ok(Self { source, mirror }),
            Err(e) => {
                if let Err(restore_err) = source.close() {
                    warn!("{}", restore_err);
                }
                Err(e)
            }
        }
    }

    /// Restore and close both ports.
    ///
    /// Both ports are always attempted; the first failure is returned.
    pub fn close(self) -> Result<(), PortError> {
        let source = self.source.close();
        let mirror = self.mirror.close();
        for err in [&source, &mirror].into_iter().filter_map(|r| r.as_ref().err()) {
            warn!("{}", err);
        }
        source.and(mirror)
    }
}

fn open_configured(
    path: &Path,
    line: &LineSettings,
    table: &BaudTable,
) -> Result<PortHandle, PortError> {
    let mut port = PortHandle::open(path)?;
    port.configure(line, table)?;
    Ok(port)
}

/// Open both ports, mirror until `shutdown` is raised, then close them.
pub fn run(
    settings: &RunSettings,
    table: &BaudTable,
    shutdown: &ShutdownSignal,
) -> MirrorResult<TransferStats> {
    let pair = PortPair::open(settings, table)?;
    info!(
        "Opened {} ({}) and {} ({})",
        settings.source.display(),
        settings.source_line,
        settings.mirror.display(),
        settings.mirror_line
    );

    let mut engine =
        MirrorEngine::new(pair.source, pair.mirror, settings.engine, shutdown.clone())?;
    let outcome = engine.run();

    let (source, mirror) = engine.into_endpoints();
    let pair = PortPair { source, mirror };
    // Restoration problems are logged by `close`; they never mask the run result.
    if pair.close().is_ok() {
        info!("Ports restored");
    }

    outcome
}
