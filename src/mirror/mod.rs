//! Mirroring: the data pump and the optional handshake-line follower.
//!
//! ```text
//! source ──read──> [buffer] ──write+drain──> mirror
//! source <──write+drain── [buffer] <──read── mirror
//! source CTS/DSR/CD ──────────────> mirror RTS/DTR   (control lines)
//! ```

pub mod control;
pub mod engine;

pub use control::{derive_outputs, ControlLines, ControlMirror, LineUpdate};
pub use engine::{
    transfer, CycleReport, EngineOptions, EngineState, MirrorEngine, TransferStats,
    DEFAULT_BUFFER_SIZE, DEFAULT_POLL_INTERVAL,
};
