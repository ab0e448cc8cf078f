//! ttymirror library
//!
//! Mirrors two serial ports into each other: every byte read from one is
//! written to the other, until a termination signal arrives. Both ports get
//! their original terminal attributes back on the way out.
//!
//! # Modules
//!
//! - `config`: TOML configuration with environment overrides
//! - `port`: Port handles, line configuration and modem lines
//! - `mirror`: The data pump and the handshake-line follower
//! - `lifecycle`: Signal handling and orderly open/close of the port pair
//! - `cli`: Command-line arguments
//! - `logging`: `tracing` subscriber setup
//! - `error`: Run-level error handling

pub mod cli;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod mirror;
pub mod port;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use error::{MirrorError, MirrorResult};
pub use lifecycle::{PortPair, RunSettings, ShutdownSignal};
pub use mirror::{ControlLines, EngineOptions, MirrorEngine, TransferStats};
pub use port::{
    BaudTable, DataBits, LineSettings, MockEndpoint, Parity, PortError, PortHandle,
    SerialEndpoint, StopBits,
};
