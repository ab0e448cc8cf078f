//! Serial endpoints: opening, line configuration, modem lines.
//!
//! [`PortHandle`] is the real device; [`MockEndpoint`] stands in for it in
//! tests. Both implement [`SerialEndpoint`], which is all the mirror engine
//! needs.

pub mod baud;
pub mod error;
pub mod handle;
pub mod line;
pub mod mock;
pub mod modem;
pub mod traits;

pub use baud::BaudTable;
pub use error::PortError;
pub use handle::{PortHandle, PortState};
pub use mock::MockEndpoint;
pub use modem::ModemLines;
pub use traits::*;
