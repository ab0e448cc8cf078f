//! Supported line speeds.
//!
//! The set of usable rates is a property of the host, so it is discovered once
//! at startup and passed around as a [`BaudTable`] instead of being baked into
//! every lookup.

use crate::config::ConfigError;
use nix::sys::termios::{cfsetispeed, cfsetospeed, BaudRate, Termios};
use tracing::trace;

/// Every rate worth asking the platform about, slowest first.
pub const CANDIDATE_RATES: &[u32] = &[
    50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600,
    115200, 230400, 460800, 500000, 576000, 921600, 1000000, 1152000, 1500000, 2000000, 2500000,
    3000000, 3500000, 4000000,
];

/// The POSIX rates every termios implementation provides.
pub const STANDARD_RATES: &[u32] = &[
    50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400,
];

/// Rates this host can apply to a terminal, with their termios symbols.
#[derive(Debug, Clone)]
pub struct BaudTable {
    entries: Vec<(u32, BaudRate)>,
}

impl BaudTable {
    /// Ask the platform which of the [`CANDIDATE_RATES`] it can apply.
    ///
    /// A rate is kept only when termios accepts its symbol as both input and
    /// output speed.
    pub fn detect() -> Self {
        // SAFETY: `libc::termios` is plain data and all-zero is a valid value.
        let mut scratch = Termios::from(unsafe { std::mem::zeroed::<libc::termios>() });
        let entries: Vec<_> = CANDIDATE_RATES
            .iter()
            .filter_map(|&rate| {
                let symbol = platform_symbol(rate)?;
                accepts(&mut scratch, symbol).then_some((rate, symbol))
            })
            .collect();
        trace!("Host supports {} baud rates", entries.len());
        Self { entries }
    }

    /// Look up the termios symbol for `rate`.
    pub fn symbol(&self, rate: u32) -> Result<BaudRate, ConfigError> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == rate)
            .map(|&(_, symbol)| symbol)
            .ok_or(ConfigError::UnsupportedBaudRate(rate))
    }

    pub fn contains(&self, rate: u32) -> bool {
        self.symbol(rate).is_ok()
    }

    /// Supported rates in ascending order.
    pub fn rates(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|&(rate, _)| rate)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn accepts(scratch: &mut Termios, symbol: BaudRate) -> bool {
    cfsetispeed(scratch, symbol).is_ok() && cfsetospeed(scratch, symbol).is_ok()
}

fn platform_symbol(rate: u32) -> Option<BaudRate> {
    let symbol = match rate {
        50 => BaudRate::B50,
        75 => BaudRate::B75,
        110 => BaudRate::B110,
        134 => BaudRate::B134,
        150 => BaudRate::B150,
        200 => BaudRate::B200,
        300 => BaudRate::B300,
        600 => BaudRate::B600,
        1200 => BaudRate::B1200,
        1800 => BaudRate::B1800,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        230400 => BaudRate::B230400,
        _ => return extended_symbol(rate),
    };
    Some(symbol)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn extended_symbol(rate: u32) -> Option<BaudRate> {
    let symbol = match rate {
        460800 => BaudRate::B460800,
        500000 => BaudRate::B500000,
        576000 => BaudRate::B576000,
        921600 => BaudRate::B921600,
        1000000 => BaudRate::B1000000,
        1152000 => BaudRate::B1152000,
        1500000 => BaudRate::B1500000,
        2000000 => BaudRate::B2000000,
        #[cfg(not(target_arch = "sparc64"))]
        2500000 => BaudRate::B2500000,
        #[cfg(not(target_arch = "sparc64"))]
        3000000 => BaudRate::B3000000,
        #[cfg(not(target_arch = "sparc64"))]
        3500000 => BaudRate::B3500000,
        #[cfg(not(target_arch = "sparc64"))]
        4000000 => BaudRate::B4000000,
        _ => return None,
    };
    Some(symbol)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn extended_symbol(_rate: u32) -> Option<BaudRate> {
    None
}
