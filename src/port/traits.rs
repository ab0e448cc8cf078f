//! Core types and traits for serial endpoints.
//!
//! Defines the line settings applied to each port and the `SerialEndpoint`
//! trait that lets the mirror engine drive both real ports and test doubles.

use super::error::PortError;
use super::modem::ModemLines;
use crate::config::ConfigError;
use std::fmt;
use std::io;
use std::os::fd::AsFd;
use std::path::Path;
use std::str::FromStr;

/// Line parameters for one port.
///
/// Values of this type are only built through validation, so every field is
/// already in range by the time a port sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Parity checking mode.
    pub parity: Parity,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
        }
    }
}

impl fmt::Display for LineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.baud_rate,
            u8::from(self.data_bits),
            self.parity.letter(),
            u8::from(self.stop_bits)
        )
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = ConfigError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(Self::Five),
            6 => Ok(Self::Six),
            7 => Ok(Self::Seven),
            8 => Ok(Self::Eight),
            other => Err(ConfigError::InvalidDataBits(other)),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl Parity {
    fn letter(self) -> char {
        match self {
            Self::None => 'N',
            Self::Even => 'E',
            Self::Odd => 'O',
        }
    }
}

impl FromStr for Parity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "none" => Ok(Self::None),
            "e" | "even" => Ok(Self::Even),
            "o" | "odd" => Ok(Self::Odd),
            _ => Err(ConfigError::InvalidParity(s.to_string())),
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = ConfigError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(ConfigError::InvalidStopBits(other)),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

/// A serial endpoint the mirror engine can move bytes through.
///
/// Reads and writes must never block: when no data (or no buffer space) is
/// available they return `io::ErrorKind::WouldBlock` or `Ok(0)`.
pub trait SerialEndpoint: AsFd + fmt::Debug {
    /// The filesystem path the endpoint was opened from.
    fn path(&self) -> &Path;

    /// Mark the endpoint as taking part in the mirror loop.
    ///
    /// Fails if the endpoint is not ready to carry traffic.
    fn activate(&mut self) -> Result<(), PortError> {
        Ok(())
    }

    /// Read whatever is currently available into `buf`.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write as much of `data` as the OS accepts right now.
    fn write_chunk(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Block until every byte written so far has left the transmitter.
    fn drain(&mut self) -> io::Result<()>;

    /// Current modem status register.
    fn modem_status(&mut self) -> io::Result<ModemLines>;

    /// Assert the lines in `assert` and deassert the lines in `deassert`,
    /// leaving every other line untouched.
    fn set_modem_lines(&mut self, assert: ModemLines, deassert: ModemLines) -> io::Result<()>;
}
