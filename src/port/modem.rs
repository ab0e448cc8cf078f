//! Modem control and status lines.

use std::fmt;
use std::io;
use std::ops::{BitAnd, BitOr, Not};
use std::os::fd::{AsFd, AsRawFd};

/// A set of modem lines, bit-compatible with the `TIOCM_*` register.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModemLines(libc::c_int);

impl ModemLines {
    pub const EMPTY: Self = Self(0);
    /// Data Terminal Ready (output).
    pub const DTR: Self = Self(libc::TIOCM_DTR);
    /// Request To Send (output).
    pub const RTS: Self = Self(libc::TIOCM_RTS);
    /// Clear To Send (input).
    pub const CTS: Self = Self(libc::TIOCM_CTS);
    /// Data Set Ready (input).
    pub const DSR: Self = Self(libc::TIOCM_DSR);
    /// Data Carrier Detect (input).
    pub const CAR: Self = Self(libc::TIOCM_CAR);
    /// Ring Indicator (input).
    pub const RNG: Self = Self(libc::TIOCM_RNG);

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every line in `other` is present.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any line in `other` is present.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for ModemLines {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for ModemLines {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for ModemLines {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for ModemLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ModemLines, &str); 6] = [
            (ModemLines::DTR, "DTR"),
            (ModemLines::RTS, "RTS"),
            (ModemLines::CTS, "CTS"),
            (ModemLines::DSR, "DSR"),
            (ModemLines::CAR, "CAR"),
            (ModemLines::RNG, "RNG"),
        ];

        let mut set = f.debug_set();
        for (line, name) in NAMES {
            if self.contains(line) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

mod ioctl {
    nix::ioctl_read_bad!(tiocmget, libc::TIOCMGET, libc::c_int);
    nix::ioctl_write_ptr_bad!(tiocmbis, libc::TIOCMBIS, libc::c_int);
    nix::ioctl_write_ptr_bad!(tiocmbic, libc::TIOCMBIC, libc::c_int);
}

/// Read the modem status register of a terminal device.
pub fn get(fd: impl AsFd) -> io::Result<ModemLines> {
    let mut bits: libc::c_int = 0;
    // SAFETY: `bits` outlives the call and the fd is borrowed for its duration.
    unsafe { ioctl::tiocmget(fd.as_fd().as_raw_fd(), &mut bits) }?;
    Ok(ModemLines(bits))
}

/// Assert and deassert individual modem lines of a terminal device.
pub fn set(fd: impl AsFd, assert: ModemLines, deassert: ModemLines) -> io::Result<()> {
    let raw = fd.as_fd().as_raw_fd();
    if !assert.is_empty() {
        // SAFETY: the pointer refers to a live local for the duration of the call.
        unsafe { ioctl::tiocmbis(raw, &assert.0) }?;
    }
    if !deassert.is_empty() {
        // SAFETY: as above.
        unsafe { ioctl::tiocmbic(raw, &deassert.0) }?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_and_intersects() {
        let lines = ModemLines::CTS | ModemLines::DSR;
        assert!(lines.contains(ModemLines::CTS));
        assert!(!lines.contains(ModemLines::CTS | ModemLines::CAR));
        assert!(lines.intersects(ModemLines::DSR | ModemLines::CAR));
        assert!(!lines.intersects(ModemLines::RTS | ModemLines::DTR));
    }

    #[test]
    fn test_debug_lists_names() {
        let lines = ModemLines::RTS | ModemLines::CAR;
        assert_eq!(format!("{lines:?}"), "{RTS, CAR}");
        assert_eq!(format!("{:?}", ModemLines::EMPTY), "{}");
    }

    #[test]
    fn test_modem_ioctl_on_non_tty_fails() {
        let file = tempfile::tempfile().unwrap();
        let err = get(&file).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTTY));
    }
}
