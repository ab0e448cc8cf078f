//! Line configurator: turns [`LineSettings`] into termios attributes.

use super::baud::BaudTable;
use super::error::PortError;
use super::traits::{DataBits, LineSettings, Parity, StopBits};
use nix::sys::termios::{
    cfmakeraw, cfsetispeed, cfsetospeed, tcsetattr, ControlFlags, LocalFlags, SetArg,
    SpecialCharacterIndices, Termios,
};
use std::os::fd::AsFd;
use std::path::Path;

/// Rewrite `termios` for fully raw operation with the given line settings.
///
/// Reads on a descriptor using the result return immediately with whatever is
/// buffered (`VMIN = 0`, `VTIME = 0`).
pub fn prepare(
    termios: &mut Termios,
    settings: &LineSettings,
    table: &BaudTable,
) -> Result<(), PortError> {
    let speed = table
        .symbol(settings.baud_rate)
        .map_err(|_| PortError::UnsupportedBaudRate(settings.baud_rate))?;

    cfmakeraw(termios);

    let flags = &mut termios.control_flags;
    flags.remove(ControlFlags::CSIZE | ControlFlags::CSTOPB);
    flags.remove(ControlFlags::PARENB | ControlFlags::PARODD);
    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "freebsd"
    ))]
    flags.remove(ControlFlags::CRTSCTS);

    flags.insert(match settings.data_bits {
        DataBits::Five => ControlFlags::CS5,
        DataBits::Six => ControlFlags::CS6,
        DataBits::Seven => ControlFlags::CS7,
        DataBits::Eight => ControlFlags::CS8,
    });

    if settings.stop_bits == StopBits::Two {
        flags.insert(ControlFlags::CSTOPB);
    }

    match settings.parity {
        Parity::None => {}
        Parity::Even => flags.insert(ControlFlags::PARENB),
        Parity::Odd => flags.insert(ControlFlags::PARENB | ControlFlags::PARODD),
    }

    flags.insert(ControlFlags::CLOCAL | ControlFlags::CREAD);

    termios
        .local_flags
        .remove(LocalFlags::ICANON | LocalFlags::ECHO | LocalFlags::ECHOE | LocalFlags::ISIG);
    termios.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
    termios.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

    cfsetispeed(termios, speed).map_err(|_| PortError::UnsupportedBaudRate(settings.baud_rate))?;
    cfsetospeed(termios, speed).map_err(|_| PortError::UnsupportedBaudRate(settings.baud_rate))?;

    Ok(())
}

/// Derive attributes from `original` and apply them to `fd` immediately.
///
/// Returns the attributes now in effect.
pub fn configure(
    fd: impl AsFd,
    path: &Path,
    original: &Termios,
    settings: &LineSettings,
    table: &BaudTable,
) -> Result<Termios, PortError> {
    let mut termios = original.clone();
    prepare(&mut termios, settings, table)?;
    tcsetattr(fd, SetArg::TCSANOW, &termios).map_err(|e| PortError::configure(path, e))?;
    Ok(termios)
}
