//! Control-line mirror: reflect one port's handshake inputs onto the other's
//! outputs.

use crate::port::{ModemLines, SerialEndpoint};
use serde::{Deserialize, Serialize};
use std::io;
use tracing::{trace, warn};

/// Which directions of handshake mirroring are active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ControlLines {
    /// Handshake lines are left alone.
    #[default]
    Off,
    /// Source status drives mirror outputs.
    Forward,
    /// As `Forward`, and mirror status also drives source outputs.
    Both,
}

/// Output lines to raise and drop on the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineUpdate {
    pub assert: ModemLines,
    pub deassert: ModemLines,
}

/// Map a source status register onto destination outputs.
///
/// CTS drives RTS; DSR or carrier detect drives DTR.
pub fn derive_outputs(status: ModemLines) -> LineUpdate {
    let mut assert = ModemLines::EMPTY;
    let mut deassert = ModemLines::EMPTY;

    if status.contains(ModemLines::CTS) {
        assert = assert | ModemLines::RTS;
    } else {
        deassert = deassert | ModemLines::RTS;
    }

    if status.intersects(ModemLines::DSR | ModemLines::CAR) {
        assert = assert | ModemLines::DTR;
    } else {
        deassert = deassert | ModemLines::DTR;
    }

    LineUpdate { assert, deassert }
}

/// Read `src` status and write the derived outputs to `dst`.
pub fn reflect<S, D>(src: &mut S, dst: &mut D) -> io::Result<LineUpdate>
where
    S: SerialEndpoint + ?Sized,
    D: SerialEndpoint + ?Sized,
{
    let status = src.modem_status()?;
    let update = derive_outputs(status);
    dst.set_modem_lines(update.assert, update.deassert)?;
    trace!(
        "{:?} on {} -> {:?} on {}",
        status,
        src.path().display(),
        update.assert,
        dst.path().display()
    );
    Ok(update)
}

/// Per-run control-line state: which directions are still live.
#[derive(Debug, Clone)]
pub struct ControlMirror {
    forward: bool,
    reverse: bool,
}

impl ControlMirror {
    pub fn new(mode: ControlLines) -> Self {
        Self {
            forward: mode != ControlLines::Off,
            reverse: mode == ControlLines::Both,
        }
    }

    pub fn is_active(&self) -> bool {
        self.forward || self.reverse
    }

    /// One pass over the active directions.
    ///
    /// A direction whose ioctls fail is switched off for the rest of the run;
    /// data mirroring is unaffected.
    pub fn tick<S, M>(&mut self, source: &mut S, mirror: &mut M)
    where
        S: SerialEndpoint,
        M: SerialEndpoint,
    {
        if self.forward {
            if let Err(e) = reflect(source, mirror) {
                warn!(
                    "Disabling control-line mirroring {} -> {}: {}",
                    source.path().display(),
                    mirror.path().display(),
                    e
                );
                self.forward = false;
            }
        }

        if self.reverse {
            if let Err(e) = reflect(mirror, source) {
                warn!(
                    "Disabling control-line mirroring {} -> {}: {}",
                    mirror.path().display(),
                    source.path().display(),
                    e
                );
                self.reverse = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockEndpoint;

    #[test]
    fn test_cts_drives_rts() {
        let update = derive_outputs(ModemLines::CTS);
        assert!(update.assert.contains(ModemLines::RTS));
        assert!(!update.deassert.contains(ModemLines::RTS));

        let update = derive_outputs(ModemLines::EMPTY);
        assert!(update.deassert.contains(ModemLines::RTS));
        assert!(!update.assert.contains(ModemLines::RTS));
    }

    #[test]
    fn test_dsr_carrier_truth_table() {
        let cases = [
            (ModemLines::EMPTY, false),
            (ModemLines::DSR, true),
            (ModemLines::CAR, true),
            (ModemLines::DSR | ModemLines::CAR, true),
        ];
        for (status, dtr) in cases {
            let update = derive_outputs(status);
            assert_eq!(update.assert.contains(ModemLines::DTR), dtr, "{status:?}");
            assert_eq!(update.deassert.contains(ModemLines::DTR), !dtr, "{status:?}");
        }
    }

    #[test]
    fn test_unrelated_inputs_ignored() {
        let update = derive_outputs(ModemLines::RNG | ModemLines::RTS | ModemLines::DTR);
        assert_eq!(update.assert, ModemLines::EMPTY);
        assert_eq!(update.deassert, ModemLines::RTS | ModemLines::DTR);
    }

    #[test]
    fn test_reflect_updates_destination() {
        let mut src = MockEndpoint::new("SRC");
        let mut dst = MockEndpoint::new("DST");
        src.set_modem_inputs(ModemLines::CTS | ModemLines::CAR);

        reflect(&mut src, &mut dst).unwrap();
        assert_eq!(dst.modem_outputs(), ModemLines::RTS | ModemLines::DTR);

        src.set_modem_inputs(ModemLines::DSR);
        reflect(&mut src, &mut dst).unwrap();
        assert_eq!(dst.modem_outputs(), ModemLines::DTR);

        src.set_modem_inputs(ModemLines::EMPTY);
        reflect(&mut src, &mut dst).unwrap();
        assert_eq!(dst.modem_outputs(), ModemLines::EMPTY);
    }

    #[test]
    fn test_forward_only() {
        let mut src = MockEndpoint::new("SRC");
        let mut dst = MockEndpoint::new("DST");
        src.set_modem_inputs(ModemLines::CTS);
        dst.set_modem_inputs(ModemLines::CTS | ModemLines::DSR);

        let mut control = ControlMirror::new(ControlLines::Forward);
        control.tick(&mut src, &mut dst);

        assert_eq!(dst.modem_outputs(), ModemLines::RTS);
        assert_eq!(src.modem_outputs(), ModemLines::EMPTY);
    }

    #[test]
    fn test_both_directions() {
        let mut src = MockEndpoint::new("SRC");
        let mut dst = MockEndpoint::new("DST");
        src.set_modem_inputs(ModemLines::DSR);
        dst.set_modem_inputs(ModemLines::CTS);

        let mut control = ControlMirror::new(ControlLines::Both);
        control.tick(&mut src, &mut dst);

        assert_eq!(dst.modem_outputs(), ModemLines::DTR);
        assert_eq!(src.modem_outputs(), ModemLines::RTS);
    }

    #[test]
    fn test_failure_disables_direction() {
        let mut src = MockEndpoint::new("SRC");
        let mut dst = MockEndpoint::new("DST");
        src.set_modem_unsupported(true);
        dst.set_modem_inputs(ModemLines::CTS);

        let mut control = ControlMirror::new(ControlLines::Both);
        control.tick(&mut src, &mut dst);
        assert!(!control.forward);
        assert!(!control.reverse);
        assert!(!control.is_active());
    }

    #[test]
    fn test_off_is_inactive() {
        assert!(!ControlMirror::new(ControlLines::Off).is_active());
    }
}
