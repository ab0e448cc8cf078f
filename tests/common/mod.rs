//! Shared test utilities for ttymirror integration tests.
//!
//! Pseudo-terminals stand in for serial hardware: the slave side is opened by
//! path exactly like a real device, while the test drives the master side.

#![allow(dead_code)]

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::pty::openpty;
use nix::sys::termios::{tcgetattr, LocalFlags, Termios};
use nix::unistd::ttyname;
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsFd, OwnedFd};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// One pseudo-terminal: `path` is what the mirror opens, `master` is the
/// far end of the virtual cable.
pub struct VirtualPort {
    pub master: File,
    pub slave: OwnedFd,
    pub path: PathBuf,
}

impl VirtualPort {
    pub fn new() -> Self {
        let pty = openpty(None, None).expect("openpty");
        let path = ttyname(&pty.slave).expect("ttyname");
        Self {
            master: File::from(pty.master),
            slave: pty.slave,
            path,
        }
    }

    /// Current attributes of the slave side.
    pub fn attributes(&self) -> Termios {
        tcgetattr(&self.slave).expect("tcgetattr")
    }

    /// Wait until something has put the slave into raw mode.
    pub fn wait_until_raw(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if !self.attributes().local_flags.contains(LocalFlags::ICANON) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    /// Send bytes as if they arrived on the wire.
    pub fn send(&mut self, data: &[u8]) {
        self.master.write_all(data).expect("write to master");
        self.master.flush().expect("flush master");
    }

    /// Collect up to `len` bytes that the mirror wrote to this port.
    pub fn receive(&mut self, len: usize, timeout: Duration) -> Vec<u8> {
        let deadline = Instant::now() + timeout;
        let mut collected = Vec::with_capacity(len);
        let mut buf = [0u8; 1024];

        while collected.len() < len {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let millis = remaining.as_millis().min(u16::MAX as u128) as u16;
            let mut fds = [PollFd::new(self.master.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(millis)) {
                Ok(0) => continue,
                Ok(_) => {}
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => panic!("poll on master failed: {e}"),
            }
            let want = (len - collected.len()).min(buf.len());
            match self.master.read(&mut buf[..want]) {
                Ok(n) => collected.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => panic!("read from master failed: {e}"),
            }
        }
        collected
    }
}

/// Two virtual ports, source first.
pub fn port_pair() -> (VirtualPort, VirtualPort) {
    (VirtualPort::new(), VirtualPort::new())
}
