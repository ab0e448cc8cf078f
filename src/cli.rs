//! Command-line arguments and the merge into a validated run.

use crate::config::{Config, ConfigError, ConfigResult};
use crate::lifecycle::RunSettings;
use crate::logging::Verbosity;
use crate::mirror::ControlLines;
use crate::port::BaudTable;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Mirror two serial ports in both directions.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "ttymirror",
    version,
    about = "Bidirectional serial port mirror.",
    long_about = "Copies every byte arriving on the source port to the mirror port and every byte \
                  arriving on the mirror port back to the source, until interrupted. Both ports \
                  are returned to their original terminal settings on exit."
)]
pub struct Args {
    /// Source serial device
    #[arg(short, long, value_name = "PATH", required_unless_present_any = ["list_ports", "list_baud_rates"])]
    pub source: Option<PathBuf>,

    /// Mirror serial device
    #[arg(short, long, value_name = "PATH", required_unless_present_any = ["list_ports", "list_baud_rates"])]
    pub mirror: Option<PathBuf>,

    /// Baud rate for both ports [default: 9600]
    #[arg(short, long, value_name = "RATE")]
    pub baud: Option<u32>,

    /// Data bits: 5, 6, 7 or 8 [default: 8]
    #[arg(short, long = "data-bits", value_name = "BITS")]
    pub data_bits: Option<u8>,

    /// Stop bits: 1 or 2 [default: 1]
    #[arg(short = 'p', long = "stop-bits", value_name = "BITS")]
    pub stop_bits: Option<u8>,

    /// Parity: n, e or o (none, even, odd) [default: n]
    #[arg(short = 'y', long, value_name = "PARITY")]
    pub parity: Option<String>,

    /// Mirror handshake lines as well as data [default: off]
    #[arg(short = 'c', long = "control-lines", value_enum, value_name = "MODE")]
    pub control_lines: Option<ControlLines>,

    /// Upper bound on each readiness wait in milliseconds [default: 25]
    #[arg(long = "poll-interval", value_name = "MS")]
    pub poll_interval: Option<u64>,

    /// Transfer buffer size in bytes [default: 4096]
    #[arg(long = "buffer-size", value_name = "BYTES")]
    pub buffer_size: Option<usize>,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log detail (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// List serial ports found on this host and exit
    #[arg(long)]
    pub list_ports: bool,

    /// List baud rates supported on this host and exit
    #[arg(long, conflicts_with = "list_ports")]
    pub list_baud_rates: bool,
}

impl Args {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity {
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }

    /// Overlay the flags that were given onto `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(baud) = self.baud {
            config.line.baud_rate = baud;
        }
        if let Some(bits) = self.data_bits {
            config.line.data_bits = bits;
        }
        if let Some(bits) = self.stop_bits {
            config.line.stop_bits = bits;
        }
        if let Some(ref parity) = self.parity {
            config.line.parity = parity.clone();
        }
        if let Some(mode) = self.control_lines {
            config.mirror.control_lines = mode;
        }
        if let Some(ms) = self.poll_interval {
            config.mirror.poll_interval_ms = ms;
        }
        if let Some(size) = self.buffer_size {
            config.mirror.buffer_size = size;
        }
    }

    /// Merge the flags over `config` and validate the result.
    ///
    /// Nothing is opened here; every settings error surfaces before the
    /// first port is touched.
    pub fn run_settings(&self, mut config: Config, table: &BaudTable) -> ConfigResult<RunSettings> {
        self.apply_to(&mut config);

        let source = self.source.clone().ok_or(ConfigError::MissingPort("source"))?;
        let mirror = self.mirror.clone().ok_or(ConfigError::MissingPort("mirror"))?;
        let line = config.line.validate(table)?;
        let engine = config.mirror.validate()?;

        Ok(RunSettings {
            source,
            mirror,
            source_line: line,
            mirror_line: line,
            engine,
        })
    }
}
