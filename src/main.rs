use clap::Parser;
use serialport::SerialPortType;
use std::process::ExitCode;
use tracing::debug;
use ttymirror::cli::Args;
use ttymirror::config::ConfigLoader;
use ttymirror::error::MirrorResult;
use ttymirror::lifecycle::{self, ShutdownSignal};
use ttymirror::logging;
use ttymirror::port::BaudTable;

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!("Run failed: {:?}", e);
            eprintln!("ttymirror: {}", e);
            e.exit_code()
        }
    }
}

fn run(args: &Args) -> MirrorResult<()> {
    let config = ConfigLoader::load(args.config.as_deref())?.into_config();
    logging::init(&config.logging, args.verbosity())?;

    let table = BaudTable::detect();
    if args.list_ports {
        return list_ports();
    }
    if args.list_baud_rates {
        for rate in table.rates() {
            println!("{}", rate);
        }
        return Ok(());
    }

    let settings = args.run_settings(config, &table)?;
    let shutdown = ShutdownSignal::new();
    lifecycle::install_handler(&shutdown)?;
    lifecycle::run(&settings, &table, &shutdown)?;
    Ok(())
}

fn list_ports() -> MirrorResult<()> {
    for port in serialport::available_ports()? {
        match port.port_type {
            SerialPortType::UsbPort(info) => {
                let product = info.product.unwrap_or_default();
                println!(
                    "{}\tusb {:04x}:{:04x} {}",
                    port.port_name, info.vid, info.pid, product
                );
            }
            SerialPortType::BluetoothPort => println!("{}\tbluetooth", port.port_name),
            SerialPortType::PciPort => println!("{}\tpci", port.port_name),
            SerialPortType::Unknown => println!("{}", port.port_name),
        }
    }
    Ok(())
}
