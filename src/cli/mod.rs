//! CLI utilities for the octeon-dump binary
//!
//! No stability guaranties apply

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use miette::{Result, WrapErr};
use serialport::{FlowControl, SerialPort};

use crate::connection::Connection;
use crate::dumper;
use crate::error::Error;
use crate::layout::resolve_range;
use crate::progress::ProgressCallbacks;

/// Serial read timeout. This is the single stall/abort boundary for the whole
/// protocol; there are no per-command retry knobs.
const SERIAL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Args)]
pub struct DumpArgs {
    /// Serial port connected to the device
    pub serial: String,
    /// Baud rate of the attached failsafe console
    pub baud: u32,
    /// File to write the dump into
    pub output: PathBuf,
    /// Start offset, in hex bytes
    #[arg(long)]
    pub start: Option<String>,
    /// End offset, in hex bytes
    #[arg(long)]
    pub stop: Option<String>,
}

/// Open the serial port and wrap it in a console session.
pub fn connect(args: &DumpArgs) -> Result<Connection<Box<dyn SerialPort>>> {
    info!("Serial port: {}", args.serial);

    let port = serialport::new(&args.serial, args.baud)
        .flow_control(FlowControl::Software)
        .timeout(SERIAL_TIMEOUT)
        .open()
        .map_err(Error::from)
        .wrap_err_with(|| format!("Failed to open serial port {}", args.serial))?;

    Ok(Connection::new(port))
}

/// Connect, resolve the dump range, and stream the flash contents to disk.
pub fn dump(args: DumpArgs) -> Result<()> {
    let mut connection = connect(&args)?;

    // Flush any boot noise and confirm the failsafe prompt is alive before
    // the first real command goes out.
    connection.sync().map_err(Error::from)?;

    let range = resolve_range(&mut connection, args.start.as_deref(), args.stop.as_deref())?;

    info!("Dumping firmware to {}", args.output.display());

    let mut progress = DumpProgress::default();
    let written = dumper::dump_to_file(&mut connection, range, &args.output, &mut progress)?;

    info!("Dumped {} bytes to {}", written, args.output.display());

    Ok(())
}

/// [ProgressCallbacks] rendering through an indicatif progress bar, one tick
/// per transferred word, with the last word's address and hex text as the
/// message.
#[derive(Default)]
struct DumpProgress {
    bar: Option<ProgressBar>,
}

impl ProgressCallbacks for DumpProgress {
    fn init(&mut self, addr: u64, total: u64) {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "[{elapsed_precise}] {bar:40.cyan/blue} {bytes:>10}/{total_bytes:10} {msg}",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        bar.set_message(format!("{:X}", addr));
        self.bar = Some(bar);
    }

    fn update(&mut self, addr: u64, len: usize, data: &str) {
        if let Some(bar) = &self.bar {
            bar.inc(len as u64);
            bar.set_message(format!("{:X}: {}", addr, data));
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = &self.bar {
            bar.finish();
        }
    }
}
