//! Library and application errors

use std::io;

use miette::Diagnostic;
use thiserror::Error;

/// All possible errors returned by octeon-dump
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Error while talking to the failsafe console")]
    #[diagnostic(transparent)]
    Connection(#[from] ConnectionError),

    #[error("The console replied, but not with what was expected")]
    #[diagnostic(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Invalid hex offset '{0}'")]
    #[diagnostic(
        code(octeon_dump::invalid_offset),
        help("Offsets are hexadecimal, with or without a leading `0x`")
    )]
    InvalidOffset(String),

    #[error("Empty dump range: start {start:#x} is not below stop {stop:#x}")]
    #[diagnostic(code(octeon_dump::empty_range))]
    EmptyRange { start: u64, stop: u64 },

    #[error("Failed to open file: {0}")]
    #[diagnostic(code(octeon_dump::file_open))]
    FileOpenError(String, #[source] io::Error),

    #[error("Failed to write to the output file")]
    #[diagnostic(code(octeon_dump::sink))]
    Sink(#[source] io::Error),
}

impl From<serialport::Error> for Error {
    fn from(err: serialport::Error) -> Self {
        Self::Connection(err.into())
    }
}

/// Errors on the serial link itself
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ConnectionError {
    #[error("Serial port error: {0}")]
    #[diagnostic(
        code(octeon_dump::serial_error),
        help("Make sure the device is connected and the port is not held by another process")
    )]
    Serial(#[source] serialport::Error),

    #[error("IO error while using serial port: {0}")]
    #[diagnostic(code(octeon_dump::serial_io))]
    Io(#[source] io::Error),

    #[error("Timed out waiting for `{token}`; last console output: {context:?}")]
    #[diagnostic(
        code(octeon_dump::timeout),
        help("The console stopped answering; power-cycle the device back into the failsafe shell and retry")
    )]
    ReadTimeout { token: String, context: String },
}

impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> Self {
        ConnectionError::Io(err)
    }
}

impl From<serialport::Error> for ConnectionError {
    fn from(err: serialport::Error) -> Self {
        ConnectionError::Serial(err)
    }
}

/// The console answered with a reply whose shape cannot be trusted
#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    #[error("Flash layout report is missing the bank marker; reply was: {reply:?}")]
    #[diagnostic(
        code(octeon_dump::missing_bank_marker),
        help("The device may not be sitting in the failsafe shell, or `flinfo` is not supported; pass explicit `--start`/`--stop` offsets instead")
    )]
    MissingBankMarker { reply: String },

    #[error("No flash sectors found in the layout report")]
    #[diagnostic(
        code(octeon_dump::no_sectors),
        help("Pass explicit `--start`/`--stop` offsets instead")
    )]
    NoSectors,

    #[error("Word data `{data}` is not 16 hex characters")]
    #[diagnostic(code(octeon_dump::word_data))]
    WordData { data: String },
}
