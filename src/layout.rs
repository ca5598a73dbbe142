//! Flash bank layout discovery and dump range resolution

use std::io::{Read, Write};

use log::{debug, info};

use crate::connection::Connection;
use crate::error::{Error, ProtocolError};

/// Console command that prints the flash bank report.
const FLINFO_COMMAND: &str = "flinfo";

/// Substring required in a well-formed bank report.
const BANK_MARKER: &str = "Bank # 1";

/// Over-read applied past the last sector base address. The report does not
/// carry individual sector sizes, so the end of the range is padded to make
/// sure the last sector's tail is captured; the excess reads past the end of
/// flash are harmless on these devices.
const SECTOR_PAD: u64 = 0xFFFF;

/// Resolved `[start, stop)` byte interval to dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpRange {
    pub start: u64,
    pub stop: u64,
}

impl DumpRange {
    pub fn new(start: u64, stop: u64) -> Result<Self, Error> {
        if start >= stop {
            return Err(Error::EmptyRange { start, stop });
        }

        Ok(DumpRange { start, stop })
    }

    /// Build a range from user-supplied hex offsets, `0x` prefix optional.
    pub fn from_hex(start: &str, stop: &str) -> Result<Self, Error> {
        DumpRange::new(parse_offset(start)?, parse_offset(stop)?)
    }

    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.stop - self.start
    }
}

fn parse_offset(text: &str) -> Result<u64, Error> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    u64::from_str_radix(digits, 16).map_err(|_| Error::InvalidOffset(text.to_string()))
}

/// Sector base addresses discovered from a bank report, in report order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashLayout {
    sectors: Vec<u64>,
}

impl FlashLayout {
    /// Parse a `flinfo` report.
    ///
    /// The bank marker is a sanity check that the console actually printed a
    /// layout report; without it the reply cannot be trusted, and resolution
    /// fails rather than guessing a range. Sector bases are every
    /// whitespace-bounded 8-hex-digit token, kept in order of appearance.
    pub fn from_report(report: &str) -> Result<Self, ProtocolError> {
        if !report.contains(BANK_MARKER) {
            return Err(ProtocolError::MissingBankMarker {
                reply: report.trim().to_string(),
            });
        }

        let sectors: Vec<u64> = report
            .split_whitespace()
            .filter(|token| token.len() == 8 && token.bytes().all(|b| b.is_ascii_hexdigit()))
            .filter_map(|token| u64::from_str_radix(token, 16).ok())
            .collect();

        if sectors.is_empty() {
            return Err(ProtocolError::NoSectors);
        }

        for sector in &sectors {
            debug!("Found flash sector: {:08x}", sector);
        }

        Ok(FlashLayout { sectors })
    }

    pub fn sectors(&self) -> &[u64] {
        &self.sectors
    }

    /// Range spanning the first sector through the padded end of the last.
    pub fn dump_range(&self) -> Result<DumpRange, Error> {
        match (self.sectors.first(), self.sectors.last()) {
            (Some(&first), Some(&last)) => DumpRange::new(first, last + SECTOR_PAD),
            _ => Err(ProtocolError::NoSectors.into()),
        }
    }
}

/// Work out the absolute byte range to dump.
///
/// Explicit bounds short-circuit without touching the console; otherwise the
/// range is derived from the device's own bank report.
pub fn resolve_range<P: Read + Write>(
    connection: &mut Connection<P>,
    start: Option<&str>,
    stop: Option<&str>,
) -> Result<DumpRange, Error> {
    if let (Some(start), Some(stop)) = (start, stop) {
        return DumpRange::from_hex(start, stop);
    }

    let reply = connection.run_command(FLINFO_COMMAND)?;
    let report = String::from_utf8_lossy(&reply);
    let layout = FlashLayout::from_report(&report)?;
    info!("Retrieved flinfo: {} sectors", layout.sectors().len());

    layout.dump_range()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::tests::ScriptedPort;

    const FLINFO_REPLY: &str = "flinfo\r\n\
        \r\n\
        Bank # 1: CFI conformant FLASH (8 x 16)  Size: 8 MB in 3 Sectors\r\n\
        \r\n\
        Sector Start Addresses:\r\n\
        \x20 A0000000   A0010000   A0020000\r\n\
        \r\n\
        Failsafe # ";

    #[test]
    fn explicit_bounds_skip_the_console() {
        let mut connection = Connection::new(ScriptedPort::silent());

        let range = resolve_range(&mut connection, Some("1000"), Some("2000")).unwrap();

        assert_eq!(range, DumpRange { start: 0x1000, stop: 0x2000 });
        assert!(connection.into_port().commands.is_empty());
    }

    #[test]
    fn explicit_bounds_accept_a_0x_prefix() {
        let range = DumpRange::from_hex("0x1000", "0X2000").unwrap();
        assert_eq!(range, DumpRange { start: 0x1000, stop: 0x2000 });
    }

    #[test]
    fn bad_hex_offset_is_rejected() {
        let err = DumpRange::from_hex("zzzz", "2000").unwrap_err();
        assert!(matches!(err, Error::InvalidOffset(_)));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = DumpRange::from_hex("2000", "1000").unwrap_err();
        assert!(matches!(err, Error::EmptyRange { .. }));
    }

    #[test]
    fn range_from_layout_report_pads_the_last_sector() {
        let port = ScriptedPort::new(|_| FLINFO_REPLY.as_bytes().to_vec());
        let mut connection = Connection::new(port);

        let range = resolve_range(&mut connection, None, None).unwrap();

        assert_eq!(range.start, 0xA0000000);
        assert_eq!(range.stop, 0xA0020000 + 0xFFFF);
        assert_eq!(connection.into_port().commands, vec!["flinfo".to_string()]);
    }

    #[test]
    fn sectors_are_kept_in_report_order() {
        let layout = FlashLayout::from_report(
            "Bank # 1\n  A0000000   A0010000   A0020000\n",
        )
        .unwrap();

        assert_eq!(layout.sectors(), &[0xA0000000, 0xA0010000, 0xA0020000]);
    }

    #[test]
    fn missing_bank_marker_is_a_protocol_error() {
        let port = ScriptedPort::new(|_| b"Unknown command 'flinfo'\r\nFailsafe # ".to_vec());
        let mut connection = Connection::new(port);

        let err = resolve_range(&mut connection, None, None).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::MissingBankMarker { .. })
        ));
    }

    #[test]
    fn report_without_sector_tokens_is_a_protocol_error() {
        let err = FlashLayout::from_report("Bank # 1: nothing useful follows").unwrap_err();
        assert!(matches!(err, ProtocolError::NoSectors));
    }

    #[test]
    fn only_whitespace_bounded_8_digit_tokens_count() {
        let layout = FlashLayout::from_report(
            "Bank # 1 Size: 123456789 kB\n  A0000000  0xA0010000  A0020000\n",
        )
        .unwrap();

        // The 9-digit size and the 0x-prefixed token are not sector bases.
        assert_eq!(layout.sectors(), &[0xA0000000, 0xA0020000]);
    }
}
