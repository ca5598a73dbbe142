//! Matching and decoding of the console's hex reply lines

use std::sync::OnceLock;

use regex::Regex;

use crate::dumper::WORD_SIZE;
use crate::error::ProtocolError;

fn hex_line_re() -> &'static Regex {
    static HEX_LINE: OnceLock<Regex> = OnceLock::new();
    HEX_LINE.get_or_init(|| Regex::new(r"([0-9a-fA-F]+): ?0x([0-9a-fA-F]+)").unwrap())
}

/// Match one `<addr>: 0x<data>` console line.
///
/// Returns the address and data hex digit runs as text; callers pick the
/// width and conversion appropriate for their context. Anything else, such as
/// command echoes, blank lines, or prompt fragments, does not match.
pub fn hex_line(line: &str) -> Option<(&str, &str)> {
    hex_line_re().captures(line).map(|caps| {
        let (_, [addr, data]) = caps.extract();
        (addr, data)
    })
}

/// Decode the 16-hex-char data field of a `read64` reply into its 8 bytes.
///
/// The console prints the word as big-endian hex text; bytes are taken in
/// print order with no swapping.
pub fn decode_word(hex: &str) -> Result<[u8; WORD_SIZE], ProtocolError> {
    let digits = hex.as_bytes();
    if digits.len() != WORD_SIZE * 2 {
        return Err(ProtocolError::WordData {
            data: hex.to_string(),
        });
    }

    let mut word = [0u8; WORD_SIZE];
    for (i, pair) in digits.chunks_exact(2).enumerate() {
        match (
            (pair[0] as char).to_digit(16),
            (pair[1] as char).to_digit(16),
        ) {
            (Some(hi), Some(lo)) => word[i] = ((hi << 4) | lo) as u8,
            _ => {
                return Err(ProtocolError::WordData {
                    data: hex.to_string(),
                })
            }
        }
    }

    Ok(word)
}
