//! The word-by-word dump loop
//!
//! One `read64` per 8-byte word: send the command, poll console lines until
//! the data line shows up, decode, persist, repeat. Strictly sequential and
//! blocking; the total order of appended bytes is the correctness property
//! the whole tool exists to provide.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use log::{info, trace};

use crate::connection::Connection;
use crate::error::Error;
use crate::layout::DumpRange;
use crate::parse;
use crate::progress::ProgressCallbacks;

/// Bytes returned by a single word-read command.
pub const WORD_SIZE: usize = 8;

/// Word-read command; the offset is appended as a `0x` hex literal.
const READ_COMMAND: &str = "read64";

/// Dump `range` through `connection` into `sink`.
///
/// Returns the number of bytes written. Every word is flushed before the next
/// command goes out, so an interrupted run leaves at most the in-flight word
/// behind and the sink's length always equals the completed portion of the
/// range. Lines that do not look like data lines (echoes, blanks, prompt
/// fragments) are expected noise and are skipped without bound; a console
/// that stops answering entirely surfaces as a read timeout instead.
pub fn dump<P, W>(
    connection: &mut Connection<P>,
    range: DumpRange,
    sink: &mut W,
    progress: &mut dyn ProgressCallbacks,
) -> Result<u64, Error>
where
    P: Read + Write,
    W: Write,
{
    info!(
        "Dumping {} bytes from {:#x} to {:#x}",
        range.len(),
        range.start,
        range.stop
    );
    progress.init(range.start, range.len());

    let mut written = 0u64;
    let mut offset = range.start;

    while offset < range.stop {
        connection.send(&format!("{} {:#x}", READ_COMMAND, offset))?;

        let data = loop {
            let line = connection.read_line()?;
            if let Some((_, data)) = parse::hex_line(&line) {
                break data.to_string();
            }
            trace!("Skipping console line: {:?}", line.trim_end());
        };

        let word = parse::decode_word(&data)?;

        // The padded end of a discovered range is not word-aligned; clamp the
        // final word so the image is exactly range.len() bytes.
        let remaining = range.stop - offset;
        let take = if remaining < WORD_SIZE as u64 {
            remaining as usize
        } else {
            WORD_SIZE
        };

        progress.update(offset, take, &data);

        sink.write_all(&word[..take]).map_err(Error::Sink)?;
        sink.flush().map_err(Error::Sink)?;

        written += take as u64;
        offset += WORD_SIZE as u64;
    }

    progress.finish();

    Ok(written)
}

/// Dump `range` into the file at `path`.
///
/// Any previous contents at the path are destroyed; the file ends up exactly
/// `range.len()` bytes long on success.
pub fn dump_to_file<P: Read + Write>(
    connection: &mut Connection<P>,
    range: DumpRange,
    path: &Path,
    progress: &mut dyn ProgressCallbacks,
) -> Result<u64, Error> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| Error::FileOpenError(path.display().to_string(), e))?;

    dump(connection, range, &mut file, progress)
}
