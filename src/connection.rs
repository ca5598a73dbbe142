//! Maintain a conversation with the failsafe shell
//!
//! The [Connection] struct abstracts over the serial link and the
//! command/ready-prompt handshake, and provides the request/response
//! primitives every higher component is built on. It is generic over any
//! [Read] + [Write] pair so tests can swap the real port for a scripted
//! console.

use std::io::{self, Read, Write};

use log::debug;

use crate::error::ConnectionError;

/// Prompt printed by the failsafe shell when it is idle and ready for a
/// command.
pub const DEFAULT_PROMPT: &str = "Failsafe # ";

/// An established conversation with the failsafe console.
///
/// The port is owned exclusively; commands are issued strictly one at a time
/// and each reply is fully consumed before the next command goes out. The
/// remote shell serializes everything anyway, and interleaving would corrupt
/// the prompt bookkeeping.
pub struct Connection<P> {
    port: P,
    prompt: String,
}

impl<P: Read + Write> Connection<P> {
    pub fn new(port: P) -> Self {
        Self::with_prompt(port, DEFAULT_PROMPT)
    }

    /// Create a connection that waits for a non-default ready-prompt.
    pub fn with_prompt(port: P, prompt: &str) -> Self {
        Connection {
            port,
            prompt: prompt.to_string(),
        }
    }

    /// The ready-prompt this connection synchronizes on.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Write a single command line and flush it out on the wire.
    pub fn send(&mut self, command: &str) -> Result<(), ConnectionError> {
        self.port.write_all(command.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()?;

        Ok(())
    }

    /// Read until `token` shows up at the end of the accumulated buffer.
    ///
    /// Returns everything read, token included. The serial read timeout is
    /// the single stall boundary: if the token has not appeared by then the
    /// whole buffer rides along in the error as diagnostic context. There is
    /// no retry loop here; a hung console should surface immediately rather
    /// than spin silently.
    pub fn wait_for(&mut self, token: &str) -> Result<Vec<u8>, ConnectionError> {
        let needle = token.as_bytes();
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(0) => return Err(stalled(token, &buf)),
                Ok(_) => buf.push(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return Err(stalled(token, &buf));
                }
                Err(e) => return Err(e.into()),
            }

            if buf.ends_with(needle) {
                return Ok(buf);
            }
        }
    }

    /// Send a command and wait for the ready-prompt that follows its output.
    pub fn run_command(&mut self, command: &str) -> Result<Vec<u8>, ConnectionError> {
        let prompt = self.prompt.clone();
        self.run_command_expecting(command, &prompt)
    }

    /// Send a command and wait for an explicit completion token.
    pub fn run_command_expecting(
        &mut self,
        command: &str,
        token: &str,
    ) -> Result<Vec<u8>, ConnectionError> {
        debug!(
            "Waiting for {:?} to indicate command {:?} is done",
            token, command
        );
        self.send(command)?;
        self.wait_for(token)
    }

    /// Read one line-terminated chunk and decode it as text.
    ///
    /// Used by the per-word polling loop, where the expected reply is a
    /// structured data line rather than the shell prompt.
    pub fn read_line(&mut self) -> Result<String, ConnectionError> {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(0) => return Err(stalled("end of line", &buf)),
                Ok(_) => {
                    buf.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return Err(stalled("end of line", &buf));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Nudge the shell with a bare newline and wait for the ready-prompt.
    ///
    /// Run once at startup to flush any boot noise and confirm the console is
    /// actually sitting in the failsafe shell.
    pub fn sync(&mut self) -> Result<(), ConnectionError> {
        self.run_command("")?;

        Ok(())
    }

    /// Release the underlying port.
    pub fn into_port(self) -> P {
        self.port
    }
}

fn stalled(token: &str, buf: &[u8]) -> ConnectionError {
    ConnectionError::ReadTimeout {
        token: token.to_string(),
        context: String::from_utf8_lossy(buf).into_owned(),
    }
}
