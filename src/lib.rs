//! Dump firmware from Octeon devices through the u-boot failsafe console.
//!
//! The failsafe shell is a text console meant for a human at a terminal:
//! commands are echoed, replies arrive as free-form lines, and the only
//! synchronization point is the ready-prompt. This crate drives that console
//! as a machine would not normally dare to, issuing one `read64` per 8-byte
//! word and reassembling the parsed hex replies into a byte-exact flash
//! image.

pub mod cli;
mod connection;
mod dumper;
mod error;
mod layout;
mod parse;
mod progress;

pub use connection::{Connection, DEFAULT_PROMPT};
pub use dumper::{dump, dump_to_file, WORD_SIZE};
pub use error::{ConnectionError, Error, ProtocolError};
pub use layout::{resolve_range, DumpRange, FlashLayout};
pub use progress::{DefaultProgressCallback, ProgressCallbacks};
