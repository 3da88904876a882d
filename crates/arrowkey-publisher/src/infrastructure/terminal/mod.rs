//! Terminal input infrastructure.
//!
//! The capture loop needs exactly one capability from the terminal: "give me
//! the next byte".  [`ByteSource`] captures that contract so the loop can run
//! against the real keyboard ([`raw::RawTerminal`]) or a scripted byte stream
//! ([`mock::ScriptedByteSource`]) in tests.
//!
//! # Raw mode
//!
//! A terminal normally buffers a whole line, echoes every key, and turns
//! Ctrl-C into `SIGINT`.  Raw mode switches all of that off so arrow keys
//! arrive immediately as escape sequences and Ctrl-C arrives as the byte
//! `0x03`.  Whatever acquires raw mode must restore the previous settings on
//! every exit path, otherwise the user's shell is left unusable.

use std::io;

use thiserror::Error;

pub mod mock;
pub mod raw;

/// Error type for terminal input operations.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// Standard input is not attached to a terminal (piped, redirected, CI).
    #[error("standard input is not a terminal")]
    NotATerminal,
    /// The terminal refused the raw-mode attribute change.
    #[error("failed to switch terminal to raw mode: {0}")]
    RawMode(#[source] io::Error),
    /// The input stream reached end-of-file.
    #[error("terminal input closed")]
    Closed,
    #[error("failed to read terminal input: {0}")]
    Read(#[from] io::Error),
}

/// A blocking source of single input bytes.
pub trait ByteSource: Send {
    /// Blocks until one byte is available and returns it.
    ///
    /// Implementations must never consume more than the byte they return.
    ///
    /// # Errors
    ///
    /// Returns [`TerminalError::Closed`] at end of input and
    /// [`TerminalError::Read`] for I/O failures.
    fn read_byte(&mut self) -> Result<u8, TerminalError>;
}
