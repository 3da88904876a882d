//! Scripted byte source for tests.
//!
//! [`ScriptedByteSource`] replays a fixed byte sequence, optionally pausing
//! between bytes, and then ends the way the script says: end-of-file or an
//! I/O error.  It records how many bytes were read and whether it has been
//! dropped, so tests can verify that capture stopped promptly and "restored
//! the terminal" (released its source).

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::{ByteSource, TerminalError};

#[derive(Debug, Clone, Copy)]
enum ScriptEnd {
    Closed,
    Error(io::ErrorKind),
}

/// A [`ByteSource`] that replays a pre-recorded script.
#[derive(Debug)]
pub struct ScriptedByteSource {
    bytes: VecDeque<u8>,
    delay: Option<Duration>,
    end: ScriptEnd,
    bytes_read: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl ScriptedByteSource {
    /// Replays `bytes`, then reports end of input.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            bytes: VecDeque::from(bytes),
            delay: None,
            end: ScriptEnd::Closed,
            bytes_read: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sleeps for `delay` before returning each byte.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fails with an I/O error of `kind` once the script is exhausted.
    pub fn then_fail(mut self, kind: io::ErrorKind) -> Self {
        self.end = ScriptEnd::Error(kind);
        self
    }

    /// Counter of bytes handed out so far.
    pub fn bytes_read(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.bytes_read)
    }

    /// Flag set when the source is dropped.
    pub fn released(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl ByteSource for ScriptedByteSource {
    fn read_byte(&mut self) -> Result<u8, TerminalError> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        match self.bytes.pop_front() {
            Some(byte) => {
                self.bytes_read.fetch_add(1, Ordering::SeqCst);
                Ok(byte)
            }
            None => match self.end {
                ScriptEnd::Closed => Err(TerminalError::Closed),
                ScriptEnd::Error(kind) => {
                    Err(TerminalError::Read(io::Error::new(kind, "scripted failure")))
                }
            },
        }
    }
}

impl Drop for ScriptedByteSource {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
