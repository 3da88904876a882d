//! Directional key events and the termination marker.
//!
//! A [`KeyEvent`] is what travels through the pipeline: created by the
//! decoder, queued, and published as a plain ASCII token.  The
//! [`TerminationSignal`] never enters the queue; it only tells the capture
//! loop to stop.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One of the four arrow keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEvent {
    Up,
    Down,
    Left,
    Right,
}

/// Marker emitted by the decoder when the interrupt byte (Ctrl-C) is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationSignal;

/// Error returned when a payload token is not one of the four arrow names.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown key token: {0:?}")]
pub struct UnknownKeyToken(pub String);

impl KeyEvent {
    /// All variants, in CSI final-byte order (`A`, `B`, `C`, `D`).
    pub const ALL: [KeyEvent; 4] = [KeyEvent::Up, KeyEvent::Down, KeyEvent::Right, KeyEvent::Left];

    /// Maps the final byte of a `CSI` cursor-key sequence to an event.
    ///
    /// `ESC [ A` is up, `B` down, `C` right, `D` left.  Any other byte yields
    /// `None`.
    pub fn from_csi_final(byte: u8) -> Option<Self> {
        match byte {
            b'A' => Some(KeyEvent::Up),
            b'B' => Some(KeyEvent::Down),
            b'C' => Some(KeyEvent::Right),
            b'D' => Some(KeyEvent::Left),
            _ => None,
        }
    }

    /// Returns the final byte of the `CSI` sequence that produces this event.
    pub fn csi_final(self) -> u8 {
        match self {
            KeyEvent::Up => b'A',
            KeyEvent::Down => b'B',
            KeyEvent::Right => b'C',
            KeyEvent::Left => b'D',
        }
    }

    /// The token published on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            KeyEvent::Up => "UP",
            KeyEvent::Down => "DOWN",
            KeyEvent::Left => "LEFT",
            KeyEvent::Right => "RIGHT",
        }
    }

    /// The token as a byte payload.
    pub fn payload(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyEvent {
    type Err = UnknownKeyToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(KeyEvent::Up),
            "DOWN" => Ok(KeyEvent::Down),
            "LEFT" => Ok(KeyEvent::Left),
            "RIGHT" => Ok(KeyEvent::Right),
            other => Err(UnknownKeyToken(other.to_string())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
