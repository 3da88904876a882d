//! Escape-sequence decoder for raw terminal input.
//!
//! In raw mode a terminal reports an arrow key as the three bytes
//! `ESC [ A` (up), `ESC [ B` (down), `ESC [ C` (right) or `ESC [ D` (left).
//! Ctrl-C is delivered as the single byte `0x03` because raw mode turns off
//! signal generation.
//!
//! ```text
//!            0x1B             '['             'A'..='D'
//!   IDLE ───────────▶ ESC_SEEN ─────▶ BRACKET_SEEN ─────────▶ IDLE + KeyEvent
//!    ▲  │ other            │ other            │ other
//!    └──┴──────────────────┴──────────────────┘  (discard, resynchronize)
//!
//!   0x03 in any state ──▶ TerminationSignal
//! ```
//!
//! The decoder is fed exactly one byte per call and never looks ahead, so it
//! behaves identically whether the bytes arrive in one burst or one at a time.

use tracing::trace;

use crate::domain::key_event::{KeyEvent, TerminationSignal};

/// Escape (`ESC`) byte that starts every cursor-key sequence.
pub const ESC: u8 = 0x1B;

/// End-of-text byte sent by Ctrl-C in raw mode.
pub const ETX: u8 = 0x03;

/// Control Sequence Introducer byte following `ESC`.
pub const CSI_BRACKET: u8 = b'[';

/// Position inside an escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    /// Waiting for the start of a sequence.
    #[default]
    Idle,
    /// `ESC` has been read.
    EscSeen,
    /// `ESC [` has been read.
    BracketSeen,
}

/// Output of a single [`EscapeDecoder::feed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Key(KeyEvent),
    Terminate(TerminationSignal),
}

/// Byte-at-a-time arrow-key decoder.
#[derive(Debug, Default)]
pub struct EscapeDecoder {
    state: DecoderState,
}

impl EscapeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, mostly useful for tests and trace logging.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Abandons any partially read sequence.
    pub fn reset(&mut self) {
        self.state = DecoderState::Idle;
    }

    /// Advances the state machine by one byte.
    ///
    /// Returns `Some` when the byte completes an arrow-key sequence or is the
    /// interrupt byte, `None` otherwise.  Malformed sequences are discarded
    /// silently and the decoder resynchronizes on the next byte.
    pub fn feed(&mut self, byte: u8) -> Option<Decoded> {
        if byte == ETX {
            self.state = DecoderState::Idle;
            return Some(Decoded::Terminate(TerminationSignal));
        }

        match self.state {
            DecoderState::Idle => {
                if byte == ESC {
                    self.state = DecoderState::EscSeen;
                } else {
                    trace!("ignoring byte 0x{byte:02X}");
                }
                None
            }
            DecoderState::EscSeen => {
                if byte == CSI_BRACKET {
                    self.state = DecoderState::BracketSeen;
                } else {
                    trace!("discarding malformed escape ESC 0x{byte:02X}");
                    self.state = DecoderState::Idle;
                }
                None
            }
            DecoderState::BracketSeen => {
                self.state = DecoderState::Idle;
                let event = KeyEvent::from_csi_final(byte);
                if event.is_none() {
                    trace!("discarding unsupported sequence ESC [ 0x{byte:02X}");
                }
                event.map(Decoded::Key)
            }
        }
    }
}

/// Decodes a complete byte slice, stopping after the first termination signal.
///
/// The returned vector ends with [`Decoded::Terminate`] if the slice contained
/// the interrupt byte; bytes after it are not examined.
pub fn decode_all(bytes: &[u8]) -> Vec<Decoded> {
    let mut decoder = EscapeDecoder::new();
    let mut out = Vec::new();
    for &byte in bytes {
        if let Some(decoded) = decoder.feed(byte) {
            out.push(decoded);
            if matches!(decoded, Decoded::Terminate(_)) {
                break;
            }
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
