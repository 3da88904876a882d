//! CaptureInputUseCase: turns terminal bytes into queued key events.
//!
//! The use case owns the [`ByteSource`] and an [`EscapeDecoder`].  It reads one
//! byte at a time, feeds it to the decoder, and offers each recognized
//! [`KeyEvent`] to the shared [`EventQueue`] without ever blocking on it.
//!
//! # Shutdown order
//!
//! When capture ends (interrupt byte, end of input, or a read error) the use
//! case:
//!
//! 1. drops the byte source, which restores the terminal for real sources;
//! 2. closes the queue, which tells the publisher to drain and finish.
//!
//! Nothing is read after the interrupt byte.

use std::sync::Arc;

use arrowkey_core::{Decoded, EscapeDecoder, EventQueue, KeyEvent, PipelineStats, TryPutError};
use tracing::{debug, info, warn};

use crate::infrastructure::terminal::{ByteSource, TerminalError};

/// Why the capture loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The user pressed Ctrl-C.
    Interrupted,
    /// The byte source reached end of input.
    SourceClosed,
    /// The byte source failed; the message describes the I/O error.
    SourceFailed(String),
}

/// Reads, decodes, and enqueues arrow-key events until told to stop.
pub struct CaptureInputUseCase<S: ByteSource> {
    source: S,
    decoder: EscapeDecoder,
    queue: Arc<EventQueue>,
    stats: Arc<PipelineStats>,
}

impl<S: ByteSource> CaptureInputUseCase<S> {
    pub fn new(source: S, queue: Arc<EventQueue>, stats: Arc<PipelineStats>) -> Self {
        Self {
            source,
            decoder: EscapeDecoder::new(),
            queue,
            stats,
        }
    }

    /// Reads bytes until the decoder produces a key event or the interrupt.
    ///
    /// # Errors
    ///
    /// Propagates the first [`TerminalError`] from the byte source.
    pub fn next_signal(&mut self) -> Result<Decoded, TerminalError> {
        loop {
            let byte = self.source.read_byte()?;
            if let Some(decoded) = self.decoder.feed(byte) {
                return Ok(decoded);
            }
        }
    }

    /// Offers `event` to the queue, counting it as dropped when full.
    ///
    /// Returns `false` if the queue has been closed.
    pub fn enqueue(&self, event: KeyEvent) -> bool {
        self.stats.record_captured();
        match self.queue.try_put(event) {
            Ok(()) => {
                debug!(%event, "captured");
                true
            }
            Err(TryPutError::Full(event)) => {
                self.stats.record_dropped();
                warn!(%event, capacity = self.queue.capacity(), "event queue full; dropping event");
                true
            }
            Err(TryPutError::Closed(event)) => {
                debug!(%event, "event queue closed; dropping event");
                false
            }
        }
    }

    /// Runs the capture loop to completion.
    ///
    /// Releases the byte source and closes the queue before returning.
    pub fn run(mut self) -> CaptureOutcome {
        let outcome = loop {
            match self.next_signal() {
                Ok(Decoded::Key(event)) => {
                    if !self.enqueue(event) {
                        break CaptureOutcome::SourceClosed;
                    }
                }
                Ok(Decoded::Terminate(_)) => {
                    info!("interrupt received; stopping capture");
                    break CaptureOutcome::Interrupted;
                }
                Err(TerminalError::Closed) => {
                    info!("terminal input closed; stopping capture");
                    break CaptureOutcome::SourceClosed;
                }
                Err(e) => {
                    warn!("terminal read failed: {e}");
                    break CaptureOutcome::SourceFailed(e.to_string());
                }
            }
        };

        let Self { source, queue, .. } = self;
        drop(source);
        queue.close();
        outcome
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
