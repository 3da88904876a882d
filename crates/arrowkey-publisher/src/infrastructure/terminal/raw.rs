//! Raw-mode terminal reader backed by `crossterm`.
//!
//! [`RawTerminal::acquire`] saves the current terminal attributes and
//! switches standard input to raw mode.  The saved attributes are put back
//! exactly once, by whichever of these happens first:
//!
//! - dropping the [`RawTerminal`];
//! - [`RestoreHandle::restore`] called from another owner (the binary keeps
//!   one for its error paths);
//! - the panic hook installed by [`install_panic_restore`].

use std::io::{self, IsTerminal, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossterm::terminal;
use tracing::{debug, warn};

use super::{ByteSource, TerminalError};

/// Shared "restore the terminal once" switch.
#[derive(Debug, Clone)]
pub struct RestoreHandle {
    restored: Arc<AtomicBool>,
}

impl RestoreHandle {
    fn new() -> Self {
        Self {
            restored: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Restores the saved terminal attributes if no one has done so yet.
    ///
    /// Returns `Ok(true)` when this call performed the restore and `Ok(false)`
    /// when it had already happened.
    ///
    /// # Errors
    ///
    /// Returns the I/O error reported by the terminal driver.  The handle is
    /// still marked restored, so the attempt is not repeated.
    pub fn restore(&self) -> io::Result<bool> {
        if self.restored.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        terminal::disable_raw_mode()?;
        debug!("terminal restored to its previous mode");
        Ok(true)
    }
}

/// Standard input in raw mode.
pub struct RawTerminal {
    stdin: io::Stdin,
    restore: RestoreHandle,
}

impl RawTerminal {
    /// Switches standard input into raw mode.
    ///
    /// # Errors
    ///
    /// - [`TerminalError::NotATerminal`] if stdin is not a TTY.
    /// - [`TerminalError::RawMode`] if the attribute change fails.
    pub fn acquire() -> Result<Self, TerminalError> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Err(TerminalError::NotATerminal);
        }
        terminal::enable_raw_mode().map_err(TerminalError::RawMode)?;
        debug!("terminal switched to raw mode");
        Ok(Self {
            stdin,
            restore: RestoreHandle::new(),
        })
    }

    /// Returns a handle that can restore the terminal from another thread.
    pub fn restore_handle(&self) -> RestoreHandle {
        self.restore.clone()
    }
}

impl ByteSource for RawTerminal {
    fn read_byte(&mut self) -> Result<u8, TerminalError> {
        let mut buf = [0u8; 1];
        loop {
            match self.stdin.read(&mut buf) {
                Ok(0) => return Err(TerminalError::Closed),
                Ok(_) => return Ok(buf[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TerminalError::Read(e)),
            }
        }
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if let Err(e) = self.restore.restore() {
            warn!("failed to restore terminal mode: {e}");
        }
    }
}

/// Chains a panic hook that restores the terminal before the default hook
/// prints the panic message.
pub fn install_panic_restore(handle: RestoreHandle) {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = handle.restore();
        original_hook(info);
    }));
}
