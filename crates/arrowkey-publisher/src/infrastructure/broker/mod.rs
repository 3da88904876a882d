//! Message broker infrastructure.
//!
//! A broker session has two halves:
//!
//! - the outbound client ([`crate::application::publish_events::BrokerClient`]),
//!   used by the publisher thread to hand off messages;
//! - the event loop ([`BrokerEventLoop`]), which owns the network connection,
//!   keeps it alive, reconnects after failures, and reports what happens to
//!   a [`ConnectionHandler`].
//!
//! The event loop runs on the main thread until the client asks it to
//! disconnect.

use thiserror::Error;
use tracing::{debug, info, warn};

pub mod mock;
pub mod mqtt;

/// Error type for broker session setup and the event loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// The initial connection could not be established.
    #[error("failed to connect to broker at {addr}: {reason}")]
    Connect { addr: String, reason: String },
    /// The broker answered the CONNECT packet with a non-success code.
    #[error("broker at {addr} refused the connection: {reason}")]
    Refused { addr: String, reason: String },
    /// The event loop stopped for a reason other than a requested disconnect.
    #[error("broker event loop stopped: {0}")]
    EventLoop(String),
}

/// Callbacks invoked by the event loop.
///
/// Every method has an empty default so implementors override only what they
/// care about.
pub trait ConnectionHandler: Send + Sync {
    /// The broker acknowledged a (re)connection.
    fn on_connect(&self, _session_present: bool) {}

    /// A message arrived on a subscribed topic.
    fn on_message(&self, _topic: &str, _payload: &[u8]) {}

    /// The connection failed; the event loop will retry.
    fn on_connection_error(&self, _error: &str) {}
}

/// Reports connection activity through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ConnectionHandler for LoggingHandler {
    fn on_connect(&self, session_present: bool) {
        info!(session_present, "connected to broker");
    }

    fn on_message(&self, topic: &str, payload: &[u8]) {
        debug!(topic, bytes = payload.len(), "incoming message");
    }

    fn on_connection_error(&self, error: &str) {
        warn!("broker connection error: {error}; retrying");
    }
}

/// Drives a broker connection until the session is closed.
pub trait BrokerEventLoop {
    /// Processes network events until the client disconnects.
    ///
    /// Transient connection errors are reported to `handler` and retried.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::EventLoop`] if the loop cannot continue.
    fn run(&mut self, handler: &dyn ConnectionHandler) -> Result<(), BrokerError>;
}
