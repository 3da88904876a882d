//! PublishEventsUseCase: drains the event queue into the message broker.
//!
//! The publisher is the single consumer of the shared [`EventQueue`].  It
//! blocks on [`EventQueue::take`], publishes each event's payload to the
//! configured topic, and returns once the queue has been closed and emptied.
//!
//! # Failure handling
//!
//! A failed publish is logged, counted in [`PipelineStats`], and the event is
//! discarded.  It is never put back in the queue, so one bad publish cannot
//! reorder later events or stall the drain.
//!
//! # Architecture
//!
//! The broker is reached only through the [`BrokerClient`] trait.  The MQTT
//! implementation lives in `infrastructure::broker::mqtt`; tests inject a
//! recording double or a `mockall` mock.

use std::sync::Arc;

use arrowkey_core::{EventQueue, KeyEvent, PipelineStats};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error type for broker client operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    /// The broker (or its outgoing request buffer) rejected the message.
    #[error("publish to '{topic}' rejected: {reason}")]
    Rejected { topic: String, reason: String },
    /// The client has no live connection to hand the request to.
    #[error("broker client is disconnected: {0}")]
    Disconnected(String),
}

/// Outbound half of a broker session.
///
/// Implementations must be cheap to call from the publisher thread and must
/// not block indefinitely while the broker is unreachable.
pub trait BrokerClient: Send + Sync {
    /// Hands `payload` to the broker for delivery on `topic`.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;

    /// Asks the broker session to end once queued requests are flushed.
    fn disconnect(&self) -> Result<(), PublishError>;
}

/// Publishes queued key events until the queue is closed and empty.
pub struct PublishEventsUseCase {
    queue: Arc<EventQueue>,
    broker: Arc<dyn BrokerClient>,
    topic: String,
    stats: Arc<PipelineStats>,
}

impl PublishEventsUseCase {
    pub fn new(
        queue: Arc<EventQueue>,
        broker: Arc<dyn BrokerClient>,
        topic: impl Into<String>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            queue,
            broker,
            topic: topic.into(),
            stats,
        }
    }

    /// Publishes a single event and records the outcome.
    ///
    /// # Errors
    ///
    /// Returns the broker's [`PublishError`]; the event is not retried.
    pub fn publish_one(&self, event: KeyEvent) -> Result<(), PublishError> {
        match self.broker.publish(&self.topic, event.payload()) {
            Ok(()) => {
                self.stats.record_published();
                debug!(%event, topic = %self.topic, "published");
                Ok(())
            }
            Err(e) => {
                self.stats.record_publish_failed();
                Err(e)
            }
        }
    }

    /// Drains the queue, returning the number of events published.
    ///
    /// Blocks while the queue is empty and open.  Returns after the queue has
    /// been closed and every event queued before the close has been handled.
    pub fn run(&self) -> u64 {
        let mut published = 0u64;
        while let Some(event) = self.queue.take() {
            match self.publish_one(event) {
                Ok(()) => published += 1,
                Err(e) => warn!(%event, "discarding event: {e}"),
            }
        }
        info!(published, "event queue drained");
        published
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
