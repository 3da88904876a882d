//! In-memory broker for tests.
//!
//! [`RecordingBroker`] stands in for an MQTT session: it records every publish,
//! can be told to reject specific calls, and shares a disconnect signal with
//! the [`ManualEventLoop`] obtained from [`RecordingBroker::event_loop`].  The
//! event loop behaves like the real one from the pipeline's point of view: it
//! reports a connection, then blocks until the client disconnects.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use arrowkey_core::KeyEvent;

use super::{BrokerError, BrokerEventLoop, ConnectionHandler};
use crate::application::publish_events::{BrokerClient, PublishError};

#[derive(Debug, Default)]
struct DisconnectSignal {
    disconnected: Mutex<bool>,
    changed: Condvar,
}

impl DisconnectSignal {
    fn set(&self) {
        *lock(&self.disconnected) = true;
        self.changed.notify_all();
    }

    fn wait(&self) {
        let mut disconnected = lock(&self.disconnected);
        while !*disconnected {
            disconnected = self
                .changed
                .wait(disconnected)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A [`BrokerClient`] that records publishes in memory.
#[derive(Debug, Default)]
pub struct RecordingBroker {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    calls: Mutex<usize>,
    fail_on: HashSet<usize>,
    publish_delay: Option<Duration>,
    disconnects: Mutex<usize>,
    signal: Arc<DisconnectSignal>,
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the publish calls whose zero-based index is in `calls`.
    pub fn failing_on(calls: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fail_on: calls.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Sleeps for `delay` inside every publish, simulating a slow broker.
    pub fn with_publish_delay(mut self, delay: Duration) -> Self {
        self.publish_delay = Some(delay);
        self
    }

    /// An event loop that runs until this broker is disconnected.
    pub fn event_loop(&self) -> ManualEventLoop {
        ManualEventLoop {
            signal: Arc::clone(&self.signal),
            failure: None,
        }
    }

    /// Every accepted `(topic, payload)` pair, in publish order.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        lock(&self.published).clone()
    }

    /// Accepted payloads parsed back into key events.
    pub fn published_events(&self) -> Vec<KeyEvent> {
        lock(&self.published)
            .iter()
            .filter_map(|(_, payload)| std::str::from_utf8(payload).ok()?.parse().ok())
            .collect()
    }

    /// Total publish calls, accepted or rejected.
    pub fn publish_calls(&self) -> usize {
        *lock(&self.calls)
    }

    pub fn disconnect_count(&self) -> usize {
        *lock(&self.disconnects)
    }
}

impl BrokerClient for RecordingBroker {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        if let Some(delay) = self.publish_delay {
            thread::sleep(delay);
        }
        let index = {
            let mut calls = lock(&self.calls);
            let index = *calls;
            *calls += 1;
            index
        };
        if self.fail_on.contains(&index) {
            return Err(PublishError::Rejected {
                topic: topic.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        lock(&self.published).push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn disconnect(&self) -> Result<(), PublishError> {
        *lock(&self.disconnects) += 1;
        self.signal.set();
        Ok(())
    }
}

/// Event loop paired with a [`RecordingBroker`].
#[derive(Debug)]
pub struct ManualEventLoop {
    signal: Arc<DisconnectSignal>,
    failure: Option<String>,
}

impl ManualEventLoop {
    /// An event loop that fails immediately with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            signal: Arc::new(DisconnectSignal::default()),
            failure: Some(reason.into()),
        }
    }
}

impl BrokerEventLoop for ManualEventLoop {
    fn run(&mut self, handler: &dyn ConnectionHandler) -> Result<(), BrokerError> {
        if let Some(reason) = self.failure.take() {
            return Err(BrokerError::EventLoop(reason));
        }
        handler.on_connect(false);
        self.signal.wait();
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::broker::LoggingHandler;

    #[test]
    fn test_records_publishes_and_injects_failures() {
        // Arrange
        let broker = RecordingBroker::failing_on([1]);

        // Act
        let first = broker.publish("t", b"UP");
        let second = broker.publish("t", b"DOWN");
        let third = broker.publish("t", b"LEFT");

        // Assert
        assert!(first.is_ok());
        assert!(matches!(second, Err(PublishError::Rejected { .. })));
        assert!(third.is_ok());
        assert_eq!(broker.publish_calls(), 3);
        assert_eq!(broker.published_events(), vec![KeyEvent::Up, KeyEvent::Left]);
    }

    #[test]
    fn test_event_loop_returns_after_disconnect() {
        // Arrange
        let broker = Arc::new(RecordingBroker::new());
        let mut event_loop = broker.event_loop();
        let runner = thread::spawn(move || event_loop.run(&LoggingHandler));

        // Act
        thread::sleep(Duration::from_millis(20));
        broker.disconnect().unwrap();

        // Assert
        assert_eq!(runner.join().unwrap(), Ok(()));
        assert_eq!(broker.disconnect_count(), 1);
    }

    #[test]
    fn test_failing_event_loop_reports_error() {
        let mut event_loop = ManualEventLoop::failing("network down");
        assert_eq!(
            event_loop.run(&LoggingHandler),
            Err(BrokerError::EventLoop("network down".to_string()))
        );
    }
}
