//! Pipeline: wires capture, queue, publisher, and broker event loop together.
//!
//! # Threads
//!
//! ```text
//!  arrowkey-capture           arrowkey-publish           caller (main)
//!  ───────────────           ────────────────           ─────────────
//!  read byte                  take() ◀── EventQueue       BrokerEventLoop::run
//!  decode                     publish ──▶ BrokerClient ──▶   (network I/O)
//!  try_put ──▶ EventQueue
//! ```
//!
//! # Shutdown
//!
//! 1. Capture sees Ctrl-C (or loses its input), releases the terminal, and
//!    closes the queue.
//! 2. The publisher drains what is left, then asks the broker to disconnect.
//! 3. The event loop sees the disconnect and returns.  While the broker is
//!    unreachable it returns on its next connection error instead.
//! 4. [`Pipeline::run`] joins both workers and returns a [`PipelineReport`].
//!
//! Both workers hold a guard that performs their shutdown step even if they
//! panic, so a crashed worker cannot leave the others waiting forever.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use arrowkey_core::{
    ConfigError, EventQueue, PipelineConfig, PipelineStats, QueueError, StatsSnapshot,
};
use thiserror::Error;
use tracing::{error, info, warn};

use super::capture_input::{CaptureInputUseCase, CaptureOutcome};
use super::publish_events::{BrokerClient, PublishEventsUseCase};
use crate::infrastructure::broker::{BrokerError, BrokerEventLoop, ConnectionHandler};
use crate::infrastructure::terminal::ByteSource;

/// Error type for running the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Why capture stopped.
    pub capture: CaptureOutcome,
    /// Events the drain loop handed to the broker client.
    pub published: u64,
    /// Final counter values.
    pub stats: StatsSnapshot,
}

struct CloseQueueOnDrop(Arc<EventQueue>);

impl Drop for CloseQueueOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

struct DisconnectOnDrop(Arc<dyn BrokerClient>);

impl Drop for DisconnectOnDrop {
    fn drop(&mut self) {
        if let Err(e) = self.0.disconnect() {
            warn!("broker disconnect failed: {e}");
        }
    }
}

/// A configured capture-and-publish pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    broker: Arc<dyn BrokerClient>,
    stats: Arc<PipelineStats>,
}

impl Pipeline {
    /// Validates `config` and prepares a pipeline publishing through `broker`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the configuration is invalid.
    pub fn new(config: PipelineConfig, broker: Arc<dyn BrokerClient>) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            broker,
            stats: Arc::new(PipelineStats::new()),
        })
    }

    /// Live counters; safe to read while [`run`](Self::run) is in progress.
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Runs until capture stops and the queue has been drained.
    ///
    /// `event_loop` is driven on the calling thread.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Broker`] if the event loop fails.  The queue is
    ///   closed and the publisher joined; the capture thread is left running
    ///   because it may be blocked in a terminal read.
    /// - [`PipelineError::Spawn`] if a worker thread cannot be started.
    /// - [`PipelineError::WorkerPanicked`] if a worker panicked.
    pub fn run<S, L>(
        self,
        source: S,
        event_loop: &mut L,
        handler: &dyn ConnectionHandler,
    ) -> Result<PipelineReport, PipelineError>
    where
        S: ByteSource + 'static,
        L: BrokerEventLoop + ?Sized,
    {
        let queue = Arc::new(EventQueue::with_capacity(self.config.queue_capacity)?);

        let capture = {
            let queue = Arc::clone(&queue);
            let stats = Arc::clone(&self.stats);
            spawn("arrowkey-capture", move || {
                let _close = CloseQueueOnDrop(Arc::clone(&queue));
                CaptureInputUseCase::new(source, queue, stats).run()
            })?
        };

        let publisher = {
            let use_case = PublishEventsUseCase::new(
                Arc::clone(&queue),
                Arc::clone(&self.broker),
                self.config.topic.clone(),
                Arc::clone(&self.stats),
            );
            let broker = Arc::clone(&self.broker);
            let spawned = spawn("arrowkey-publish", move || {
                let _disconnect = DisconnectOnDrop(broker);
                use_case.run()
            });
            match spawned {
                Ok(handle) => handle,
                Err(e) => {
                    queue.close();
                    return Err(e);
                }
            }
        };

        info!(
            topic = %self.config.topic,
            capacity = self.config.queue_capacity,
            "pipeline running; press Ctrl-C to stop"
        );

        if let Err(e) = event_loop.run(handler) {
            error!("broker event loop failed: {e}");
            queue.close();
            let _ = publisher.join();
            return Err(e.into());
        }

        let capture = capture
            .join()
            .map_err(|_| PipelineError::WorkerPanicked("capture"))?;
        let published = publisher
            .join()
            .map_err(|_| PipelineError::WorkerPanicked("publish"))?;

        let stats = self.stats.snapshot();
        info!(
            ?capture,
            captured = stats.captured,
            dropped = stats.dropped,
            published = stats.published,
            publish_failed = stats.publish_failed,
            "pipeline stopped"
        );
        Ok(PipelineReport {
            capture,
            published,
            stats,
        })
    }
}

fn spawn<T, F>(name: &'static str, f: F) -> Result<JoinHandle<T>, PipelineError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|source| PipelineError::Spawn { name, source })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::broker::mock::RecordingBroker;
    use crate::infrastructure::broker::LoggingHandler;
    use crate::infrastructure::terminal::mock::ScriptedByteSource;

    #[test]
    fn test_invalid_config_is_rejected_before_running() {
        let config = PipelineConfig {
            queue_capacity: 0,
            ..PipelineConfig::default()
        };
        let result = Pipeline::new(config, Arc::new(RecordingBroker::new()));
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::ZeroCapacity))
        ));
    }

    #[test]
    fn test_run_publishes_then_disconnects_once() {
        // Arrange
        let broker = Arc::new(RecordingBroker::new());
        let mut event_loop = broker.event_loop();
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            Arc::clone(&broker) as Arc<dyn BrokerClient>,
        )
        .unwrap();

        // Act
        let report = pipeline
            .run(
                ScriptedByteSource::new(b"\x1b[B\x1b[C\x03".to_vec()),
                &mut event_loop,
                &LoggingHandler,
            )
            .unwrap();

        // Assert
        assert_eq!(report.capture, CaptureOutcome::Interrupted);
        assert_eq!(report.published, 2);
        assert_eq!(
            broker.published_events(),
            vec![arrowkey_core::KeyEvent::Down, arrowkey_core::KeyEvent::Right]
        );
        assert_eq!(broker.disconnect_count(), 1);
    }

    #[test]
    fn test_stats_handle_reflects_final_counts() {
        let broker = Arc::new(RecordingBroker::new());
        let mut event_loop = broker.event_loop();
        let pipeline = Pipeline::new(PipelineConfig::default(), broker.clone()).unwrap();
        let stats = pipeline.stats();

        let report = pipeline
            .run(
                ScriptedByteSource::new(b"\x1b[A\x03".to_vec()),
                &mut event_loop,
                &LoggingHandler,
            )
            .unwrap();

        assert_eq!(stats.snapshot(), report.stats);
        assert_eq!(report.stats.captured, 1);
    }
}
