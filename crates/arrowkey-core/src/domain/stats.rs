//! Thread-safe pipeline counters.
//!
//! Dropped events and publish failures are never fatal, so the only way to
//! see them after the fact is through these counters.  The capture thread and
//! the publish thread update them concurrently; any thread may take a
//! [`StatsSnapshot`] at any time.
//!
//! # Atomic ordering
//!
//! Every counter is an independent `AtomicU64` updated with
//! `Ordering::Relaxed`.  The counters are diagnostics only: nothing reads one
//! counter to decide what to do with another, so no cross-counter ordering
//! is needed.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by the capture and publish threads.
#[derive(Debug, Default)]
pub struct PipelineStats {
    captured: AtomicU64,
    dropped: AtomicU64,
    published: AtomicU64,
    publish_failed: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Key events recognized by the decoder.
    pub captured: u64,
    /// Events rejected because the queue was full.
    pub dropped: u64,
    /// Events the broker client accepted for sending.  Acceptance is not
    /// delivery: requests still buffered when the session ends are lost and
    /// reported by the broker adapter, not subtracted here.
    pub published: u64,
    /// Events the broker refused.
    pub publish_failed: u64,
}

impl StatsSnapshot {
    /// Events that were accepted by the queue.
    pub fn queued(&self) -> u64 {
        self.captured.saturating_sub(self.dropped)
    }
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_captured(&self) {
        self.captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_failed(&self) {
        self.publish_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    ///
    /// Each field is read independently, so a snapshot taken while the
    /// pipeline is running may be off by one event between fields.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            captured: self.captured.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            publish_failed: self.publish_failed.load(Ordering::Relaxed),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
