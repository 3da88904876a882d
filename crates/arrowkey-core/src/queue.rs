//! Bounded, closable FIFO shared by the capture and publish threads.
//!
//! # Overflow policy (drop-newest)
//!
//! [`EventQueue::try_put`] never blocks.  When the queue already holds
//! `capacity` events the incoming event is rejected and handed back inside
//! [`TryPutError::Full`]; nothing already queued is touched.  Input capture
//! therefore stays responsive no matter how slowly the broker accepts
//! publishes.
//!
//! # Blocking consumer
//!
//! [`EventQueue::take`] parks the calling thread on a `Condvar` until an event
//! arrives.  After [`EventQueue::close`] the consumer still receives every
//! event that was queued before the close, then gets `None`; this is how the
//! publisher drains the queue during shutdown.
//!
//! # Synchronisation
//!
//! One `Mutex` guards both the `VecDeque` and the closed flag, so an insert
//! and a removal can never interleave halfway: each event is either appended
//! or rejected as a whole, and each slot is popped by exactly one `take`.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::domain::key_event::KeyEvent;

/// Errors returned when constructing a queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
}

/// Reasons [`EventQueue::try_put`] rejected an event.
///
/// The rejected event is returned to the caller so it can be logged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TryPutError {
    #[error("queue is full; dropped {0}")]
    Full(KeyEvent),
    #[error("queue is closed; dropped {0}")]
    Closed(KeyEvent),
}

impl TryPutError {
    /// The event that was not queued.
    pub fn into_event(self) -> KeyEvent {
        match self {
            TryPutError::Full(event) | TryPutError::Closed(event) => event,
        }
    }
}

#[derive(Debug)]
struct Slots {
    events: VecDeque<KeyEvent>,
    closed: bool,
    dropped: u64,
}

/// Slots reserved up front; larger queues grow on demand.
const PREALLOCATED_SLOTS: usize = 64;

/// Fixed-capacity key-event queue.
///
/// Share it between threads with `Arc<EventQueue>`; every method takes
/// `&self`.
#[derive(Debug)]
pub struct EventQueue {
    slots: Mutex<Slots>,
    available: Condvar,
    capacity: usize,
}

impl EventQueue {
    /// Creates an empty queue holding at most `capacity` events.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ZeroCapacity`] when `capacity` is 0.
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self {
            slots: Mutex::new(Slots {
                events: VecDeque::with_capacity(capacity.min(PREALLOCATED_SLOTS)),
                closed: false,
                dropped: 0,
            }),
            available: Condvar::new(),
            capacity,
        })
    }

    /// Appends `event` if there is room, without blocking.
    ///
    /// # Errors
    ///
    /// - [`TryPutError::Full`] when `len() == capacity()`; the event is dropped.
    /// - [`TryPutError::Closed`] after [`close`](Self::close) has been called.
    pub fn try_put(&self, event: KeyEvent) -> Result<(), TryPutError> {
        let mut slots = self.lock();
        if slots.closed {
            return Err(TryPutError::Closed(event));
        }
        if slots.events.len() >= self.capacity {
            slots.dropped += 1;
            return Err(TryPutError::Full(event));
        }
        slots.events.push_back(event);
        drop(slots);
        self.available.notify_one();
        Ok(())
    }

    /// Removes and returns the oldest event, blocking until one is available.
    ///
    /// Returns `None` only once the queue is closed **and** empty.
    pub fn take(&self) -> Option<KeyEvent> {
        let mut slots = self.lock();
        loop {
            if let Some(event) = slots.events.pop_front() {
                return Some(event);
            }
            if slots.closed {
                return None;
            }
            slots = self
                .available
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Stops accepting new events and wakes every blocked consumer.
    ///
    /// Events already queued remain available to [`take`](Self::take).
    /// Closing twice is harmless.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events rejected with [`TryPutError::Full`] so far.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    // A panic while the lock is held cannot leave `Slots` half-updated (every
    // mutation is a single VecDeque call or field store), so a poisoned lock
    // is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn cycle(i: usize) -> KeyEvent {
        KeyEvent::ALL[i % KeyEvent::ALL.len()]
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert_eq!(
            EventQueue::with_capacity(0).unwrap_err(),
            QueueError::ZeroCapacity
        );
    }

    #[test]
    fn test_huge_capacity_does_not_reserve_up_front() {
        // Arrange / Act
        let queue = EventQueue::with_capacity(usize::MAX).unwrap();
        queue.try_put(KeyEvent::Up).unwrap();

        // Assert
        assert_eq!(queue.capacity(), usize::MAX);
        assert_eq!(queue.take(), Some(KeyEvent::Up));
    }

    #[test]
    fn test_take_returns_events_in_insertion_order() {
        // Arrange
        let queue = EventQueue::with_capacity(8).unwrap();
        let events = [KeyEvent::Up, KeyEvent::Left, KeyEvent::Left, KeyEvent::Down];

        // Act
        for e in events {
            queue.try_put(e).unwrap();
        }
        let taken: Vec<_> = (0..events.len()).map(|_| queue.take().unwrap()).collect();

        // Assert
        assert_eq!(taken, events);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_drops_newest_and_keeps_first_twenty() {
        // Arrange
        let queue = EventQueue::with_capacity(20).unwrap();
        let inserted: Vec<_> = (0..25).map(cycle).collect();

        // Act
        let results: Vec<_> = inserted.iter().map(|&e| queue.try_put(e)).collect();

        // Assert – first 20 accepted, last 5 rejected with the event returned
        assert!(results[..20].iter().all(Result::is_ok));
        for (i, result) in results[20..].iter().enumerate() {
            assert_eq!(result, &Err(TryPutError::Full(inserted[20 + i])));
        }
        assert_eq!(queue.len(), 20);
        assert_eq!(queue.dropped(), 5);

        let retained: Vec<_> = (0..20).map(|_| queue.take().unwrap()).collect();
        assert_eq!(retained, inserted[..20]);
    }

    #[test]
    fn test_full_queue_accepts_again_after_take() {
        let queue = EventQueue::with_capacity(1).unwrap();
        queue.try_put(KeyEvent::Up).unwrap();
        assert!(matches!(queue.try_put(KeyEvent::Down), Err(TryPutError::Full(_))));

        assert_eq!(queue.take(), Some(KeyEvent::Up));
        assert_eq!(queue.try_put(KeyEvent::Down), Ok(()));
    }

    #[test]
    fn test_take_blocks_until_event_is_put() {
        // Arrange
        let queue = Arc::new(EventQueue::with_capacity(4).unwrap());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take())
        };

        // Act – give the consumer time to park before producing
        thread::sleep(Duration::from_millis(50));
        queue.try_put(KeyEvent::Right).unwrap();

        // Assert
        assert_eq!(consumer.join().unwrap(), Some(KeyEvent::Right));
    }

    #[test]
    fn test_close_drains_remaining_events_then_returns_none() {
        // Arrange
        let queue = EventQueue::with_capacity(4).unwrap();
        queue.try_put(KeyEvent::Up).unwrap();
        queue.try_put(KeyEvent::Down).unwrap();

        // Act
        queue.close();

        // Assert
        assert_eq!(queue.take(), Some(KeyEvent::Up));
        assert_eq!(queue.take(), Some(KeyEvent::Down));
        assert_eq!(queue.take(), None);
    }

    #[test]
    fn test_put_after_close_is_rejected() {
        let queue = EventQueue::with_capacity(4).unwrap();
        queue.close();
        assert_eq!(
            queue.try_put(KeyEvent::Left),
            Err(TryPutError::Closed(KeyEvent::Left))
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_close_wakes_blocked_consumer() {
        // Arrange
        let queue = Arc::new(EventQueue::with_capacity(4).unwrap());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take())
        };
        thread::sleep(Duration::from_millis(50));

        // Act
        queue.close();

        // Assert
        assert_eq!(consumer.join().unwrap(), None);
        assert!(queue.is_closed());
    }

    #[test]
    fn test_try_put_error_returns_rejected_event() {
        assert_eq!(TryPutError::Full(KeyEvent::Up).into_event(), KeyEvent::Up);
        assert_eq!(TryPutError::Closed(KeyEvent::Left).into_event(), KeyEvent::Left);
    }
}
