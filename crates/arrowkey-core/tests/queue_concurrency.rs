//! Integration tests for the event queue under real thread contention.
//!
//! One producer and one consumer run simultaneously with pseudo-random
//! scheduling delays.  Every event carries its position in the producer's
//! stream (encoded through the repeating four-key cycle plus a side channel),
//! so duplicates and reordering are detectable.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use arrowkey_core::{EventQueue, KeyEvent, TryPutError};

/// Tiny xorshift generator; deterministic per seed so failures reproduce.
struct Jitter(u64);

impl Jitter {
    fn next_micros(&mut self, max: u64) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0 % max
    }

    fn pause(&mut self) {
        match self.next_micros(4) {
            0 => thread::yield_now(),
            1 => thread::sleep(Duration::from_micros(self.next_micros(200))),
            _ => {}
        }
    }
}

fn event_for(i: usize) -> KeyEvent {
    KeyEvent::ALL[i % 4]
}

#[test]
fn test_spsc_with_jitter_preserves_order_and_never_duplicates() {
    for seed in [0x9E37_79B9_u64, 0xDEAD_BEEF, 0x1234_5678] {
        // Arrange
        const TOTAL: usize = 2_000;
        let queue = Arc::new(EventQueue::with_capacity(20).unwrap());
        // Indices of accepted events, in the order the producer queued them.
        let accepted = Arc::new(Mutex::new(Vec::new()));

        let producer = {
            let queue = Arc::clone(&queue);
            let accepted = Arc::clone(&accepted);
            thread::spawn(move || {
                let mut jitter = Jitter(seed);
                for i in 0..TOTAL {
                    // Record before inserting so the consumer can never see
                    // an event whose index has not been logged yet.
                    let mut log = accepted.lock().unwrap();
                    match queue.try_put(event_for(i)) {
                        Ok(()) => log.push(i),
                        Err(TryPutError::Full(_)) => {}
                        Err(TryPutError::Closed(_)) => panic!("queue closed early"),
                    }
                    drop(log);
                    jitter.pause();
                }
                queue.close();
            })
        };

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut jitter = Jitter(seed.rotate_left(17));
                let mut received = Vec::new();
                while let Some(event) = queue.take() {
                    received.push(event);
                    jitter.pause();
                }
                received
            })
        };

        // Act
        producer.join().unwrap();
        let received = consumer.join().unwrap();

        // Assert – the consumer saw exactly the accepted events, in order
        let accepted = accepted.lock().unwrap();
        let expected: Vec<KeyEvent> = accepted.iter().map(|&i| event_for(i)).collect();
        assert_eq!(received.len(), accepted.len(), "seed {seed:#x}: lost or duplicated");
        assert_eq!(received, expected, "seed {seed:#x}: reordered");
        assert!(!accepted.is_empty());
    }
}

#[test]
fn test_producer_never_blocks_when_consumer_is_stalled() {
    // Arrange
    let queue = Arc::new(EventQueue::with_capacity(20).unwrap());
    let stall = Arc::new(Mutex::new(()));
    let guard = stall.lock().unwrap();

    let consumer = {
        let queue = Arc::clone(&queue);
        let stall = Arc::clone(&stall);
        thread::spawn(move || {
            // Blocks until the test releases the stall.
            let _g = stall.lock().unwrap();
            let mut n = 0;
            while queue.take().is_some() {
                n += 1;
            }
            n
        })
    };

    // Act – 25 puts with nobody draining must complete immediately
    let results: Vec<_> = (0..25).map(|i| queue.try_put(event_for(i))).collect();

    // Assert
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 20);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(TryPutError::Full(_))))
            .count(),
        5
    );

    queue.close();
    drop(guard);
    assert_eq!(consumer.join().unwrap(), 20);
}
