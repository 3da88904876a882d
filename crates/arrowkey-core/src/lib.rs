//! # arrowkey-core
//!
//! Shared library for the arrow-key publisher containing the key-event domain
//! types, the terminal escape-sequence decoder, and the bounded event queue
//! that sits between input capture and broker publishing.
//!
//! It has zero dependencies on OS APIs, terminals, or network sockets, so
//! every piece can be exercised from plain unit tests.
//!
//! # Architecture overview (for beginners)
//!
//! The publisher reads raw bytes from a terminal, turns arrow-key escape
//! sequences into [`KeyEvent`]s, and forwards them to an MQTT topic.  Capture
//! and publishing run on different threads so a slow broker never stalls the
//! keyboard.  This crate provides the pieces in the middle:
//!
//! - **`decoder`** – A three-state machine that consumes one byte at a time
//!   and recognizes `ESC [ A|B|C|D` plus the Ctrl-C interrupt byte.
//!
//! - **`queue`** – A fixed-capacity FIFO shared between the capture thread
//!   (producer) and the publish thread (consumer).  Inserting never blocks:
//!   when the queue is full the newest event is dropped.
//!
//! - **`domain`** – The [`KeyEvent`] value type, pipeline configuration, and
//!   the counters used for diagnostics.

pub mod decoder;
pub mod domain;
pub mod queue;

pub use decoder::{Decoded, DecoderState, EscapeDecoder};
pub use domain::config::{ConfigError, PipelineConfig, QualityOfService, MAX_QUEUE_CAPACITY};
pub use domain::key_event::{KeyEvent, TerminationSignal};
pub use domain::stats::{PipelineStats, StatsSnapshot};
pub use queue::{EventQueue, QueueError, TryPutError};
