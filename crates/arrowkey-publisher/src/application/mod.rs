//! Application layer use cases for the arrow-key publisher.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules in `arrowkey_core`) and the infrastructure (terminal, network).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal ("every arrow key I
//!   press shows up on the broker, in order").
//! - **Depend on abstractions** (`ByteSource`, `BrokerClient`,
//!   `BrokerEventLoop`) rather than concrete implementations, so tests can
//!   swap in scripted input and an in-memory broker.
//!
//! # Sub-modules
//!
//! - **`capture_input`**  – Reads terminal bytes, decodes arrow keys, and
//!   offers them to the bounded queue without blocking.
//!
//! - **`publish_events`** – Drains the queue into the broker, discarding
//!   events whose publish fails.
//!
//! - **`pipeline`**       – Starts both workers, runs the broker event loop,
//!   and performs the ordered shutdown after Ctrl-C.

pub mod capture_input;
pub mod pipeline;
pub mod publish_events;
