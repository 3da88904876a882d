//! Domain entities for the arrow-key publisher.
//!
//! This module contains pure value types with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! The innermost layer of the application holds the concepts that make the
//! system what it is, here the four directional key events, the settings a
//! pipeline runs with, and the counters it reports.  Domain code:
//!
//! - Has **no** imports from terminal libraries, MQTT clients, or the OS.
//! - Can be compiled and tested on any platform without external setup.
//!
//! Code in outer layers (capture, publishing, the CLI) depends on the domain,
//! but the domain never depends on them.

/// Pipeline settings and their validation rules.
pub mod config;

/// [`key_event::KeyEvent`] and [`key_event::TerminationSignal`].
pub mod key_event;

/// Lock-free pipeline counters.
pub mod stats;
