//! Infrastructure layer for the arrow-key publisher.
//!
//! Contains OS-facing adapters: the raw-mode terminal reader and the MQTT
//! broker session, plus in-memory doubles of both for tests.
//!
//! **Dependency rule**: this layer may depend on `application` traits and
//! `arrowkey_core`, but the use cases only ever see it through those traits.

pub mod broker;
pub mod terminal;
