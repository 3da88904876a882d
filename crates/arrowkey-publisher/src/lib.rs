//! arrowkey-publisher library entry point.
//!
//! Exposes the module tree so that integration tests in `tests/` and the
//! binary entry point in `main.rs` share the same code.

pub mod application;
pub mod infrastructure;
