//! alicat-test-harness: Test utilities and mock transports for alicat.
//!
//! This crate provides [`MockTransport`] for deterministic testing of the
//! line-protocol engine without a real instrument, and [`MockProbe`] for
//! inspecting what the engine wrote and how often it read after the mock
//! has been moved into a session.

pub mod mock_serial;

pub use mock_serial::{MockProbe, MockTransport};
