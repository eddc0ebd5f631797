//! Transport trait for instrument communication.
//!
//! The [`Transport`] trait abstracts over the physical link to an instrument.
//! `alicat-transport` implements it for serial ports and
//! `alicat-test-harness` provides a scripted mock, so the line-protocol
//! engine runs unchanged against real hardware and in deterministic tests.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to an instrument.
///
/// Protocol concerns (line framing, unit addressing, response matching) live
/// in the engine that consumes this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the instrument.
    ///
    /// Implementations should return once all bytes have been handed to the
    /// underlying port.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive whatever bytes are currently available.
    ///
    /// Returns the number of bytes read, which may be zero. Waits at most
    /// `timeout` for data; an elapsed window is reported as
    /// [`Error::Timeout`](crate::error::Error::Timeout). A zero `timeout`
    /// makes the read non-blocking.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
