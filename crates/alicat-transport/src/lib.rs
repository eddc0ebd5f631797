//! Transport implementations for alicat.
//!
//! Provides [`SerialTransport`], the concrete [`Transport`](alicat_core::Transport)
//! for USB virtual COM ports and RS-232/RS-485 adapters. Framing is fixed at
//! 8N1; instruments ship at [`DEFAULT_BAUD_RATE`].
//!
//! # Example
//!
//! ```no_run
//! use alicat_transport::SerialTransport;
//! use alicat_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> alicat_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 19200).await?;
//!
//! // Poll unit A.
//! transport.send(b"A\r").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_millis(50)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{SerialTransport, DEFAULT_BAUD_RATE};
