//! InstrumentBuilder -- fluent builder for constructing [`Instrument`] sessions.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters, poll budgets, and read timing before the port is
//! opened.
//!
//! # Example
//!
//! ```no_run
//! use alicat::builder::InstrumentBuilder;
//! use alicat::models::flow_meter;
//! use std::time::Duration;
//!
//! # async fn example() -> alicat_core::Result<()> {
//! let mut instrument = InstrumentBuilder::new(flow_meter())
//!     .serial_port("/dev/ttyUSB0")
//!     .baud_rate(19200)
//!     .read_timeout(Duration::from_millis(50))
//!     .build()
//!     .await?;
//! let unit: alicat_core::UnitId = "A".parse()?;
//! let frame = instrument.poll_data(&unit).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use alicat_core::error::{Error, Result};
use alicat_core::transport::Transport;
use alicat_text_io::EngineConfig;

use crate::instrument::{DEFAULT_POLL_ATTEMPTS, DEFAULT_RESEND_AFTER, Instrument};
use crate::models::InstrumentModel;

/// Fluent builder for [`Instrument`].
///
/// All configuration has defaults, so the simplest usage is:
///
/// ```ignore
/// let instrument = InstrumentBuilder::new(flow_meter())
///     .serial_port("/dev/ttyUSB0")
///     .build()
///     .await?;
/// ```
pub struct InstrumentBuilder {
    model: InstrumentModel,
    serial_port: Option<String>,
    baud_rate: Option<u32>,
    config: EngineConfig,
    poll_attempts: u32,
    resend_after: u32,
    cancel: Option<CancellationToken>,
}

impl InstrumentBuilder {
    /// Create a new builder for the given instrument model.
    pub fn new(model: InstrumentModel) -> Self {
        InstrumentBuilder {
            model,
            serial_port: None,
            baud_rate: None,
            config: EngineConfig::default(),
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            resend_after: DEFAULT_RESEND_AFTER,
            cancel: None,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the model's default baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = Some(baud);
        self
    }

    /// Upper bound on a single port read (default: 20ms).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Pause between unanswered read attempts (default: 10ms).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Reads a poll waits before giving up (default: 10).
    pub fn poll_attempts(mut self, attempts: u32) -> Self {
        self.poll_attempts = attempts;
        self
    }

    /// Unanswered reads before a configuration command is resent (default: 5).
    pub fn resend_after(mut self, attempts: u32) -> Self {
        self.resend_after = attempts;
        self
    }

    /// Token that aborts configuration resend loops with [`Error::Cancelled`].
    ///
    /// Without one, configuration requests wait until the instrument
    /// answers or the caller drops the future. Polls and fire-and-forget
    /// commands ignore it; see
    /// [`Instrument::set_cancel_token`](crate::Instrument::set_cancel_token)
    /// to replace a fired token.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build an [`Instrument`] with a caller-provided transport.
    ///
    /// This is the primary entry point for testing (pass a
    /// `MockTransport` from `alicat-test-harness`).
    pub fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Instrument> {
        if self.poll_attempts == 0 {
            return Err(Error::InvalidParameter("poll_attempts must be at least 1".into()));
        }
        if self.resend_after == 0 {
            return Err(Error::InvalidParameter("resend_after must be at least 1".into()));
        }
        let baud = self.baud_rate.unwrap_or(self.model.default_baud_rate);
        if baud == 0 {
            return Err(Error::InvalidParameter("baud_rate must be non-zero".into()));
        }

        Ok(Instrument::new(
            transport,
            self.model,
            baud,
            self.config,
            self.poll_attempts,
            self.resend_after,
            self.cancel,
        ))
    }

    /// Build an [`Instrument`] on a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    /// The baud rate defaults to the model's default if not overridden.
    pub async fn build(self) -> Result<Instrument> {
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        let baud = self.baud_rate.unwrap_or(self.model.default_baud_rate);

        let transport = alicat_transport::SerialTransport::open(port, baud).await?;
        info!(port, baud, model = self.model.name, "instrument session opened");
        self.build_with_transport(Box::new(transport))
    }
}
