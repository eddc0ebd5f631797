//! Serial line to one or more instruments.
//!
//! The link is always 8 data bits, no parity, one stop bit, no flow control;
//! only the baud rate varies between installations. A [`receive`] waits at
//! most the window it is given and reports [`Error::Timeout`] when nothing
//! arrived, which the line reader counts as an empty attempt.
//!
//! [`receive`]: Transport::receive

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{
    DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream, StopBits,
};
use tracing::{debug, info, trace, warn};

use alicat_core::error::{Error, Result};
use alicat_core::transport::Transport;

/// Factory default baud rate of Alicat instruments.
pub const DEFAULT_BAUD_RATE: u32 = 19200;

/// An open 8N1 serial line.
pub struct SerialTransport {
    stream: Option<SerialStream>,
    path: String,
}

impl SerialTransport {
    /// Open `path` (e.g. `/dev/ttyUSB0`, `COM3`) at `baud_rate`.
    ///
    /// DTR and RTS are left de-asserted; RS-485 adapters that key their
    /// driver on RTS would otherwise hold the bus.
    pub async fn open(path: &str, baud_rate: u32) -> Result<Self> {
        if baud_rate == 0 {
            return Err(Error::InvalidParameter("baud rate must be non-zero".into()));
        }

        let mut stream = tokio_serial::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| Error::Transport(format!("cannot open {path}: {e}")))?;

        for (line, result) in [
            ("DTR", stream.write_data_terminal_ready(false)),
            ("RTS", stream.write_request_to_send(false)),
        ] {
            if let Err(e) = result {
                warn!(path, line, error = %e, "could not de-assert control line");
            }
        }

        info!(path, baud_rate, "serial line open");
        Ok(SerialTransport {
            stream: Some(stream),
            path: path.to_string(),
        })
    }

    /// Device path the line was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn stream(&mut self) -> Result<&mut SerialStream> {
        self.stream.as_mut().ok_or(Error::NotConnected)
    }
}

/// A vanished USB adapter surfaces as one of these kinds; anything else is
/// reported as-is.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::UnexpectedEof => {
            Error::ConnectionLost
        }
        _ => Error::Io(e),
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let path = self.path.clone();
        let stream = self.stream()?;
        trace!(path = %path, data = %String::from_utf8_lossy(data).escape_debug(), "tx");
        stream.write_all(data).await.map_err(map_io_error)?;
        stream.flush().await.map_err(map_io_error)
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let path = self.path.clone();
        let stream = self.stream()?;
        // A zero window still returns bytes that are already buffered.
        let n = tokio::time::timeout(timeout, stream.read(buf))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(map_io_error)?;
        trace!(path = %path, data = %String::from_utf8_lossy(&buf[..n]).escape_debug(), "rx");
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.flush().await {
                debug!(path = %self.path, error = %e, "flush on close failed");
            }
            info!(path = %self.path, "serial line closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanished_adapter_is_connection_lost() {
        for kind in [ErrorKind::BrokenPipe, ErrorKind::NotConnected, ErrorKind::UnexpectedEof] {
            let e = map_io_error(std::io::Error::new(kind, "gone"));
            assert!(matches!(e, Error::ConnectionLost), "{kind:?}");
        }
    }

    #[test]
    fn other_io_errors_pass_through() {
        let e = map_io_error(std::io::Error::new(ErrorKind::Other, "framing"));
        assert!(matches!(e, Error::Io(_)));
    }

    #[tokio::test]
    async fn open_missing_port_is_transport_error() {
        let result = SerialTransport::open("/dev/this-port-does-not-exist", DEFAULT_BAUD_RATE).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn open_rejects_zero_baud() {
        let result = SerialTransport::open("/dev/ttyUSB0", 0).await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }
}
