//! Line framing for carriage-return terminated ASCII protocols.
//!
//! Instruments answer with ASCII text terminated by `\r`. Bytes arrive in
//! arbitrary fragments, so [`LineReader`] accumulates them and hands out one
//! complete line at a time. Lines are decoded lossily: a corrupted byte near
//! a device reset or a baud mismatch becomes U+FFFD instead of aborting the
//! read loop.

use std::time::Duration;

use tracing::{trace, warn};

use alicat_core::error::{Error, Result};
use alicat_core::transport::Transport;

/// The carriage-return byte that terminates every line.
pub const TERMINATOR: u8 = b'\r';

/// Maximum buffer size before reset to prevent unbounded growth.
/// Instrument lines are well under 100 bytes; 8192 is generous headroom.
pub const MAX_BUF: usize = 8192;

/// Size of the scratch buffer handed to each transport read.
const READ_CHUNK: usize = 256;

/// Split the first complete line off the front of `buf`.
///
/// The returned line includes its terminator. Returns `None` and leaves
/// `buf` untouched if no terminator has been received yet.
///
/// # Example
///
/// ```
/// use alicat_text_io::reader::take_line;
///
/// let mut buf = b"A +014.70\rB +0".to_vec();
/// assert_eq!(take_line(&mut buf).as_deref(), Some("A +014.70\r"));
/// assert_eq!(take_line(&mut buf), None);
/// assert_eq!(buf, b"B +0");
/// ```
pub fn take_line(buf: &mut Vec<u8>) -> Option<String> {
    let pos = buf.iter().position(|&b| b == TERMINATOR)?;
    let raw: Vec<u8> = buf.drain(..=pos).collect();
    Some(String::from_utf8_lossy(&raw).into_owned())
}

/// Accumulates transport bytes into complete lines.
#[derive(Debug)]
pub struct LineReader {
    buf: Vec<u8>,
    read_timeout: Duration,
}

impl LineReader {
    /// Create a reader whose transport reads wait at most `read_timeout`.
    pub fn new(read_timeout: Duration) -> Self {
        LineReader {
            buf: Vec::new(),
            read_timeout,
        }
    }

    /// Return the next complete line, if one is available.
    ///
    /// A line already sitting in the buffer is returned without touching
    /// the transport. Otherwise exactly one read is performed. A
    /// zero-length read or an elapsed read window is the normal "nothing
    /// yet" case and yields `Ok(None)`; only genuine transport faults are
    /// returned as errors.
    pub async fn try_read_line(&mut self, transport: &mut dyn Transport) -> Result<Option<String>> {
        if let Some(line) = take_line(&mut self.buf) {
            return Ok(Some(line));
        }

        let mut chunk = [0u8; READ_CHUNK];
        match transport.receive(&mut chunk, self.read_timeout).await {
            Ok(0) | Err(Error::Timeout) => return Ok(None),
            Ok(n) => self.extend(&chunk[..n]),
            Err(e) => return Err(e),
        }

        Ok(take_line(&mut self.buf))
    }

    /// Append raw bytes to the buffer.
    ///
    /// If the buffer grows past [`MAX_BUF`] without containing a terminator
    /// it is discarded, so line noise cannot grow it without bound.
    pub fn extend(&mut self, bytes: &[u8]) {
        trace!(bytes = bytes.len(), data = ?String::from_utf8_lossy(bytes), "line reader input");
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > MAX_BUF && !self.buf.contains(&TERMINATOR) {
            warn!(len = self.buf.len(), "line buffer overflow, resetting");
            self.buf.clear();
        }
    }

    /// Drop any buffered bytes, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.buf.len();
        self.buf.clear();
        discarded
    }

    /// Bytes received but not yet returned as a line.
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// The per-read wait applied to the transport.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}
