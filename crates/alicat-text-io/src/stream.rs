//! Streaming sessions.
//!
//! A streaming instrument emits data lines without being asked. A
//! [`LineStream`] borrows the engine mutably for as long as it lives, so no
//! request can be issued while lines are being forwarded.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use alicat_core::error::Result;

use crate::engine::Engine;

/// Forwards every complete line until cancelled.
pub struct LineStream<'a> {
    engine: &'a mut Engine,
    cancel: CancellationToken,
    finished: bool,
}

impl<'a> LineStream<'a> {
    pub(crate) fn new(engine: &'a mut Engine, cancel: CancellationToken) -> Self {
        LineStream {
            engine,
            cancel,
            finished: false,
        }
    }

    /// Wait for the next complete line.
    ///
    /// Returns `Ok(None)` once the token is cancelled. Cancellation is
    /// checked before every read, so a line that arrives afterwards is left
    /// for the next consumer of the engine.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        let poll_interval = self.engine.config().poll_interval;
        loop {
            if self.finished || self.cancel.is_cancelled() {
                self.finished = true;
                return Ok(None);
            }

            if let Some(line) = self.engine.read_line().await? {
                return Ok(Some(line));
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.finished = true;
                    return Ok(None);
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Engine {
    /// Start forwarding unsolicited lines.
    pub fn stream(&mut self, cancel: CancellationToken) -> LineStream<'_> {
        self.discard_abandoned();
        debug!("streaming session started");
        LineStream::new(self, cancel)
    }

    /// Invoke `on_line` for every complete line until `cancel` fires.
    ///
    /// Returns the number of lines forwarded. Transport faults end the
    /// session with an error.
    pub async fn run_stream<F>(&mut self, cancel: CancellationToken, mut on_line: F) -> Result<usize>
    where
        F: FnMut(&str),
    {
        let mut stream = self.stream(cancel);
        let mut forwarded = 0;
        while let Some(line) = stream.next_line().await? {
            on_line(&line);
            forwarded += 1;
        }
        debug!(lines = forwarded, "streaming session ended");
        Ok(forwarded)
    }
}
