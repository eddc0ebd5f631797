//! Scripted mock transport for deterministic testing of the line engine.
//!
//! [`MockTransport`] implements [`Transport`] with a queue of read chunks:
//! each `receive()` call hands out exactly one queued chunk (an empty chunk
//! is a zero-length read), and once the queue is empty every read reports
//! [`Error::Timeout`]. This mirrors a non-blocking serial port where each
//! read returns whatever happens to be buffered at that moment.
//!
//! Request/response pairs can also be pre-loaded with
//! [`expect`](MockTransport::expect): the response chunk is queued only when
//! the matching request is sent, the way a half-duplex instrument answers.
//!
//! # Example
//!
//! ```
//! use alicat_test_harness::MockTransport;
//!
//! let mock = MockTransport::new();
//! mock.push_read(b"");
//! mock.push_read(b"A +014.70 +025.00\r");
//! let probe = mock.probe();
//! assert_eq!(probe.pending_reads(), 2);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alicat_core::error::{Error, Result};
use alicat_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The chunk queued for reading once the request has been sent.
    response: Vec<u8>,
}

#[derive(Debug)]
struct MockState {
    /// Chunks handed out one per `receive()` call.
    reads: VecDeque<Vec<u8>>,
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
    /// Number of `receive()` calls made while connected.
    receive_count: usize,
    connected: bool,
    fail_next_send: bool,
    fail_next_receive: bool,
}

/// A mock [`Transport`] for testing the engine without hardware.
///
/// State is shared with any [`MockProbe`] obtained from
/// [`probe`](MockTransport::probe), so a test can keep inspecting and
/// scripting the mock after moving it into a session.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Inspection handle sharing state with a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockProbe {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    // A panicking test thread must not hide the log from the next assertion.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    /// Create a new mock transport in the connected state with nothing to read.
    pub fn new() -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                reads: VecDeque::new(),
                expectations: VecDeque::new(),
                sent_log: Vec::new(),
                receive_count: 0,
                connected: true,
                fail_next_send: false,
                fail_next_receive: false,
            })),
        }
    }

    /// Create a mock whose reads return `chunks` in order.
    pub fn with_reads<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mock = Self::new();
        for chunk in chunks {
            mock.push_read(chunk.as_ref());
        }
        mock
    }

    /// Queue one chunk for a future `receive()` call.
    pub fn push_read(&self, chunk: &[u8]) {
        lock(&self.state).reads.push_back(chunk.to_vec());
    }

    /// Add an expected request/response pair.
    ///
    /// While expectations are pending, every `send()` must match the next
    /// one exactly; the paired response is then queued as a read chunk.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        lock(&self.state).expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Make the next `send()` fail with [`Error::ConnectionLost`].
    pub fn fail_next_send(&self) {
        lock(&self.state).fail_next_send = true;
    }

    /// Make the next `receive()` fail with [`Error::ConnectionLost`].
    pub fn fail_next_receive(&self) {
        lock(&self.state).fail_next_receive = true;
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        lock(&self.state).connected = connected;
    }

    /// Obtain an inspection handle that outlives moving the mock away.
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            state: Arc::clone(&self.state),
        }
    }

    /// All data sent through this transport, one element per `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        lock(&self.state).sent_log.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProbe {
    /// All data sent through the transport, one element per `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        lock(&self.state).sent_log.clone()
    }

    /// Number of `send()` calls recorded.
    pub fn send_count(&self) -> usize {
        lock(&self.state).sent_log.len()
    }

    /// Number of `receive()` calls made while connected.
    pub fn receive_count(&self) -> usize {
        lock(&self.state).receive_count
    }

    /// Number of queued read chunks not yet handed out.
    pub fn pending_reads(&self) -> usize {
        lock(&self.state).reads.len()
    }

    /// Number of request/response expectations not yet consumed.
    pub fn remaining_expectations(&self) -> usize {
        lock(&self.state).expectations.len()
    }

    /// Queue one more chunk for a future `receive()` call.
    pub fn push_read(&self, chunk: &[u8]) {
        lock(&self.state).reads.push_back(chunk.to_vec());
    }

    /// Whether the transport is still connected.
    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.connected {
            return Err(Error::NotConnected);
        }
        if state.fail_next_send {
            state.fail_next_send = false;
            return Err(Error::ConnectionLost);
        }

        state.sent_log.push(data.to_vec());

        if let Some(expectation) = state.expectations.pop_front() {
            if data != expectation.request.as_slice() {
                return Err(Error::Transport(format!(
                    "unexpected send data: expected {:?}, got {:?}",
                    String::from_utf8_lossy(&expectation.request),
                    String::from_utf8_lossy(data)
                )));
            }
            state.reads.push_back(expectation.response);
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        let mut state = lock(&self.state);
        if !state.connected {
            return Err(Error::NotConnected);
        }
        state.receive_count += 1;
        if state.fail_next_receive {
            state.fail_next_receive = false;
            return Err(Error::ConnectionLost);
        }

        let Some(chunk) = state.reads.pop_front() else {
            return Err(Error::Timeout);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            // Caller's buffer was short; the rest arrives on the next read.
            state.reads.push_front(chunk[n..].to_vec());
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.connected = false;
        state.reads.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_hand_out_one_chunk_per_call() {
        let mut mock = MockTransport::with_reads(["A", "", "B\r"]);
        let mut buf = [0u8; 64];

        let n = mock.receive(&mut buf, Duration::ZERO).await.unwrap();
        assert_eq!(&buf[..n], b"A");
        let n = mock.receive(&mut buf, Duration::ZERO).await.unwrap();
        assert_eq!(n, 0);
        let n = mock.receive(&mut buf, Duration::ZERO).await.unwrap();
        assert_eq!(&buf[..n], b"B\r");
    }

    #[tokio::test]
    async fn exhausted_script_times_out() {
        let mut mock = MockTransport::new();
        let mut buf = [0u8; 8];

        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(mock.probe().receive_count(), 1);
    }

    #[tokio::test]
    async fn tracks_sent_data_through_probe() {
        let mut mock = MockTransport::new();
        let probe = mock.probe();

        mock.send(b"A\r").await.unwrap();
        mock.send(b"AV\r").await.unwrap();

        assert_eq!(probe.send_count(), 2);
        assert_eq!(probe.sent_data(), vec![b"A\r".to_vec(), b"AV\r".to_vec()]);
    }

    #[tokio::test]
    async fn expectation_queues_response_after_send() {
        let mut mock = MockTransport::new();
        mock.expect(b"A\r", b"A +014.70\r");
        let mut buf = [0u8; 64];

        assert!(matches!(
            mock.receive(&mut buf, Duration::ZERO).await,
            Err(Error::Timeout)
        ));

        mock.send(b"A\r").await.unwrap();
        let n = mock.receive(&mut buf, Duration::ZERO).await.unwrap();
        assert_eq!(&buf[..n], b"A +014.70\r");
        assert_eq!(mock.probe().remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn expectation_mismatch_errors() {
        let mut mock = MockTransport::new();
        mock.expect(b"A\r", b"A data\r");

        let result = mock.send(b"B\r").await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn partial_receive_keeps_remainder() {
        let mut mock = MockTransport::with_reads(["ABCD"]);
        let mut buf = [0u8; 2];

        let n = mock.receive(&mut buf, Duration::ZERO).await.unwrap();
        assert_eq!(&buf[..n], b"AB");
        let n = mock.receive(&mut buf, Duration::ZERO).await.unwrap();
        assert_eq!(&buf[..n], b"CD");
    }

    #[tokio::test]
    async fn injected_faults_fire_once() {
        let mut mock = MockTransport::new();
        mock.fail_next_send();
        mock.fail_next_receive();
        let mut buf = [0u8; 8];

        assert!(matches!(mock.send(b"A\r").await, Err(Error::ConnectionLost)));
        assert!(mock.send(b"A\r").await.is_ok());
        assert!(matches!(
            mock.receive(&mut buf, Duration::ZERO).await,
            Err(Error::ConnectionLost)
        ));
        assert!(matches!(
            mock.receive(&mut buf, Duration::ZERO).await,
            Err(Error::Timeout)
        ));
    }

    #[tokio::test]
    async fn disconnect() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.close().await.unwrap();
        assert!(!mock.is_connected());
        assert!(matches!(mock.send(b"A\r").await, Err(Error::NotConnected)));

        let mut other = MockTransport::new();
        other.set_connected(false);
        let mut buf = [0u8; 8];
        assert!(matches!(
            other.receive(&mut buf, Duration::ZERO).await,
            Err(Error::NotConnected)
        ));
    }
}
