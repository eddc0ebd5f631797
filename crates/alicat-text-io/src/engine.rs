//! Request/response engine for carriage-return terminated instruments.
//!
//! The [`Engine`] owns the transport exclusively. A request is written once,
//! then the engine reads line by line until one satisfies the request's
//! [`Expectation`]. Unanswered attempts are handled by the request's
//! [`RetryPolicy`]: either resend the identical bytes every N attempts
//! (stall recovery, waits indefinitely) or give up after N attempts.
//!
//! Instruments in this family sometimes swallow a command, typically while
//! streaming or right after power-up. Resending the same bytes is harmless
//! because every command is idempotent on the device side.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use alicat_core::error::{Error, Result};
use alicat_core::transport::Transport;

use crate::matcher::Expectation;
use crate::reader::LineReader;

/// Default wait applied to each transport read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(20);

/// Default pause between unanswered attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Timing for the engine's read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on a single transport read.
    pub read_timeout: Duration,
    /// Sleep between attempts that produced no matching line.
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            read_timeout: DEFAULT_READ_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What to do when attempts go unanswered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Resend the identical command after every `resend_after` unmatched
    /// attempts and keep waiting. Only cancellation ends the wait.
    StallRecovery { resend_after: u32 },
    /// Never resend; give up after `max_attempts` unmatched attempts.
    Bounded { max_attempts: u32 },
}

impl RetryPolicy {
    /// The attempt count at which the policy acts. Never less than one.
    pub fn threshold(&self) -> u32 {
        match *self {
            RetryPolicy::StallRecovery { resend_after } => resend_after.max(1),
            RetryPolicy::Bounded { max_attempts } => max_attempts.max(1),
        }
    }
}

/// A command in flight together with its acceptance test and retry policy.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    command: Vec<u8>,
    expectation: Expectation,
    policy: RetryPolicy,
    /// Unmatched attempts since the last (re)send.
    attempts: u32,
    /// Unmatched attempts since the request was first issued.
    total_attempts: u32,
    resends: u32,
}

/// Next step after an unmatched attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Wait,
    Resend,
    GiveUp,
}

impl PendingRequest {
    pub fn new(command: impl Into<Vec<u8>>, expectation: Expectation, policy: RetryPolicy) -> Self {
        PendingRequest {
            command: command.into(),
            expectation,
            policy,
            attempts: 0,
            total_attempts: 0,
            resends: 0,
        }
    }

    /// The exact bytes written (and rewritten on resend).
    pub fn command(&self) -> &[u8] {
        &self.command
    }

    pub fn expectation(&self) -> &Expectation {
        &self.expectation
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Unmatched attempts since the last (re)send.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Number of times the command has been resent.
    pub fn resends(&self) -> u32 {
        self.resends
    }

    fn record_miss(&mut self) -> Step {
        self.attempts += 1;
        self.total_attempts += 1;
        if self.attempts < self.policy.threshold() {
            return Step::Wait;
        }
        match self.policy {
            RetryPolicy::Bounded { .. } => Step::GiveUp,
            RetryPolicy::StallRecovery { .. } => {
                self.attempts = 0;
                self.resends += 1;
                Step::Resend
            }
        }
    }
}

/// Result of a request that completed without a transport fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The first line that satisfied the expectation.
    Matched(String),
    /// A bounded request ran out of attempts.
    Exhausted { attempts: u32 },
}

impl Outcome {
    /// The matched line, or `None` if the request gave up.
    pub fn into_line(self) -> Option<String> {
        match self {
            Outcome::Matched(line) => Some(line),
            Outcome::Exhausted { .. } => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Outcome::Matched(_))
    }
}

/// Engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No request outstanding.
    Idle,
    /// A request was issued and its wait was abandoned before completing.
    /// The next command discards it.
    AwaitingResponse,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Exclusive owner of one instrument connection.
pub struct Engine {
    transport: Box<dyn Transport>,
    reader: LineReader,
    config: EngineConfig,
    pending: Option<PendingRequest>,
}

impl Engine {
    pub fn new(transport: Box<dyn Transport>, config: EngineConfig) -> Self {
        Engine {
            transport,
            reader: LineReader::new(config.read_timeout),
            config,
            pending: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        if self.pending.is_some() {
            EngineState::AwaitingResponse
        } else {
            EngineState::Idle
        }
    }

    /// The request whose wait was abandoned, if any.
    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Write a command that expects no reply.
    pub async fn send(&mut self, command: &[u8]) -> Result<()> {
        self.discard_abandoned();
        debug!(command = %String::from_utf8_lossy(command).trim_end(), "sending command");
        self.transport.send(command).await
    }

    /// Issue `request` and wait for a matching line.
    ///
    /// With [`RetryPolicy::StallRecovery`] this only returns on a match or
    /// a transport fault; use [`execute_until`](Self::execute_until) to make
    /// the wait cancellable.
    pub async fn execute(&mut self, request: PendingRequest) -> Result<Outcome> {
        self.run(request, None).await
    }

    /// Like [`execute`](Self::execute), but returns [`Error::Cancelled`]
    /// once `cancel` fires. Nothing is written if it already has.
    pub async fn execute_until(
        &mut self,
        request: PendingRequest,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        self.run(request, Some(cancel)).await
    }

    /// Read one line if available, performing at most one transport read.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        self.reader.try_read_line(&mut *self.transport).await
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> Result<()> {
        self.discard_abandoned();
        self.transport.close().await
    }

    pub(crate) fn discard_abandoned(&mut self) {
        if let Some(stale) = self.pending.take() {
            debug!(
                command = %String::from_utf8_lossy(stale.command()).trim_end(),
                "discarding abandoned request"
            );
        }
    }

    async fn run(
        &mut self,
        request: PendingRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<Outcome> {
        self.discard_abandoned();

        let stale = self.reader.clear();
        if stale > 0 {
            debug!(bytes = stale, "discarding partial line before new request");
        }

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            debug!("request cancelled before sending");
            return Err(Error::Cancelled);
        }

        debug!(
            command = %String::from_utf8_lossy(request.command()).trim_end(),
            policy = ?request.policy(),
            "sending request"
        );
        self.transport.send(request.command()).await?;

        let pending = self.pending.insert(request);
        let result = await_response(
            &mut *self.transport,
            &mut self.reader,
            pending,
            &self.config,
            cancel,
        )
        .await;
        self.pending = None;
        result
    }
}

// ---------------------------------------------------------------------------
// Response loop
// ---------------------------------------------------------------------------

/// Read until a line matches, resending or giving up per the request's
/// policy. Sleeps `poll_interval` between unmatched attempts.
async fn await_response(
    transport: &mut dyn Transport,
    reader: &mut LineReader,
    pending: &mut PendingRequest,
    config: &EngineConfig,
    cancel: Option<&CancellationToken>,
) -> Result<Outcome> {
    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            debug!("request cancelled");
            return Err(Error::Cancelled);
        }

        match reader.try_read_line(transport).await? {
            Some(line) if pending.expectation.matches(&line) => {
                debug!(
                    response = %line.trim_end(),
                    attempts = pending.total_attempts + 1,
                    resends = pending.resends,
                    "response matched"
                );
                return Ok(Outcome::Matched(line));
            }
            Some(line) => {
                debug!(line = %line.trim_end(), "skipping unmatched line");
            }
            None => {}
        }

        match pending.record_miss() {
            Step::Wait => {}
            Step::Resend => {
                debug!(resends = pending.resends, "no matching response, resending");
                transport.send(&pending.command).await?;
            }
            Step::GiveUp => {
                debug!(attempts = pending.total_attempts, "no response, giving up");
                return Ok(Outcome::Exhausted {
                    attempts: pending.total_attempts,
                });
            }
        }

        match cancel {
            Some(cancel) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("request cancelled");
                        return Err(Error::Cancelled);
                    }
                    _ = tokio::time::sleep(config.poll_interval) => {}
                }
            }
            None => tokio::time::sleep(config.poll_interval).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
