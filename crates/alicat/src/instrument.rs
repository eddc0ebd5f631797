//! Instrument -- one session on one serial line.
//!
//! This module ties the command builders ([`commands`](crate::commands)) to
//! the line engine from `alicat-text-io`. Several instruments can share a
//! line, each answering to its own [`UnitId`]; every operation therefore
//! takes the unit it addresses.
//!
//! All operations take `&mut self`: the line is half-duplex and responses
//! carry no request id, so at most one request or one streaming session can
//! be outstanding at a time.
//!
//! Operations fall into three groups:
//! - fire-and-forget (`start_stream`, `stop_stream`, `tare`, display lock,
//!   baud rate, unit id): the instrument does not reliably answer, so
//!   nothing is read back
//! - bounded poll (`poll_data`): gives up with `Ok(None)` after a fixed
//!   number of reads
//! - stall recovery (`available_gases`, `change_gas`, `set_units`,
//!   `query_static_unit_value`): resends until answered

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use alicat_core::error::{Error, Result};
use alicat_core::transport::Transport;
use alicat_core::types::{InstrumentInfo, UnitId};
use alicat_text_io::{
    Engine, EngineConfig, EngineState, Expectation, LineStream, Outcome, PendingRequest, RetryPolicy,
};

use crate::commands::{Command, UnitSetting};
use crate::models::InstrumentModel;

/// Default number of reads a poll waits before giving up.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;

/// Default number of unanswered reads before a command is resent.
pub const DEFAULT_RESEND_AFTER: u32 = 5;

/// Length a `DCU 69` answer must reach to count as a response.
const STATIC_VALUE_MIN_LEN: usize = 10;

/// A configuration echo counts as a response once it is longer than this.
const CONFIG_ECHO_LEN_FLOOR: usize = 3;

/// A connected instrument line.
///
/// Constructed via [`InstrumentBuilder`](crate::builder::InstrumentBuilder).
pub struct Instrument {
    engine: Engine,
    model: InstrumentModel,
    info: InstrumentInfo,
    poll_attempts: u32,
    resend_after: u32,
    cancel: Option<CancellationToken>,
    /// Set once a start-stream command has been sent.
    streaming: bool,
}

impl Instrument {
    /// Create a new `Instrument` from its constituent parts.
    ///
    /// This is called by [`InstrumentBuilder`](crate::builder::InstrumentBuilder);
    /// callers should use the builder API instead.
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        model: InstrumentModel,
        baud_rate: u32,
        config: EngineConfig,
        poll_attempts: u32,
        resend_after: u32,
        cancel: Option<CancellationToken>,
    ) -> Self {
        let info = InstrumentInfo {
            kind: model.kind,
            model_name: model.name.to_string(),
            baud_rate,
        };
        Instrument {
            engine: Engine::new(transport, config),
            model,
            info,
            poll_attempts,
            resend_after,
            cancel,
            streaming: false,
        }
    }

    pub fn info(&self) -> &InstrumentInfo {
        &self.info
    }

    pub fn model(&self) -> &InstrumentModel {
        &self.model
    }

    /// Baud rate the host port was opened at.
    pub fn baud_rate(&self) -> u32 {
        self.info.baud_rate
    }

    /// Whether a start-stream command was sent and not yet stopped.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Whether a request was abandoned mid-wait and is still pending.
    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn is_connected(&self) -> bool {
        self.engine.is_connected()
    }

    /// Replace the token that aborts resend loops.
    ///
    /// A fired token stays fired; install a fresh one to make later
    /// configuration requests cancellable again, or `None` to wait until
    /// answered.
    pub fn set_cancel_token(&mut self, token: Option<CancellationToken>) {
        self.cancel = token;
    }

    // -----------------------------------------------------------------
    // Command plumbing
    // -----------------------------------------------------------------

    async fn send_only(&mut self, unit: &UnitId, command: Command) -> Result<()> {
        debug!(unit = %unit, command = command.name(), "fire-and-forget command");
        let bytes = self.model.commands.encode(unit, &command);
        self.engine.send(&bytes).await
    }

    async fn request(
        &mut self,
        unit: &UnitId,
        command: Command,
        expectation: Expectation,
        policy: RetryPolicy,
    ) -> Result<Outcome> {
        debug!(unit = %unit, command = command.name(), "request");
        let bytes = self.model.commands.encode(unit, &command);
        let request = PendingRequest::new(bytes, expectation, policy);
        match (&self.cancel, policy) {
            // A poll ends on its own attempt budget.
            (_, RetryPolicy::Bounded { .. }) | (None, _) => self.engine.execute(request).await,
            (Some(cancel), RetryPolicy::StallRecovery { .. }) => {
                self.engine.execute_until(request, cancel).await
            }
        }
    }

    /// Issue a stall-recovery request and return the matched line.
    async fn request_line(
        &mut self,
        unit: &UnitId,
        command: Command,
        expectation: Expectation,
    ) -> Result<String> {
        let policy = RetryPolicy::StallRecovery {
            resend_after: self.resend_after,
        };
        match self.request(unit, command, expectation, policy).await? {
            Outcome::Matched(line) => Ok(line),
            Outcome::Exhausted { .. } => unreachable!("stall recovery never gives up"),
        }
    }

    // -----------------------------------------------------------------
    // Streaming
    // -----------------------------------------------------------------

    /// Tell the instrument to stream data continuously.
    pub async fn start_stream(&mut self, unit: &UnitId) -> Result<()> {
        self.send_only(unit, Command::StartStream).await?;
        self.streaming = true;
        Ok(())
    }

    /// Tell the instrument to stop streaming.
    pub async fn stop_stream(&mut self, unit: &UnitId) -> Result<()> {
        self.send_only(unit, Command::StopStream).await?;
        self.streaming = false;
        Ok(())
    }

    /// Forward every complete line to `on_line` until `cancel` fires.
    ///
    /// Returns the number of lines forwarded.
    pub async fn read_stream<F>(&mut self, cancel: CancellationToken, on_line: F) -> Result<usize>
    where
        F: FnMut(&str),
    {
        if !self.streaming {
            debug!("reading stream without a start-stream command");
        }
        self.engine.run_stream(cancel, on_line).await
    }

    /// Pull-based alternative to [`read_stream`](Self::read_stream).
    pub fn stream_lines(&mut self, cancel: CancellationToken) -> LineStream<'_> {
        self.engine.stream(cancel)
    }

    // -----------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------

    /// Request one data frame.
    ///
    /// Returns `Ok(None)` if no line containing the unit id arrives within
    /// the poll budget. The command is never resent.
    pub async fn poll_data(&mut self, unit: &UnitId) -> Result<Option<String>> {
        if self.streaming {
            warn!(unit = %unit, "polling while the instrument is streaming");
        }
        let policy = RetryPolicy::Bounded {
            max_attempts: self.poll_attempts,
        };
        let expectation = Expectation::ContainsUnitId(unit.clone());
        let outcome = self.request(unit, Command::Poll, expectation, policy).await?;
        if let Outcome::Exhausted { attempts } = outcome {
            debug!(unit = %unit, attempts, "poll got no response");
        }
        Ok(outcome.into_line())
    }

    /// List the gases the instrument is calibrated for.
    pub async fn available_gases(&mut self, unit: &UnitId) -> Result<String> {
        let expectation = Expectation::ContainsUnitId(unit.clone());
        self.request_line(unit, Command::AvailableGases, expectation).await
    }

    /// Select gas number `gas`. Returns the instrument's echo.
    pub async fn change_gas(&mut self, unit: &UnitId, gas: u32) -> Result<String> {
        self.request_line(
            unit,
            Command::ChangeGas(gas),
            Expectation::LongerThan(CONFIG_ECHO_LEN_FLOOR),
        )
        .await
    }

    /// Change the engineering unit of a statistic. Returns the echo.
    pub async fn set_units(&mut self, unit: &UnitId, setting: &UnitSetting) -> Result<String> {
        self.request_line(
            unit,
            Command::SetUnits(*setting),
            Expectation::LongerThan(CONFIG_ECHO_LEN_FLOOR),
        )
        .await
    }

    /// Read back the engineering unit of the static statistic.
    pub async fn query_static_unit_value(&mut self, unit: &UnitId) -> Result<String> {
        self.request_line(
            unit,
            Command::QueryStaticUnitValue,
            Expectation::MinLength(STATIC_VALUE_MIN_LEN),
        )
        .await
    }

    // -----------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------

    /// Zero the instrument reading.
    pub async fn tare(&mut self, unit: &UnitId) -> Result<()> {
        self.send_only(unit, Command::Tare).await
    }

    pub async fn lock_display(&mut self, unit: &UnitId) -> Result<()> {
        self.send_only(unit, Command::LockDisplay).await
    }

    pub async fn unlock_display(&mut self, unit: &UnitId) -> Result<()> {
        self.send_only(unit, Command::UnlockDisplay).await
    }

    /// Change the instrument's baud rate.
    ///
    /// The host port keeps the rate it was opened at; reopen the session
    /// at the new rate to keep talking to the instrument.
    pub async fn set_baud_rate(&mut self, unit: &UnitId, baud: u32) -> Result<()> {
        if baud == 0 {
            return Err(Error::InvalidParameter("baud rate must be non-zero".into()));
        }
        self.send_only(unit, Command::SetBaudRate(baud)).await
    }

    /// Re-address the instrument at `unit` as `new_unit`.
    pub async fn change_unit_id(&mut self, unit: &UnitId, new_unit: &UnitId) -> Result<()> {
        self.send_only(unit, Command::ChangeUnitId(new_unit.clone())).await
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> Result<()> {
        self.streaming = false;
        self.engine.close().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::commands;
    use crate::models::{flow_meter, pressure_meter};
    use alicat_test_harness::MockTransport;

    /// Helper to build an Instrument with a MockTransport for testing.
    fn make_test_instrument(mock: &MockTransport) -> Instrument {
        Instrument::new(
            Box::new(mock.clone()),
            flow_meter(),
            19200,
            EngineConfig::default(),
            DEFAULT_POLL_ATTEMPTS,
            DEFAULT_RESEND_AFTER,
            None,
        )
    }

    fn unit(id: &str) -> UnitId {
        UnitId::new(id).unwrap()
    }

    // -----------------------------------------------------------------
    // poll_data
    // -----------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_poll_after_empty_reads() {
        let mock = MockTransport::with_reads(["", "", "", "A data\r"]);
        let probe = mock.probe();
        let mut inst = make_test_instrument(&mock);

        let line = inst.poll_data(&unit("A")).await.unwrap();

        assert_eq!(line.as_deref(), Some("A data\r"));
        assert_eq!(probe.sent_data(), vec![b"A\r".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_exhaustion_then_fresh_poll() {
        let mock = MockTransport::with_reads([""; 10]);
        let probe = mock.probe();
        let mut inst = make_test_instrument(&mock);
        let a = unit("A");

        assert_eq!(inst.poll_data(&a).await.unwrap(), None);
        assert_eq!(probe.receive_count(), 10);
        assert_eq!(probe.send_count(), 1);
        assert_eq!(inst.state(), EngineState::Idle);

        probe.push_read(b"A +014.70 +025.00\r");
        let line = inst.poll_data(&a).await.unwrap();
        assert_eq!(line.as_deref(), Some("A +014.70 +025.00\r"));
        assert_eq!(probe.sent_data(), vec![b"A\r".to_vec(), b"A\r".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_ignores_other_units() {
        let mock = MockTransport::with_reads(["B +000.00\r", "A +014.70\r"]);
        let mut inst = make_test_instrument(&mock);

        let line = inst.poll_data(&unit("A")).await.unwrap();
        assert_eq!(line.as_deref(), Some("A +014.70\r"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_budget_is_configurable() {
        let mock = MockTransport::new();
        let probe = mock.probe();
        let mut inst = Instrument::new(
            Box::new(mock.clone()),
            flow_meter(),
            19200,
            EngineConfig::default(),
            3,
            DEFAULT_RESEND_AFTER,
            None,
        );

        assert_eq!(inst.poll_data(&unit("A")).await.unwrap(), None);
        assert_eq!(probe.receive_count(), 3);
    }

    #[tokio::test]
    async fn test_poll_transport_fault() {
        let mock = MockTransport::new();
        mock.fail_next_send();
        let mut inst = make_test_instrument(&mock);

        let result = inst.poll_data(&unit("A")).await;
        assert!(matches!(result, Err(Error::ConnectionLost)));
        assert_eq!(inst.state(), EngineState::Idle);
    }

    // -----------------------------------------------------------------
    // Stall-recovery requests
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn test_change_gas() {
        let mut mock = MockTransport::new();
        mock.expect(&commands::cmd_change_gas(&unit("A"), 8), b"A 8 N2\r");
        let mut inst = make_test_instrument(&mock);

        let echo = inst.change_gas(&unit("A"), 8).await.unwrap();
        assert_eq!(echo, "A 8 N2\r");
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_gas_rejects_short_lines() {
        let mock = MockTransport::with_reads(["A\r", "ok\r", "A 8\r"]);
        let mut inst = make_test_instrument(&mock);

        let echo = inst.change_gas(&unit("A"), 8).await.unwrap();
        assert_eq!(echo, "A 8\r");
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_gas_resends_on_stall() {
        let mock = MockTransport::new();
        let probe = mock.probe();
        let mut inst = make_test_instrument(&mock);

        let result = tokio::time::timeout(
            Duration::from_millis(300),
            inst.change_gas(&unit("A"), 8),
        )
        .await;
        assert!(result.is_err());

        let sent = probe.sent_data();
        assert!(sent.len() >= 3);
        assert_eq!(sent.len(), 1 + probe.receive_count() / 5);
        assert!(sent.iter().all(|s| s == b"AG 8\r"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_available_gases_matches_unit_id() {
        let mock = MockTransport::with_reads(["", "B 8 N2\r", "A 0 Air\r"]);
        let probe = mock.probe();
        let mut inst = make_test_instrument(&mock);

        let gases = inst.available_gases(&unit("A")).await.unwrap();
        assert_eq!(gases, "A 0 Air\r");
        assert_eq!(probe.sent_data(), vec![b"A??G*\r".to_vec()]);
    }

    #[tokio::test]
    async fn test_set_units() {
        let mut mock = MockTransport::new();
        mock.expect(b"ADCU 5 1 7 0\r", b"A 7 SCCM\r");
        let mut inst = make_test_instrument(&mock);

        let echo = inst.set_units(&unit("A"), &UnitSetting::new(5, 7)).await.unwrap();
        assert_eq!(echo, "A 7 SCCM\r");
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_static_unit_value_needs_ten_chars() {
        let mock = MockTransport::with_reads(["A 69\r", "A 69 12 PSIA\r"]);
        let probe = mock.probe();
        let mut inst = make_test_instrument(&mock);

        let value = inst.query_static_unit_value(&unit("A")).await.unwrap();
        assert_eq!(value, "A 69 12 PSIA\r");
        assert_eq!(probe.sent_data(), vec![b"ADCU 69\r".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_static_unit_value_resends_identical_bytes() {
        let mock = MockTransport::with_reads(["", "", "", "", "", "A 69 12 PSIA\r"]);
        let probe = mock.probe();
        let mut inst = make_test_instrument(&mock);

        inst.query_static_unit_value(&unit("A")).await.unwrap();
        assert_eq!(
            probe.sent_data(),
            vec![b"ADCU 69\r".to_vec(), b"ADCU 69\r".to_vec()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_token_ends_stall_recovery() {
        let mock = MockTransport::new();
        let cancel = CancellationToken::new();
        let mut inst = Instrument::new(
            Box::new(mock.clone()),
            flow_meter(),
            19200,
            EngineConfig::default(),
            DEFAULT_POLL_ATTEMPTS,
            DEFAULT_RESEND_AFTER,
            Some(cancel.clone()),
        );

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let result = inst.available_gases(&unit("A")).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(inst.state(), EngineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_session_still_polls() {
        let mock = MockTransport::new();
        let probe = mock.probe();
        let cancel = CancellationToken::new();
        let mut inst = Instrument::new(
            Box::new(mock.clone()),
            flow_meter(),
            19200,
            EngineConfig::default(),
            DEFAULT_POLL_ATTEMPTS,
            DEFAULT_RESEND_AFTER,
            Some(cancel.clone()),
        );
        let a = unit("A");

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });
        assert!(matches!(inst.available_gases(&a).await, Err(Error::Cancelled)));
        let gases_sent = probe.send_count();

        probe.push_read(b"A +014.70\r");
        let line = inst.poll_data(&a).await.unwrap();
        assert_eq!(line.as_deref(), Some("A +014.70\r"));
        assert_eq!(probe.send_count(), gases_sent + 1);
        assert_eq!(probe.sent_data().last().map(Vec::as_slice), Some(&b"A\r"[..]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_token_writes_nothing_until_replaced() {
        let mock = MockTransport::new();
        let probe = mock.probe();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut inst = Instrument::new(
            Box::new(mock.clone()),
            flow_meter(),
            19200,
            EngineConfig::default(),
            DEFAULT_POLL_ATTEMPTS,
            DEFAULT_RESEND_AFTER,
            Some(cancel),
        );
        let a = unit("A");

        assert!(matches!(inst.change_gas(&a, 8).await, Err(Error::Cancelled)));
        assert_eq!(probe.send_count(), 0);

        inst.set_cancel_token(Some(CancellationToken::new()));
        probe.push_read(b"A 8 N2\r");
        assert_eq!(inst.change_gas(&a, 8).await.unwrap(), "A 8 N2\r");
        assert_eq!(probe.sent_data(), vec![b"AG 8\r".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_available_gases_resends_identical_bytes() {
        let mock = MockTransport::with_reads(["", "", "", "", "", "", "A 0 Air 8 N2\r"]);
        let probe = mock.probe();
        let mut inst = make_test_instrument(&mock);

        let gases = inst.available_gases(&unit("A")).await.unwrap();
        assert_eq!(gases, "A 0 Air 8 N2\r");
        assert_eq!(
            probe.sent_data(),
            vec![b"A??G*\r".to_vec(), b"A??G*\r".to_vec()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_units_resends_identical_bytes() {
        let mock = MockTransport::with_reads([
            "", "", "", "", "", "", "", "", "", "", "A 7 SCCM\r",
        ]);
        let probe = mock.probe();
        let mut inst = make_test_instrument(&mock);

        let echo = inst.set_units(&unit("A"), &UnitSetting::new(5, 7)).await.unwrap();
        assert_eq!(echo, "A 7 SCCM\r");
        assert_eq!(probe.sent_data(), vec![b"ADCU 5 1 7 0\r".to_vec(); 3]);
    }

    // -----------------------------------------------------------------
    // Fire-and-forget commands
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn test_fire_and_forget_commands_do_not_read() {
        let mock = MockTransport::new();
        let probe = mock.probe();
        let mut inst = make_test_instrument(&mock);
        let a = unit("A");

        inst.tare(&a).await.unwrap();
        inst.lock_display(&a).await.unwrap();
        inst.unlock_display(&a).await.unwrap();
        inst.set_baud_rate(&a, 115_200).await.unwrap();
        inst.change_unit_id(&a, &unit("B")).await.unwrap();

        assert_eq!(
            probe.sent_data(),
            vec![
                b"AV\r".to_vec(),
                b"AL\r".to_vec(),
                b"AU\r".to_vec(),
                b"ANCB 115200\r".to_vec(),
                b"A@ B\r".to_vec(),
            ]
        );
        assert_eq!(probe.receive_count(), 0);
    }

    #[tokio::test]
    async fn test_set_baud_rate_keeps_host_rate() {
        let mock = MockTransport::new();
        let mut inst = make_test_instrument(&mock);

        inst.set_baud_rate(&unit("A"), 9600).await.unwrap();
        assert_eq!(inst.baud_rate(), 19200);
        assert!(matches!(
            inst.set_baud_rate(&unit("A"), 0).await,
            Err(Error::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn test_pressure_dialect() {
        let mock = MockTransport::new();
        let probe = mock.probe();
        let mut inst = Instrument::new(
            Box::new(mock.clone()),
            pressure_meter(),
            19200,
            EngineConfig::default(),
            DEFAULT_POLL_ATTEMPTS,
            DEFAULT_RESEND_AFTER,
            None,
        );
        let a = unit("A");

        inst.start_stream(&a).await.unwrap();
        inst.stop_stream(&a).await.unwrap();
        inst.tare(&a).await.unwrap();

        assert_eq!(
            probe.sent_data(),
            vec![b"A@=@\r".to_vec(), b"@@=A\r".to_vec(), b"APC\r".to_vec()]
        );
    }

    // -----------------------------------------------------------------
    // Streaming
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn test_streaming_flag() {
        let mock = MockTransport::new();
        let probe = mock.probe();
        let mut inst = make_test_instrument(&mock);
        let a = unit("A");

        assert!(!inst.is_streaming());
        inst.start_stream(&a).await.unwrap();
        assert!(inst.is_streaming());
        inst.stop_stream(&a).await.unwrap();
        assert!(!inst.is_streaming());

        assert_eq!(probe.sent_data(), vec![b"A@ @\r".to_vec(), b"@@ A\r".to_vec()]);
    }

    #[tokio::test]
    async fn test_failed_start_stream_leaves_flag_clear() {
        let mock = MockTransport::new();
        mock.fail_next_send();
        let mut inst = make_test_instrument(&mock);

        assert!(inst.start_stream(&unit("A")).await.is_err());
        assert!(!inst.is_streaming());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_stream_fragments() {
        let mock = MockTransport::with_reads(["stream part 1", "stream part 2\r"]);
        let mut inst = make_test_instrument(&mock);
        let cancel = CancellationToken::new();

        let mut lines = Vec::new();
        let stopper = cancel.clone();
        let forwarded = inst
            .read_stream(cancel, |line| {
                lines.push(line.to_string());
                stopper.cancel();
            })
            .await
            .unwrap();

        assert_eq!(forwarded, 1);
        assert_eq!(lines, vec!["stream part 1stream part 2\r".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_while_streaming_still_polls() {
        let mock = MockTransport::new();
        let probe = mock.probe();
        let mut inst = make_test_instrument(&mock);
        let a = unit("A");

        inst.start_stream(&a).await.unwrap();
        probe.push_read(b"A +014.70\r");
        assert!(inst.poll_data(&a).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_lines_pull() {
        let mock = MockTransport::with_reads(["A 1\r", "A 2\r"]);
        let mut inst = make_test_instrument(&mock);
        let cancel = CancellationToken::new();

        let mut stream = inst.stream_lines(cancel.clone());
        assert_eq!(stream.next_line().await.unwrap().as_deref(), Some("A 1\r"));
        assert_eq!(stream.next_line().await.unwrap().as_deref(), Some("A 2\r"));
        cancel.cancel();
        assert_eq!(stream.next_line().await.unwrap(), None);
    }

    // -----------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn test_info_and_close() {
        let mock = MockTransport::new();
        let mut inst = make_test_instrument(&mock);

        assert_eq!(inst.info().model_name, "Flow meter");
        assert_eq!(inst.info().kind, alicat_core::InstrumentKind::Flow);
        assert_eq!(inst.model().name, "Flow meter");
        assert!(inst.is_connected());

        inst.close().await.unwrap();
        assert!(!inst.is_connected());
        assert!(matches!(inst.tare(&unit("A")).await, Err(Error::NotConnected)));
    }
}
