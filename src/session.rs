//! Command/response session state machine.
//!
//! Drives the transmit/receive cycle against one exclusively owned byte
//! channel: periodic status polls on a ~1 s cadence, movement commands
//! injected between polls, one in-flight request at a time, and a
//! timeout/retry policy that folds parse failures and line noise into the
//! same path as a missing response. Exceeding the retry threshold parks the
//! session in `Faulted` until an explicit reset.
//!
//! Lifecycle: `Idle → Polling → AwaitingResponse → (Polling | Faulted)`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::channel::{byte_values, ByteChannel};
use crate::error::{CommanderError, Result};
use crate::protocol::{
    CommandFrame, FeedbackDecoder, FeedbackReport, FrameBuilder, ResponseParser, TimingModel,
};

/// Session lifecycle states. Mutated only by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing sent yet.
    Idle,
    /// Between exchanges; next poll (or injected movement) is due.
    Polling,
    /// A frame is in flight; listening for its response window.
    AwaitingResponse,
    /// Retry threshold exceeded. Terminal until `reset()`.
    Faulted,
}

/// Tunable session policy. Defaults come from capture timing.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cadence of status polls.
    pub poll_interval: Duration,
    /// Idle gap between the end of transmission and the start of
    /// listening. Captures show the response starting no earlier than
    /// ~15 ms after the command completes.
    pub response_settle: Duration,
    /// Response listen window. Observed command-to-response delay is
    /// 36-39 ms; the default includes margin.
    pub response_timeout: Duration,
    /// Consecutive failed exchanges tolerated before faulting.
    pub retry_threshold: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            response_settle: Duration::from_millis(15),
            response_timeout: Duration::from_millis(100),
            retry_threshold: 3,
        }
    }
}

/// Cloneable handle for requesting a stop from outside the session task.
///
/// A stop is honored at the suspension points (poll-interval residue and
/// the response wait); a frame whose transmission has begun is always sent
/// to completion with correct timing first.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// Orchestrates the command/response cycle over one byte channel.
pub struct SessionController<C: ByteChannel> {
    channel: C,
    builder: FrameBuilder,
    timing: TimingModel,
    parser: ResponseParser,
    decoder: FeedbackDecoder,
    config: SessionConfig,
    state: SessionState,
    last_feedback: Option<FeedbackReport>,
    consecutive_failures: u32,
    stop: StopHandle,
}

impl<C: ByteChannel> SessionController<C> {
    pub fn new(channel: C, config: SessionConfig) -> Self {
        Self {
            channel,
            builder: FrameBuilder::new(),
            timing: TimingModel::new(),
            parser: ResponseParser::new(),
            decoder: FeedbackDecoder::new(),
            config,
            state: SessionState::Idle,
            last_feedback: None,
            consecutive_failures: 0,
            stop: StopHandle::default(),
        }
    }

    /// Use a non-default timing model (e.g. delays from configuration).
    pub fn with_timing(mut self, timing: TimingModel) -> Self {
        self.timing = timing;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Most recently decoded feedback, if any exchange has succeeded.
    pub fn last_feedback(&self) -> Option<&FeedbackReport> {
        self.last_feedback.as_ref()
    }

    /// Handle for stopping the session from another task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Borrow the underlying channel (e.g. to inspect a mock in tests).
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Mutably borrow the underlying channel.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Tear the session down, returning the channel.
    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Clear a fault (or a stop) and return to `Polling`.
    pub fn reset(&mut self) {
        if self.state == SessionState::Faulted {
            info!("session fault cleared by external reset");
        }
        self.consecutive_failures = 0;
        self.stop.stopped.store(false, Ordering::SeqCst);
        self.state = SessionState::Polling;
    }

    /// Begin the session: run the two-command init handshake observed in
    /// captures (status query, then init), then settle into `Polling`.
    ///
    /// Handshake misses count against the retry threshold like any other
    /// exchange.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Ok(());
        }
        self.state = SessionState::Polling;
        info!("session starting; sending init handshake");

        let status = self.builder.status_query();
        let init = self.builder.init();
        for frame in [status, init] {
            if let Err(err) = self.exchange(frame).await {
                warn!(%err, "handshake exchange failed");
                if matches!(err, CommanderError::SessionFault(_)) {
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Send one status query and wait for its response.
    pub async fn poll_once(&mut self) -> Result<FeedbackReport> {
        self.ensure_operational()?;
        let frame = self.builder.status_query();
        self.exchange(frame).await
    }

    /// Send a movement command for `angle_deg` between polls.
    ///
    /// # Errors
    /// `UnsupportedAngle` synchronously when the angle has no known
    /// encoding; otherwise the usual timeout/retry semantics.
    pub async fn move_to(&mut self, angle_deg: f64) -> Result<FeedbackReport> {
        self.ensure_operational()?;
        let frame = self.builder.movement(angle_deg)?;
        info!(angle_deg, "issuing movement command");
        self.exchange(frame).await
    }

    /// Poll continuously for `duration`, honoring the poll cadence and the
    /// stop handle. Returns early on fault or stop.
    pub async fn run(&mut self, duration: Duration) -> Result<()> {
        self.start().await?;
        let deadline = Instant::now() + duration;

        while Instant::now() < deadline {
            if self.stop.is_stopped() {
                info!("stop requested; session going idle");
                self.state = SessionState::Idle;
                return Ok(());
            }

            let cycle_start = Instant::now();
            match self.poll_once().await {
                Ok(report) => debug!(?report, "poll succeeded"),
                Err(err @ CommanderError::SessionFault(_)) => return Err(err),
                Err(err) => warn!(%err, "poll failed; will retry"),
            }

            // Residue of the poll interval after the exchange itself.
            let elapsed = cycle_start.elapsed();
            let residue = self.config.poll_interval.saturating_sub(elapsed);
            let stop = self.stop.clone();
            tokio::select! {
                _ = tokio::time::sleep(residue) => {}
                _ = stop.notified() => {}
            }
        }
        Ok(())
    }

    fn ensure_operational(&self) -> Result<()> {
        if self.state == SessionState::Faulted {
            return Err(CommanderError::SessionFault(self.consecutive_failures));
        }
        Ok(())
    }

    /// One full transmit/listen/parse/decode cycle. At most one exchange is
    /// ever in flight: the channel is owned mutably for the whole cycle.
    async fn exchange(&mut self, frame: CommandFrame) -> Result<FeedbackReport> {
        let schedule = self.timing.schedule(&frame);
        let tx_duration = self.timing.frame_duration(frame.len());
        debug!(
            kind = ?frame.kind(),
            len = frame.len(),
            ?tx_duration,
            "transmitting frame"
        );

        self.state = SessionState::AwaitingResponse;
        // The send is never raced against the stop signal: a started frame
        // is always completed with correct timing.
        let outcome = match self.channel.send(&schedule).await {
            Err(err) => Err(err),
            Ok(()) => {
                tokio::time::sleep(self.config.response_settle).await;

                let stop = self.stop.clone();
                let received = tokio::select! {
                    r = self.channel.receive(self.config.response_timeout) => Some(r),
                    _ = stop.notified() => None,
                };
                match received {
                    None => {
                        self.state = SessionState::Idle;
                        return Err(CommanderError::ResponseTimeout(self.config.response_timeout));
                    }
                    Some(Err(err)) => Err(err),
                    Some(Ok(raw)) if raw.is_empty() => {
                        Err(CommanderError::ResponseTimeout(self.config.response_timeout))
                    }
                    Some(Ok(raw)) => self.parser.parse(&byte_values(&raw)),
                }
            }
        };

        match outcome {
            Ok(response) => {
                let report = self.decoder.decode(&response);
                self.consecutive_failures = 0;
                self.last_feedback = Some(report.clone());
                self.state = SessionState::Polling;
                Ok(report)
            }
            Err(err) => {
                // Parse and transport failures are folded into the same
                // timeout/retry path; transient noise is tolerated like a
                // missing response, and a dead channel reaches Faulted
                // through the threshold instead of looping forever.
                self.consecutive_failures += 1;
                warn!(
                    %err,
                    failures = self.consecutive_failures,
                    threshold = self.config.retry_threshold,
                    "exchange failed"
                );
                if self.consecutive_failures >= self.config.retry_threshold {
                    self.state = SessionState::Faulted;
                    Err(CommanderError::SessionFault(self.consecutive_failures))
                } else {
                    self.state = SessionState::Polling;
                    Err(err)
                }
            }
        }
    }
}
