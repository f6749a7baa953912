// ── State polling loop ──
//
// Reads the target's state once per interval until the cancellation
// token fires. Cancellation is checked at the top of every iteration and
// raced against the inter-read sleep; a read already in flight is left to
// finish or fail on its own.

use std::io::Write;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use amsprobe_api::{AdsState, AmsAddress};

use crate::error::CoreError;
use crate::session::AdsConnection;

/// Where the poll loop is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Stopped,
}

/// What a finished poll loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    /// Number of state reads that completed successfully.
    pub reads: u64,
    /// State reported by the last successful read.
    pub last_state: Option<AdsState>,
}

/// The console line emitted for every successful read.
pub fn report_line(target: &AmsAddress, state: AdsState) -> String {
    format!("[AdsClient] State of host TwinCAT '{target}' is: {state}")
}

/// Drives sequential state reads and reports each one to `out` and the log.
pub struct Poller<W> {
    target: AmsAddress,
    interval: Duration,
    out: W,
    state: PollState,
    summary: PollSummary,
}

impl<W: Write> Poller<W> {
    pub fn new(target: AmsAddress, interval: Duration, out: W) -> Self {
        Self {
            target,
            interval,
            out,
            state: PollState::Polling,
            summary: PollSummary {
                reads: 0,
                last_state: None,
            },
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Consume the poller, handing back the console sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Poll until `cancel` fires or a read fails.
    ///
    /// Returns [`CoreError::Poll`] on the first failed read; no further
    /// reads are attempted after a failure.
    pub async fn run<C: AdsConnection>(
        &mut self,
        connection: &mut C,
        cancel: &CancellationToken,
    ) -> Result<PollSummary, CoreError> {
        while self.state == PollState::Polling {
            if cancel.is_cancelled() {
                debug!("cancellation observed at iteration boundary");
                self.state = PollState::Stopped;
                break;
            }

            let result = match connection.read_state().await {
                Ok(result) => result,
                Err(source) => {
                    self.state = PollState::Stopped;
                    error!(
                        target_addr = %self.target,
                        reads = self.summary.reads,
                        error = %source,
                        "state read failed"
                    );
                    return Err(CoreError::Poll {
                        target: self.target.to_string(),
                        source,
                    });
                }
            };

            self.summary.reads += 1;
            self.summary.last_state = Some(result.ads_state);
            self.report(result.ads_state, result.device_state);

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("cancellation observed while waiting for next poll");
                    self.state = PollState::Stopped;
                }
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        Ok(self.summary)
    }

    fn report(&mut self, state: AdsState, device_state: u16) {
        let line = report_line(&self.target, state);
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!(error = %e, "failed to write poll result to console");
        }
        info!(ads_state = %state, device_state, "{line}");
    }
}
