//! Live standings loop.
//!
//! [`LiveSession`] drives a [`TelemetryDecoder`] once per tick, turns the
//! decoded catalog into a [`LivePositions`] snapshot and hands it to a
//! [`StandingsSink`]. The loop ends when the simulator reports Cool Down, when
//! a required variable cannot be read, or when the caller cancels; in every
//! case exactly one session-only final report is posted last.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::decoder::{PollOutcome, TelemetryDecoder};
use crate::sink::StandingsSink;
use crate::standings::{Drivers, LivePositions, SessionRecord, SessionState, Weekend};
use crate::{Result, TelemetryError};

#[cfg(test)]
mod tests;

/// Loop timing and output options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSessionConfig {
    /// Longest wait for the simulator's data signal per tick.
    pub poll_timeout: Duration,
    /// Pause after each posted snapshot.
    pub post_interval: Duration,
    /// Replace driver names with `Driver <car_idx>`.
    pub redact: bool,
}

impl Default for LiveSessionConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(100),
            post_interval: Duration::from_secs(10),
            redact: false,
        }
    }
}

/// Lifecycle of a [`LiveSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Built, not yet run.
    Idle,
    /// Ticking.
    Active,
    /// Final report attempted. The session cannot run again.
    Terminated,
}

/// What one tick decided.
#[derive(Debug)]
pub enum TickOutcome {
    /// A snapshot was posted; sleep, then tick again.
    Continue,
    /// State is Invalid, or a recoverable decode error dropped the
    /// connection; tick again without posting.
    Skip,
    /// Cool Down reached.
    Finish,
    /// A required read failed. The session record carries the error text.
    Fail(TelemetryError),
}

/// Polls telemetry and posts live standings until the session ends.
pub struct LiveSession<S> {
    decoder: TelemetryDecoder,
    sink: S,
    config: LiveSessionConfig,
    phase: Phase,
    last_version: i32,
    weekend: Weekend,
    session: SessionRecord,
    drivers: Drivers,
}

impl<S: StandingsSink> LiveSession<S> {
    pub fn new(decoder: TelemetryDecoder, sink: S, config: LiveSessionConfig) -> Self {
        Self {
            decoder,
            sink,
            config,
            phase: Phase::Idle,
            last_version: -1,
            weekend: Weekend::default(),
            session: SessionRecord::default(),
            drivers: Drivers::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &SessionRecord {
        &self.session
    }

    pub fn weekend(&self) -> &Weekend {
        &self.weekend
    }

    pub fn drivers(&self) -> &Drivers {
        &self.drivers
    }

    pub fn decoder(&self) -> &TelemetryDecoder {
        &self.decoder
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Tick until the session ends, then post the final report.
    ///
    /// Returns the final post's error if it fails, otherwise the error that
    /// ended the loop, otherwise `Ok(())` (Cool Down or cancellation).
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        if self.phase == Phase::Terminated {
            return Err(TelemetryError::connection_failed("Live session already terminated"));
        }

        info!(
            poll_timeout = ?self.config.poll_timeout,
            post_interval = ?self.config.post_interval,
            redact = self.config.redact,
            "Live session started"
        );
        self.phase = Phase::Active;

        let failure = loop {
            if cancel.is_cancelled() {
                info!("Live session cancelled");
                break None;
            }

            match self.tick().await {
                TickOutcome::Continue => {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.config.post_interval) => {}
                    }
                }
                TickOutcome::Skip => {}
                TickOutcome::Finish => {
                    info!("Session reached Cool Down");
                    break None;
                }
                TickOutcome::Fail(e) => {
                    error!(error = %e, "Live session stopped");
                    break Some(e);
                }
            }
        };

        self.finish(failure).await
    }

    /// One pass: poll, rebuild on a new version, read state, merge, post.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.phase == Phase::Idle {
            self.phase = Phase::Active;
        }

        let outcome = match self.decoder.poll(self.config.poll_timeout).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_retryable() => {
                // The decoder is disconnected; the next poll re-reads everything
                warn!(error = %e, "Telemetry poll failed, retrying next tick");
                tokio::time::sleep(self.config.poll_timeout).await;
                return TickOutcome::Skip;
            }
            Err(e) => {
                self.session.fail(format!("Can not read telemetry, err: {}", e));
                return TickOutcome::Fail(e);
            }
        };

        let version = self.decoder.version();
        let new_epoch = outcome == PollOutcome::Data { new_version: true };
        if version != self.last_version || new_epoch {
            debug!(from = self.last_version, to = version, "Rebuilding session state");
            self.last_version = version;
            if let Err(e) = self.rebuild() {
                self.session.fail(format!("Can not determine SessionNum, err: {}", e));
                return TickOutcome::Fail(e);
            }
        }

        let code = match self.decoder.scalar::<i32>("SessionState") {
            Ok(code) => code,
            Err(e) => {
                self.session.fail(format!("Can not determine SessionState, err: {}", e));
                return TickOutcome::Fail(e);
            }
        };

        let state = SessionState::from_code(code);
        self.session.set_state(state);
        match state {
            SessionState::Invalid => {
                debug!(code, version, "Session state invalid, skipping tick");
                return TickOutcome::Skip;
            }
            SessionState::CoolDown => return TickOutcome::Finish,
            _ => {}
        }

        if let Err(e) = self.merge_standings() {
            return TickOutcome::Fail(e);
        }

        let snapshot = LivePositions::standings(&self.weekend, &self.session, &self.drivers);
        trace!(state = %state, drivers = snapshot.drivers.len(), "Posting standings");
        if let Err(e) = self.sink.post(&snapshot).await {
            warn!(error = %e, "Posting standings failed");
            self.session.fail(format!("Can not post standings, err: {}", e));
        }

        TickOutcome::Continue
    }

    fn rebuild(&mut self) -> Result<()> {
        let session_num = self.decoder.scalar::<i32>("SessionNum")?;
        let info = self.decoder.session().unwrap_or_default();

        self.weekend = Weekend::from_info(&info.weekend_info);
        self.session = SessionRecord::from_info(session_num, &info.session_info);
        self.drivers = Drivers::from_session(info.drivers(), self.config.redact);

        debug!(
            session_num,
            session_type = %self.session.session_type,
            drivers = self.drivers.len(),
            "Session state rebuilt"
        );
        Ok(())
    }

    fn merge_standings(&mut self) -> Result<()> {
        let positions = self.per_car("CarIdxClassPosition")?;
        self.drivers.set_positions(&positions);

        let laps = self.per_car("CarIdxLapCompleted")?;
        self.drivers.set_laps(&laps);
        Ok(())
    }

    fn per_car(&mut self, name: &str) -> Result<Vec<i32>> {
        self.decoder.sequence::<i32>(name).inspect_err(|e| {
            self.session.fail(format!("Can not determine {}, err: {}", name, e));
        })
    }

    async fn finish(&mut self, failure: Option<TelemetryError>) -> Result<()> {
        self.phase = Phase::Terminated;

        let report = LivePositions::final_report(&self.session);
        if let Err(e) = self.sink.post(&report).await {
            error!(error = %e, "Final standings post failed");
            return Err(e);
        }

        info!(
            session_state = %self.session.session_state,
            error_text = %self.session.error_text,
            "Live session finished"
        );
        failure.map_or(Ok(()), Err)
    }
}
