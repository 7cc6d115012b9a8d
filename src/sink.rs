//! Standings consumers.
//!
//! A [`StandingsSink`] receives every snapshot [`crate::live::LiveSession`]
//! produces, in tick order, with the session-only final report last. The
//! HTTP transport that posts to a remote standings service lives outside this
//! crate; [`LogSink`] is the dry-run sink used offline and by the binary.

use std::io::{self, Write};

use async_trait::async_trait;
use tracing::info;

use crate::standings::LivePositions;
use crate::{Result, TelemetryError};

#[async_trait]
pub trait StandingsSink: Send {
    /// Deliver one snapshot.
    async fn post(&mut self, positions: &LivePositions) -> Result<()>;
}

/// Writes each snapshot as pretty JSON and logs a one-line summary.
pub struct LogSink<W = io::Stdout> {
    writer: W,
    posted: usize,
}

impl LogSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl Default for LogSink<io::Stdout> {
    fn default() -> Self {
        Self::stdout()
    }
}

impl<W: Write + Send> LogSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, posted: 0 }
    }

    /// Snapshots written so far.
    pub fn posted(&self) -> usize {
        self.posted
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> StandingsSink for LogSink<W> {
    async fn post(&mut self, positions: &LivePositions) -> Result<()> {
        let json = serde_json::to_string_pretty(positions)?;
        writeln!(self.writer, "{}", json)
            .and_then(|()| self.writer.flush())
            .map_err(|e| TelemetryError::Sink {
                reason: "writing snapshot failed".to_string(),
                source: Some(Box::new(e)),
            })?;

        self.posted += 1;
        info!(
            session_state = %positions.session.session_state,
            drivers = positions.drivers.len(),
            final_report = positions.is_final(),
            "Posted standings"
        );
        Ok(())
    }
}
