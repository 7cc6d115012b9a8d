//! Live race standings from iRacing shared-memory telemetry.
//!
//! `livetiming` reads the simulator's telemetry region, decodes it into typed
//! variables and relays periodic standings snapshots to a consumer.
//!
//! # Layers
//!
//! - **Region**: [`region::SharedRegion`] hands out bounds-checked bytes and
//!   waits for the writer's "new data" signal. [`region::MemoryRegion`] and
//!   [`region::FileRegion`] work everywhere; `windows::MappedRegion` maps the
//!   live simulator.
//! - **Decoder**: [`TelemetryDecoder`] tracks the connection, parses the
//!   header, descriptor table and session YAML, and publishes one immutable
//!   [`Catalog`] per poll.
//! - **Live session**: [`LiveSession`] polls the decoder, merges class
//!   positions and laps into the driver list and posts [`LivePositions`] to a
//!   [`StandingsSink`] until the session cools down.
//!
//! # Example (offline replay)
//!
//! ```rust,no_run
//! use livetiming::region::FileRegion;
//! use livetiming::{DecoderConfig, LiveSession, LiveSessionConfig, LogSink, TelemetryDecoder};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> livetiming::Result<()> {
//!     let region = FileRegion::open("capture.bin")?;
//!     let decoder = TelemetryDecoder::new(region, DecoderConfig::default());
//!     let mut live = LiveSession::new(decoder, LogSink::stdout(), LiveSessionConfig::default());
//!     live.run(CancellationToken::new()).await
//! }
//! ```

pub mod codec;
pub mod decoder;
mod error;
pub mod live;
pub mod region;
pub mod schema;
pub mod sink;
pub mod standings;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;
mod yaml_utils;

// Platform-specific modules
#[cfg(windows)]
pub mod windows;

pub use decoder::{DecoderConfig, PollOutcome, TelemetryDecoder};
pub use error::*;
pub use live::{LiveSession, LiveSessionConfig, Phase, TickOutcome};
pub use schema::{SessionInfo, SessionInfoParser};
pub use sink::{LogSink, StandingsSink};
pub use standings::{LivePositions, SessionState};
pub use types::*;
