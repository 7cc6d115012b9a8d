//! Byte sources the decoder reads telemetry from.
//!
//! A [`SharedRegion`] is a fixed-size span of bytes owned by an external
//! writer, plus an optional "new data" signal. The decoder never assumes two
//! reads are consistent with each other; it re-checks tick counts instead.
//!
//! Implementations:
//! - [`MemoryRegion`]: an in-process buffer the caller writes to, used by tests
//!   and benches to stand in for the simulator
//! - [`FileRegion`]: a captured region on disk for offline replay
//! - `windows::MappedRegion`: the live iRacing mapping (Windows only)

use std::fmt::Display;
use std::time::Duration;

use tracing::warn;

use crate::Result;

mod file;
mod memory;

pub use file::FileRegion;
pub use memory::{MemoryRegion, SignalMode};

/// Read-only view of a telemetry region.
#[async_trait::async_trait]
pub trait SharedRegion: Send + Sync {
    /// Size of the region in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `length` bytes starting at `offset`.
    ///
    /// Any span not fully inside the region, including one whose end
    /// overflows, is [`crate::TelemetryError::OutOfRange`]. Reads after
    /// [`SharedRegion::close`] fail with a connection error.
    fn read_at(&self, offset: usize, length: usize) -> Result<Vec<u8>>;

    /// Wait up to `timeout` for the writer to signal new data.
    ///
    /// Returns `false` on timeout. When the signal primitive fails the
    /// remaining timeout is slept out and `false` is returned. A region with
    /// no signal primitive at all reports ready at once.
    async fn wait_for_signal(&self, timeout: Duration) -> bool;

    /// Release the underlying resources. Idempotent.
    fn close(&mut self);
}

/// Keep a data signal that may not exist.
///
/// A region whose signal could not be opened still serves reads; every wait
/// on it then reports ready at once.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn optional_signal<T, E: Display>(
    name: &str,
    opened: std::result::Result<T, E>,
) -> Option<T> {
    match opened {
        Ok(signal) => Some(signal),
        Err(e) => {
            warn!(signal = name, error = %e, "Data signal unavailable, every wait reports ready");
            None
        }
    }
}
