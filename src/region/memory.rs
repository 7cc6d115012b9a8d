//! In-process telemetry region

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::trace;

use super::SharedRegion;
use crate::codec::span_at;
use crate::{Result, TelemetryError};

/// How [`MemoryRegion::wait_for_signal`](SharedRegion::wait_for_signal) behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMode {
    /// Wait for [`MemoryRegion::signal`]; time out otherwise.
    Notify,
    /// Every wait reports new data immediately.
    AlwaysReady,
}

#[derive(Debug)]
struct Shared {
    bytes: RwLock<Vec<u8>>,
    signal: Notify,
    mode: SignalMode,
}

/// A telemetry region held in memory.
///
/// Clones share the same bytes, so one handle can act as the writer while the
/// decoder owns another. Closing a handle only affects that handle.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    shared: Arc<Shared>,
    closed: bool,
}

impl MemoryRegion {
    /// A region that waits for [`MemoryRegion::signal`].
    pub fn new(bytes: Vec<u8>) -> Self {
        Self::with_mode(bytes, SignalMode::Notify)
    }

    /// A region whose waits always report new data.
    pub fn always_ready(bytes: Vec<u8>) -> Self {
        Self::with_mode(bytes, SignalMode::AlwaysReady)
    }

    pub fn with_mode(bytes: Vec<u8>, mode: SignalMode) -> Self {
        Self {
            shared: Arc::new(Shared { bytes: RwLock::new(bytes), signal: Notify::new(), mode }),
            closed: false,
        }
    }

    /// Overwrite bytes starting at `offset`.
    pub fn write_at(&self, offset: usize, data: &[u8]) -> Result<()> {
        let mut bytes = self.shared.bytes.write().unwrap_or_else(PoisonError::into_inner);
        let size = bytes.len();
        let target = offset
            .checked_add(data.len())
            .and_then(|end| bytes.get_mut(offset..end))
            .ok_or_else(|| TelemetryError::out_of_range(offset, data.len(), size))?;
        target.copy_from_slice(data);
        Ok(())
    }

    /// Overwrite a little-endian `i32` at `offset`.
    pub fn write_i32(&self, offset: usize, value: i32) -> Result<()> {
        self.write_at(offset, &value.to_le_bytes())
    }

    /// Swap in a whole new image. The size may change.
    pub fn replace(&self, image: Vec<u8>) {
        *self.shared.bytes.write().unwrap_or_else(PoisonError::into_inner) = image;
    }

    /// Copy of the current image.
    pub fn snapshot(&self) -> Vec<u8> {
        self.shared.bytes.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Wake one waiter, or the next one to wait if none is waiting.
    pub fn signal(&self) {
        self.shared.signal.notify_one();
    }
}

#[async_trait::async_trait]
impl SharedRegion for MemoryRegion {
    fn len(&self) -> usize {
        self.shared.bytes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn read_at(&self, offset: usize, length: usize) -> Result<Vec<u8>> {
        if self.closed {
            return Err(TelemetryError::connection_failed("Region is closed"));
        }
        let bytes = self.shared.bytes.read().unwrap_or_else(PoisonError::into_inner);
        span_at(&bytes, offset, length).map(<[u8]>::to_vec)
    }

    async fn wait_for_signal(&self, timeout: Duration) -> bool {
        match self.shared.mode {
            SignalMode::AlwaysReady => true,
            SignalMode::Notify => {
                let signaled =
                    tokio::time::timeout(timeout, self.shared.signal.notified()).await.is_ok();
                trace!(signaled, "Memory region wait finished");
                signaled
            }
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
