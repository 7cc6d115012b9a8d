//! Live iRacing shared memory region

use crate::region::{SharedRegion, optional_signal};
use crate::{Result, TelemetryError};
use std::ptr::NonNull;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};
use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows::Win32::System::Memory::{
    FILE_MAP_READ, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile,
};
use windows::Win32::System::Threading::{
    OpenEventW, SYNCHRONIZATION_ACCESS_RIGHTS, WaitForSingleObject,
};
use windows::core::PCWSTR;

/// iRacing shared memory file name
pub const IRSDK_MEMMAPFILENAME: &str = "Local\\IRSDKMemMapFileName";
/// iRacing data valid event name
pub const IRSDK_DATAVALIDEVENTNAME: &str = "Local\\IRSDKDataValidEvent";
/// Size of the mapping the simulator creates
pub const IRSDK_MEMMAPFILESIZE: usize = 1164 * 1024;

/// SYNCHRONIZE access right
const SYNCHRONIZE: u32 = 0x0010_0000;

struct Mapping {
    handle: HANDLE,
    base: NonNull<u8>,
    event: Option<HANDLE>,
}

impl Mapping {
    fn release(self) {
        unsafe {
            let addr = MEMORY_MAPPED_VIEW_ADDRESS { Value: self.base.as_ptr() as *mut _ };
            let _ = UnmapViewOfFile(addr);
            let _ = CloseHandle(self.handle);
            if let Some(event) = self.event {
                let _ = CloseHandle(event);
            }
        }
    }
}

/// Read-only mapping of the live telemetry region.
pub struct MappedRegion {
    mapping: Option<Mapping>,
}

impl MappedRegion {
    /// Open the simulator's mapping and data-valid event.
    ///
    /// Fails with a Windows API error when the simulator is not running. A
    /// missing event is not an error: the region then reports every wait as
    /// ready.
    pub fn open() -> Result<Self> {
        trace!("Attempting to map iRacing shared memory");

        let handle = unsafe {
            let wide_name = wide_string(IRSDK_MEMMAPFILENAME);
            OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR::from_raw(wide_name.as_ptr()))
                .map_err(|e| TelemetryError::windows_api_error("OpenFileMappingW", e))?
        };

        let base = unsafe {
            let ptr = MapViewOfFile(handle, FILE_MAP_READ, 0, 0, IRSDK_MEMMAPFILESIZE);
            match NonNull::new(ptr.Value as *mut u8) {
                Some(base) => base,
                None => {
                    let win_err = windows::core::Error::from_thread();
                    let _ = CloseHandle(handle);
                    return Err(TelemetryError::windows_api_error("MapViewOfFile", win_err));
                }
            }
        };

        let event = unsafe {
            let wide_name = wide_string(IRSDK_DATAVALIDEVENTNAME);
            OpenEventW(
                SYNCHRONIZATION_ACCESS_RIGHTS(SYNCHRONIZE),
                false,
                PCWSTR::from_raw(wide_name.as_ptr()),
            )
        };
        let event = optional_signal(IRSDK_DATAVALIDEVENTNAME, event);

        debug!(event = event.is_some(), "Mapped iRacing shared memory");
        Ok(Self { mapping: Some(Mapping { handle, base, event }) })
    }
}

#[async_trait::async_trait]
impl SharedRegion for MappedRegion {
    fn len(&self) -> usize {
        IRSDK_MEMMAPFILESIZE
    }

    fn read_at(&self, offset: usize, length: usize) -> Result<Vec<u8>> {
        let mapping = self
            .mapping
            .as_ref()
            .ok_or_else(|| TelemetryError::connection_failed("Shared memory is closed"))?;

        match offset.checked_add(length) {
            Some(end) if end <= IRSDK_MEMMAPFILESIZE => {}
            _ => return Err(TelemetryError::out_of_range(offset, length, IRSDK_MEMMAPFILESIZE)),
        }

        // SAFETY: the view spans IRSDK_MEMMAPFILESIZE bytes and the span was
        // checked above. The writer may change bytes underneath; callers
        // re-check tick counts.
        let bytes = unsafe {
            std::slice::from_raw_parts(mapping.base.as_ptr().add(offset), length).to_vec()
        };
        Ok(bytes)
    }

    async fn wait_for_signal(&self, timeout: Duration) -> bool {
        let Some(mapping) = self.mapping.as_ref() else {
            tokio::time::sleep(timeout).await;
            return false;
        };
        let Some(event) = mapping.event else {
            return true;
        };

        // HANDLE is not Send; the kernel object outlives the wait because
        // close() needs &mut self
        let event_raw = event.0 as usize;
        let timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;
        let started = Instant::now();

        let waited = tokio::task::spawn_blocking(move || {
            let event = HANDLE(event_raw as *mut std::ffi::c_void);
            unsafe { WaitForSingleObject(event, timeout_ms) }
        })
        .await;

        match waited {
            Ok(WAIT_OBJECT_0) => true,
            Ok(WAIT_TIMEOUT) => false,
            Ok(other) => {
                warn!(result = other.0, "WaitForSingleObject failed");
                tokio::time::sleep(timeout.saturating_sub(started.elapsed())).await;
                false
            }
            Err(e) => {
                warn!(error = %e, "Event wait task failed");
                tokio::time::sleep(timeout.saturating_sub(started.elapsed())).await;
                false
            }
        }
    }

    fn close(&mut self) {
        if let Some(mapping) = self.mapping.take() {
            mapping.release();
            debug!("Unmapped iRacing shared memory");
        }
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        self.close();
    }
}

// SAFETY: the mapping is read-only and the handles are kernel objects usable
// from any thread
unsafe impl Send for MappedRegion {}
unsafe impl Sync for MappedRegion {}

/// Convert string to null-terminated wide string for Windows APIs
fn wide_string(s: &str) -> Vec<u16> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}
