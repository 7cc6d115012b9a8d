//! iRacing Header Structure Parsing
//!
//! Parses and validates the `irsdk_header` block at the start of the telemetry
//! region. The header tells the decoder where the session YAML, the variable
//! descriptor table and the rotating value buffers live.
//!
//! # iRacing Header Layout
//!
//! ```c
//! typedef struct irsdk_header
//! {
//!     int ver;                    // api version, 2 for current clients
//!     int status;                 // bitfield, bit 0 = connected
//!     int tickRate;               // ticks per second (60hz)
//!     int sessionInfoUpdate;      // incremented when session info changes
//!     int sessionInfoLen;         // length in bytes of session info string
//!     int sessionInfoOffset;      // offset to session info string
//!     int numVars;                // length of irsdk_varHeader array
//!     int varHeaderOffset;        // offset to irsdk_varHeader[0]
//!     int numBuf;                 // num of buffers in use (<= 4)
//!     int bufLen;                 // length in bytes for each buffer
//!     int pad1[2];
//!     irsdk_varBuf varBuf[4];     // { tickCount, bufOffset, pad[2] }
//! } irsdk_header;
//! ```
//!
//! All fields are little-endian `i32`. The header is read field by field through
//! [`crate::codec`], so no layout assumptions about the host are made.
//!
//! # Buffer Rotation
//!
//! The simulator writes each new sample into the oldest of `numBuf` buffers and
//! stamps it with a tick count. [`Header::latest_buffer`] picks the buffer with
//! the highest tick; the decoder re-checks that tick after copying to detect a
//! torn read.

use crate::codec::{i32_at, non_negative};
use crate::{Result, TelemetryError};
use tracing::trace;

/// The expected iRacing SDK version
pub const IRSDK_VER: i32 = 2;

/// Status flag indicating that the simulator is actively publishing telemetry
pub const IRSDK_STATUS_CONNECTED: i32 = 0x1;

/// Size of the header block in bytes
pub const HEADER_SIZE: usize = 112;

/// Maximum number of value buffers the header can describe
pub const IRSDK_MAX_BUFS: usize = 4;

/// Upper bound on descriptor count accepted from a header
pub const MAX_VARS: i32 = 10_000;

const VAR_BUF_OFFSET: usize = 48;
const VAR_BUF_STRIDE: usize = 16;

/// One entry of the value-buffer rotation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarBuf {
    /// Tick count when the buffer was last written
    pub tick_count: i32,
    /// Offset from the region start to the buffer
    pub buf_offset: i32,
}

/// Decoded `irsdk_header`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub ver: i32,
    pub status: i32,
    pub tick_rate: i32,
    /// Data-version counter; bumped whenever the session YAML changes
    pub session_info_update: i32,
    pub session_info_len: i32,
    pub session_info_offset: i32,
    pub num_vars: i32,
    pub var_header_offset: i32,
    pub num_buf: i32,
    pub buf_len: i32,
    pub var_buf: [VarBuf; IRSDK_MAX_BUFS],
}

/// Location of the value buffer a decode pass should read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSlot {
    pub index: usize,
    pub tick_count: i32,
    pub offset: usize,
}

impl Header {
    /// Parse the header fields from the first [`HEADER_SIZE`] bytes of `memory`.
    ///
    /// Only the width is checked here; call [`Header::validate`] once the
    /// connected bit is set.
    pub fn parse(memory: &[u8]) -> Result<Self> {
        if memory.len() < HEADER_SIZE {
            return Err(TelemetryError::out_of_range(0, HEADER_SIZE, memory.len()));
        }

        let mut var_buf = [VarBuf::default(); IRSDK_MAX_BUFS];
        for (i, slot) in var_buf.iter_mut().enumerate() {
            let base = VAR_BUF_OFFSET + i * VAR_BUF_STRIDE;
            slot.tick_count = i32_at(memory, base)?;
            slot.buf_offset = i32_at(memory, base + 4)?;
        }

        let header = Self {
            ver: i32_at(memory, 0)?,
            status: i32_at(memory, 4)?,
            tick_rate: i32_at(memory, 8)?,
            session_info_update: i32_at(memory, 12)?,
            session_info_len: i32_at(memory, 16)?,
            session_info_offset: i32_at(memory, 20)?,
            num_vars: i32_at(memory, 24)?,
            var_header_offset: i32_at(memory, 28)?,
            num_buf: i32_at(memory, 32)?,
            buf_len: i32_at(memory, 36)?,
            var_buf,
        };

        trace!(
            ver = header.ver,
            status = header.status,
            session_info_update = header.session_info_update,
            num_vars = header.num_vars,
            num_buf = header.num_buf,
            "Parsed iRacing header"
        );

        Ok(header)
    }

    /// Returns true when iRacing reports the shared memory is live
    pub fn is_connected(&self) -> bool {
        (self.status & IRSDK_STATUS_CONNECTED) != 0
    }

    /// Check the header against the region it was read from.
    ///
    /// Every block the header points at must lie entirely inside
    /// `region_len` bytes.
    pub fn validate(&self, region_len: usize) -> Result<()> {
        if self.ver != IRSDK_VER {
            return Err(TelemetryError::Version {
                expected: IRSDK_VER as u32,
                found: self.ver as u32,
            });
        }

        if !(1..=IRSDK_MAX_BUFS as i32).contains(&self.num_buf) {
            return Err(TelemetryError::parse(
                "Header validation",
                format!("Expected 1-4 buffers, found {}", self.num_buf),
            ));
        }

        if self.buf_len <= 0 {
            return Err(TelemetryError::parse(
                "Header validation",
                format!("Invalid buffer length: {}", self.buf_len),
            ));
        }

        if !(0..=MAX_VARS).contains(&self.num_vars) {
            return Err(TelemetryError::parse(
                "Header validation",
                format!("Invalid num_vars: {}", self.num_vars),
            ));
        }

        let session_offset =
            non_negative(self.session_info_offset, "Header validation", "session info offset")?;
        let session_len =
            non_negative(self.session_info_len, "Header validation", "session info length")?;
        check_span(session_offset, Some(session_len), region_len)?;

        let var_offset =
            non_negative(self.var_header_offset, "Header validation", "var header offset")?;
        let table_len = (self.num_vars as usize).checked_mul(super::variables::VAR_HEADER_SIZE);
        check_span(var_offset, table_len, region_len)?;

        let buf_len = self.buf_len as usize;
        for (i, buf) in self.active_buffers().iter().enumerate() {
            let offset = non_negative(
                buf.buf_offset,
                "Header validation",
                &format!("offset for buffer {}", i),
            )?;
            check_span(offset, Some(buf_len), region_len)?;
        }

        Ok(())
    }

    /// Buffers the writer is currently rotating through.
    pub fn active_buffers(&self) -> &[VarBuf] {
        let n = usize::try_from(self.num_buf).unwrap_or(0).min(IRSDK_MAX_BUFS);
        &self.var_buf[..n]
    }

    /// The most recently written buffer, `None` if no buffers are active.
    pub fn latest_buffer(&self) -> Option<BufferSlot> {
        self.active_buffers()
            .iter()
            .enumerate()
            .max_by_key(|(_, buf)| buf.tick_count)
            .and_then(|(index, buf)| {
                usize::try_from(buf.buf_offset).ok().map(|offset| BufferSlot {
                    index,
                    tick_count: buf.tick_count,
                    offset,
                })
            })
    }

    /// Byte offset of a buffer's tick count field within the header.
    pub fn tick_field_offset(index: usize) -> usize {
        VAR_BUF_OFFSET + index * VAR_BUF_STRIDE
    }
}

fn check_span(offset: usize, length: Option<usize>, region_len: usize) -> Result<()> {
    let length = length.unwrap_or(usize::MAX);
    match offset.checked_add(length) {
        Some(end) if end <= region_len => Ok(()),
        _ => Err(TelemetryError::out_of_range(offset, length, region_len)),
    }
}
