//! Little-endian field decoding for region bytes.
//!
//! The fixed-width helpers take arrays, so a span of the wrong width is a
//! compile error rather than a runtime condition. The `*_at` helpers slice a
//! larger buffer and report [`TelemetryError::OutOfRange`] instead of panicking.

use crate::{Result, TelemetryError};

/// Decode a little-endian signed 32-bit integer.
pub fn le_i32(bytes: [u8; 4]) -> i32 {
    i32::from_le_bytes(bytes)
}

/// Decode a little-endian unsigned 32-bit integer.
pub fn le_u32(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

/// Reinterpret four little-endian bytes as an IEEE-754 single.
pub fn le_f32(bytes: [u8; 4]) -> f32 {
    f32::from_bits(le_u32(bytes))
}

/// Reinterpret eight little-endian bytes as an IEEE-754 double.
pub fn le_f64(bytes: [u8; 8]) -> f64 {
    f64::from_bits(u64::from_le_bytes(bytes))
}

/// Text from a fixed-length field with trailing NUL padding removed.
pub fn nul_trimmed(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Copy `N` bytes starting at `offset` out of `data`.
pub fn fixed_at<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    let end = offset
        .checked_add(N)
        .ok_or_else(|| TelemetryError::out_of_range(offset, N, data.len()))?;
    let span = data
        .get(offset..end)
        .ok_or_else(|| TelemetryError::out_of_range(offset, N, data.len()))?;

    let mut out = [0u8; N];
    out.copy_from_slice(span);
    Ok(out)
}

/// Borrow `length` bytes starting at `offset` out of `data`.
pub fn span_at(data: &[u8], offset: usize, length: usize) -> Result<&[u8]> {
    offset
        .checked_add(length)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| TelemetryError::out_of_range(offset, length, data.len()))
}

/// Little-endian `i32` at `offset`.
pub fn i32_at(data: &[u8], offset: usize) -> Result<i32> {
    fixed_at::<4>(data, offset).map(le_i32)
}

/// Convert a signed header field into a byte offset or length.
pub(crate) fn non_negative(value: i32, context: &str, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        TelemetryError::parse(context, format!("Negative {}: {}", field, value))
    })
}
