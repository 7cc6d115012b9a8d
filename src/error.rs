//! Error types for telemetry decoding and standings relay.
//!
//! All errors implement `std::error::Error` and carry structured context.
//!
//! ## Error Categories
//!
//! - **Decode errors**: out-of-range offsets, malformed headers, unparseable session
//!   YAML, torn reads. The decoder drops to disconnected and retries on the next poll.
//! - **Lookup errors**: a variable is absent or the source is not connected.
//! - **Transport errors**: the standings sink could not accept a snapshot.
//! - **Platform errors**: shared memory or event primitives are unavailable.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use livetiming::TelemetryError;
//!
//! let error = TelemetryError::connection_failed("iRacing not running");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Failed to connect to telemetry source: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Region file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SDK version mismatch: expected {expected}, found {found}")]
    Version { expected: u32, found: u32 },

    #[error("Read of {length} bytes at offset {offset:#x} is outside the {size} byte region")]
    OutOfRange { offset: usize, length: usize, size: usize },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Telemetry variable '{name}' not found")]
    NotFound { name: String },

    #[error("Type conversion error: {details}")]
    TypeConversion { details: String },

    #[error("{feature} is only available on {required_platform}")]
    UnsupportedPlatform { feature: String, required_platform: String },

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },

    #[error("Buffer operation failed: {context}")]
    Buffer { context: String, buffer_index: Option<usize> },

    #[error("Standings sink rejected snapshot: {reason}")]
    Sink {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Connection { .. } => true,
            TelemetryError::Buffer { .. } => true,
            TelemetryError::OutOfRange { .. } => true,
            TelemetryError::Parse { .. } => true,
            TelemetryError::NotFound { .. } => true,
            TelemetryError::Sink { .. } => true,
            TelemetryError::File { .. } => false,
            TelemetryError::Version { .. } => false,
            TelemetryError::TypeConversion { .. } => false,
            TelemetryError::UnsupportedPlatform { .. } => false,
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => true,
        }
    }

    /// Returns true for errors raised while interpreting region bytes.
    ///
    /// These force the decoder back to the disconnected state.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            TelemetryError::OutOfRange { .. }
                | TelemetryError::Parse { .. }
                | TelemetryError::Version { .. }
                | TelemetryError::Buffer { .. }
        )
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::Connection { .. } => vec![
                "Ensure iRacing is running",
                "Check Windows permissions for shared memory access",
                "Try restarting iRacing",
            ],
            TelemetryError::File { .. } => vec![
                "Check the region capture exists and is readable",
                "Verify the capture was taken from a live session",
            ],
            TelemetryError::OutOfRange { .. } => vec![
                "Wait for the simulator to finish writing the header",
                "Verify the region capture is not truncated",
            ],
            TelemetryError::Version { .. } => vec![
                "Update iRacing to latest version",
                "Update library to compatible version",
            ],
            TelemetryError::Parse { .. } => vec![
                "Check data format compatibility",
                "Verify source data integrity",
            ],
            TelemetryError::NotFound { .. } => vec![
                "Check variable name spelling",
                "Wait until the simulator is in a session",
            ],
            TelemetryError::TypeConversion { .. } => vec![
                "Check the variable's declared type",
                "Use the matching typed accessor",
            ],
            TelemetryError::UnsupportedPlatform { .. } => vec![
                "Replay a captured region with --file",
                "Run on Windows alongside iRacing for live data",
            ],
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => vec![
                "Check Windows API permissions",
                "Verify system resources availability",
            ],
            TelemetryError::Buffer { .. } => vec![
                "Retry on the next tick",
                "Check system load if torn reads persist",
            ],
            TelemetryError::Sink { .. } => vec![
                "Check the standings endpoint is reachable",
                "Check the output destination is writable",
            ],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TelemetryError::File { path, source }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        TelemetryError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for bounds violations.
    pub fn out_of_range(offset: usize, length: usize, size: usize) -> Self {
        TelemetryError::OutOfRange { offset, length, size }
    }

    /// Helper constructor for parse errors.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for missing variables.
    pub fn not_found(name: impl Into<String>) -> Self {
        TelemetryError::NotFound { name: name.into() }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        TelemetryError::WindowsApi { operation: operation.into(), source }
    }

    /// Helper constructor for buffer operation errors.
    pub fn buffer_operation_error(context: impl Into<String>, buffer_index: Option<usize>) -> Self {
        TelemetryError::Buffer { context: context.into(), buffer_index }
    }

    /// Helper constructor for sink failures.
    pub fn sink_failed(reason: impl Into<String>) -> Self {
        TelemetryError::Sink { reason: reason.into(), source: None }
    }

    /// Helper constructor for unsupported platform errors.
    pub fn unsupported_platform(
        feature: impl Into<String>,
        required_platform: impl Into<String>,
    ) -> Self {
        TelemetryError::UnsupportedPlatform {
            feature: feature.into(),
            required_platform: required_platform.into(),
        }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::Sink {
            reason: "snapshot serialization failed".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(windows)]
impl From<core::Error> for TelemetryError {
    fn from(err: core::Error) -> Self {
        TelemetryError::WindowsApi {
            operation: "Unknown Windows operation".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(
            reason in ".*",
            name in "\\w+",
            offset in 0usize..0x10000usize,
            length in 1usize..4096usize,
            details in ".*"
        ) {
            let connection = TelemetryError::connection_failed(reason.clone());
            prop_assert!(connection.to_string().contains(&reason));

            let missing = TelemetryError::not_found(name.clone());
            prop_assert!(missing.to_string().contains(&name));

            let range = TelemetryError::out_of_range(offset, length, 0);
            let hex_offset = format!("{:#x}", offset);
            prop_assert!(range.to_string().contains(&hex_offset));

            let conversion = TelemetryError::TypeConversion { details: details.clone() };
            prop_assert!(conversion.to_string().contains(&details));
        }

        #[test]
        fn sink_errors_keep_their_source(base_message in "[a-z ]{1,40}") {
            let err = TelemetryError::Sink {
                reason: "post failed".to_string(),
                source: Some(Box::new(std::io::Error::other(base_message.clone()))),
            };

            let source = std::error::Error::source(&err).expect("source should be chained");
            prop_assert!(source.to_string().contains(&base_message));
        }
    }

    #[test]
    fn decode_errors_are_classified() {
        assert!(TelemetryError::out_of_range(10, 4, 8).is_decode_error());
        assert!(TelemetryError::parse("header", "bad").is_decode_error());
        assert!(TelemetryError::buffer_operation_error("torn", Some(1)).is_decode_error());
        assert!(!TelemetryError::not_found("Speed").is_decode_error());
        assert!(!TelemetryError::sink_failed("down").is_decode_error());
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<TelemetryError>();

        let error = TelemetryError::connection_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_suggestions_are_actionable() {
        let errors = [
            TelemetryError::connection_failed("test"),
            TelemetryError::out_of_range(0x1000, 4, 16),
            TelemetryError::Version { expected: 2, found: 1 },
            TelemetryError::sink_failed("endpoint down"),
        ];

        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }

        assert!(!TelemetryError::Version { expected: 2, found: 1 }.is_retryable());
        assert!(TelemetryError::sink_failed("down").is_retryable());
    }

    #[test]
    fn every_loop_ending_error_has_suggestions() {
        // what LiveSession::run can hand back to the binary
        let endings = [
            TelemetryError::not_found("SessionNum"),
            TelemetryError::Version { expected: 2, found: 3 },
            TelemetryError::connection_failed("Live session already terminated"),
            TelemetryError::sink_failed("final post rejected"),
            TelemetryError::file_error("capture.bin".into(), std::io::ErrorKind::NotFound.into()),
        ];

        for error in &endings {
            assert!(!error.recovery_suggestions().is_empty(), "{error:?}");
        }
    }

    #[test]
    fn io_errors_convert_to_file_errors() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "capture.bin");
        let telemetry_err: TelemetryError = io_err.into();

        match telemetry_err {
            TelemetryError::File { source, .. } => assert_eq!(source.to_string(), "capture.bin"),
            other => panic!("Expected File error variant, got {other:?}"),
        }
    }
}
