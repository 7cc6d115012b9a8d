//! # Session Information Parsing
//!
//! Handles iRacing's session information YAML block. The block describes the
//! event (track, series, hosted session ids), the list of sessions in the
//! weekend and every car entered.
//!
//! ## iRacing YAML Compatibility
//!
//! iRacing outputs invalid YAML containing unescaped characters in driver names
//! and livery strings. [`SessionInfoParser`] runs the repair pass from
//! [`crate::yaml_utils`] before deserializing:
//!
//! ```text
//! // Problematic iRacing YAML:
//! UserName: O'Connor, Mike
//!
//! // After preprocessing:
//! UserName: 'O''Connor, Mike'
//! ```
//!
//! ## Caching
//!
//! The header's `sessionInfoUpdate` counter changes whenever iRacing rewrites
//! the block, so the parser keys its cache on that counter and skips the YAML
//! work on every other poll.

use serde::{Deserialize, Serialize};

pub mod cache;
pub mod driver;
pub mod session_data;
pub mod weekend;

pub use cache::{SessionInfoCache, SessionInfoParser};
pub use driver::{Driver, DriverInfoData};
pub use session_data::{Session, SessionInfoData};
pub use weekend::WeekendInfo;

/// Session information extracted and parsed from iRacing's YAML session data
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SessionInfo {
    /// Weekend and track information
    #[serde(default)]
    pub weekend_info: WeekendInfo,
    /// Session information and session list
    #[serde(default)]
    pub session_info: SessionInfoData,
    /// Driver information (current driver + drivers list)
    #[serde(default)]
    pub driver_info: Option<DriverInfoData>,
}

impl SessionInfo {
    /// Parse cleaned YAML into SessionInfo
    ///
    /// The YAML should already be preprocessed to fix iRacing's non-standard format.
    pub fn parse(yaml: &str) -> crate::Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| {
            crate::TelemetryError::parse("Session YAML deserialization", format!("YAML parsing failed: {}", e))
        })
    }

    /// Every driver listed, empty when the block has no `DriverInfo`.
    pub fn drivers(&self) -> &[Driver] {
        self.driver_info.as_ref().map(DriverInfoData::drivers).unwrap_or_default()
    }
}
