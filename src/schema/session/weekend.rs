//! Weekend and track information
//!
//! The `WeekendInfo` block identifies the event: track, series, season and the
//! hosted session ids. Fields iRacing sends that are not listed here are ignored.

use serde::{Deserialize, Serialize};

/// Weekend and track information from iRacing
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct WeekendInfo {
    /// Track name
    pub track_name: String,
    /// Track ID
    #[serde(rename = "TrackID")]
    pub track_id: Option<i32>,
    /// Track length
    pub track_length: String,
    /// Track display name
    pub track_display_name: String,
    /// Track configuration name
    pub track_config_name: Option<String>,
    /// Track type (road course, oval, etc.)
    pub track_type: Option<String>,
    /// Series ID
    #[serde(rename = "SeriesID")]
    pub series_id: Option<i32>,
    /// Season ID
    #[serde(rename = "SeasonID")]
    pub season_id: Option<i32>,
    /// Session ID
    #[serde(rename = "SessionID")]
    pub session_id: Option<i32>,
    /// Sub-session ID (for splits)
    #[serde(rename = "SubSessionID")]
    pub sub_session_id: Option<i32>,
    /// League ID
    #[serde(rename = "LeagueID")]
    pub league_id: Option<i32>,
    /// Official session flag
    pub official: Option<i32>,
    /// Race week number
    pub race_week: Option<i32>,
    /// Event type (Race, Practice, Test, ...)
    pub event_type: Option<String>,
    /// Category (Road, Oval, etc.)
    pub category: Option<String>,
    /// Simulation mode (full, replay)
    pub sim_mode: Option<String>,
    /// Team racing enabled
    pub team_racing: Option<i32>,
    /// Number of car classes
    pub num_car_classes: Option<i32>,
    /// Number of car types
    pub num_car_types: Option<i32>,
}
