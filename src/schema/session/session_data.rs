//! Session list structures

use serde::{Deserialize, Serialize};

/// Session information data from iRacing
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct SessionInfoData {
    /// Current session number
    pub current_session_num: i32,
    /// List of sessions
    pub sessions: Vec<Session>,
}

impl SessionInfoData {
    /// First session whose number matches `session_num`.
    pub fn find(&self, session_num: i32) -> Option<&Session> {
        self.sessions.iter().find(|session| session.session_num == session_num)
    }
}

/// Individual session data
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct Session {
    /// Session number
    pub session_num: i32,
    /// Session laps ("unlimited" or number)
    pub session_laps: String,
    /// Session time ("unlimited" or time)
    pub session_time: String,
    /// Session type
    pub session_type: String,
    /// Session name
    pub session_name: Option<String>,
    /// Session sub type
    pub session_sub_type: Option<String>,
    /// Whether session was skipped
    pub session_skipped: Option<i32>,
}
