//! Live standings snapshot model.
//!
//! These are the records posted to a [`crate::sink::StandingsSink`]: a
//! [`Weekend`] built from the session block's `WeekendInfo`, the active
//! [`SessionRecord`], and one [`Driver`] per human competitor with the class
//! position and laps completed merged in from telemetry.
//!
//! Every numeric field is omitted from JSON when zero and every text field when
//! empty, so a final "stream ended" snapshot carries little more than the
//! session state.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::session::{self, WeekendInfo};

fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// Simulator session state, from the `SessionState` telemetry variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Invalid,
    GetInCar,
    Warmup,
    ParadeLaps,
    Racing,
    Checkered,
    CoolDown,
}

impl SessionState {
    /// Map a raw state code. Codes outside `0..=6` are `Invalid`.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => SessionState::GetInCar,
            2 => SessionState::Warmup,
            3 => SessionState::ParadeLaps,
            4 => SessionState::Racing,
            5 => SessionState::Checkered,
            6 => SessionState::CoolDown,
            _ => SessionState::Invalid,
        }
    }

    /// Text sent to consumers.
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Invalid => "Invalid",
            SessionState::GetInCar => "Get In Car",
            SessionState::Warmup => "Warmup",
            SessionState::ParadeLaps => "Parade Laps",
            SessionState::Racing => "Racing",
            SessionState::Checkered => "Checkered",
            SessionState::CoolDown => "Cool Down",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Event identification for the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weekend {
    #[serde(skip_serializing_if = "is_zero")]
    pub track_id: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub track_display_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub track_config_name: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub series_id: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub season_id: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub session_id: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub sub_session_id: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub official: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub race_week: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub num_car_classes: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub num_car_types: i32,
}

impl Weekend {
    pub fn from_info(info: &WeekendInfo) -> Self {
        Self {
            track_id: info.track_id.unwrap_or_default(),
            track_display_name: info.track_display_name.clone(),
            track_config_name: info.track_config_name.clone().unwrap_or_default(),
            series_id: info.series_id.unwrap_or_default(),
            season_id: info.season_id.unwrap_or_default(),
            session_id: info.session_id.unwrap_or_default(),
            sub_session_id: info.sub_session_id.unwrap_or_default(),
            official: info.official.unwrap_or_default(),
            race_week: info.race_week.unwrap_or_default(),
            event_type: info.event_type.clone().unwrap_or_default(),
            category: info.category.clone().unwrap_or_default(),
            num_car_classes: info.num_car_classes.unwrap_or_default(),
            num_car_types: info.num_car_types.unwrap_or_default(),
        }
    }
}

/// The session being monitored, plus its live state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRecord {
    #[serde(skip_serializing_if = "is_zero")]
    pub session_num: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_laps: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_state: String,
    /// Set when the relay hit a problem the consumer should know about.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error_text: String,
}

impl SessionRecord {
    /// The first listed session numbered `session_num`, or an empty record.
    pub fn from_info(session_num: i32, info: &session::SessionInfoData) -> Self {
        info.find(session_num)
            .map(|s| Self {
                session_num: s.session_num,
                session_laps: s.session_laps.clone(),
                session_type: s.session_type.clone(),
                session_name: s.session_name.clone().unwrap_or_default(),
                ..Self::default()
            })
            .unwrap_or_default()
    }

    pub fn set_state(&mut self, state: SessionState) {
        self.session_state = state.label().to_string();
    }

    /// Mark the session invalid with an explanation.
    pub fn fail(&mut self, error_text: impl Into<String>) {
        self.set_state(SessionState::Invalid);
        self.error_text = error_text.into();
    }
}

/// One human competitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Driver {
    pub car_idx: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_name: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub user_id: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub car_class_id: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub car_id: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub class_position: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub laps_completed: i32,
    #[serde(rename = "irating", skip_serializing_if = "is_zero")]
    pub i_rating: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub club_id: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub car_number_raw: i32,
}

impl Driver {
    fn from_entry(entry: &session::Driver, redact: bool) -> Self {
        let user_name = if redact {
            format!("Driver {}", entry.car_idx)
        } else {
            entry.user_name.clone()
        };

        Self {
            car_idx: entry.car_idx,
            user_name,
            user_id: entry.user_id.unwrap_or_default(),
            car_class_id: entry.car_class_id.unwrap_or_default(),
            car_id: entry.car_id.unwrap_or_default(),
            class_position: 0,
            laps_completed: 0,
            i_rating: entry.i_rating.unwrap_or_default(),
            club_id: entry.club_id.unwrap_or_default(),
            car_number_raw: entry.car_number_raw.unwrap_or_default(),
        }
    }
}

/// Competitors keyed by car index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drivers(BTreeMap<i32, Driver>);

impl Drivers {
    /// Build the competitor set from the session's driver list.
    ///
    /// Pace car, spectators and AI entries are left out. With `redact` set,
    /// names are replaced by `Driver <car_idx>`.
    pub fn from_session(entries: &[session::Driver], redact: bool) -> Self {
        Self(
            entries
                .iter()
                .filter(|entry| entry.is_competitor())
                .map(|entry| (entry.car_idx, Driver::from_entry(entry, redact)))
                .collect(),
        )
    }

    /// Apply a per-car class position array (index = car index).
    pub fn set_positions(&mut self, positions: &[i32]) {
        for (car_idx, &position) in positions.iter().enumerate() {
            if let Some(driver) = self.slot(car_idx) {
                driver.class_position = position;
            }
        }
    }

    /// Apply a per-car laps completed array (index = car index).
    pub fn set_laps(&mut self, laps: &[i32]) {
        for (car_idx, &lap) in laps.iter().enumerate() {
            if let Some(driver) = self.slot(car_idx) {
                driver.laps_completed = lap;
            }
        }
    }

    fn slot(&mut self, car_idx: usize) -> Option<&mut Driver> {
        let car_idx = i32::try_from(car_idx).ok()?;
        self.0.get_mut(&car_idx)
    }

    pub fn get(&self, car_idx: i32) -> Option<&Driver> {
        self.0.get(&car_idx)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drivers in ascending car index order.
    pub fn sorted(&self) -> Vec<Driver> {
        self.0.values().cloned().collect()
    }
}

/// One snapshot posted to the consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivePositions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekend: Option<Weekend>,
    pub session: SessionRecord,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drivers: Vec<Driver>,
}

impl LivePositions {
    /// A full standings snapshot.
    pub fn standings(weekend: &Weekend, session: &SessionRecord, drivers: &Drivers) -> Self {
        Self {
            weekend: Some(weekend.clone()),
            session: session.clone(),
            drivers: drivers.sorted(),
        }
    }

    /// The "stream ended" snapshot: session record only.
    pub fn final_report(session: &SessionRecord) -> Self {
        Self { weekend: None, session: session.clone(), drivers: Vec::new() }
    }

    /// True for snapshots built by [`LivePositions::final_report`].
    pub fn is_final(&self) -> bool {
        self.weekend.is_none() && self.drivers.is_empty()
    }
}

impl fmt::Display for LivePositions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
