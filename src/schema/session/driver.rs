//! Driver information structures

use serde::{Deserialize, Serialize};

/// Driver information data containing current driver info + drivers list
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct DriverInfoData {
    /// Current driver car index
    pub driver_car_idx: Option<i32>,
    /// Current driver user ID
    #[serde(rename = "DriverUserID")]
    pub driver_user_id: Option<i32>,
    /// Pace car index
    pub pace_car_idx: Option<i32>,
    /// List of all drivers in session
    pub drivers: Option<Vec<Driver>>,
}

impl DriverInfoData {
    /// Drivers listed in the session, empty when the block is missing.
    pub fn drivers(&self) -> &[Driver] {
        self.drivers.as_deref().unwrap_or_default()
    }
}

/// Individual driver data (from Drivers list)
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct Driver {
    /// Car index number
    pub car_idx: i32,
    /// Driver name
    pub user_name: String,
    /// Driver abbreviation
    pub abbrev_name: Option<String>,
    /// Driver initials
    pub initials: Option<String>,
    /// User ID
    #[serde(rename = "UserID")]
    pub user_id: Option<i32>,
    /// Team ID
    #[serde(rename = "TeamID")]
    pub team_id: Option<i32>,
    /// Team name
    pub team_name: Option<String>,
    /// Car number (display)
    pub car_number: Option<String>,
    /// Car number raw (numeric with class prefix)
    pub car_number_raw: Option<i32>,
    /// Car class ID
    #[serde(rename = "CarClassID")]
    pub car_class_id: Option<i32>,
    /// Car ID
    #[serde(rename = "CarID")]
    pub car_id: Option<i32>,
    /// Car screen name
    pub car_screen_name: Option<String>,
    /// Car class short name
    pub car_class_short_name: Option<String>,
    /// Whether this is a pace car
    pub car_is_pace_car: Option<i32>,
    /// Whether this is AI
    #[serde(rename = "CarIsAI")]
    pub car_is_ai: Option<i32>,
    /// iRating
    pub i_rating: Option<i32>,
    /// License string (display)
    pub lic_string: Option<String>,
    /// Club ID
    #[serde(rename = "ClubID")]
    pub club_id: Option<i32>,
    /// Club name
    pub club_name: Option<String>,
    /// Whether this is a spectator
    pub is_spectator: Option<i32>,
    /// Car design string (livery colors)
    pub car_design_str: Option<String>,
}

impl Driver {
    pub fn is_pace_car(&self) -> bool {
        self.car_is_pace_car.unwrap_or(0) == 1
    }

    pub fn is_spectator(&self) -> bool {
        self.is_spectator.unwrap_or(0) == 1
    }

    pub fn is_ai(&self) -> bool {
        self.car_is_ai.unwrap_or(0) == 1
    }

    /// Only human competitors take part in standings.
    pub fn is_competitor(&self) -> bool {
        !(self.is_pace_car() || self.is_spectator() || self.is_ai())
    }
}
