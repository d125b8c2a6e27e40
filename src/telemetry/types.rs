//! Position sample type

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Header row of the position log, in column order
pub const HEADER: [&str; 4] = ["Timestamp", "Latitude", "Longitude", "Altitude"];

/// Timestamp layout used in the log (`YYYY-MM-DD HH:MM:SS`)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One timestamped position reading.
///
/// Values are kept as the text the simulator wrote; they are never converted
/// to numbers, so a logged row reproduces the source exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Latitude")]
    pub latitude: String,
    #[serde(rename = "Longitude")]
    pub longitude: String,
    #[serde(rename = "Altitude")]
    pub altitude: String,
}

impl Sample {
    pub fn new(
        timestamp: impl Into<String>,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
        altitude: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            latitude: latitude.into(),
            longitude: longitude.into(),
            altitude: altitude.into(),
        }
    }

    /// Build a sample stamped with the given instant
    pub fn at(
        time: DateTime<Local>,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
        altitude: impl Into<String>,
    ) -> Self {
        Self::new(format_timestamp(time), latitude, longitude, altitude)
    }
}

/// Format an instant the way the log stores it
pub fn format_timestamp(time: DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}
