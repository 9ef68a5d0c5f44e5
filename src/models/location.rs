use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wire;

/// A named geographic point with optional derived place info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Store-assigned identifier, absent until the location is persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// "<city>, <country>" or empty when unknown
    #[serde(default)]
    pub info: String,
    /// Creation time, never changed after the first persist
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl Location {
    /// Create a new, not yet persisted location stamped with the current time
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            latitude,
            longitude,
            info: String::new(),
            timestamp: Utc::now(),
        }
    }

    /// (0, 0) is the "no coordinate provided" sentinel
    pub fn is_zero(&self) -> bool {
        is_zero(self.latitude, self.longitude)
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Age in whole seconds relative to `now`
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.timestamp).num_seconds()
    }
}

pub fn is_zero(latitude: f64, longitude: f64) -> bool {
    latitude == 0.0 && longitude == 0.0
}

/// Inbound body of `POST /add` and `PUT /update`.
///
/// Coordinates may arrive as JSON numbers or numeric strings; a missing
/// coordinate falls back to the zero sentinel. `info` and `timestamp` are
/// owned by the service and ignored when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "wire::coordinate")]
    pub latitude: f64,
    #[serde(default, deserialize_with = "wire::coordinate")]
    pub longitude: f64,
}

impl LocationPayload {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    pub fn is_zero(&self) -> bool {
        is_zero(self.latitude, self.longitude)
    }
}
