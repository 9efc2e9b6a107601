use chrono::{DateTime, Utc};
use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

/// A single GPS/network sample as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters
    pub accuracy_m: f64,
    /// Instantaneous speed in meters per second
    pub speed_mps: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(
        latitude: f64,
        longitude: f64,
        accuracy_m: f64,
        speed_mps: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m,
            speed_mps,
            timestamp,
        }
    }

    /// False for samples that must never reach the accumulator: non-finite
    /// values, impossible coordinates or a negative accuracy radius.
    pub fn is_well_formed(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.accuracy_m.is_finite()
            && self.speed_mps.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.accuracy_m >= 0.0
    }

    fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Great-circle distance between two fixes in meters.
pub fn distance_m(a: &LocationFix, b: &LocationFix) -> f64 {
    Haversine::distance(a.point(), b.point())
}
