//! Tariff and fare derivation.
//!
//! Time is billed per complete minute: the fare steps up once every 60
//! seconds, never continuously.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const BASE_FARE: f64 = 2.50;
pub const PRICE_PER_KM: f64 = 1.50;
pub const PRICE_PER_MINUTE: f64 = 0.50;

/// Whole 60-second intervals contained in `elapsed` (floor).
pub fn complete_minutes(elapsed: Duration) -> u64 {
    elapsed.as_secs() / 60
}

/// `MM:SS`, minutes keep counting past 59.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareBreakdown {
    pub base: f64,
    pub distance_component: f64,
    pub time_component: f64,
    pub total: f64,
    pub complete_minutes_elapsed: u64,
}

impl FareBreakdown {
    pub fn compute(distance_km: f64, elapsed: Duration) -> Self {
        let minutes = complete_minutes(elapsed);
        let distance_component = distance_km * PRICE_PER_KM;
        let time_component = minutes as f64 * PRICE_PER_MINUTE;

        Self {
            base: BASE_FARE,
            distance_component,
            time_component,
            total: BASE_FARE + distance_component + time_component,
            complete_minutes_elapsed: minutes,
        }
    }
}

/// What the display sink shows on every refresh tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayReading {
    pub distance_km: String,
    pub elapsed: String,
    pub fare: String,
}

impl DisplayReading {
    pub fn new(distance_km: f64, elapsed: Duration, fare: &FareBreakdown) -> Self {
        Self {
            distance_km: format!("{distance_km:.2}"),
            elapsed: format_elapsed(elapsed),
            fare: format!("{:.2}", fare.total),
        }
    }
}

/// Short one-line text for the ride-completion notification.
pub fn summary_text(distance_km: f64, fare: &FareBreakdown) -> String {
    format!(
        "Ride complete: {distance_km:.2} km, {} min, fare {:.2}",
        fare.complete_minutes_elapsed, fare.total
    )
}

/// Longer itemised text for the expanded notification.
pub fn breakdown_text(distance_km: f64, fare: &FareBreakdown) -> String {
    format!(
        "Base {:.2} + distance {distance_km:.2} km x {PRICE_PER_KM:.2} = {:.2} + time {} min x {PRICE_PER_MINUTE:.2} = {:.2}. Total {:.2}",
        fare.base,
        fare.distance_component,
        fare.complete_minutes_elapsed,
        fare.time_component,
        fare.total
    )
}
