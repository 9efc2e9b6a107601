use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of completed rides kept in history; older ones are discarded.
pub const HISTORY_CAPACITY: usize = 20;

/// Immutable summary of one completed ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRecord {
    pub id: String,
    pub completed_at: DateTime<Utc>,
    pub distance_km: f64,
    pub complete_minutes: u64,
    pub fare: f64,
}
