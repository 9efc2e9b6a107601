use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::MeterError;
use crate::location::LocationFix;
use crate::models::RideRecord;

use super::fare::{DisplayReading, FareBreakdown};
use super::filter::{evaluate_fix, FixEvaluation};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RideStatus {
    #[default]
    Idle,
    Active,
    Stopped,
}

/// Per-ride mutable trip data. Only touched through [`RideState`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripAccumulator {
    pub last_accepted_fix: Option<LocationFix>,
    pub accumulated_distance_m: f64,
    pub ride_started_at: Option<DateTime<Utc>>,
}

impl TripAccumulator {
    pub fn distance_km(&self) -> f64 {
        self.accumulated_distance_m / 1000.0
    }
}

/// Result of a successful stop: the history entry plus the final fare.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRide {
    pub record: RideRecord,
    pub fare: FareBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RideSnapshot {
    pub status: RideStatus,
    pub ride_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub distance_km: f64,
    pub elapsed_secs: u64,
    pub fare: FareBreakdown,
    pub reading: DisplayReading,
}

/// Ride lifecycle plus the trip accumulator.
///
/// Distance accumulates and the clock runs only while `Active`. Elapsed time
/// is measured from a monotonic anchor and frozen when the ride stops.
#[derive(Debug, Clone, Default)]
pub struct RideState {
    status: RideStatus,
    ride_id: Option<String>,
    trip: TripAccumulator,
    running_anchor: Option<Instant>,
    frozen_elapsed: Duration,
}

impl RideState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RideStatus {
        self.status
    }

    pub fn ride_id(&self) -> Option<&str> {
        self.ride_id.as_deref()
    }

    pub fn trip(&self) -> &TripAccumulator {
        &self.trip
    }

    pub fn distance_km(&self) -> f64 {
        self.trip.distance_km()
    }

    pub fn start(
        &mut self,
        ride_id: String,
        started_at: DateTime<Utc>,
        now: Instant,
    ) -> Result<(), MeterError> {
        if self.status != RideStatus::Idle {
            return Err(self.invalid("start"));
        }

        *self = Self {
            status: RideStatus::Active,
            ride_id: Some(ride_id),
            trip: TripAccumulator {
                last_accepted_fix: None,
                accumulated_distance_m: 0.0,
                ride_started_at: Some(started_at),
            },
            running_anchor: Some(now),
            frozen_elapsed: Duration::ZERO,
        };
        Ok(())
    }

    /// Run a fix through the noise filter and apply the decision.
    pub fn apply_fix(&mut self, fix: &LocationFix) -> Result<FixEvaluation, MeterError> {
        if self.status != RideStatus::Active {
            return Err(self.invalid("record a fix for"));
        }

        let evaluation = evaluate_fix(self.trip.last_accepted_fix.as_ref(), fix);
        if evaluation.accept {
            self.trip.accumulated_distance_m += evaluation.delta_m;
            self.trip.last_accepted_fix = evaluation.new_reference;
        }
        Ok(evaluation)
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        match (self.status, self.running_anchor) {
            (RideStatus::Active, Some(anchor)) => now.saturating_duration_since(anchor),
            (RideStatus::Stopped, _) => self.frozen_elapsed,
            _ => Duration::ZERO,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    pub fn fare_at(&self, now: Instant) -> FareBreakdown {
        FareBreakdown::compute(self.distance_km(), self.elapsed_at(now))
    }

    /// Read-only view for display refresh; never mutates the trip.
    pub fn snapshot_at(&self, now: Instant) -> RideSnapshot {
        let elapsed = self.elapsed_at(now);
        let distance_km = self.distance_km();
        let fare = FareBreakdown::compute(distance_km, elapsed);

        RideSnapshot {
            status: self.status,
            ride_id: self.ride_id.clone(),
            started_at: self.trip.ride_started_at,
            distance_km,
            elapsed_secs: elapsed.as_secs(),
            reading: DisplayReading::new(distance_km, elapsed, &fare),
            fare,
        }
    }

    pub fn snapshot(&self) -> RideSnapshot {
        self.snapshot_at(Instant::now())
    }

    /// Freeze the clock and produce the authoritative fare and history entry.
    pub fn stop(
        &mut self,
        completed_at: DateTime<Utc>,
        now: Instant,
    ) -> Result<CompletedRide, MeterError> {
        if self.status != RideStatus::Active {
            return Err(self.invalid("stop"));
        }

        self.frozen_elapsed = self.elapsed_at(now);
        self.running_anchor = None;
        self.status = RideStatus::Stopped;

        let distance_km = self.distance_km();
        let fare = FareBreakdown::compute(distance_km, self.frozen_elapsed);
        let record = RideRecord {
            id: self.ride_id.clone().unwrap_or_default(),
            completed_at,
            distance_km,
            complete_minutes: fare.complete_minutes_elapsed,
            fare: fare.total,
        };

        Ok(CompletedRide { record, fare })
    }

    /// Back to `Idle`. An active ride has to be stopped first.
    pub fn reset(&mut self) -> Result<(), MeterError> {
        if self.status != RideStatus::Stopped {
            return Err(self.invalid("reset"));
        }
        *self = Self::default();
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> MeterError {
        MeterError::InvalidTransition {
            action,
            status: self.status,
        }
    }
}
