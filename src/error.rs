use thiserror::Error;

use crate::meter::RideStatus;

/// Errors surfaced by the ride meter.
#[derive(Debug, Error)]
pub enum MeterError {
    /// Lifecycle call not allowed from the current status
    #[error("cannot {action} a ride while {status:?}")]
    InvalidTransition {
        action: &'static str,
        status: RideStatus,
    },

    /// Location subscription failed to start
    #[error("location source unavailable: {0:#}")]
    LocationUnavailable(#[source] anyhow::Error),

    /// Ride history could not be read or written
    #[error("ride history failed: {0:#}")]
    History(#[source] anyhow::Error),
}

impl MeterError {
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, MeterError::InvalidTransition { .. })
    }
}
