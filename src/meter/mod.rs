pub mod controller;
pub mod fare;
pub mod filter;
pub mod state;
pub mod tracking;
pub mod visibility;

pub use controller::RideController;
pub use fare::{DisplayReading, FareBreakdown};
pub use filter::{evaluate_fix, FixEvaluation, FixOutcome, RejectReason};
pub use state::{CompletedRide, RideSnapshot, RideState, RideStatus, TripAccumulator};
pub use visibility::VisibilityPolicy;
