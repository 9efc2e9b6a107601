//! Noise filter for incoming fixes.
//!
//! Gates run in a fixed order and the first failing gate wins. A rejected
//! fix never replaces the reference, so a run of bad samples cannot drag
//! the reference point forward.

use serde::Serialize;

use crate::location::{distance_m, LocationFix};

/// Below this speed a reading is treated as stationary noise.
pub const MIN_SPEED_MPS: f64 = 0.5;
/// Fixes with a larger accuracy radius are too uncertain to bill.
pub const MAX_ACCURACY_M: f64 = 20.0;
/// Displacements shorter than this are GPS jitter.
pub const MIN_DISTANCE_CHANGE_M: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    Malformed,
    TooSlow,
    TooInaccurate,
    TooClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FixOutcome {
    /// First usable fix of the ride; becomes the reference, adds no distance
    Reference,
    /// Passed every gate; `delta_m` was travelled since the reference
    Counted,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixEvaluation {
    pub accept: bool,
    pub outcome: FixOutcome,
    /// Reference to use after this fix: the candidate when accepted,
    /// otherwise the unchanged prior
    pub new_reference: Option<LocationFix>,
    pub delta_m: f64,
}

impl FixEvaluation {
    fn accepted(outcome: FixOutcome, candidate: &LocationFix, delta_m: f64) -> Self {
        Self {
            accept: true,
            outcome,
            new_reference: Some(*candidate),
            delta_m,
        }
    }

    fn rejected(reason: RejectReason, prior: Option<&LocationFix>) -> Self {
        Self {
            accept: false,
            outcome: FixOutcome::Rejected(reason),
            new_reference: prior.copied(),
            delta_m: 0.0,
        }
    }
}

/// Decide what a candidate fix does to the trip. Pure: the caller applies
/// `new_reference` and `delta_m` together.
pub fn evaluate_fix(prior: Option<&LocationFix>, candidate: &LocationFix) -> FixEvaluation {
    if !candidate.is_well_formed() {
        return FixEvaluation::rejected(RejectReason::Malformed, prior);
    }

    let Some(reference) = prior else {
        return FixEvaluation::accepted(FixOutcome::Reference, candidate, 0.0);
    };

    if candidate.speed_mps < MIN_SPEED_MPS {
        return FixEvaluation::rejected(RejectReason::TooSlow, prior);
    }

    if candidate.accuracy_m > MAX_ACCURACY_M {
        return FixEvaluation::rejected(RejectReason::TooInaccurate, prior);
    }

    let delta_m = distance_m(reference, candidate);
    if !delta_m.is_finite() || delta_m < MIN_DISTANCE_CHANGE_M {
        return FixEvaluation::rejected(RejectReason::TooClose, prior);
    }

    FixEvaluation::accepted(FixOutcome::Counted, candidate, delta_m)
}
