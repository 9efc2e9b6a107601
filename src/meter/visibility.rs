use serde::{Deserialize, Serialize};

use super::RideStatus;

/// Decides whether the location subscription should be live when the
/// hosting screen becomes visible or hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityPolicy {
    /// Keep receiving fixes in the background while a ride is active
    pub keep_alive_while_active: bool,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self {
            keep_alive_while_active: true,
        }
    }
}

impl VisibilityPolicy {
    pub fn should_subscribe(&self, status: RideStatus, visible: bool) -> bool {
        status == RideStatus::Active && (visible || self.keep_alive_while_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_subscribes_outside_an_active_ride() {
        let policy = VisibilityPolicy::default();
        for status in [RideStatus::Idle, RideStatus::Stopped] {
            assert!(!policy.should_subscribe(status, true));
            assert!(!policy.should_subscribe(status, false));
        }
    }

    #[test]
    fn keep_alive_decides_hidden_active_rides() {
        let keep = VisibilityPolicy {
            keep_alive_while_active: true,
        };
        let suspend = VisibilityPolicy {
            keep_alive_while_active: false,
        };

        assert!(keep.should_subscribe(RideStatus::Active, false));
        assert!(!suspend.should_subscribe(RideStatus::Active, false));
        assert!(suspend.should_subscribe(RideStatus::Active, true));
    }
}
