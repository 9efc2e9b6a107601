use std::sync::Mutex;

use anyhow::Result;
use tokio::sync::mpsc;

use super::{LocationFix, LocationSource, LocationStream, SUBSCRIPTION_BUFFER};

/// Source fed by the platform shell: each OS location callback calls
/// [`PushLocationSource::push`]. Only the latest subscription receives fixes.
#[derive(Default)]
pub struct PushLocationSource {
    sender: Mutex<Option<mpsc::Sender<LocationFix>>>,
}

impl PushLocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward a fix to the current subscriber. Returns false when nobody is
    /// listening (never subscribed, or the receiver was dropped).
    pub fn push(&self, fix: LocationFix) -> bool {
        let mut guard = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let Some(sender) = guard.as_ref() else {
            return false;
        };

        match sender.try_send(fix) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("location queue full, dropping fix");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                *guard = None;
                false
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        let guard = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.as_ref().is_some_and(|sender| !sender.is_closed())
    }
}

impl LocationSource for PushLocationSource {
    fn subscribe(&self) -> Result<LocationStream> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut guard = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(tx);
        Ok(rx)
    }
}
