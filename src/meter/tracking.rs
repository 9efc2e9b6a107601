use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::location::{LocationFix, LocationStream};

use super::filter::FixOutcome;
use super::state::RideState;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Owns the task draining one location subscription into the ride state.
#[derive(Default)]
pub struct LocationTracking {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl LocationTracking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn start(&mut self, stream: LocationStream, state: Arc<Mutex<RideState>>) -> Result<()> {
        if self.is_active() {
            bail!("location tracking already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(fix_loop(stream, state, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancel the drain task and wait until it has applied the queued fixes
    /// and dropped the subscription.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("location tracking task failed to join")
        } else {
            Ok(())
        }
    }
}

/// Single consumer of the fix queue. Every fix is applied under the state
/// lock, in arrival order. On cancellation, fixes already queued are
/// applied before the loop returns.
pub async fn fix_loop(
    mut stream: LocationStream,
    state: Arc<Mutex<RideState>>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                let mut drained = 0usize;
                while let Ok(fix) = stream.try_recv() {
                    apply(&state, &fix).await;
                    drained += 1;
                }
                log_info!("location tracking shutting down ({drained} queued fix(es) applied)");
                break;
            }
            next = stream.recv() => {
                let Some(fix) = next else {
                    log_warn!("location source closed the stream");
                    break;
                };
                apply(&state, &fix).await;
            }
        }
    }
}

async fn apply(state: &Mutex<RideState>, fix: &LocationFix) {
    let mut guard = state.lock().await;
    match guard.apply_fix(fix) {
        Ok(evaluation) => match evaluation.outcome {
            FixOutcome::Reference => {
                log_debug!("reference fix set at {:.6},{:.6}", fix.latitude, fix.longitude);
            }
            FixOutcome::Counted => {
                log_debug!(
                    "counted {:.1} m, trip now {:.3} km",
                    evaluation.delta_m,
                    guard.distance_km()
                );
            }
            FixOutcome::Rejected(reason) => {
                log_debug!("fix rejected: {reason:?}");
            }
        },
        Err(err) => {
            log_debug!("dropping fix: {err}");
        }
    }
}
