use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::Utc;
use log::{error, info, warn};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    error::MeterError,
    history::HistoryStore,
    location::{LocationFix, LocationSource},
    models::RideRecord,
    sinks::{DisplaySink, NotificationSink},
};

use super::{
    fare::{breakdown_text, summary_text},
    filter::FixEvaluation,
    state::{CompletedRide, RideSnapshot, RideState, RideStatus},
    tracking::LocationTracking,
    visibility::VisibilityPolicy,
};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Drives one ride at a time: lifecycle calls, the fix subscription and
/// the periodic display refresh.
///
/// Lock order is `tracking`, then `state`, then `ticker`. Lifecycle
/// transitions hold `tracking` from start to finish. The fix loop and the
/// ticker only ever take `state`.
pub struct RideController<H: HistoryStore> {
    state: Arc<Mutex<RideState>>,
    history: Arc<H>,
    source: Arc<dyn LocationSource>,
    display: Arc<dyn DisplaySink>,
    notifier: Arc<dyn NotificationSink>,
    tracking: Arc<Mutex<LocationTracking>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    policy: VisibilityPolicy,
    visible: Arc<AtomicBool>,
}

impl<H: HistoryStore> Clone for RideController<H> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            history: self.history.clone(),
            source: self.source.clone(),
            display: self.display.clone(),
            notifier: self.notifier.clone(),
            tracking: self.tracking.clone(),
            ticker: self.ticker.clone(),
            tick_interval: self.tick_interval,
            policy: self.policy,
            visible: self.visible.clone(),
        }
    }
}

impl<H: HistoryStore> RideController<H> {
    pub fn new(
        history: Arc<H>,
        source: Arc<dyn LocationSource>,
        display: Arc<dyn DisplaySink>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RideState::new())),
            history,
            source,
            display,
            notifier,
            tracking: Arc::new(Mutex::new(LocationTracking::new())),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: DEFAULT_TICK_INTERVAL,
            policy: VisibilityPolicy::default(),
            visible: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_policy(mut self, policy: VisibilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn snapshot(&self) -> RideSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn status(&self) -> RideStatus {
        self.state.lock().await.status()
    }

    pub async fn is_tracking(&self) -> bool {
        self.tracking.lock().await.is_active()
    }

    /// Begin a new ride. Ignored (with a warning) unless the meter is idle.
    /// If the location subscription cannot be set up the meter stays idle.
    pub async fn start(&self) -> Result<RideSnapshot, MeterError> {
        let mut tracking = self.tracking.lock().await;
        let mut state = self.state.lock().await;

        if state.status() != RideStatus::Idle {
            warn!(
                "ignoring start: ride is {:?}",
                state.status()
            );
            return Ok(state.snapshot());
        }

        let stream = if self
            .policy
            .should_subscribe(RideStatus::Active, self.visible.load(Ordering::SeqCst))
        {
            Some(
                self.source
                    .subscribe()
                    .map_err(MeterError::LocationUnavailable)?,
            )
        } else {
            None
        };

        // The consumer waits on the state lock, so it only sees fixes once
        // the ride below is Active.
        if let Some(stream) = stream {
            tracking
                .start(stream, self.state.clone())
                .map_err(MeterError::LocationUnavailable)?;
        }

        let ride_id = Uuid::new_v4().to_string();
        if let Err(err) = state.start(ride_id.clone(), Utc::now(), Instant::now()) {
            drop(state);
            if let Err(stop_err) = tracking.stop().await {
                error!("failed to release location tracking: {stop_err:#}");
            }
            return Err(err);
        }

        let snapshot = state.snapshot();
        drop(state);

        self.spawn_ticker().await;
        drop(tracking);
        info!("ride {ride_id} started");

        Ok(snapshot)
    }

    /// Apply one fix under the state lock. Fixes outside an active ride are
    /// dropped.
    pub async fn apply_fix(&self, fix: LocationFix) -> Option<FixEvaluation> {
        let mut state = self.state.lock().await;
        match state.apply_fix(&fix) {
            Ok(evaluation) => Some(evaluation),
            Err(err) => {
                warn!("dropping fix: {err}");
                None
            }
        }
    }

    /// Finish the active ride: freeze the fare, save it to history and
    /// notify. Returns `None` when no ride was active.
    ///
    /// Elapsed time freezes at the moment of the call. Fixes the source had
    /// already queued by then are still applied before the distance freezes.
    pub async fn stop(&self) -> Result<Option<CompletedRide>, MeterError> {
        let completed_at = Utc::now();
        let now = Instant::now();

        let mut tracking = self.tracking.lock().await;

        let status = self.state.lock().await.status();
        if status != RideStatus::Active {
            warn!("ignoring stop: ride is {status:?}");
            return Ok(None);
        }

        if let Err(err) = tracking.stop().await {
            error!("failed to stop location tracking: {err:#}");
        }

        let (completed, final_snapshot) = {
            let mut state = self.state.lock().await;
            match state.stop(completed_at, now) {
                Ok(completed) => (completed, state.snapshot()),
                Err(err) => {
                    warn!("ignoring stop: {err}");
                    return Ok(None);
                }
            }
        };

        self.cancel_ticker().await;
        drop(tracking);

        self.display.show(&final_snapshot.reading);

        let record = &completed.record;
        let saved = self.history.append(record.clone()).await;

        self.notifier.notify(
            &summary_text(record.distance_km, &completed.fare),
            &breakdown_text(record.distance_km, &completed.fare),
        );

        info!(
            "ride {} stopped: {:.2} km, {} min, fare {:.2}",
            record.id, record.distance_km, record.complete_minutes, record.fare
        );

        saved.map_err(MeterError::History)?;
        Ok(Some(completed))
    }

    /// Return to idle. An active ride is stopped (and saved) first; history
    /// is kept.
    pub async fn reset(&self) -> Result<RideSnapshot, MeterError> {
        if self.status().await == RideStatus::Active {
            self.stop().await?;
        }

        let mut state = self.state.lock().await;
        if let Err(err) = state.reset() {
            warn!("ignoring reset: {err}");
        }
        Ok(state.snapshot())
    }

    pub async fn history(&self) -> Result<Vec<RideRecord>, MeterError> {
        self.history.list().await.map_err(MeterError::History)
    }

    pub async fn clear_history(&self) -> Result<(), MeterError> {
        self.history.clear().await.map_err(MeterError::History)?;
        info!("ride history cleared");
        Ok(())
    }

    /// Screen shown/hidden. Suspends or resumes the location subscription as
    /// the visibility policy dictates.
    pub async fn on_visibility_changed(&self, visible: bool) -> Result<(), MeterError> {
        self.visible.store(visible, Ordering::SeqCst);

        let mut tracking = self.tracking.lock().await;
        let status = self.state.lock().await.status();
        let wanted = self.policy.should_subscribe(status, visible);

        if wanted && !tracking.is_active() {
            let stream = self
                .source
                .subscribe()
                .map_err(MeterError::LocationUnavailable)?;
            tracking
                .start(stream, self.state.clone())
                .map_err(MeterError::LocationUnavailable)?;
            info!("location updates resumed");
        } else if !wanted && tracking.is_active() {
            if let Err(err) = tracking.stop().await {
                error!("failed to suspend location updates: {err:#}");
            }
            info!("location updates suspended");
        }

        Ok(())
    }

    /// Tear down background work when the hosting context goes away. The
    /// ride state itself is left as is.
    pub async fn shutdown(&self) {
        let mut tracking = self.tracking.lock().await;
        if let Err(err) = tracking.stop().await {
            error!("failed to stop location tracking: {err:#}");
        }
        self.cancel_ticker().await;
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let display = self.display.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;

                let reading = {
                    let guard = state.lock().await;
                    if guard.status() != RideStatus::Active {
                        break;
                    }
                    guard.snapshot().reading
                };

                display.show(&reading);
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}
