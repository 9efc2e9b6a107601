use anyhow::{Context, Result};
use chrono::Utc;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::time::{self, Duration, MissedTickBehavior};

use super::{LocationFix, LocationSource, LocationStream, SUBSCRIPTION_BUFFER};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

use crate::{log_debug, log_info};

const METERS_PER_DEGREE_LAT: f64 = 111_195.0;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub start_latitude: f64,
    pub start_longitude: f64,
    /// Direction of travel in degrees clockwise from north
    pub heading_deg: f64,
    pub cruise_speed_mps: f64,
    pub interval: Duration,
    /// Fraction of samples reported as stationary (speed 0)
    pub stationary_ratio: f64,
    /// Fraction of samples with a poor accuracy radius
    pub poor_signal_ratio: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_latitude: 48.8566,
            start_longitude: 2.3522,
            heading_deg: 45.0,
            cruise_speed_mps: 11.0,
            interval: Duration::from_secs(1),
            stationary_ratio: 0.1,
            poor_signal_ratio: 0.1,
            seed: 7,
        }
    }
}

/// Stand-in for device GPS: drives along a fixed heading with jitter.
pub struct SimulatedLocationSource {
    config: SimulationConfig,
}

impl SimulatedLocationSource {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }
}

impl LocationSource for SimulatedLocationSource {
    fn subscribe(&self) -> Result<LocationStream> {
        let runtime = tokio::runtime::Handle::try_current()
            .context("simulated location source needs a tokio runtime")?;
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        runtime.spawn(drive(self.config.clone(), tx));
        Ok(rx)
    }
}

async fn drive(config: SimulationConfig, tx: mpsc::Sender<LocationFix>) {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut ticker = time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let heading = config.heading_deg.to_radians();
    let step_secs = config.interval.as_secs_f64();
    let mut latitude = config.start_latitude;
    let mut longitude = config.start_longitude;

    loop {
        ticker.tick().await;

        let stationary = rng.gen_bool(config.stationary_ratio.clamp(0.0, 1.0));
        let speed = if stationary {
            0.0
        } else {
            (config.cruise_speed_mps + rng.gen_range(-1.5..1.5)).max(0.0)
        };

        let travelled = speed * step_secs;
        latitude += travelled * heading.cos() / METERS_PER_DEGREE_LAT;
        longitude += travelled * heading.sin()
            / (METERS_PER_DEGREE_LAT * latitude.to_radians().cos().max(1e-6));

        let accuracy = if rng.gen_bool(config.poor_signal_ratio.clamp(0.0, 1.0)) {
            rng.gen_range(25.0..80.0)
        } else {
            rng.gen_range(3.0..12.0)
        };
        let jitter = 1.0 / METERS_PER_DEGREE_LAT;

        let fix = LocationFix::new(
            latitude + rng.gen_range(-jitter..jitter),
            longitude + rng.gen_range(-jitter..jitter),
            accuracy,
            speed,
            Utc::now(),
        );

        log_debug!(
            "simulated fix lat={:.6} lon={:.6} acc={:.1} speed={:.1}",
            fix.latitude,
            fix.longitude,
            fix.accuracy_m,
            fix.speed_mps
        );

        if tx.send(fix).await.is_err() {
            log_info!("simulated location source unsubscribed");
            break;
        }
    }
}
