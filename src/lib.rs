pub mod db;
pub mod error;
pub mod history;
pub mod location;
pub mod meter;
pub mod models;
pub mod settings;
pub mod sinks;
pub mod utils;

use std::{env, path::Path, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::time::Duration;

use db::Database;
use location::{LocationSource, SimulatedLocationSource, SimulationConfig};
use meter::RideController;
use settings::SettingsStore;
use sinks::{LogDisplay, LogNotifier, MutedNotifier, NotificationSink};

pub use error::MeterError;

pub const DATA_DIR_ENV: &str = "TAXIMETER_DATA_DIR";
pub const SIM_SECONDS_ENV: &str = "TAXIMETER_SIM_SECONDS";

const DEFAULT_DATA_DIR: &str = "taximeter-data";
const DEFAULT_SIM_SECONDS: u64 = 30;

/// Everything a shell needs to drive the meter.
pub struct AppState {
    pub db: Database,
    pub meter: RideController<Database>,
    pub settings: SettingsStore,
}

impl AppState {
    pub fn open(data_dir: &Path, source: Arc<dyn LocationSource>) -> Result<Self> {
        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("failed to create data directory {}", data_dir.display())
        })?;

        let database = Database::new(data_dir.join("taximeter.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let current = settings.get();

        let notifier: Arc<dyn NotificationSink> = if current.notifications_enabled {
            Arc::new(LogNotifier)
        } else {
            Arc::new(MutedNotifier)
        };

        let meter = RideController::new(
            Arc::new(database.clone()),
            source,
            Arc::new(LogDisplay),
            notifier,
        )
        .with_policy(current.visibility_policy());

        Ok(Self {
            db: database,
            meter,
            settings,
        })
    }
}

fn data_dir_from_env() -> PathBuf {
    env::var(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

fn sim_seconds_from_env() -> u64 {
    match env::var(SIM_SECONDS_ENV) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{SIM_SECONDS_ENV}={raw} is not a number, using {DEFAULT_SIM_SECONDS}");
            DEFAULT_SIM_SECONDS
        }),
        Err(_) => DEFAULT_SIM_SECONDS,
    }
}

/// Run one simulated ride end to end: start, drive, stop, print history.
pub fn run() -> Result<()> {
    utils::logging::init_logging();

    info!("Taximeter starting up...");

    let data_dir = data_dir_from_env();
    let ride_secs = sim_seconds_from_env();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async move {
        let source = Arc::new(SimulatedLocationSource::new(SimulationConfig::default()));
        let app = AppState::open(&data_dir, source)?;
        info!("ride history stored at {}", app.db.path().display());

        app.meter.start().await?;

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(ride_secs)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, ending ride early");
            }
        }

        app.meter.stop().await?;

        let history = app.meter.history().await?;
        info!("{} ride(s) in history", history.len());
        for ride in &history {
            info!(
                "  {} | {:.2} km | {} min | {:.2}",
                ride.completed_at.format("%Y-%m-%d %H:%M"),
                ride.distance_km,
                ride.complete_minutes,
                ride.fare
            );
        }

        app.meter.reset().await?;
        app.meter.shutdown().await;
        Ok::<(), anyhow::Error>(())
    })
}
