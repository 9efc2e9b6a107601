//! Downstream collaborators: the live display and ride-completion
//! notifications. Both are fire-and-forget.

use log::info;

use crate::meter::DisplayReading;

pub trait DisplaySink: Send + Sync {
    fn show(&self, reading: &DisplayReading);
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, summary: &str, breakdown: &str);
}

/// Writes each refresh to the log.
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn show(&self, reading: &DisplayReading) {
        info!(
            "meter {} km | {} | fare {}",
            reading.distance_km, reading.elapsed, reading.fare
        );
    }
}

pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, summary: &str, breakdown: &str) {
        info!("{summary}");
        info!("{breakdown}");
    }
}

/// Discards notifications, for when the user has turned them off.
pub struct MutedNotifier;

impl NotificationSink for MutedNotifier {
    fn notify(&self, _summary: &str, _breakdown: &str) {}
}
