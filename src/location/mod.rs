//! Location fixes and the sources that deliver them.
//!
//! A source hands out a bounded queue of fixes per subscription. Dropping the
//! receiving end is the unsubscribe signal: producers stop as soon as a send
//! fails, which releases the underlying GPS resource.

pub mod fix;
pub mod push;
pub mod simulated;

use anyhow::Result;
use tokio::sync::mpsc;

pub use fix::{distance_m, LocationFix};
pub use push::PushLocationSource;
pub use simulated::{SimulatedLocationSource, SimulationConfig};

/// Queue depth per subscription. Fixes arrive roughly once a second so this
/// only fills up if the consumer stalls.
pub const SUBSCRIPTION_BUFFER: usize = 64;

pub type LocationStream = mpsc::Receiver<LocationFix>;

/// Upstream collaborator that produces raw fixes while subscribed.
pub trait LocationSource: Send + Sync {
    /// Begin delivering fixes. Fails when the platform cannot start updates
    /// (permission denied, GPS disabled, ...).
    fn subscribe(&self) -> Result<LocationStream>;
}
