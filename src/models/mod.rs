pub mod ride_record;

pub use ride_record::{RideRecord, HISTORY_CAPACITY};
