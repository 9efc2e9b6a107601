//! Ride-history persistence port.
//!
//! History is recency ordered (index 0 is the latest ride) and bounded to
//! [`HISTORY_CAPACITY`]. The SQLite [`Database`](crate::db::Database) is the
//! durable implementation; [`MemoryHistory`] keeps rides in process only.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use anyhow::Result;

use crate::models::{RideRecord, HISTORY_CAPACITY};

pub trait HistoryStore: Send + Sync + 'static {
    /// Prepend a completed ride, discarding anything beyond the capacity.
    fn append(&self, record: RideRecord) -> impl Future<Output = Result<()>> + Send;

    /// Most recent first.
    fn list(&self) -> impl Future<Output = Result<Vec<RideRecord>>> + Send;

    fn clear(&self) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Default)]
pub struct MemoryHistory {
    records: Mutex<VecDeque<RideRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, VecDeque<RideRecord>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl HistoryStore for MemoryHistory {
    async fn append(&self, record: RideRecord) -> Result<()> {
        let mut records = self.records();
        records.push_front(record);
        records.truncate(HISTORY_CAPACITY);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RideRecord>> {
        Ok(self.records().iter().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.records().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(n: u64) -> RideRecord {
        RideRecord {
            id: format!("ride-{n}"),
            completed_at: Utc::now(),
            distance_km: n as f64,
            complete_minutes: n,
            fare: 2.5 + n as f64,
        }
    }

    #[tokio::test]
    async fn newest_record_is_first() {
        let history = MemoryHistory::new();
        history.append(record(1)).await.unwrap();
        history.append(record(2)).await.unwrap();

        let list = history.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "ride-2");
        assert_eq!(list[1].id, "ride-1");
    }

    #[tokio::test]
    async fn twenty_first_ride_evicts_the_oldest() {
        let history = MemoryHistory::new();
        for n in 1..=21 {
            history.append(record(n)).await.unwrap();
        }

        let list = history.list().await.unwrap();
        assert_eq!(list.len(), HISTORY_CAPACITY);
        assert_eq!(list[0].id, "ride-21");
        assert_eq!(list[HISTORY_CAPACITY - 1].id, "ride-2");
        assert!(list.iter().all(|r| r.id != "ride-1"));
    }

    #[tokio::test]
    async fn clear_empties_history() {
        let history = MemoryHistory::new();
        history.append(record(1)).await.unwrap();
        history.clear().await.unwrap();
        assert!(history.list().await.unwrap().is_empty());
    }
}
