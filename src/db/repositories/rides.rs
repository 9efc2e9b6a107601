use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{finite, parse_datetime, to_i64, to_u64},
};
use crate::history::HistoryStore;
use crate::models::{RideRecord, HISTORY_CAPACITY};

fn row_to_ride(row: &Row) -> Result<RideRecord> {
    let completed_at: String = row.get("completed_at")?;
    let complete_minutes: i64 = row.get("complete_minutes")?;

    Ok(RideRecord {
        id: row.get("id")?,
        completed_at: parse_datetime(&completed_at, "completed_at")?,
        distance_km: row.get("distance_km")?,
        complete_minutes: to_u64(complete_minutes, "complete_minutes")?,
        fare: row.get("fare")?,
    })
}

impl Database {
    /// Insert a completed ride and drop everything older than the newest
    /// `HISTORY_CAPACITY` rides, atomically.
    pub async fn insert_ride(&self, record: &RideRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO ride_history (id, completed_at, distance_km, complete_minutes, fare)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.completed_at.to_rfc3339(),
                    finite(record.distance_km, "distance_km")?,
                    to_i64(record.complete_minutes)?,
                    finite(record.fare, "fare")?,
                ],
            )
            .context("failed to insert ride")?;

            tx.execute(
                "DELETE FROM ride_history
                 WHERE seq NOT IN (
                     SELECT seq FROM ride_history ORDER BY seq DESC LIMIT ?1
                 )",
                params![HISTORY_CAPACITY as i64],
            )
            .context("failed to trim ride history")?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn list_rides(&self) -> Result<Vec<RideRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, completed_at, distance_km, complete_minutes, fare
                 FROM ride_history
                 ORDER BY seq DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut rides = Vec::new();
            while let Some(row) = rows.next()? {
                rides.push(row_to_ride(row)?);
            }

            Ok(rides)
        })
        .await
    }

    pub async fn delete_all_rides(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM ride_history", [])
                .context("failed to clear ride history")?;
            Ok(())
        })
        .await
    }
}

impl HistoryStore for Database {
    async fn append(&self, record: RideRecord) -> Result<()> {
        self.insert_ride(&record).await
    }

    async fn list(&self) -> Result<Vec<RideRecord>> {
        self.list_rides().await
    }

    async fn clear(&self) -> Result<()> {
        self.delete_all_rides().await
    }
}
