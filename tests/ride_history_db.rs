//! SQLite ride history: capacity, ordering and durability.

use chrono::{Duration as ChronoDuration, Utc};
use taximeter_lib::db::Database;
use taximeter_lib::history::HistoryStore;
use taximeter_lib::models::{RideRecord, HISTORY_CAPACITY};
use tempfile::TempDir;

fn open(dir: &TempDir) -> Database {
    Database::new(dir.path().join("rides.sqlite3")).expect("failed to open database")
}

fn ride(n: i64) -> RideRecord {
    RideRecord {
        id: format!("ride-{n}"),
        completed_at: Utc::now() + ChronoDuration::seconds(n),
        distance_km: n as f64 * 0.5,
        complete_minutes: n as u64,
        fare: 2.5 + n as f64,
    }
}

#[tokio::test]
async fn starts_empty() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    assert!(db.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn newest_ride_is_listed_first() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);

    db.append(ride(1)).await.unwrap();
    db.append(ride(2)).await.unwrap();
    db.append(ride(3)).await.unwrap();

    let ids: Vec<String> = db.list().await.unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["ride-3", "ride-2", "ride-1"]);
}

#[tokio::test]
async fn keeps_only_the_newest_twenty() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);

    for n in 1..=21 {
        db.append(ride(n)).await.unwrap();
    }

    let rides = db.list().await.unwrap();
    assert_eq!(rides.len(), HISTORY_CAPACITY);
    assert_eq!(rides[0].id, "ride-21");
    assert_eq!(rides[HISTORY_CAPACITY - 1].id, "ride-2");
    assert!(rides.iter().all(|r| r.id != "ride-1"));
}

#[tokio::test]
async fn stored_values_round_trip() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    let original = ride(7);

    db.append(original.clone()).await.unwrap();
    let stored = db.list().await.unwrap().remove(0);
    assert_eq!(stored, original);
}

#[tokio::test]
async fn history_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let db = open(&dir);
        db.append(ride(1)).await.unwrap();
    }

    let db = open(&dir);
    let rides = db.list().await.unwrap();
    assert_eq!(rides.len(), 1);
    assert_eq!(rides[0].id, "ride-1");
}

#[tokio::test]
async fn clear_removes_everything() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    for n in 1..=3 {
        db.append(ride(n)).await.unwrap();
    }

    db.clear().await.unwrap();
    assert!(db.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn non_finite_fare_is_refused() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    let mut bad = ride(1);
    bad.fare = f64::NAN;

    assert!(db.append(bad).await.is_err());
    assert!(db.list().await.unwrap().is_empty());
}
