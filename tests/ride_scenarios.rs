//! End-to-end rides through the controller with SQLite history.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use taximeter_lib::db::Database;
use taximeter_lib::location::{LocationFix, PushLocationSource};
use taximeter_lib::meter::{DisplayReading, RideController, RideStatus};
use taximeter_lib::sinks::{DisplaySink, NotificationSink};
use tempfile::TempDir;
use tokio::time::{self, Duration};

const EARTH_RADIUS_M: f64 = 6_371_008.8;

#[derive(Default)]
struct Screen {
    last: Mutex<Option<DisplayReading>>,
}

impl DisplaySink for Screen {
    fn show(&self, reading: &DisplayReading) {
        *self.last.lock().unwrap() = Some(reading.clone());
    }
}

#[derive(Default)]
struct Inbox {
    summaries: Mutex<Vec<String>>,
}

impl NotificationSink for Inbox {
    fn notify(&self, summary: &str, _breakdown: &str) {
        self.summaries.lock().unwrap().push(summary.to_string());
    }
}

struct Rig {
    _dir: TempDir,
    meter: RideController<Database>,
    gps: Arc<PushLocationSource>,
    screen: Arc<Screen>,
    inbox: Arc<Inbox>,
}

fn rig() -> Rig {
    let dir = TempDir::new().unwrap();
    let db = Database::new(dir.path().join("rides.sqlite3")).unwrap();
    let gps = Arc::new(PushLocationSource::new());
    let screen = Arc::new(Screen::default());
    let inbox = Arc::new(Inbox::default());
    let meter = RideController::new(Arc::new(db), gps.clone(), screen.clone(), inbox.clone());

    Rig {
        _dir: dir,
        meter,
        gps,
        screen,
        inbox,
    }
}

fn fix(lat: f64, lon: f64, speed: f64, accuracy: f64) -> LocationFix {
    LocationFix::new(lat, lon, accuracy, speed, Utc::now())
}

fn north_of(from: &LocationFix, meters: f64) -> LocationFix {
    LocationFix {
        latitude: from.latitude + (meters / EARTH_RADIUS_M).to_degrees(),
        ..*from
    }
}

async fn drain() {
    time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test(start_paused = true)]
async fn first_fix_is_free_second_fix_counts() {
    let rig = rig();
    rig.meter.start().await.unwrap();

    let first = fix(35.6762, 139.6503, 2.0, 5.0);
    rig.gps.push(first);
    drain().await;
    assert_eq!(rig.meter.snapshot().await.distance_km, 0.0);

    rig.gps.push(north_of(&first, 10.0));
    drain().await;
    let distance = rig.meter.snapshot().await.distance_km;
    assert!((distance - 0.010).abs() < 1e-9, "got {distance}");
}

#[tokio::test(start_paused = true)]
async fn slow_fix_after_reference_adds_nothing() {
    let rig = rig();
    rig.meter.start().await.unwrap();

    let first = fix(35.6762, 139.6503, 2.0, 5.0);
    rig.gps.push(first);
    let mut crawl = north_of(&first, 40.0);
    crawl.speed_mps = 0.2;
    rig.gps.push(crawl);
    drain().await;
    assert_eq!(rig.meter.snapshot().await.distance_km, 0.0);

    // The reference is still `first`, so 10 m from it counts as 10 m.
    rig.gps.push(north_of(&first, 10.0));
    drain().await;
    assert!((rig.meter.snapshot().await.distance_km - 0.010).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn noisy_drive_only_bills_clean_movement() {
    let rig = rig();
    rig.meter.start().await.unwrap();

    let start = fix(-33.8688, 151.2093, 8.0, 6.0);
    rig.gps.push(start);

    let mut poor = north_of(&start, 100.0);
    poor.accuracy_m = 45.0;
    rig.gps.push(poor);

    rig.gps.push(north_of(&start, 3.0));

    let mut broken = north_of(&start, 50.0);
    broken.latitude = f64::NAN;
    rig.gps.push(broken);

    rig.gps.push(north_of(&start, 250.0));
    drain().await;

    let distance = rig.meter.snapshot().await.distance_km;
    assert!((distance - 0.250).abs() < 1e-9, "got {distance}");
}

#[tokio::test(start_paused = true)]
async fn stop_after_125_seconds_bills_two_minutes() {
    let rig = rig();
    rig.meter.start().await.unwrap();

    let first = fix(52.3676, 4.9041, 10.0, 4.0);
    rig.gps.push(first);
    rig.gps.push(north_of(&first, 3_200.0));
    drain().await;

    time::sleep(Duration::from_secs(125) - Duration::from_millis(20)).await;
    let completed = rig.meter.stop().await.unwrap().expect("active ride");

    assert_eq!(completed.fare.complete_minutes_elapsed, 2);
    assert!((completed.fare.total - 8.30).abs() < 1e-6);

    let shown = rig.screen.last.lock().unwrap().clone().unwrap();
    assert_eq!(shown.distance_km, "3.20");
    assert_eq!(shown.elapsed, "02:05");
    assert_eq!(shown.fare, "8.30");

    let summaries = rig.inbox.summaries.lock().unwrap().clone();
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].contains("8.30"));
}

#[tokio::test(start_paused = true)]
async fn stop_then_reset_prepends_the_frozen_record() {
    let rig = rig();

    for _ in 0..3 {
        rig.meter.start().await.unwrap();
        rig.meter.stop().await.unwrap();
        rig.meter.reset().await.unwrap();
    }
    let before = rig.meter.history().await.unwrap().len();

    rig.meter.start().await.unwrap();
    time::sleep(Duration::from_secs(61)).await;
    let completed = rig.meter.stop().await.unwrap().unwrap();

    // Time keeps passing after stop; the record must not.
    time::sleep(Duration::from_secs(120)).await;
    let snapshot = rig.meter.reset().await.unwrap();
    assert_eq!(snapshot.status, RideStatus::Idle);

    let history = rig.meter.history().await.unwrap();
    assert_eq!(history.len(), before + 1);
    assert_eq!(history[0], completed.record);
    assert_eq!(history[0].complete_minutes, 1);
}

#[tokio::test(start_paused = true)]
async fn twenty_first_ride_evicts_the_oldest() {
    let rig = rig();
    let mut ids = Vec::new();

    for _ in 0..21 {
        rig.meter.start().await.unwrap();
        let completed = rig.meter.stop().await.unwrap().unwrap();
        ids.push(completed.record.id);
        rig.meter.reset().await.unwrap();
    }

    let history = rig.meter.history().await.unwrap();
    assert_eq!(history.len(), 20);
    assert_eq!(history[0].id, ids[20]);
    assert!(history.iter().all(|r| r.id != ids[0]));
}

#[tokio::test(start_paused = true)]
async fn fixes_are_ignored_once_stopped() {
    let rig = rig();
    rig.meter.start().await.unwrap();
    rig.meter.stop().await.unwrap();

    assert!(!rig.gps.push(fix(0.0, 0.0, 2.0, 5.0)));
    assert_eq!(rig.meter.snapshot().await.distance_km, 0.0);
}

#[tokio::test(start_paused = true)]
async fn stopping_right_after_fixes_arrive_still_bills_them() {
    let rig = rig();
    rig.meter.start().await.unwrap();

    let first = fix(41.9028, 12.4964, 6.0, 3.0);
    assert!(rig.gps.push(first));
    assert!(rig.gps.push(north_of(&first, 500.0)));
    let completed = rig.meter.stop().await.unwrap().unwrap();

    assert!((completed.record.distance_km - 0.5).abs() < 1e-9);
    let history = rig.meter.history().await.unwrap();
    assert_eq!(history[0].id, completed.record.id);
    assert!((history[0].distance_km - 0.5).abs() < 1e-9);
    assert_eq!(rig.screen.last.lock().unwrap().clone().unwrap().distance_km, "0.50");
}
