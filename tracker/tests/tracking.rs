use std::{sync::{Arc, atomic::{AtomicUsize, Ordering}}, time::Duration};

use async_trait::async_trait;
use car_logbook_data_management::DataManager;
use car_logbook_lib::{track_point::TrackPoint, trip::LocationPoint};
use chrono::TimeZone;
use geo_types::Point;
use tokio::sync::{Mutex, mpsc};
use tracker::{TrackerError, api::SyncClient, config::TrackerConfig, controller::TrackingController, foreground::ForegroundTask, location::LocationSource, state::TrackingState};

/// Records every upload attempt and fails the first `failures` of them.
struct MockSyncClient {
    batches: Mutex<Vec<(i64, Vec<LocationPoint>)>>,
    failures_left: AtomicUsize,
}

impl MockSyncClient {
    fn new(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(failures),
        })
    }

    async fn batches(&self) -> Vec<(i64, Vec<LocationPoint>)> {
        self.batches.lock().await.clone()
    }
}

#[async_trait]
impl SyncClient for MockSyncClient {
    async fn upload_batch(&self, trip_id: i64, points: Vec<LocationPoint>) -> Result<(), TrackerError> {
        self.batches.lock().await.push((trip_id, points));

        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(TrackerError::Api("simulated transport failure".to_string()));
        }

        Ok(())
    }
}

/// Hands out one pre-built fix channel; the test drives the sender side.
struct ManualLocationSource {
    receiver: Mutex<Option<mpsc::Receiver<TrackPoint>>>,
    subscriptions: AtomicUsize,
}

impl ManualLocationSource {
    fn new() -> (Arc<Self>, mpsc::Sender<TrackPoint>) {
        let (tx, rx) = mpsc::channel(32);
        let source = Arc::new(Self {
            receiver: Mutex::new(Some(rx)),
            subscriptions: AtomicUsize::new(0),
        });
        (source, tx)
    }

    async fn break_subscription(&self) {
        self.receiver.lock().await.take();
    }
}

#[async_trait]
impl LocationSource for ManualLocationSource {
    async fn subscribe(&self, _interval: Duration) -> Result<mpsc::Receiver<TrackPoint>, TrackerError> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        self.receiver.lock().await.take()
            .ok_or_else(|| TrackerError::Location("No location provider available".to_string()))
    }
}

#[derive(Default)]
struct CountingForeground {
    started: AtomicUsize,
    stopped: AtomicUsize,
}

impl ForegroundTask for CountingForeground {
    fn start(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    controller: TrackingController,
    data: DataManager,
    sync: Arc<MockSyncClient>,
    source: Arc<ManualLocationSource>,
    fixes: mpsc::Sender<TrackPoint>,
    foreground: Arc<CountingForeground>,
}

async fn harness(upload_failures: usize) -> Harness {
    let data = DataManager::open_in_memory().await.unwrap();
    let sync = MockSyncClient::new(upload_failures);
    let (source, fixes) = ManualLocationSource::new();
    let foreground = Arc::new(CountingForeground::default());

    let config = TrackerConfig {
        sample_interval: Duration::from_millis(10),
        // All flushes in these tests are driven explicitly.
        flush_interval: Duration::from_secs(3600),
        ..Default::default()
    };

    let controller = TrackingController::new(
        config,
        data.clone(),
        sync.clone(),
        source.clone(),
        foreground.clone(),
        Arc::new(TrackingState::new()),
    );

    Harness {
        controller,
        data,
        sync,
        source,
        fixes,
        foreground,
    }
}

fn fix(millis: i64) -> TrackPoint {
    TrackPoint::new(Point::new(30.52, 50.45), chrono::Utc.timestamp_millis_opt(millis).unwrap())
}

async fn wait_for_buffered(data: &DataManager, trip_id: i64, count: i64) {
    for _ in 0..200 {
        if data.unsent_point_count(trip_id).await.unwrap() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("Expected {count} buffered points for trip {trip_id}");
}

async fn wait_until_idle(state: &TrackingState) {
    for _ in 0..200 {
        if !state.is_tracking() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("Controller never went idle");
}

#[tokio::test]
async fn failed_flush_retries_the_same_points_as_one_batch() {
    let h = harness(1).await;

    h.controller.start(7).await.unwrap();
    for millis in [1_000, 2_000, 3_000] {
        h.fixes.send(fix(millis)).await.unwrap();
    }
    wait_for_buffered(&h.data, 7, 3).await;

    // First attempt fails; nothing may be deleted.
    h.controller.flush_now().await;
    assert_eq!(h.data.unsent_point_count(7).await.unwrap(), 3);

    // Second attempt succeeds and drains the buffer.
    h.controller.flush_now().await;
    assert_eq!(h.data.unsent_point_count(7).await.unwrap(), 0);

    let batches = h.sync.batches().await;
    assert_eq!(batches.len(), 2);
    for (trip_id, points) in &batches {
        assert_eq!(*trip_id, 7);
        assert_eq!(points.len(), 3);
    }
    // The retry re-sends the identical batch, not an accumulated double one.
    assert_eq!(batches[0].1, batches[1].1);

    h.controller.stop().await;
}

#[tokio::test]
async fn upload_failure_never_deletes_buffered_points() {
    let h = harness(usize::MAX).await;

    h.data.buffer_point(3, &fix(1_000)).await;
    h.data.buffer_point(3, &fix(2_000)).await;

    h.controller.flush_stranded().await;
    h.controller.flush_stranded().await;

    assert_eq!(h.data.unsent_point_count(3).await.unwrap(), 2);
    assert_eq!(h.sync.batches().await.len(), 2);
}

#[tokio::test]
async fn flush_reuploads_after_crash_between_upload_and_delete() {
    let h = harness(0).await;

    h.data.buffer_point(9, &fix(1_000)).await;
    h.data.buffer_point(9, &fix(2_000)).await;

    // Simulated first run: the upload was acknowledged, but the process died
    // before the delete step.
    let points = h.data.unsent_points(9).await.unwrap();
    let batch: Vec<LocationPoint> = points.iter().map(LocationPoint::from).collect();
    h.sync.upload_batch(9, batch).await.unwrap();
    assert_eq!(h.data.unsent_point_count(9).await.unwrap(), 2);

    // Restarted run: the recovery pass re-uploads the same rows and deletes
    // them once acknowledged.
    h.controller.flush_stranded().await;

    let batches = h.sync.batches().await;
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0], batches[1]);
    assert_eq!(h.data.unsent_point_count(9).await.unwrap(), 0);
}

#[tokio::test]
async fn start_while_active_is_a_noop() {
    let h = harness(0).await;

    h.controller.start(5).await.unwrap();
    h.controller.start(6).await.unwrap();

    // No second subscription was opened.
    assert_eq!(h.source.subscriptions.load(Ordering::SeqCst), 1);
    assert_eq!(h.foreground.started.load(Ordering::SeqCst), 1);

    // Fixes keep landing on the first trip.
    h.fixes.send(fix(1_000)).await.unwrap();
    wait_for_buffered(&h.data, 5, 1).await;
    assert_eq!(h.data.unsent_point_count(6).await.unwrap(), 0);

    h.controller.stop().await;
}

#[tokio::test]
async fn stop_while_idle_is_a_noop() {
    let h = harness(0).await;

    h.controller.stop().await;

    assert!(!h.controller.state().is_tracking());
    assert!(h.sync.batches().await.is_empty());
    assert_eq!(h.foreground.stopped.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn immediate_stop_with_no_fixes_makes_no_network_calls() {
    let h = harness(0).await;

    h.controller.start(5).await.unwrap();
    assert!(h.controller.state().is_tracking());

    h.controller.stop().await;

    assert!(!h.controller.state().is_tracking());
    assert!(h.sync.batches().await.is_empty());
    assert_eq!(h.foreground.stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stop_runs_a_final_flush() {
    let h = harness(0).await;

    h.controller.start(7).await.unwrap();
    h.fixes.send(fix(1_000)).await.unwrap();
    wait_for_buffered(&h.data, 7, 1).await;

    h.controller.stop().await;

    assert_eq!(h.data.unsent_point_count(7).await.unwrap(), 0);
    assert_eq!(h.sync.batches().await.len(), 1);
}

#[tokio::test]
async fn subscription_loss_tears_down_without_flushing() {
    let h = harness(0).await;

    h.controller.start(7).await.unwrap();
    h.fixes.send(fix(1_000)).await.unwrap();
    wait_for_buffered(&h.data, 7, 1).await;

    // The provider dies underneath the controller.
    let Harness { controller, data, sync, foreground, fixes, .. } = h;
    drop(fixes);

    let state = controller.state();
    wait_until_idle(&state).await;

    // No flush on forced teardown; the buffered point stays for recovery.
    assert!(sync.batches().await.is_empty());
    assert_eq!(data.unsent_point_count(7).await.unwrap(), 1);
    assert_eq!(foreground.stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_subscription_leaves_the_controller_idle() {
    let h = harness(0).await;
    h.source.break_subscription().await;

    let result = h.controller.start(7).await;

    assert!(matches!(result, Err(TrackerError::Location(_))));
    assert!(!h.controller.state().is_tracking());
    assert_eq!(h.foreground.started.load(Ordering::SeqCst), 1);
    assert_eq!(h.foreground.stopped.load(Ordering::SeqCst), 1);

    // The controller is still reusable once a provider is back.
    h.controller.stop().await;
    assert!(h.sync.batches().await.is_empty());
}

#[tokio::test]
async fn current_location_outlives_the_trip() {
    let h = harness(0).await;
    let state = h.controller.state();
    let mut location_updates = state.watch_location();

    h.controller.start(7).await.unwrap();
    h.fixes.send(fix(1_000)).await.unwrap();

    location_updates.changed().await.unwrap();
    wait_for_buffered(&h.data, 7, 1).await;

    h.controller.stop().await;

    let last = state.current_location().expect("last fix should persist");
    assert_eq!(last.latitude(), 50.45);
    assert_eq!(last.longitude(), 30.52);
    assert!(!state.is_tracking());
}

#[tokio::test]
async fn tracking_flag_is_observable() {
    let h = harness(0).await;
    let state = h.controller.state();
    let mut tracking = state.watch_tracking();
    assert!(!*tracking.borrow_and_update());

    h.controller.start(5).await.unwrap();
    tracking.changed().await.unwrap();
    assert!(*tracking.borrow_and_update());

    h.controller.stop().await;
    tracking.changed().await.unwrap();
    assert!(!*tracking.borrow_and_update());
}
