use std::sync::Arc;

use car_logbook_data_management::DataManager;
use car_logbook_lib::trip::LocationPoint;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{TrackerError, api::SyncClient, config::TrackerConfig, foreground::ForegroundTask, location::LocationSource, state::TrackingState};

struct Session {
    trip_id: Option<i64>,
    sampler: Option<JoinHandle<()>>,
    flusher: Option<JoinHandle<()>>,
}

struct Inner {
    config: TrackerConfig,
    data: DataManager,
    sync: Arc<dyn SyncClient>,
    locations: Arc<dyn LocationSource>,
    foreground: Arc<dyn ForegroundTask>,
    state: Arc<TrackingState>,
    session: Mutex<Session>,
    // Serializes flush attempts so a timer tick and a final flush can never
    // upload the same rows concurrently.
    flush_gate: Mutex<()>,
}

/// Orchestrates one trip recording at a time: subscribes to the location
/// source, buffers every fix durably, and drains the buffer to the backend in
/// periodic batches. Rows are deleted only after the backend acknowledged the
/// batch containing them, so every fix reaches the server at least once; a
/// failure anywhere in between can only ever cause a re-upload.
#[derive(Clone)]
pub struct TrackingController {
    inner: Arc<Inner>,
}

impl TrackingController {
    pub fn new(
        config: TrackerConfig,
        data: DataManager,
        sync: Arc<dyn SyncClient>,
        locations: Arc<dyn LocationSource>,
        foreground: Arc<dyn ForegroundTask>,
        state: Arc<TrackingState>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                data,
                sync,
                locations,
                foreground,
                state,
                session: Mutex::new(Session {
                    trip_id: None,
                    sampler: None,
                    flusher: None,
                }),
                flush_gate: Mutex::new(()),
            }),
        }
    }

    pub fn state(&self) -> Arc<TrackingState> {
        self.inner.state.clone()
    }

    /// Begins recording for the given trip. A no-op if a trip is already
    /// being recorded or the id is invalid. Fails only when the location
    /// subscription cannot be opened, in which case nothing is left running.
    pub async fn start(&self, trip_id: i64) -> Result<(), TrackerError> {
        if trip_id <= 0 {
            tracing::warn!("Ignoring start with invalid trip id {}", trip_id);
            return Ok(());
        }

        let mut session = self.inner.session.lock().await;

        if let Some(active) = session.trip_id {
            tracing::warn!("Ignoring start for trip {}: trip {} is already being recorded", trip_id, active);
            return Ok(());
        }

        self.inner.foreground.start();

        let mut fixes = match self.inner.locations.subscribe(self.inner.config.sample_interval).await {
            Ok(fixes) => fixes,
            Err(err) => {
                self.inner.foreground.stop();
                return Err(err);
            }
        };

        session.trip_id = Some(trip_id);

        let controller = self.clone();
        session.sampler = Some(tokio::spawn(async move {
            while let Some(fix) = fixes.recv().await {
                controller.inner.state.set_location(fix);
                controller.inner.data.buffer_point(trip_id, &fix).await;
            }
            // The stream only ends without a stop when the subscription was
            // lost underneath us.
            controller.handle_subscription_loss(trip_id).await;
        }));

        let controller = self.clone();
        session.flusher = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(controller.inner.config.flush_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // the first tick completes immediately
            loop {
                ticker.tick().await;
                controller.flush_active().await;
            }
        }));

        self.inner.state.set_tracking(true);
        tracing::info!("Tracking started for trip {}", trip_id);

        Ok(())
    }

    /// Ends the recording: cancels sampling and the flush timer promptly,
    /// then awaits one final flush before going idle. The final flush is
    /// never cancelled (its upload is bounded by the request timeout), and a
    /// failed one leaves the rows for [`Self::flush_stranded`].
    pub async fn stop(&self) {
        let mut session = self.inner.session.lock().await;

        let Some(trip_id) = session.trip_id else {
            tracing::debug!("Ignoring stop: no trip is being recorded");
            return;
        };

        if let Some(sampler) = session.sampler.take() {
            sampler.abort();
        }
        if let Some(flusher) = session.flusher.take() {
            flusher.abort();
        }

        self.flush_trip(trip_id).await;

        session.trip_id = None;
        self.inner.foreground.stop();
        self.inner.state.set_tracking(false);
        tracing::info!("Tracking stopped for trip {}", trip_id);
    }

    /// One upload attempt for the active trip, outside the timer cadence.
    pub async fn flush_now(&self) {
        self.flush_active().await;
    }

    /// Recovery pass for rows left behind by a failed final flush or a
    /// process death mid-trip. Meant to run once at application start, before
    /// any new recording.
    pub async fn flush_stranded(&self) {
        let trip_ids = match self.inner.data.unsent_trip_ids().await {
            Ok(trip_ids) => trip_ids,
            Err(err) => {
                tracing::error!("Failed to look for stranded points: {:?}", err);
                return;
            }
        };

        for trip_id in trip_ids {
            tracing::info!("Retrying stranded points for trip {}", trip_id);
            self.flush_trip(trip_id).await;
        }
    }

    async fn flush_active(&self) {
        let trip_id = self.inner.session.lock().await.trip_id;

        let Some(trip_id) = trip_id else {
            return;
        };

        self.flush_trip(trip_id).await;
    }

    /// The flush procedure: read everything buffered for the trip, upload it
    /// as one batch, and delete exactly the uploaded rows on acknowledgement.
    /// On failure the buffer is left untouched and the next attempt retries
    /// the same (possibly larger) set.
    async fn flush_trip(&self, trip_id: i64) {
        let _gate = self.inner.flush_gate.lock().await;

        let points = match self.inner.data.unsent_points(trip_id).await {
            Ok(points) => points,
            Err(err) => {
                tracing::error!("Failed to read buffered points for trip {}: {:?}", trip_id, err);
                return;
            }
        };

        if points.is_empty() {
            return;
        }

        let batch: Vec<LocationPoint> = points.iter().map(LocationPoint::from).collect();

        match self.inner.sync.upload_batch(trip_id, batch).await {
            Ok(()) => {
                let point_ids: Vec<i64> = points.iter().map(|point| point.point_id).collect();
                tracing::debug!("Uploaded {} points for trip {}", point_ids.len(), trip_id);

                if let Err(err) = self.inner.data.delete_points(&point_ids).await {
                    // Not fatal: the rows get re-uploaded and deleted on the
                    // next attempt, and the backend tolerates duplicates.
                    tracing::error!("Failed to delete {} uploaded points for trip {}: {:?}", point_ids.len(), trip_id, err);
                }
            }
            Err(err) => {
                tracing::warn!("Batch upload for trip {} failed, will retry: {:?}", trip_id, err);
            }
        }
    }

    /// Forced teardown when the location stream dies while recording. No
    /// flush happens here: there is no point racing a broken platform state,
    /// and the buffered rows are picked up by the recovery pass.
    async fn handle_subscription_loss(&self, trip_id: i64) {
        let mut session = self.inner.session.lock().await;

        if session.trip_id != Some(trip_id) {
            // A stop already won the race.
            return;
        }

        tracing::error!("Location subscription lost, tearing down tracking for trip {}", trip_id);

        session.sampler = None;
        if let Some(flusher) = session.flusher.take() {
            flusher.abort();
        }
        session.trip_id = None;

        self.inner.foreground.stop();
        self.inner.state.set_tracking(false);
    }
}
