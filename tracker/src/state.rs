use car_logbook_lib::track_point::TrackPoint;
use tokio::sync::watch;

/// Observable tracking state for the UI layer. Exactly one writer (the
/// tracking controller, through the crate-private setters); any number of
/// readers through the watch receivers.
///
/// `current_location` keeps the last known fix even after tracking stops; it
/// only resets when the process does.
pub struct TrackingState {
    is_tracking: watch::Sender<bool>,
    current_location: watch::Sender<Option<TrackPoint>>,
}

impl TrackingState {
    pub fn new() -> Self {
        Self {
            is_tracking: watch::Sender::new(false),
            current_location: watch::Sender::new(None),
        }
    }

    pub fn is_tracking(&self) -> bool {
        *self.is_tracking.borrow()
    }

    pub fn current_location(&self) -> Option<TrackPoint> {
        *self.current_location.borrow()
    }

    pub fn watch_tracking(&self) -> watch::Receiver<bool> {
        self.is_tracking.subscribe()
    }

    pub fn watch_location(&self) -> watch::Receiver<Option<TrackPoint>> {
        self.current_location.subscribe()
    }

    pub(crate) fn set_tracking(&self, tracking: bool) {
        self.is_tracking.send_replace(tracking);
    }

    pub(crate) fn set_location(&self, point: TrackPoint) {
        self.current_location.send_replace(Some(point));
    }
}

impl Default for TrackingState {
    fn default() -> Self {
        Self::new()
    }
}
