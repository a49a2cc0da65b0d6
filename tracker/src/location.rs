use std::time::Duration;

use async_trait::async_trait;
use car_logbook_lib::track_point::TrackPoint;
use geo_types::Point;
use tokio::sync::mpsc;

use crate::TrackerError;

/// A platform location provider. Subscribing yields a stream of fixes at
/// roughly the requested interval; the sender side dropping means the
/// subscription was lost (permission revoked, provider gone) and cannot be
/// resumed from here.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn subscribe(&self, interval: Duration) -> Result<mpsc::Receiver<TrackPoint>, TrackerError>;
}

/// A jittered random walk from a fixed starting point. Stands in for a real
/// location provider in the simulator binary.
pub struct SimulatedLocationSource {
    start: Point,
}

impl SimulatedLocationSource {
    pub fn new(start: Point) -> Self {
        Self {
            start,
        }
    }
}

#[async_trait]
impl LocationSource for SimulatedLocationSource {
    async fn subscribe(&self, interval: Duration) -> Result<mpsc::Receiver<TrackPoint>, TrackerError> {
        let (tx, rx) = mpsc::channel(32);
        let mut position = self.start;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                position = Point::new(
                    position.x() + (rand::random::<f64>() - 0.5) * 1e-4,
                    position.y() + (rand::random::<f64>() - 0.5) * 1e-4,
                );
                if tx.send(TrackPoint::new(position, chrono::Utc::now())).await.is_err() {
                    // Subscriber went away, stop sampling.
                    break;
                }
            }
        });

        Ok(rx)
    }
}
