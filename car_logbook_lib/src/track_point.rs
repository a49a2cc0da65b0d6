use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};

/// A single GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub position: Point,
    pub timestamp: DateTime<Utc>,
}

impl TrackPoint {
    pub fn new(position: Point, timestamp: DateTime<Utc>) -> Self {
        Self {
            position,
            timestamp,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.position.y()
    }

    pub fn longitude(&self) -> f64 {
        self.position.x()
    }
}

/// One row of the local GPS point buffer. Immutable once written; rows are
/// only ever removed in bulk by id after the backend has acknowledged the
/// batch containing them.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferedPoint {
    pub point_id: i64,
    pub trip_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl BufferedPoint {
    pub fn track_point(&self) -> TrackPoint {
        TrackPoint::new(Point::new(self.longitude, self.latitude), self.timestamp)
    }
}
