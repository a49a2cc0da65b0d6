use std::path::Path;

use car_logbook_lib::{track_point::{BufferedPoint, TrackPoint}, trip::CachedTrip, vehicle::CachedVehicle};

use crate::{database::db::LogbookDatabase, DataManagerError};

#[derive(Clone)]
pub struct DataManager {
    pub(crate) database: LogbookDatabase,
}

/// The public interface for all local logbook data: the durable GPS point
/// buffer and the read-through trip/vehicle cache.
impl DataManager {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DataManagerError> {
        // Create the parent dir if it doesn't exist
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|_| DataManagerError::Database(format!("Failed to create data directory: {:?}", parent)))?;
            }
        }

        let database = LogbookDatabase::connect(path).await?;

        Ok(DataManager {
            database,
        })
    }

    pub async fn open_in_memory() -> Result<Self, DataManagerError> {
        let database = LogbookDatabase::connect_in_memory().await?;

        Ok(DataManager {
            database,
        })
    }

    /// Durably buffers one fix for the given trip. A storage failure is
    /// logged and the fix is dropped; sampling must keep going either way.
    pub async fn buffer_point(&self, trip_id: i64, point: &TrackPoint) {
        if let Err(err) = self.database.append_point(trip_id, point).await {
            tracing::error!("Dropping fix for trip {}: {:?}", trip_id, err);
        }
    }

    pub async fn unsent_points(&self, trip_id: i64) -> Result<Vec<BufferedPoint>, DataManagerError> {
        self.database.get_unsent_for_trip(trip_id).await
    }

    pub async fn unsent_point_count(&self, trip_id: i64) -> Result<i64, DataManagerError> {
        self.database.count_unsent_for_trip(trip_id).await
    }

    pub async fn unsent_trip_ids(&self) -> Result<Vec<i64>, DataManagerError> {
        self.database.unsent_trip_ids().await
    }

    pub async fn delete_points(&self, point_ids: &[i64]) -> Result<(), DataManagerError> {
        self.database.delete_points_by_ids(point_ids).await
    }

    pub async fn cache_trips(&self, trips: &[CachedTrip]) -> Result<(), DataManagerError> {
        for trip in trips {
            self.database.upsert_trip(trip).await?;
        }
        Ok(())
    }

    pub async fn cached_trips(&self) -> Result<Vec<CachedTrip>, DataManagerError> {
        self.database.get_trips().await
    }

    pub async fn cached_trip(&self, trip_id: i64) -> Result<Option<CachedTrip>, DataManagerError> {
        self.database.get_trip(trip_id).await
    }

    pub async fn evict_trip(&self, trip_id: i64) -> Result<(), DataManagerError> {
        self.database.delete_trip(trip_id).await
    }

    pub async fn cache_vehicles(&self, vehicles: &[CachedVehicle]) -> Result<(), DataManagerError> {
        for vehicle in vehicles {
            self.database.upsert_vehicle(vehicle).await?;
        }
        Ok(())
    }

    /// Makes the cache exactly the given set: vehicles deleted on the backend
    /// (possibly from another device) must disappear on the next refresh.
    pub async fn replace_vehicles(&self, vehicles: &[CachedVehicle]) -> Result<(), DataManagerError> {
        self.database.clear_vehicles().await?;
        self.cache_vehicles(vehicles).await
    }

    pub async fn cached_vehicles(&self) -> Result<Vec<CachedVehicle>, DataManagerError> {
        self.database.get_vehicles().await
    }

    pub async fn evict_vehicle(&self, vehicle_id: i64) -> Result<(), DataManagerError> {
        self.database.delete_vehicle(vehicle_id).await
    }
}
