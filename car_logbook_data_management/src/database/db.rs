use std::path::Path;

use car_logbook_lib::{track_point::{BufferedPoint, TrackPoint}, trip::CachedTrip, vehicle::CachedVehicle};
use const_format::concatcp;
use sqlx::{query, query_as, sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Executor, Pool, Sqlite, SqlitePool};

use crate::DataManagerError;

use super::constants::*;

#[derive(Clone)]
pub struct LogbookDatabase {
    pool: Pool<Sqlite>,
}

impl LogbookDatabase {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await
            .map_err(|_| DataManagerError::Database("Failed to connect to database".to_string()))?;

        let db = Self {
            pool
        };

        db.init().await?;

        Ok(db)
    }

    /// A single-connection in-memory database. More than one connection would
    /// mean more than one (empty) in-memory database.
    pub async fn connect_in_memory() -> Result<Self, DataManagerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().in_memory(true)).await
            .map_err(|_| DataManagerError::Database("Failed to open in-memory database".to_string()))?;

        let db = Self {
            pool
        };

        db.init().await?;

        Ok(db)
    }

    async fn init(&self) -> Result<(), DataManagerError> {
        self.pool.execute(concatcp!("
            CREATE TABLE IF NOT EXISTS ", GPS_BUFFER_TABLE_NAME, "(",
                POINT_ID,  " INTEGER PRIMARY KEY AUTOINCREMENT,",
                TRIP_ID,   " INTEGER NOT NULL,",
                LATITUDE,  " REAL NOT NULL,",
                LONGITUDE, " REAL NOT NULL,",
                TIMESTAMP, " TIMESTAMP NOT NULL);

            CREATE TABLE IF NOT EXISTS ", TRIPS_TABLE_NAME, "(",
                TRIP_ID,               " INTEGER PRIMARY KEY,",
                START_TIME,            " TEXT NOT NULL,",
                END_TIME,              " TEXT,",
                TOTAL_DISTANCE_KM,     " REAL,",
                TOTAL_FUEL_CONSUMED_L, " REAL,",
                VEHICLE_ID,            " INTEGER NOT NULL,",
                VEHICLE_NAME,          " TEXT NOT NULL,",
                NOTES,                 " TEXT);

            CREATE TABLE IF NOT EXISTS ", VEHICLES_TABLE_NAME, "(",
                VEHICLE_ID, " INTEGER PRIMARY KEY,",
                MAKE,       " TEXT NOT NULL,",
                MODEL,      " TEXT NOT NULL,",
                YEAR,       " INTEGER NOT NULL)"))
            .await
            .map_err(|_| DataManagerError::Database("Failed to initialize database schema".to_string()))
            .map(|_| ())
    }

    /// Appends a fix to the buffer with a fresh auto-assigned row id.
    pub async fn append_point(&self, trip_id: i64, point: &TrackPoint) -> Result<BufferedPoint, DataManagerError> {
        let point_id = query_as::<_, (i64,)>(concatcp!("
            INSERT INTO ", GPS_BUFFER_TABLE_NAME, "(",
            POINT_ID, ", ", TRIP_ID, ", ", LATITUDE, ", ", LONGITUDE, ", ", TIMESTAMP, ")
            VALUES (NULL, ?1, ?2, ?3, ?4) RETURNING ", POINT_ID))
                .bind(trip_id)
                .bind(point.latitude())
                .bind(point.longitude())
                .bind(point.timestamp)
                .fetch_one(&self.pool).await
                .map_err(|_| DataManagerError::Database("Failed to append point to buffer".to_string()))
                .map(|row| row.0)?;

        Ok(BufferedPoint {
            point_id,
            trip_id,
            latitude: point.latitude(),
            longitude: point.longitude(),
            timestamp: point.timestamp,
        })
    }

    /// Inserts a row with an explicit id; a colliding id replaces the row.
    pub async fn insert_buffered(&self, point: &BufferedPoint) -> Result<(), DataManagerError> {
        query(concatcp!("
            INSERT OR REPLACE INTO ", GPS_BUFFER_TABLE_NAME, "(",
            POINT_ID, ", ", TRIP_ID, ", ", LATITUDE, ", ", LONGITUDE, ", ", TIMESTAMP, ")
            VALUES (?1, ?2, ?3, ?4, ?5)"))
                .bind(point.point_id)
                .bind(point.trip_id)
                .bind(point.latitude)
                .bind(point.longitude)
                .bind(point.timestamp)
                .execute(&self.pool).await
                .map_err(|_| DataManagerError::Database("Failed to insert point into buffer".to_string()))
                .map(|_| ())
    }

    pub async fn get_unsent_for_trip(&self, trip_id: i64) -> Result<Vec<BufferedPoint>, DataManagerError> {
        query_as::<_, BufferedPoint>(concatcp!("SELECT * FROM ", GPS_BUFFER_TABLE_NAME, " WHERE ", TRIP_ID, " = ?1 ORDER BY ", POINT_ID))
            .bind(trip_id)
            .fetch_all(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to read unsent points".to_string()))
    }

    pub async fn count_unsent_for_trip(&self, trip_id: i64) -> Result<i64, DataManagerError> {
        query_as::<_, (i64,)>(concatcp!("SELECT COUNT(*) FROM ", GPS_BUFFER_TABLE_NAME, " WHERE ", TRIP_ID, " = ?1"))
            .bind(trip_id)
            .fetch_one(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to count unsent points".to_string()))
            .map(|row| row.0)
    }

    /// Trips that still have buffered rows. Non-empty after a failed final
    /// flush; drives the recovery pass on the next start.
    pub async fn unsent_trip_ids(&self) -> Result<Vec<i64>, DataManagerError> {
        query_as::<_, (i64,)>(concatcp!("SELECT DISTINCT ", TRIP_ID, " FROM ", GPS_BUFFER_TABLE_NAME, " ORDER BY ", TRIP_ID))
            .fetch_all(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to read buffered trip ids".to_string()))
            .map(|rows| rows.into_iter().map(|row| row.0).collect())
    }

    /// Deletes exactly the given rows. An empty id set is a no-op.
    pub async fn delete_points_by_ids(&self, point_ids: &[i64]) -> Result<(), DataManagerError> {
        if point_ids.is_empty() {
            return Ok(());
        }

        let id_list = point_ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<String>>()
            .join(", ");

        query(&format!("DELETE FROM {} WHERE {} IN ({})", GPS_BUFFER_TABLE_NAME, POINT_ID, id_list))
            .execute(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to delete uploaded points".to_string()))
            .map(|_| ())
    }

    pub async fn upsert_trip(&self, trip: &CachedTrip) -> Result<(), DataManagerError> {
        query(concatcp!("
            INSERT OR REPLACE INTO ", TRIPS_TABLE_NAME, "(",
            TRIP_ID, ", ", START_TIME, ", ", END_TIME, ", ", TOTAL_DISTANCE_KM, ", ",
            TOTAL_FUEL_CONSUMED_L, ", ", VEHICLE_ID, ", ", VEHICLE_NAME, ", ", NOTES, ")
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"))
                .bind(trip.trip_id)
                .bind(&trip.start_time)
                .bind(&trip.end_time)
                .bind(trip.total_distance_km)
                .bind(trip.total_fuel_consumed_l)
                .bind(trip.vehicle_id)
                .bind(&trip.vehicle_name)
                .bind(&trip.notes)
                .execute(&self.pool).await
                .map_err(|_| DataManagerError::Database("Failed to upsert trip".to_string()))
                .map(|_| ())
    }

    pub async fn get_trips(&self) -> Result<Vec<CachedTrip>, DataManagerError> {
        query_as::<_, CachedTrip>(concatcp!("SELECT * FROM ", TRIPS_TABLE_NAME, " ORDER BY ", START_TIME, " DESC"))
            .fetch_all(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to get trips".to_string()))
    }

    pub async fn get_trip(&self, trip_id: i64) -> Result<Option<CachedTrip>, DataManagerError> {
        query_as::<_, CachedTrip>(concatcp!("SELECT * FROM ", TRIPS_TABLE_NAME, " WHERE ", TRIP_ID, " = ?1"))
            .bind(trip_id)
            .fetch_optional(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to get trip".to_string()))
    }

    pub async fn delete_trip(&self, trip_id: i64) -> Result<(), DataManagerError> {
        query(concatcp!("DELETE FROM ", TRIPS_TABLE_NAME, " WHERE ", TRIP_ID, " = ?1"))
            .bind(trip_id)
            .execute(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to delete trip".to_string()))
            .map(|_| ())
    }

    pub async fn upsert_vehicle(&self, vehicle: &CachedVehicle) -> Result<(), DataManagerError> {
        query(concatcp!("
            INSERT OR REPLACE INTO ", VEHICLES_TABLE_NAME, "(",
            VEHICLE_ID, ", ", MAKE, ", ", MODEL, ", ", YEAR, ")
            VALUES (?1, ?2, ?3, ?4)"))
                .bind(vehicle.vehicle_id)
                .bind(&vehicle.make)
                .bind(&vehicle.model)
                .bind(vehicle.year)
                .execute(&self.pool).await
                .map_err(|_| DataManagerError::Database("Failed to upsert vehicle".to_string()))
                .map(|_| ())
    }

    pub async fn clear_vehicles(&self) -> Result<(), DataManagerError> {
        query(concatcp!("DELETE FROM ", VEHICLES_TABLE_NAME))
            .execute(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to clear vehicles".to_string()))
            .map(|_| ())
    }

    pub async fn get_vehicles(&self) -> Result<Vec<CachedVehicle>, DataManagerError> {
        query_as::<_, CachedVehicle>(concatcp!("SELECT * FROM ", VEHICLES_TABLE_NAME, " ORDER BY ", VEHICLE_ID))
            .fetch_all(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to get vehicles".to_string()))
    }

    pub async fn delete_vehicle(&self, vehicle_id: i64) -> Result<(), DataManagerError> {
        query(concatcp!("DELETE FROM ", VEHICLES_TABLE_NAME, " WHERE ", VEHICLE_ID, " = ?1"))
            .bind(vehicle_id)
            .execute(&self.pool).await
            .map_err(|_| DataManagerError::Database("Failed to delete vehicle".to_string()))
            .map(|_| ())
    }
}
