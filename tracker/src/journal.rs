use std::sync::Arc;

use car_logbook_data_management::DataManager;
use car_logbook_lib::{trip::{CachedTrip, TripDetailResponse, TripResponse}, vehicle::{CachedVehicle, VehicleRequest, VehicleResponse}};

use crate::{TrackerError, api::ApiClient};

/// Read-through journal of past trips: reads are served from the local cache,
/// refreshes and write-throughs go to the backend.
pub struct TripJournal {
    api: Arc<ApiClient>,
    data: DataManager,
}

impl TripJournal {
    pub fn new(api: Arc<ApiClient>, data: DataManager) -> Self {
        Self {
            api,
            data,
        }
    }

    /// Pulls the trip list from the backend into the cache. A network error
    /// is absorbed; the cache keeps serving the last good copy.
    pub async fn refresh(&self) {
        match self.api.get_trips().await {
            Ok(trips) => {
                let cached: Vec<CachedTrip> = trips.iter().map(CachedTrip::from).collect();
                if let Err(err) = self.data.cache_trips(&cached).await {
                    tracing::error!("Failed to cache refreshed trips: {:?}", err);
                }
            }
            Err(err) => {
                tracing::warn!("Journal refresh failed, serving cached trips: {:?}", err);
            }
        }
    }

    pub async fn trips(&self) -> Result<Vec<CachedTrip>, TrackerError> {
        Ok(self.data.cached_trips().await?)
    }

    /// Starts a trip on the backend; its id becomes the tracking trip id.
    pub async fn start_trip(&self, vehicle_id: i64) -> Result<TripResponse, TrackerError> {
        let trip = self.api.start_trip(vehicle_id).await?;
        self.data.cache_trips(&[CachedTrip::from(&trip)]).await?;
        Ok(trip)
    }

    /// Ends the trip; the backend responds with the recomputed totals.
    pub async fn end_trip(&self, trip_id: i64) -> Result<TripResponse, TrackerError> {
        let trip = self.api.end_trip(trip_id).await?;
        self.data.cache_trips(&[CachedTrip::from(&trip)]).await?;
        Ok(trip)
    }

    /// Route points are too big to cache, so details always hit the network.
    pub async fn trip_details(&self, trip_id: i64) -> Result<TripDetailResponse, TrackerError> {
        self.api.get_trip_details(trip_id).await
    }

    pub async fn update_notes(&self, trip_id: i64, notes: Option<String>) -> Result<TripResponse, TrackerError> {
        let trip = self.api.update_trip_notes(trip_id, notes).await?;
        self.data.cache_trips(&[CachedTrip::from(&trip)]).await?;
        Ok(trip)
    }

    pub async fn delete_trip(&self, trip_id: i64) -> Result<(), TrackerError> {
        self.api.delete_trip(trip_id).await?;
        self.data.evict_trip(trip_id).await?;
        Ok(())
    }
}

/// Same read-through pattern for the user's vehicles.
pub struct VehicleGarage {
    api: Arc<ApiClient>,
    data: DataManager,
}

impl VehicleGarage {
    pub fn new(api: Arc<ApiClient>, data: DataManager) -> Self {
        Self {
            api,
            data,
        }
    }

    /// Replaces the cache with the backend's vehicle list, so vehicles
    /// deleted elsewhere drop out too. A network error is absorbed and the
    /// cache keeps serving the last good copy.
    pub async fn refresh(&self) {
        match self.api.get_vehicles().await {
            Ok(vehicles) => {
                let cached: Vec<CachedVehicle> = vehicles.iter().map(CachedVehicle::from).collect();
                if let Err(err) = self.data.replace_vehicles(&cached).await {
                    tracing::error!("Failed to cache refreshed vehicles: {:?}", err);
                }
            }
            Err(err) => {
                tracing::warn!("Vehicle refresh failed, serving cached vehicles: {:?}", err);
            }
        }
    }

    pub async fn vehicles(&self) -> Result<Vec<CachedVehicle>, TrackerError> {
        Ok(self.data.cached_vehicles().await?)
    }

    pub async fn create_vehicle(&self, request: &VehicleRequest) -> Result<VehicleResponse, TrackerError> {
        let vehicle = self.api.create_vehicle(request).await?;
        self.data.cache_vehicles(&[CachedVehicle::from(&vehicle)]).await?;
        Ok(vehicle)
    }

    pub async fn update_vehicle(&self, vehicle_id: i64, request: &VehicleRequest) -> Result<VehicleResponse, TrackerError> {
        let vehicle = self.api.update_vehicle(vehicle_id, request).await?;
        self.data.cache_vehicles(&[CachedVehicle::from(&vehicle)]).await?;
        Ok(vehicle)
    }

    pub async fn delete_vehicle(&self, vehicle_id: i64) -> Result<(), TrackerError> {
        self.api.delete_vehicle(vehicle_id).await?;
        self.data.evict_vehicle(vehicle_id).await?;
        Ok(())
    }
}
