use async_trait::async_trait;
use car_logbook_lib::{auth::{AuthRequest, AuthResponse}, trip::{LocationPoint, NoteUpdateRequest, TrackBatchRequest, TripDetailResponse, TripResponse, TripStartRequest}, vehicle::{VehicleRequest, VehicleResponse}};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::{TrackerError, config::TrackerConfig};

/// The one backend operation the tracking controller's flush needs. Callers
/// must not delete buffered rows unless this returns Ok; the client never
/// retries on its own, the next flush cycle does.
#[async_trait]
pub trait SyncClient: Send + Sync {
    async fn upload_batch(&self, trip_id: i64, points: Vec<LocationPoint>) -> Result<(), TrackerError>;
}

/// REST client for the logbook backend. Holds the session JWT and attaches
/// it as a bearer token to every request after login.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| TrackerError::Api(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    pub async fn has_session(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn clear_session(&self) {
        *self.token.write().await = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, TrackerError> {
        let request = match self.token.read().await.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await
            .map_err(|err| TrackerError::Api(format!("Request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(TrackerError::Api(format!("Server returned {}", response.status())));
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, TrackerError> {
        self.send(request).await?
            .json::<T>().await
            .map_err(|err| TrackerError::Api(format!("Failed to decode response: {err}")))
    }

    async fn authenticate(&self, path: &str, request: AuthRequest) -> Result<(), TrackerError> {
        let response: AuthResponse = self.send_json(
            self.client.post(self.url(path)).json(&request)
        ).await?;

        *self.token.write().await = Some(response.token);
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), TrackerError> {
        self.authenticate("/auth/login", AuthRequest {
            name: None,
            email: email.to_string(),
            password: password.to_string(),
        }).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), TrackerError> {
        self.authenticate("/auth/register", AuthRequest {
            name: Some(name.to_string()),
            email: email.to_string(),
            password: password.to_string(),
        }).await
    }

    pub async fn start_trip(&self, vehicle_id: i64) -> Result<TripResponse, TrackerError> {
        self.send_json(
            self.client.post(self.url("/api/trips/start"))
                .json(&TripStartRequest { vehicle_id })
        ).await
    }

    pub async fn end_trip(&self, trip_id: i64) -> Result<TripResponse, TrackerError> {
        self.send_json(self.client.post(self.url(&format!("/api/trips/{trip_id}/end")))).await
    }

    pub async fn get_trips(&self) -> Result<Vec<TripResponse>, TrackerError> {
        self.send_json(self.client.get(self.url("/api/trips"))).await
    }

    pub async fn get_trip_details(&self, trip_id: i64) -> Result<TripDetailResponse, TrackerError> {
        self.send_json(self.client.get(self.url(&format!("/api/trips/{trip_id}")))).await
    }

    pub async fn update_trip_notes(&self, trip_id: i64, notes: Option<String>) -> Result<TripResponse, TrackerError> {
        self.send_json(
            self.client.patch(self.url(&format!("/api/trips/{trip_id}")))
                .json(&NoteUpdateRequest { notes })
        ).await
    }

    pub async fn delete_trip(&self, trip_id: i64) -> Result<(), TrackerError> {
        self.send(self.client.delete(self.url(&format!("/api/trips/{trip_id}")))).await.map(|_| ())
    }

    /// Downloads the backend's CSV trips report. `filter_query` is appended
    /// verbatim (empty, or a query string such as "?vehicleId=3").
    pub async fn export_trips_csv(&self, filter_query: &str) -> Result<Vec<u8>, TrackerError> {
        let response = self.send(
            self.client.get(self.url(&format!("/api/trips/export{filter_query}")))
        ).await?;

        response.bytes().await
            .map(|bytes| bytes.to_vec())
            .map_err(|err| TrackerError::Api(format!("Failed to read trips report: {err}")))
    }

    pub async fn get_vehicles(&self) -> Result<Vec<VehicleResponse>, TrackerError> {
        self.send_json(self.client.get(self.url("/api/vehicles"))).await
    }

    pub async fn create_vehicle(&self, request: &VehicleRequest) -> Result<VehicleResponse, TrackerError> {
        self.send_json(self.client.post(self.url("/api/vehicles")).json(request)).await
    }

    pub async fn update_vehicle(&self, vehicle_id: i64, request: &VehicleRequest) -> Result<VehicleResponse, TrackerError> {
        self.send_json(self.client.put(self.url(&format!("/api/vehicles/{vehicle_id}"))).json(request)).await
    }

    pub async fn delete_vehicle(&self, vehicle_id: i64) -> Result<(), TrackerError> {
        self.send(self.client.delete(self.url(&format!("/api/vehicles/{vehicle_id}")))).await.map(|_| ())
    }
}

#[async_trait]
impl SyncClient for ApiClient {
    async fn upload_batch(&self, trip_id: i64, points: Vec<LocationPoint>) -> Result<(), TrackerError> {
        self.send(
            self.client.post(self.url(&format!("/api/trips/{trip_id}/track")))
                .json(&TrackBatchRequest { points })
        ).await.map(|_| ())
    }
}
