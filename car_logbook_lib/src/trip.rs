use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::track_point::BufferedPoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStartRequest {
    pub vehicle_id: i64,
}

/// One fix as it goes over the wire in a track batch. Timestamps are epoch
/// milliseconds, matching what the backend stores for route points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl From<&BufferedPoint> for LocationPoint {
    fn from(point: &BufferedPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            timestamp: point.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackBatchRequest {
    pub points: Vec<LocationPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripResponse {
    pub id: i64,
    pub start_time: String,
    pub end_time: Option<String>,
    pub total_distance_km: Option<f64>,
    pub total_fuel_consumed_l: Option<f64>,
    pub vehicle_id: i64,
    pub vehicle_name: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPointResponse {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Full trip record with the server-computed cost breakdown and route. Only
/// ever fetched from the network, never cached (route points are too big).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetailResponse {
    pub id: i64,
    pub start_time: String,
    pub end_time: Option<String>,
    pub notes: Option<String>,
    pub vehicle_name: String,
    pub fuel_type: String,

    pub total_distance_km: f64,
    pub avg_consumption: f64,
    pub total_fuel_consumed_l: f64,
    pub price_per_liter: f64,
    pub total_cost: f64,

    pub route_points: Vec<LocationPointResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdateRequest {
    pub notes: Option<String>,
}

/// Journal cache row, refreshed from the backend's trip list.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedTrip {
    pub trip_id: i64,
    pub start_time: String,
    pub end_time: Option<String>,
    pub total_distance_km: Option<f64>,
    pub total_fuel_consumed_l: Option<f64>,
    pub vehicle_id: i64,
    pub vehicle_name: String,
    pub notes: Option<String>,
}

impl From<&TripResponse> for CachedTrip {
    fn from(response: &TripResponse) -> Self {
        Self {
            trip_id: response.id,
            start_time: response.start_time.clone(),
            end_time: response.end_time.clone(),
            total_distance_km: response.total_distance_km,
            total_fuel_consumed_l: response.total_fuel_consumed_l,
            vehicle_id: response.vehicle_id,
            vehicle_name: response.vehicle_name.clone(),
            notes: response.notes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn location_point_uses_epoch_millis() {
        let point = LocationPoint {
            latitude: 50.45,
            longitude: 30.52,
            timestamp: chrono::Utc.timestamp_millis_opt(1700000000123).unwrap(),
        };

        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["timestamp"], 1700000000123i64);

        let back: LocationPoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn trip_response_uses_camel_case() {
        let json = r#"{
            "id": 7,
            "startTime": "2025-03-01T10:00:00Z",
            "endTime": null,
            "totalDistanceKm": null,
            "totalFuelConsumedL": null,
            "vehicleId": 3,
            "vehicleName": "Lanos",
            "notes": null
        }"#;

        let trip: TripResponse = serde_json::from_str(json).unwrap();
        assert_eq!(trip.id, 7);
        assert_eq!(trip.vehicle_id, 3);
        assert!(trip.end_time.is_none());
    }
}
