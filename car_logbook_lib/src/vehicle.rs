use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRequest {
    pub make: String,
    pub model: String,
    pub year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleResponse {
    pub id: i64,
    pub make: String,
    pub model: String,
    pub year: i32,
}

/// Garage cache row.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedVehicle {
    pub vehicle_id: i64,
    pub make: String,
    pub model: String,
    pub year: i32,
}

impl CachedVehicle {
    pub fn display_name(&self) -> String {
        format!("{} {} ({})", self.make, self.model, self.year)
    }
}

impl From<&VehicleResponse> for CachedVehicle {
    fn from(response: &VehicleResponse) -> Self {
        Self {
            vehicle_id: response.id,
            make: response.make.clone(),
            model: response.model.clone(),
            year: response.year,
        }
    }
}
