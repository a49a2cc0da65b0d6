#![allow(dead_code)]

pub const GPS_BUFFER_TABLE_NAME: &str = "GpsPointsBuffer";
pub const POINT_ID: &str = "point_id";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const TIMESTAMP: &str = "timestamp";

pub const TRIPS_TABLE_NAME: &str = "Trips";
pub const TRIP_ID: &str = "trip_id";
pub const START_TIME: &str = "start_time";
pub const END_TIME: &str = "end_time";
pub const TOTAL_DISTANCE_KM: &str = "total_distance_km";
pub const TOTAL_FUEL_CONSUMED_L: &str = "total_fuel_consumed_l";
pub const VEHICLE_NAME: &str = "vehicle_name";
pub const NOTES: &str = "notes";

pub const VEHICLES_TABLE_NAME: &str = "Vehicles";
pub const VEHICLE_ID: &str = "vehicle_id";
pub const MAKE: &str = "make";
pub const MODEL: &str = "model";
pub const YEAR: &str = "year";
