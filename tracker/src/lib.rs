use car_logbook_data_management::DataManagerError;

pub mod api;
pub mod config;
pub mod controller;
pub mod foreground;
pub mod gpx_util;
pub mod journal;
pub mod location;
pub mod state;

#[derive(Debug)]
pub enum TrackerError {
    Api(String),
    Location(String),
    Storage(String),
}

impl From<DataManagerError> for TrackerError {
    fn from(err: DataManagerError) -> Self {
        TrackerError::Storage(format!("{err:?}"))
    }
}
