pub mod auth;
pub mod track_point;
pub mod trip;
pub mod vehicle;
