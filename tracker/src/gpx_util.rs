use std::io::Write;

use car_logbook_lib::trip::TripDetailResponse;
use gpx::{Gpx, GpxVersion, Metadata, Time, Track, TrackSegment, Waypoint};
use time::OffsetDateTime;

use crate::TrackerError;

/// Builds a GPX 1.1 document from a trip's server-side route.
pub fn route_to_gpx(trip: &TripDetailResponse) -> Gpx {
    let mut segment = TrackSegment::new();

    for point in &trip.route_points {
        let mut waypoint = Waypoint::new(geo_types::Point::new(point.longitude, point.latitude));
        waypoint.time = OffsetDateTime::from_unix_timestamp_nanos(point.timestamp.timestamp_millis() as i128 * 1_000_000)
            .ok()
            .map(Time::from);
        segment.points.push(waypoint);
    }

    let mut track = Track::new();
    track.name = Some(format!("{} {}", trip.vehicle_name, trip.start_time));
    track.segments.push(segment);

    let mut metadata = Metadata::default();
    metadata.name = Some(format!("Trip {}", trip.id));

    let mut gpx = Gpx::default();
    gpx.version = GpxVersion::Gpx11;
    gpx.creator = Some("car_logbook".to_string());
    gpx.metadata = Some(metadata);
    gpx.tracks.push(track);

    gpx
}

pub fn write_gpx<W: Write>(trip: &TripDetailResponse, writer: W) -> Result<(), TrackerError> {
    gpx::write(&route_to_gpx(trip), writer)
        .map_err(|err| TrackerError::Storage(format!("Failed to write GPX: {err}")))
}
