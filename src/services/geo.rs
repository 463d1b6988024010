//! Geographic calculations

use crate::types::Coordinates;

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Fixed minutes added to every trip (departure, parking, queueing)
const BASE_TRAVEL_MINUTES: f64 = 10.0;

/// Minutes per straight-line kilometer (conservative city traffic)
const MINUTES_PER_KM: f64 = 2.0;

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Estimate one-way travel time in minutes.
///
/// Straight-line proxy, not road routing: every schedule depends on these
/// constants, so changing them changes every downstream result.
pub fn travel_time_minutes(from: &Coordinates, to: &Coordinates) -> f64 {
    BASE_TRAVEL_MINUTES + MINUTES_PER_KM * haversine_distance(from, to)
}
