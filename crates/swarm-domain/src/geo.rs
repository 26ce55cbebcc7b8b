//! Spherical geodesy used by the flight model.
//!
//! All public functions take and return degrees; radians only appear
//! inside the computations.

use crate::Waypoint;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points (Haversine formula), in meters.
#[must_use]
pub fn haversine_m(from: Waypoint, to: Waypoint) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from `from` toward `to`, normalized to [0, 360).
#[must_use]
pub fn initial_bearing_deg(from: Waypoint, to: Waypoint) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

    (y.atan2(x).to_degrees() + 360.0).rem_euclid(360.0)
}

/// Point reached by traveling `distance_m` along `bearing_deg` from `from`.
#[must_use]
pub fn destination_point(from: Waypoint, bearing_deg: f64, distance_m: f64) -> Waypoint {
    let lat1 = from.lat.to_radians();
    let lng1 = from.lng.to_radians();
    let bearing = bearing_deg.to_radians();
    let angular = distance_m / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lng2 = lng1
        + (bearing.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    Waypoint {
        lat: lat2.to_degrees(),
        lng: lng2.to_degrees(),
    }
}

/// Advance `distance_m` from `from` along the direct great circle toward `to`.
#[must_use]
pub fn move_toward(from: Waypoint, to: Waypoint, distance_m: f64) -> Waypoint {
    destination_point(from, initial_bearing_deg(from, to), distance_m)
}
