use anyhow::{Result, anyhow};
use serde::Serialize;
use std::fmt;
use tracing::{error, info};

/// Mean Earth radius used by the haversine formula
const EARTH_RADIUS_KM: f64 = 6371.0;
const KM_TO_MILES: f64 = 0.621371;

const STRAIGHT_LINE_NOTE: &str =
    "This is the straight-line (as the crow flies) distance, not driving distance";

/// Eight-point compass direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Direction {
    const SECTORS: [Direction; 8] = [
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    /// Sector for a bearing in degrees; each sector is 45° wide and centered on its heading
    pub fn from_bearing(bearing_degrees: f64) -> Self {
        let index = (bearing_degrees / 45.0).round().rem_euclid(8.0) as usize;
        Self::SECTORS[index]
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceResult {
    pub distance_km: f64,
    pub distance_miles: f64,
    pub straight_line: bool,
    pub bearing_degrees: f64,
    pub direction: Direction,
    pub note: &'static str,
}

/// Great-circle distance in kilometers using the Haversine formula
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1 for near-antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Initial compass bearing from point 1 to point 2, in [0, 360)
pub fn initial_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let y = delta_lon.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Distance, bearing, and direction between two coordinates.
///
/// Identical points give a distance of 0 and a bearing of 0 (north).
/// Output is rounded to 0.01 km, so points less than about 5 m apart also
/// report 0 km; [`haversine_km`] keeps the unrounded value.
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<DistanceResult> {
    if ![lat1, lon1, lat2, lon2].iter().all(|v| v.is_finite()) {
        error!(lat1, lon1, lat2, lon2, "Distance calculation received non-finite input");
        return Err(anyhow!(
            "Failed to calculate distance: coordinates must be finite numbers, got ({}, {}) -> ({}, {})",
            lat1,
            lon1,
            lat2,
            lon2
        ));
    }

    let distance_km = haversine_km(lat1, lon1, lat2, lon2);
    let bearing = initial_bearing(lat1, lon1, lat2, lon2);

    if !distance_km.is_finite() || !bearing.is_finite() {
        error!(lat1, lon1, lat2, lon2, "Distance calculation produced a non-finite result");
        return Err(anyhow!(
            "Failed to calculate distance: result is not a finite number"
        ));
    }

    let direction = Direction::from_bearing(bearing);

    // 359.996 would otherwise print as 360.00
    let mut bearing_degrees = round2(bearing);
    if bearing_degrees >= 360.0 {
        bearing_degrees = 0.0;
    }

    let result = DistanceResult {
        distance_km: round2(distance_km),
        distance_miles: round2(distance_km * KM_TO_MILES),
        straight_line: true,
        bearing_degrees,
        direction,
        note: STRAIGHT_LINE_NOTE,
    };

    info!(
        distance_km = result.distance_km,
        bearing_degrees = result.bearing_degrees,
        direction = %result.direction,
        "Distance calculated"
    );

    Ok(result)
}
