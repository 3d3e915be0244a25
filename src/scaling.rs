use serde::{Deserialize, Serialize};

/// Fixed-point factor used for integer coordinates
pub const COORDINATE_SCALE: f64 = 1_000_000.0;

/// A coordinate pair stored as integer micro-degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScaledCoordinate {
    pub scaled_latitude: i64,
    pub scaled_longitude: i64,
}

impl ScaledCoordinate {
    /// Convert back to decimal degrees
    pub fn to_degrees(self) -> (f64, f64) {
        (
            unscale(self.scaled_latitude),
            unscale(self.scaled_longitude),
        )
    }
}

/// Scale a degree pair to micro-degrees.
///
/// Rounds to nearest with ties away from zero. Values are not range-checked;
/// validating the degrees is up to whoever produced them.
pub fn scale(latitude: f64, longitude: f64) -> ScaledCoordinate {
    ScaledCoordinate {
        scaled_latitude: scale_value(latitude),
        scaled_longitude: scale_value(longitude),
    }
}

pub fn scale_value(degrees: f64) -> i64 {
    (degrees * COORDINATE_SCALE).round() as i64
}

pub fn unscale(scaled: i64) -> f64 {
    scaled as f64 / COORDINATE_SCALE
}
