use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use super::{DispatchError, Params, failure, required, to_body};
use crate::distance::{DistanceResult, calculate_distance};
use crate::geocoding::{GeocodeResult, Geocoder};
use crate::scaling::scale;

const DISTANCE_SKIPPED_NOTE: &str =
    "Distance not calculated because one or both cities could not be geocoded";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TravelContext {
    pub from: String,
    pub to: String,
    pub summary: String,
}

/// Both lookups plus the distance between them when both succeeded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwoCityResult {
    pub success: bool,
    pub source: GeocodeResult,
    pub destination: GeocodeResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<DistanceResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_context: Option<TravelContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_error: Option<String>,
}

impl TwoCityResult {
    pub fn combine(source: GeocodeResult, destination: GeocodeResult) -> Self {
        let mut result = Self {
            success: false,
            source,
            destination,
            distance: None,
            travel_context: None,
            note: None,
            distance_error: None,
        };

        let (Some(from), Some(to)) = (&result.source.place, &result.destination.place) else {
            result.note = Some(DISTANCE_SKIPPED_NOTE.to_string());
            return result;
        };

        match calculate_distance(from.latitude, from.longitude, to.latitude, to.longitude) {
            Ok(distance) => {
                result.travel_context = Some(TravelContext {
                    from: from.formatted_address.clone(),
                    to: to.formatted_address.clone(),
                    summary: format!("From {} to {}", from.country, to.country),
                });
                result.distance = Some(distance);
                result.success = true;
            }
            Err(e) => {
                error!("Error calculating distance: {:#}", e);
                result.distance_error = Some(format!("{:#}", e));
            }
        }

        result
    }
}

/// A lookup together with its fixed-point coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledCoordinateResult {
    #[serde(flatten)]
    pub geocode: GeocodeResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled_latitude: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled_longitude: Option<i64>,
}

impl From<GeocodeResult> for ScaledCoordinateResult {
    fn from(geocode: GeocodeResult) -> Self {
        let scaled = geocode
            .place
            .as_ref()
            .map(|p| scale(p.latitude, p.longitude));
        Self {
            geocode,
            scaled_latitude: scaled.map(|s| s.scaled_latitude),
            scaled_longitude: scaled.map(|s| s.scaled_longitude),
        }
    }
}

/// Geocode two cities one after the other, source first
pub async fn locate_two_cities(
    geocoder: &Geocoder,
    source_city: &str,
    destination_city: &str,
) -> TwoCityResult {
    info!("Two cities request: {} -> {}", source_city, destination_city);
    let source = geocoder.resolve_with_fallback(source_city).await;
    let destination = geocoder.resolve_with_fallback(destination_city).await;
    TwoCityResult::combine(source, destination)
}

/// Handler for /getCityCoordinates
pub async fn city_coordinates(geocoder: &Geocoder, params: &Params) -> Result<Value, DispatchError> {
    let Some(city) = required(params, "cityName") else {
        return Ok(failure("cityName parameter is required"));
    };
    info!("Single city request: {}", city);
    to_body(&geocoder.resolve_with_fallback(city).await)
}

/// Handler for /getTwoCitiesCoordinates
pub async fn two_cities_coordinates(
    geocoder: &Geocoder,
    params: &Params,
) -> Result<Value, DispatchError> {
    let (Some(source), Some(destination)) = (
        required(params, "sourceCity"),
        required(params, "destinationCity"),
    ) else {
        return Ok(failure(
            "Both sourceCity and destinationCity parameters are required",
        ));
    };
    to_body(&locate_two_cities(geocoder, source, destination).await)
}

/// Handler for /getScaledCoordinates
pub async fn scaled_coordinates(
    geocoder: &Geocoder,
    params: &Params,
) -> Result<Value, DispatchError> {
    let Some(city) = required(params, "cityName") else {
        return Ok(failure("cityName parameter is required"));
    };
    let result = ScaledCoordinateResult::from(geocoder.resolve_with_fallback(city).await);
    to_body(&result)
}
