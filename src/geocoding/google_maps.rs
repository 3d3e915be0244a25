use anyhow::{Result, anyhow};
use async_trait::async_trait;
use google_maps::Client as GoogleMapsClient;
use google_maps::geocoding::{Error as GeocodingError, Geocoding, Response};
use google_maps::{LatLng, PlaceType};
use num_traits::ToPrimitive;
use std::time::Duration;
use tracing::{debug, info};

use super::{BoundingBox, ForwardGeocoder, Lookup, Place, ProviderExtras, ProviderId, into_lookup};

/// Google Maps forward geocoder. Disabled when no API key is configured.
pub struct GoogleMapsGeocoderClient {
    client: Option<GoogleMapsClient>,
    timeout: Duration,
}

fn to_degrees(location: &LatLng) -> Result<(f64, f64)> {
    let latitude = location
        .latitude()
        .to_f64()
        .ok_or_else(|| anyhow!("Failed to convert latitude to f64"))?;
    let longitude = location
        .longitude()
        .to_f64()
        .ok_or_else(|| anyhow!("Failed to convert longitude to f64"))?;
    Ok((latitude, longitude))
}

fn bounding_box(northeast: &LatLng, southwest: &LatLng) -> Option<BoundingBox> {
    let (north, east) = to_degrees(northeast).ok()?;
    let (south, west) = to_degrees(southwest).ok()?;
    Some(BoundingBox {
        north,
        south,
        east,
        west,
    })
}

impl GoogleMapsGeocoderClient {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        debug!("Initializing Google Maps geocoding client");
        let client = GoogleMapsClient::try_new(api_key)
            .map_err(|e| anyhow!("Failed to create Google Maps client: {}", e))?;
        Ok(Self {
            client: Some(client),
            timeout,
        })
    }

    /// A client with no API key; every lookup reports the provider as unavailable
    pub fn disabled() -> Self {
        Self {
            client: None,
            timeout: Duration::ZERO,
        }
    }

    async fn request(
        &self,
        client: &GoogleMapsClient,
        address: &str,
    ) -> Result<Option<(Place, ProviderExtras)>> {
        debug!("Geocoding address with Google Maps: {}", address);

        let outcome = tokio::time::timeout(
            self.timeout,
            client.geocoding().with_address(address).execute(),
        )
        .await
        .map_err(|_| anyhow!("Google Maps geocoding request timed out after {:?}", self.timeout))?;

        interpret_response(outcome)
    }
}

/// First match of a geocoding call, `None` when Google found nothing
fn interpret_response(
    outcome: std::result::Result<Response, google_maps::Error>,
) -> Result<Option<(Place, ProviderExtras)>> {
    let response = match outcome {
        Ok(response) => response,
        // The client reports a ZERO_RESULTS status as an error
        Err(google_maps::Error::Geocoding(GeocodingError::ZeroResults)) => return Ok(None),
        Err(e) => return Err(anyhow!("Google Maps geocoding request failed: {}", e)),
    };

    response.results.first().map(place_from_result).transpose()
}

/// Normalize one Google geocoding result
fn place_from_result(result: &Geocoding) -> Result<(Place, ProviderExtras)> {
    let (latitude, longitude) = to_degrees(&result.geometry.location)?;

    let mut country = None;
    let mut country_code = None;
    let mut state = None;

    for component in &result.address_components {
        let types = &component.types;
        if types.contains(&PlaceType::Country) {
            country = Some(component.long_name.clone());
            country_code = Some(component.short_name.clone());
        } else if types.contains(&PlaceType::AdministrativeAreaLevel1) {
            state = Some(component.long_name.clone());
        }
    }

    let place = Place::new(
        latitude,
        longitude,
        result.formatted_address.clone(),
        country,
        country_code,
        state,
    )?;

    let geometry = &result.geometry;
    let extras = ProviderExtras::Google {
        place_id: result.place_id.clone(),
        bounds: geometry
            .bounds
            .as_ref()
            .and_then(|b| bounding_box(&b.northeast, &b.southwest)),
        viewport: bounding_box(&geometry.viewport.northeast, &geometry.viewport.southwest),
    };

    Ok((place, extras))
}

#[async_trait]
impl ForwardGeocoder for GoogleMapsGeocoderClient {
    fn provider(&self) -> ProviderId {
        ProviderId::Google
    }

    async fn geocode(&self, address: &str) -> Lookup {
        let Some(client) = &self.client else {
            info!("Google Maps API key not configured");
            return Lookup::Unavailable("Google Maps API key not configured".to_string());
        };

        let outcome = self.request(client, address).await;
        into_lookup(ProviderId::Google, address, outcome, || {
            "Google API status: ZERO_RESULTS".to_string()
        })
    }
}
