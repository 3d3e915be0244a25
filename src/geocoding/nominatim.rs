use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

use super::{BoundingBox, ForwardGeocoder, Lookup, Place, ProviderExtras, ProviderId, into_lookup};

// Nominatim API response structure
#[derive(Debug, Deserialize)]
struct NominatimResponse {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    importance: Option<f64>,
    #[serde(default)]
    osm_type: Option<String>,
    #[serde(default)]
    osm_id: Option<i64>,
    #[serde(default)]
    place_rank: Option<u32>,
    /// `[south, north, west, east]` as strings
    #[serde(default)]
    boundingbox: Option<Vec<String>>,
    #[serde(default)]
    address: NominatimAddress,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
}

fn parse_bounding_box(raw: &[String]) -> Option<BoundingBox> {
    let values: Vec<f64> = raw.iter().filter_map(|v| v.parse().ok()).collect();
    match values.as_slice() {
        [south, north, west, east] => Some(BoundingBox {
            north: *north,
            south: *south,
            east: *east,
            west: *west,
        }),
        _ => None,
    }
}

/// Nominatim (OpenStreetMap) forward geocoder. Needs no API key but requires a
/// descriptive `User-Agent`.
#[derive(Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl NominatimClient {
    pub fn new(client: reqwest::Client, base_url: String, user_agent: String) -> Self {
        Self {
            client,
            base_url,
            user_agent,
        }
    }

    async fn request(&self, query: &str) -> Result<Option<(Place, ProviderExtras)>> {
        debug!("Geocoding address with Nominatim: {}", query);

        let url = format!("{}/search", self.base_url);

        let params = [
            ("q", query),
            ("format", "json"),
            ("limit", "1"),
            ("addressdetails", "1"),
        ];

        let response = self
            .client
            .get(&url)
            .query(&params)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send geocoding request: {}", e))?;

        let status = response.status();

        // Nominatim answers 403 when its usage policy is violated
        if status == reqwest::StatusCode::FORBIDDEN {
            error!(city = %query, "Nominatim geocoding request forbidden (403) - possible rate limit violation");
            return Err(anyhow!(
                "Nominatim geocoding request forbidden (403) for '{}'",
                query
            ));
        }

        if !status.is_success() {
            return Err(anyhow!(
                "Nominatim geocoding request failed with status: {}",
                status
            ));
        }

        let results: Vec<NominatimResponse> = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse geocoding response: {}", e))?;

        let Some(result) = results.into_iter().next() else {
            return Ok(None);
        };

        let latitude: f64 = result
            .lat
            .parse()
            .map_err(|e| anyhow!("Invalid latitude in response: {}", e))?;
        let longitude: f64 = result
            .lon
            .parse()
            .map_err(|e| anyhow!("Invalid longitude in response: {}", e))?;

        let bounds = result.boundingbox.as_deref().and_then(parse_bounding_box);

        let place = Place::new(
            latitude,
            longitude,
            result.display_name,
            result.address.country,
            result.address.country_code,
            result.address.state,
        )?;

        let extras = ProviderExtras::Nominatim {
            importance: result.importance.unwrap_or(0.0),
            osm_type: result.osm_type,
            osm_id: result.osm_id,
            place_rank: result.place_rank.unwrap_or(0),
            bounds,
        };

        Ok(Some((place, extras)))
    }
}

#[async_trait]
impl ForwardGeocoder for NominatimClient {
    fn provider(&self) -> ProviderId {
        ProviderId::Nominatim
    }

    async fn geocode(&self, query: &str) -> Lookup {
        let outcome = self.request(query).await;
        into_lookup(ProviderId::Nominatim, query, outcome, || {
            "No results found".to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_order() {
        let raw: Vec<String> = ["35.5", "35.8", "139.5", "139.9"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let bbox = parse_bounding_box(&raw).unwrap();
        assert_eq!(bbox.south, 35.5);
        assert_eq!(bbox.north, 35.8);
        assert_eq!(bbox.west, 139.5);
        assert_eq!(bbox.east, 139.9);
    }

    #[test]
    fn test_malformed_bounding_box_is_dropped() {
        let raw = vec!["1".to_string(), "two".to_string()];
        assert!(parse_bounding_box(&raw).is_none());
    }
}
