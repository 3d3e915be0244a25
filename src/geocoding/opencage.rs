use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{BoundingBox, ForwardGeocoder, Lookup, Place, ProviderExtras, ProviderId, into_lookup};

// OpenCage API response structure
#[derive(Debug, Deserialize)]
struct OpenCageResponse {
    #[serde(default)]
    results: Vec<OpenCageResult>,
}

#[derive(Debug, Deserialize)]
struct OpenCageResult {
    geometry: OpenCageLatLng,
    #[serde(default)]
    components: OpenCageComponents,
    formatted: String,
    #[serde(default)]
    confidence: u8,
    #[serde(default)]
    annotations: Option<OpenCageAnnotations>,
    #[serde(default)]
    bounds: Option<OpenCageBounds>,
}

#[derive(Debug, Deserialize)]
struct OpenCageLatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OpenCageComponents {
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenCageAnnotations {
    #[serde(default)]
    timezone: Option<OpenCageTimezone>,
}

#[derive(Debug, Deserialize)]
struct OpenCageTimezone {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OpenCageBounds {
    northeast: OpenCageLatLng,
    southwest: OpenCageLatLng,
}

/// OpenCage forward geocoder. Disabled when no API key is configured.
pub struct OpenCageClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenCageClient {
    pub fn new(client: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn request(&self, api_key: &str, query: &str) -> Result<Option<(Place, ProviderExtras)>> {
        debug!("Calling OpenCage API for: {}", query);

        let url = format!("{}/geocode/v1/json", self.base_url);

        let params = [
            ("q", query),
            ("key", api_key),
            ("limit", "1"),
            ("no_annotations", "0"),
            ("language", "en"),
        ];

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send OpenCage request: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(
                "OpenCage geocoding request failed with status: {}",
                status
            ));
        }

        let body: OpenCageResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse OpenCage response: {}", e))?;

        let Some(result) = body.results.into_iter().next() else {
            return Ok(None);
        };

        let place = Place::new(
            result.geometry.lat,
            result.geometry.lng,
            result.formatted,
            result.components.country,
            result.components.country_code,
            result.components.state,
        )?;

        let extras = ProviderExtras::OpenCage {
            confidence: result.confidence,
            timezone: result
                .annotations
                .and_then(|a| a.timezone)
                .map(|tz| tz.name),
            bounds: result.bounds.map(|b| BoundingBox {
                north: b.northeast.lat,
                south: b.southwest.lat,
                east: b.northeast.lng,
                west: b.southwest.lng,
            }),
        };

        Ok(Some((place, extras)))
    }
}

#[async_trait]
impl ForwardGeocoder for OpenCageClient {
    fn provider(&self) -> ProviderId {
        ProviderId::OpenCage
    }

    async fn geocode(&self, query: &str) -> Lookup {
        let Some(api_key) = &self.api_key else {
            info!("OpenCage API key not configured");
            return Lookup::Unavailable("OpenCage API key not configured".to_string());
        };

        let outcome = self.request(api_key, query).await;
        into_lookup(ProviderId::OpenCage, query, outcome, || {
            "No results found".to_string()
        })
    }
}
