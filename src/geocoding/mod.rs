mod google_maps;
mod nominatim;
mod opencage;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info};

use crate::config::Config;

pub use self::google_maps::GoogleMapsGeocoderClient;
pub use nominatim::NominatimClient;
pub use opencage::OpenCageClient;

const EMPTY_CITY_ERROR: &str = "City name cannot be empty";
const EXHAUSTED_ERROR: &str =
    "Unable to geocode city with any provider. Please check the city name and try again.";

/// Identifier of a geocoding provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenCage,
    Google,
    Nominatim,
}

impl ProviderId {
    /// Order in which providers are tried after the preferred one
    pub const FALLBACK_ORDER: [ProviderId; 3] =
        [ProviderId::OpenCage, ProviderId::Google, ProviderId::Nominatim];

    /// Configuration identifier (`opencage`, `google`, `nominatim`)
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenCage => "opencage",
            ProviderId::Google => "google",
            ProviderId::Nominatim => "nominatim",
        }
    }

    /// Human-readable label stored in `GeocodeResult::source`
    pub fn source_label(&self) -> &'static str {
        match self {
            ProviderId::OpenCage => "OpenCage Geocoding API",
            ProviderId::Google => "Google Maps Geocoding API",
            ProviderId::Nominatim => "Nominatim (OpenStreetMap)",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "opencage" => Ok(ProviderId::OpenCage),
            "google" => Ok(ProviderId::Google),
            "nominatim" => Ok(ProviderId::Nominatim),
            other => Err(anyhow!("Unknown geocoding provider: {}", other)),
        }
    }
}

/// Axis-aligned box in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Provider-specific details, kept apart from the common fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderExtras {
    #[serde(rename = "opencage")]
    OpenCage {
        confidence: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        timezone: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bounds: Option<BoundingBox>,
    },
    Google {
        place_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        bounds: Option<BoundingBox>,
        #[serde(skip_serializing_if = "Option::is_none")]
        viewport: Option<BoundingBox>,
    },
    Nominatim {
        importance: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        osm_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        osm_id: Option<i64>,
        place_rank: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        bounds: Option<BoundingBox>,
    },
}

/// Matched place with WGS84 coordinates; only constructible with in-range values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    pub country: String,
    pub country_code: String,
    pub state: String,
}

impl Place {
    pub fn new(
        latitude: f64,
        longitude: f64,
        formatted_address: String,
        country: Option<String>,
        country_code: Option<String>,
        state: Option<String>,
    ) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(anyhow!("Invalid latitude: {}", latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(anyhow!("Invalid longitude: {}", longitude));
        }

        Ok(Self {
            latitude,
            longitude,
            formatted_address,
            country: country
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            country_code: country_code.unwrap_or_default().to_uppercase(),
            state: state.unwrap_or_default(),
        })
    }
}

/// Outcome of a geocoding lookup, as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeResult {
    pub success: bool,
    pub city: String,
    #[serde(flatten)]
    pub place: Option<Place>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<ProviderExtras>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempted_providers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configured_provider: Option<String>,
}

impl GeocodeResult {
    pub fn matched(
        city: &str,
        place: Place,
        provider: ProviderId,
        extras: Option<ProviderExtras>,
    ) -> Self {
        Self {
            success: true,
            city: city.to_string(),
            place: Some(place),
            source: Some(provider.source_label().to_string()),
            extras,
            note: None,
            error: None,
            attempted_providers: None,
            configured_provider: None,
        }
    }

    pub fn no_match(city: &str, provider: ProviderId, error: impl Into<String>) -> Self {
        Self {
            source: Some(provider.source_label().to_string()),
            ..Self::failure(city, error)
        }
    }

    pub fn failure(city: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            city: city.to_string(),
            place: None,
            source: None,
            extras: None,
            note: None,
            error: Some(error.into()),
            attempted_providers: None,
            configured_provider: None,
        }
    }

    pub fn latitude(&self) -> Option<f64> {
        self.place.as_ref().map(|p| p.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.place.as_ref().map(|p| p.longitude)
    }
}

/// Tri-state result of a single provider call
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The provider matched the query
    Found(GeocodeResult),
    /// The provider answered but had no match
    NotFound(GeocodeResult),
    /// The provider could not be used for this call (missing key, network, parse, timeout)
    Unavailable(String),
}

/// Trait for geocoding services that support forward geocoding (place name → coordinates)
///
/// Implementations never return errors: every failure is folded into
/// [`Lookup::NotFound`] or [`Lookup::Unavailable`] so that one broken provider
/// cannot abort the fallback chain.
#[async_trait]
pub trait ForwardGeocoder: Send + Sync {
    fn provider(&self) -> ProviderId;

    async fn geocode(&self, query: &str) -> Lookup;
}

/// Convert an adapter's internal result into a [`Lookup`], logging the outcome
pub(crate) fn into_lookup(
    provider: ProviderId,
    query: &str,
    outcome: Result<Option<(Place, ProviderExtras)>>,
    not_found_error: impl FnOnce() -> String,
) -> Lookup {
    match outcome {
        Ok(Some((place, extras))) => {
            info!(
                provider = %provider,
                city = %query,
                lat = place.latitude,
                lng = place.longitude,
                "Found coordinates"
            );
            Lookup::Found(GeocodeResult::matched(query, place, provider, Some(extras)))
        }
        Ok(None) => {
            let message = not_found_error();
            info!(provider = %provider, city = %query, "{}", message);
            Lookup::NotFound(GeocodeResult::no_match(query, provider, message))
        }
        Err(e) => {
            error!(provider = %provider, city = %query, "Geocoding request failed: {:#}", e);
            Lookup::Unavailable(format!("{:#}", e))
        }
    }
}

/// Multi-provider geocoder with preferred-first fallback.
///
/// The preferred provider (from configuration) is tried first, then every
/// other provider in [`ProviderId::FALLBACK_ORDER`]. The first match wins.
/// Each provider gets one attempt per call; there are no retries.
pub struct Geocoder {
    providers: Vec<Box<dyn ForwardGeocoder>>,
    preferred: Option<ProviderId>,
    configured_provider: String,
}

impl Geocoder {
    /// Create a geocoder over the given providers.
    ///
    /// `providers` are kept in fixed fallback order; `preferred` is the raw
    /// configuration value and may be unrecognized.
    pub fn new(mut providers: Vec<Box<dyn ForwardGeocoder>>, preferred: &str) -> Self {
        providers.sort_by_key(|p| {
            ProviderId::FALLBACK_ORDER
                .iter()
                .position(|id| *id == p.provider())
                .unwrap_or(usize::MAX)
        });

        let preferred_id = preferred.parse::<ProviderId>().ok();
        if preferred_id.is_none() {
            debug!(
                "Preferred provider '{}' is not recognized, trying all providers in fixed order",
                preferred
            );
        }

        Self {
            providers,
            preferred: preferred_id,
            configured_provider: preferred.to_string(),
        }
    }

    /// Build the three production providers from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let opencage = OpenCageClient::new(
            client.clone(),
            config.opencage_base_url.clone(),
            config.opencage_api_key.clone(),
        );

        let google = match &config.google_maps_api_key {
            Some(api_key) => GoogleMapsGeocoderClient::new(api_key, config.http_timeout)?,
            None => {
                debug!("GOOGLE_MAPS_API_KEY not set, Google Maps geocoding unavailable");
                GoogleMapsGeocoderClient::disabled()
            }
        };

        let nominatim = NominatimClient::new(
            client,
            config.nominatim_base_url.clone(),
            config.nominatim_user_agent.clone(),
        );

        Ok(Self::new(
            vec![Box::new(opencage), Box::new(google), Box::new(nominatim)],
            &config.geocoding_provider,
        ))
    }

    pub fn preferred(&self) -> Option<ProviderId> {
        self.preferred
    }

    /// Providers in the order they will be attempted
    fn attempt_order(&self) -> Vec<&dyn ForwardGeocoder> {
        let preferred = self
            .preferred
            .and_then(|id| self.providers.iter().find(|p| p.provider() == id));

        preferred
            .into_iter()
            .chain(
                self.providers
                    .iter()
                    .filter(|p| Some(p.provider()) != self.preferred),
            )
            .map(|p| p.as_ref())
            .collect()
    }

    /// Geocode a city name, falling back across providers
    pub async fn resolve_with_fallback(&self, city: &str) -> GeocodeResult {
        if city.trim().is_empty() {
            return GeocodeResult::failure(city, EMPTY_CITY_ERROR);
        }

        info!(
            city = %city,
            preferred_provider = %self.configured_provider,
            "Geocoding request"
        );

        let mut attempted = Vec::with_capacity(self.providers.len());

        for provider in self.attempt_order() {
            let id = provider.provider();
            let is_preferred = Some(id) == self.preferred;
            debug!(
                provider = %id,
                preferred = is_preferred,
                "Trying geocoding provider"
            );
            attempted.push(id.as_str().to_string());

            match provider.geocode(city).await {
                Lookup::Found(mut result) => {
                    if let Some(preferred) = self.preferred
                        && !is_preferred
                    {
                        result.note = Some(format!(
                            "Fallback provider used (primary provider \"{}\" failed)",
                            preferred
                        ));
                    }
                    return result;
                }
                Lookup::NotFound(_) => {
                    debug!(provider = %id, city = %city, "Provider returned no results");
                }
                Lookup::Unavailable(reason) => {
                    debug!(provider = %id, city = %city, "Provider unavailable: {}", reason);
                }
            }

            if is_preferred {
                info!("Preferred provider {} failed or returned no results", id);
            }
        }

        error!(city = %city, "All geocoding providers failed");

        GeocodeResult {
            attempted_providers: Some(attempted),
            configured_provider: Some(self.configured_provider.clone()),
            ..GeocodeResult::failure(city, EXHAUSTED_ERROR)
        }
    }
}
