use anyhow::{Context, Result, anyhow, bail};
use std::env;
use std::time::Duration;

const DEFAULT_PROVIDER: &str = "nominatim";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_OPENCAGE_BASE_URL: &str = "https://api.opencagedata.com";
const DEFAULT_NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_NOMINATIM_USER_AGENT: &str = "CityLocator/1.0";
const DEFAULT_NEPTUNE_PORT: u16 = 8182;

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("Unknown log format: {}", other)),
        }
    }
}

/// Connection settings for the OpenCypher graph endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeptuneConfig {
    pub endpoint: String,
    pub port: u16,
    pub use_tls: bool,
}

impl NeptuneConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.endpoint, self.port)
    }
}

/// Process-wide settings, read once at startup and passed by reference afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub opencage_api_key: Option<String>,
    pub google_maps_api_key: Option<String>,
    /// Raw preferred provider setting; unrecognized values are kept for reporting
    pub geocoding_provider: String,
    pub http_timeout: Duration,
    pub opencage_base_url: String,
    pub nominatim_base_url: String,
    pub nominatim_user_agent: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub neptune: Option<NeptuneConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            opencage_api_key: None,
            google_maps_api_key: None,
            geocoding_provider: DEFAULT_PROVIDER.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            opencage_base_url: DEFAULT_OPENCAGE_BASE_URL.to_string(),
            nominatim_base_url: DEFAULT_NOMINATIM_BASE_URL.to_string(),
            nominatim_user_agent: DEFAULT_NOMINATIM_USER_AGENT.to_string(),
            log_level: "INFO".to_string(),
            log_format: LogFormat::Text,
            neptune: None,
        }
    }
}

impl Config {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty and whitespace-only values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let http_timeout = match get("GEOCODING_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .with_context(|| format!("GEOCODING_TIMEOUT_SECS is not a number: {}", raw))?;
                if secs == 0 {
                    bail!("GEOCODING_TIMEOUT_SECS must be greater than zero");
                }
                Duration::from_secs(secs)
            }
            None => defaults.http_timeout,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };

        let neptune = match get("NEPTUNE_ENDPOINT") {
            Some(endpoint) => {
                let port = match get("NEPTUNE_PORT") {
                    Some(raw) => raw
                        .parse::<u16>()
                        .with_context(|| format!("NEPTUNE_PORT is not a valid port: {}", raw))?,
                    None => DEFAULT_NEPTUNE_PORT,
                };
                let use_tls = get("NEPTUNE_USE_TLS")
                    .map(|v| v.eq_ignore_ascii_case("true"))
                    .unwrap_or(true);
                Some(NeptuneConfig {
                    endpoint,
                    port,
                    use_tls,
                })
            }
            None => None,
        };

        Ok(Self {
            opencage_api_key: get("OPENCAGE_API_KEY"),
            google_maps_api_key: get("GOOGLE_MAPS_API_KEY"),
            geocoding_provider: get("GEOCODING_PROVIDER").unwrap_or(defaults.geocoding_provider),
            http_timeout,
            opencage_base_url: get("OPENCAGE_BASE_URL").unwrap_or(defaults.opencage_base_url),
            nominatim_base_url: get("NOMINATIM_BASE_URL").unwrap_or(defaults.nominatim_base_url),
            nominatim_user_agent: get("NOMINATIM_USER_AGENT")
                .unwrap_or(defaults.nominatim_user_agent),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format,
            neptune,
        })
    }
}
