use geocache_core::{
    entities::{CoordinateKey, GeocodeResult},
    gateways::geocode::ReverseGeocodingGateway,
};
use reqwest::{blocking::Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const PUBLIC_BASE_URL: &str = "https://nominatim.openstreetmap.org";

const DEFAULT_ZOOM: u8 = 16;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_USER_AGENT: &str = "geocache";

#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    /// Nominatim requires every client to identify itself.
    pub user_agent: String,
    pub zoom: u8,
    pub timeout: Duration,
    pub accept_language: Option<String>,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: PUBLIC_BASE_URL.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            zoom: DEFAULT_ZOOM,
            timeout: DEFAULT_TIMEOUT,
            accept_language: None,
        }
    }
}

/// A reverse geocoding gateway based on a Nominatim instance.
#[derive(Debug, Clone)]
pub struct Nominatim {
    client: Client,
    reverse_url: String,
    zoom: u8,
    accept_language: Option<String>,
}

#[derive(Debug, Error)]
enum LookupError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Unexpected response status: {0}")]
    Status(StatusCode),
    #[error("The service was unable to resolve the coordinate: {0}")]
    Service(String),
    #[error("The response does not contain a display name")]
    MissingDisplayName,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

impl Nominatim {
    pub fn try_new(cfg: NominatimConfig) -> Result<Self, reqwest::Error> {
        let NominatimConfig {
            base_url,
            user_agent,
            zoom,
            timeout,
            accept_language,
        } = cfg;
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        let reverse_url = format!("{}/reverse", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            reverse_url,
            zoom,
            accept_language,
        })
    }

    fn lookup(&self, key: &CoordinateKey) -> Result<String, LookupError> {
        let mut query = vec![
            ("lat", key.lat().to_string()),
            ("lon", key.lon().to_string()),
            ("format", "json".to_owned()),
            ("zoom", self.zoom.to_string()),
        ];
        if let Some(lang) = &self.accept_language {
            query.push(("accept-language", lang.clone()));
        }
        let response = self.client.get(&self.reverse_url).query(&query).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }
        let ReverseResponse {
            display_name,
            error,
        } = response.json()?;
        if let Some(error) = error {
            return Err(LookupError::Service(error));
        }
        display_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(LookupError::MissingDisplayName)
    }
}

impl ReverseGeocodingGateway for Nominatim {
    fn reverse_geocode(&self, key: &CoordinateKey) -> GeocodeResult {
        match self.lookup(key) {
            Ok(display_name) => GeocodeResult::resolved(display_name),
            Err(err) => {
                log::warn!("Could not resolve {key}: {err}");
                GeocodeResult::Unresolved
            }
        }
    }
}
