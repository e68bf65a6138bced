use duration_str::{deserialize_duration, deserialize_option_duration};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

const DEFAULT_CONFIG_FILE: &str = include_str!("geocache.default.toml");

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub cache: Option<Cache>,
    pub resolution: Option<Resolution>,
    pub input: Option<Input>,
    pub geocoding: Option<Geocoding>,
    pub gateway: Option<Gateway>,
}

impl Default for Config {
    fn default() -> Self {
        let cfg: Self = toml::from_str(DEFAULT_CONFIG_FILE).expect("Default configuration");
        cfg
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Cache {
    pub file: PathBuf,
    #[serde(default = "default_flush_every")]
    pub flush_every: usize,
    #[serde(default)]
    pub retry_unresolved: bool,
}

impl Default for Cache {
    fn default() -> Self {
        Config::default().cache.expect("Cache configuration")
    }
}

// The embedded defaults always set `flush-every` explicitly.
fn default_flush_every() -> usize {
    Cache::default().flush_every
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Resolution {
    #[serde(deserialize_with = "deserialize_duration")]
    pub min_delay: Duration,
}

impl Default for Resolution {
    fn default() -> Self {
        Config::default()
            .resolution
            .expect("Resolution configuration")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Input {
    pub lat_column: String,
    pub lon_column: String,
}

impl Default for Input {
    fn default() -> Self {
        Config::default().input.expect("Input configuration")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Geocoding {
    pub gateway: Option<GeocodingGateway>,
}

impl Default for Geocoding {
    fn default() -> Self {
        Config::default()
            .geocoding
            .expect("Geocoding configuration")
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeocodingGateway {
    Nominatim,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Gateway {
    pub nominatim: Option<Nominatim>,
}

impl Default for Gateway {
    fn default() -> Self {
        Config::default().gateway.expect("Gateway configuration")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Nominatim {
    pub base_url: String,
    pub user_agent: Option<String>,
    pub zoom: u8,
    #[serde(default, deserialize_with = "deserialize_option_duration")]
    pub timeout: Option<Duration>,
    pub accept_language: Option<String>,
}
