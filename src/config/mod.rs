use anyhow::{anyhow, bail, Result};
use std::{
    env, fs,
    io::ErrorKind,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

mod raw;

const DEFAULT_CONFIG_FILE_NAME: &str = "geocache.toml";
const DEFAULT_USER_AGENT: &str = concat!("geocache/", env!("CARGO_PKG_VERSION"));

const ENV_NAME_CACHE_FILE: &str = "GEOCACHE_CACHE_FILE";
const ENV_NAME_NOMINATIM_BASE_URL: &str = "NOMINATIM_BASE_URL";
const ENV_NAME_NOMINATIM_USER_AGENT: &str = "NOMINATIM_USER_AGENT";

const MAX_ZOOM: u8 = 18;

// Usage policy of the public Nominatim instance
const PUBLIC_NOMINATIM_HOST: &str = "nominatim.openstreetmap.org";
const PUBLIC_NOMINATIM_MIN_DELAY: Duration = Duration::from_secs(1);

pub struct Config {
    pub cache: Cache,
    pub resolution: Resolution,
    pub input: Input,
    pub geocoding: Geocoding,
}

impl Config {
    /// Loads the configuration from `file_path`.
    ///
    /// Without an explicit path `geocache.toml` is used if it exists,
    /// otherwise the built-in defaults.
    pub fn try_load_from_file_or_default<P: AsRef<Path>>(file_path: Option<P>) -> Result<Self> {
        let explicit = file_path.is_some();
        let file_path: &Path = file_path.as_ref().map(|p| p.as_ref()).unwrap_or_else(|| {
            log::debug!("No configuration file specified. load {DEFAULT_CONFIG_FILE_NAME}");
            Path::new(DEFAULT_CONFIG_FILE_NAME)
        });

        let mut cfg = match fs::read_to_string(file_path) {
            Ok(cfg_string) => cfg_string
                .parse::<Self>()
                .map_err(|err| anyhow!("Invalid configuration '{}': {err}", file_path.display()))?,
            Err(err) => match err.kind() {
                ErrorKind::NotFound if !explicit => {
                    log::info!(
                        "{DEFAULT_CONFIG_FILE_NAME} not found => load default configuration."
                    );
                    Self::try_from(raw::Config::default())?
                }
                _ => bail!(
                    "Unable to read configuration '{}': {err}",
                    file_path.display()
                ),
            },
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(file) = var(ENV_NAME_CACHE_FILE) {
            self.cache.file = file.into();
        }
        if let Some(GeocodingGateway::Nominatim {
            base_url,
            user_agent,
            ..
        }) = &mut self.geocoding.gateway
        {
            if let Some(url) = var(ENV_NAME_NOMINATIM_BASE_URL) {
                *base_url = url;
            }
            if let Some(agent) = var(ENV_NAME_NOMINATIM_USER_AGENT) {
                *user_agent = agent;
            }
        }
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        let raw_config: raw::Config = toml::from_str(s)?;
        Self::try_from(raw_config)
    }
}

pub struct Cache {
    /// JSON file with the resolved addresses.
    pub file: PathBuf,
    pub flush_every: Option<NonZeroUsize>,
    pub retry_unresolved: bool,
}

pub struct Resolution {
    pub min_delay: Duration,
}

pub struct Input {
    pub lat_column: String,
    pub lon_column: String,
}

pub struct Geocoding {
    pub gateway: Option<GeocodingGateway>,
}

#[derive(Debug, Clone)]
pub enum GeocodingGateway {
    Nominatim {
        base_url: String,
        user_agent: String,
        zoom: u8,
        timeout: Option<Duration>,
        accept_language: Option<String>,
    },
}

impl GeocodingGateway {
    /// Rejects delays that violate the usage policy of the service.
    pub fn ensure_fair_use(&self, min_delay: Duration) -> Result<()> {
        match self {
            Self::Nominatim { base_url, .. } => {
                if base_url.contains(PUBLIC_NOMINATIM_HOST)
                    && min_delay < PUBLIC_NOMINATIM_MIN_DELAY
                {
                    bail!(
                        "The public Nominatim instance allows at most one request per second (min. delay: {min_delay:?})"
                    );
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<raw::Config> for Config {
    type Error = anyhow::Error;
    fn try_from(from: raw::Config) -> Result<Self> {
        let raw::Config {
            cache,
            resolution,
            input,
            geocoding,
            gateway,
        } = from;

        let raw::Cache {
            file,
            flush_every,
            retry_unresolved,
        } = cache.unwrap_or_default();
        let cache = Cache {
            file,
            flush_every: NonZeroUsize::new(flush_every),
            retry_unresolved,
        };

        let raw::Resolution { min_delay } = resolution.unwrap_or_default();
        let resolution = Resolution { min_delay };

        let raw::Input {
            lat_column,
            lon_column,
        } = input.unwrap_or_default();
        let input = Input {
            lat_column,
            lon_column,
        };

        let geo_gateway = match geocoding.unwrap_or_default().gateway {
            Some(raw::GeocodingGateway::Nominatim) => {
                let raw::Nominatim {
                    base_url,
                    user_agent,
                    zoom,
                    timeout,
                    accept_language,
                } = gateway
                    .unwrap_or_default()
                    .nominatim
                    .ok_or_else(|| anyhow!("Missing 'nominatim' gateway configuration"))?;
                if zoom > MAX_ZOOM {
                    bail!("Invalid zoom level {zoom} (max. {MAX_ZOOM})");
                }
                let user_agent = user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());
                if user_agent.trim().is_empty() {
                    bail!("The user agent must not be empty");
                }
                Some(GeocodingGateway::Nominatim {
                    base_url,
                    user_agent,
                    zoom,
                    timeout,
                    accept_language,
                })
            }
            None => None,
        };
        let geocoding = Geocoding {
            gateway: geo_gateway,
        };

        Ok(Self {
            cache,
            resolution,
            input,
            geocoding,
        })
    }
}
