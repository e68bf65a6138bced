use crate::config::GeocodingGateway;
use anyhow::{anyhow, Result};
use geocache_core::gateways::geocode::ReverseGeocodingGateway;
use geocache_gateways::nominatim::{Nominatim, NominatimConfig};

pub fn geocoding_gateway(
    cfg: Option<GeocodingGateway>,
) -> Result<Box<dyn ReverseGeocodingGateway + Send>> {
    match cfg.ok_or_else(|| anyhow!("No geocoding gateway configured"))? {
        GeocodingGateway::Nominatim {
            base_url,
            user_agent,
            zoom,
            timeout,
            accept_language,
        } => {
            log::info!("Use Nominatim gateway ({base_url})");
            let defaults = NominatimConfig::default();
            let gw = Nominatim::try_new(NominatimConfig {
                base_url,
                user_agent,
                zoom,
                timeout: timeout.unwrap_or(defaults.timeout),
                accept_language,
            })?;
            Ok(Box::new(gw))
        }
    }
}
