use crate::entities::{CoordinateKey, GeocodeResult};

/// Resolves a single coordinate into a human-readable address.
///
/// Implementations must never fail: a lookup that could not be
/// completed is reported as [`GeocodeResult::Unresolved`].
pub trait ReverseGeocodingGateway {
    fn reverse_geocode(&self, key: &CoordinateKey) -> GeocodeResult;
}
