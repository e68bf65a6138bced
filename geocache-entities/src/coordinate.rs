use std::{fmt, str::FromStr};
use thiserror::Error;

const LAT_DEG_MIN: f64 = -90.0;
const LAT_DEG_MAX: f64 = 90.0;
const LON_DEG_MIN: f64 = -180.0;
const LON_DEG_MAX: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidCoordinate {
    #[error("Coordinate ({lat}, {lon}) is not a pair of finite numbers")]
    NotFinite { lat: f64, lon: f64 },
    #[error("Latitude {0} is out of range")]
    LatOutOfRange(f64),
    #[error("Longitude {0} is out of range")]
    LonOutOfRange(f64),
}

/// The identity of a location in the address cache.
///
/// Two keys are considered equal if their canonical strings are equal.
/// Floating-point noise that does not survive the formatting is
/// therefore ignored, noise that does survive it produces a distinct key.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateKey {
    lat: f64,
    lon: f64,
}

impl CoordinateKey {
    pub fn try_from_lat_lon(lat: f64, lon: f64) -> Result<Self, InvalidCoordinate> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(InvalidCoordinate::NotFinite { lat, lon });
        }
        if !(LAT_DEG_MIN..=LAT_DEG_MAX).contains(&lat) {
            return Err(InvalidCoordinate::LatOutOfRange(lat));
        }
        if !(LON_DEG_MIN..=LON_DEG_MAX).contains(&lon) {
            return Err(InvalidCoordinate::LonOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }

    pub const fn lat(&self) -> f64 {
        self.lat
    }

    pub const fn lon(&self) -> f64 {
        self.lon
    }

    /// The string that is used as key in the durable store.
    ///
    /// Each number is rendered as the shortest decimal that round-trips
    /// to the same `f64`. Integral values keep a trailing `.0`.
    pub fn canonical_string(&self) -> String {
        format!("{},{}", format_deg(self.lat), format_deg(self.lon))
    }
}

fn format_deg(deg: f64) -> String {
    debug_assert!(deg.is_finite());
    let mut s = deg.to_string();
    if !s.contains('.') {
        s.push_str(".0");
    }
    s
}

impl PartialEq for CoordinateKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_string() == other.canonical_string()
    }
}

impl Eq for CoordinateKey {}

impl fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateKeyParseError {
    #[error("Expected '<lat>,<lon>'")]
    Format,
    #[error(transparent)]
    Invalid(#[from] InvalidCoordinate),
}

impl FromStr for CoordinateKey {
    type Err = CoordinateKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or(CoordinateKeyParseError::Format)?;
        let lat = lat
            .trim()
            .parse::<f64>()
            .map_err(|_| CoordinateKeyParseError::Format)?;
        let lon = lon
            .trim()
            .parse::<f64>()
            .map_err(|_| CoordinateKeyParseError::Format)?;
        Ok(Self::try_from_lat_lon(lat, lon)?)
    }
}
