use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoordinateError;

/// Hemisphere reference attached to an EXIF GPS tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hemisphere {
    N,
    S,
    E,
    W,
}

impl Hemisphere {
    /// Parse an EXIF `GPSLatitudeRef` / `GPSLongitudeRef` value.
    pub fn from_ref(value: &str) -> Option<Self> {
        match value.trim().chars().next()?.to_ascii_uppercase() {
            'N' => Some(Hemisphere::N),
            'S' => Some(Hemisphere::S),
            'E' => Some(Hemisphere::E),
            'W' => Some(Hemisphere::W),
            _ => None,
        }
    }

    pub fn is_negative(self) -> bool {
        matches!(self, Hemisphere::S | Hemisphere::W)
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hemisphere::N => write!(f, "N"),
            Hemisphere::S => write!(f, "S"),
            Hemisphere::E => write!(f, "E"),
            Hemisphere::W => write!(f, "W"),
        }
    }
}

/// Degrees, minutes and seconds as stored in an EXIF GPS rational triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawGpsTuple {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
}

impl RawGpsTuple {
    pub fn new(degrees: f64, minutes: f64, seconds: f64) -> Self {
        Self {
            degrees,
            minutes,
            seconds,
        }
    }
}

/// Convert a DMS tuple to signed decimal degrees.
///
/// The caller applies this once per axis. Inputs are trusted to be
/// non-negative; plausibility is checked by [`GeoCoordinate::new`].
pub fn normalize(tuple: RawGpsTuple, hemisphere: Hemisphere) -> f64 {
    let decimal = tuple.degrees + tuple.minutes / 60.0 + tuple.seconds / 3600.0;
    if hemisphere.is_negative() {
        -decimal
    } else {
        decimal
    }
}

/// Signed decimal-degree position. Always finite and in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoCoordinate {
    lat: f64,
    lon: f64,
}

impl GeoCoordinate {
    /// Placeholder used until the user supplies a real location.
    pub const PLACEHOLDER: GeoCoordinate = GeoCoordinate { lat: 0.0, lon: 0.0 };

    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NotFinite { lat, lon });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Build a coordinate from the two EXIF GPS tuples and their ref tags.
    pub fn from_gps(
        lat: RawGpsTuple,
        lat_ref: Hemisphere,
        lon: RawGpsTuple,
        lon_ref: Hemisphere,
    ) -> Result<Self, CoordinateError> {
        Self::new(normalize(lat, lat_ref), normalize(lon, lon_ref))
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::PLACEHOLDER
    }
}

impl<'de> Deserialize<'de> for GeoCoordinate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            lat: f64,
            lon: f64,
        }

        let raw = Raw::deserialize(deserializer)?;
        GeoCoordinate::new(raw.lat, raw.lon).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lon)
    }
}
