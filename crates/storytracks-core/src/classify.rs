use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use crate::geo::GeoCoordinate;
use crate::metadata::ParsedExif;

/// Outcome of classifying one image's EXIF. Always complete and renderable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Both capture time and a valid location came from EXIF.
    pub usable: bool,
    pub coordinate: GeoCoordinate,
    /// ISO-8601 timestamp.
    pub captured_at: String,
}

/// Classify against the current wall clock.
pub fn classify(exif: Option<&ParsedExif>) -> Classification {
    classify_at(exif, Utc::now())
}

/// Classify with an explicit ingestion time used for the defaults.
pub fn classify_at(exif: Option<&ParsedExif>, now: DateTime<Utc>) -> Classification {
    let defaulted = || Classification {
        usable: false,
        coordinate: GeoCoordinate::PLACEHOLDER,
        captured_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
    };

    let Some(exif) = exif else {
        return defaulted();
    };
    let (Some(created), Some((lat, lat_ref)), Some((lon, lon_ref))) =
        (exif.create_date, exif.gps_latitude, exif.gps_longitude)
    else {
        return defaulted();
    };

    match GeoCoordinate::from_gps(lat, lat_ref, lon, lon_ref) {
        Ok(coordinate) => Classification {
            usable: true,
            coordinate,
            captured_at: created.format("%Y-%m-%dT%H:%M:%S").to_string(),
        },
        Err(err) => {
            debug!(%err, "discarding implausible GPS tags");
            defaulted()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Hemisphere, RawGpsTuple};
    use chrono::NaiveDateTime;

    fn sf_exif() -> ParsedExif {
        ParsedExif {
            create_date: Some(
                NaiveDateTime::parse_from_str("2023-05-01 10:20:30", "%Y-%m-%d %H:%M:%S").unwrap(),
            ),
            gps_latitude: Some((RawGpsTuple::new(37.0, 34.0, 59.88), Hemisphere::N)),
            gps_longitude: Some((RawGpsTuple::new(122.0, 25.0, 9.84), Hemisphere::W)),
        }
    }

    #[test]
    fn absent_exif_gets_defaults() {
        let before = Utc::now();
        let c = classify(None);
        let after = Utc::now();

        assert!(!c.usable);
        assert_eq!(c.coordinate, GeoCoordinate::PLACEHOLDER);
        let at = DateTime::parse_from_rfc3339(&c.captured_at).unwrap().with_timezone(&Utc);
        assert!(at >= before - chrono::Duration::seconds(1));
        assert!(at <= after + chrono::Duration::seconds(1));
    }

    #[test]
    fn complete_exif_is_usable() {
        let c = classify(Some(&sf_exif()));
        assert!(c.usable);
        assert!((c.coordinate.lat() - 37.5833).abs() < 1e-4);
        assert!((c.coordinate.lon() + 122.4194).abs() < 1e-4);
        assert_eq!(c.captured_at, "2023-05-01T10:20:30");
    }

    #[test]
    fn missing_pieces_fall_back() {
        let now = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z").unwrap().with_timezone(&Utc);

        let no_date = ParsedExif { create_date: None, ..sf_exif() };
        let no_lat = ParsedExif { gps_latitude: None, ..sf_exif() };
        let no_lon = ParsedExif { gps_longitude: None, ..sf_exif() };

        for exif in [no_date, no_lat, no_lon] {
            let c = classify_at(Some(&exif), now);
            assert!(!c.usable);
            assert!(c.coordinate.is_placeholder());
            assert_eq!(c.captured_at, "2024-01-02T03:04:05Z");
        }
    }

    #[test]
    fn implausible_gps_is_not_usable() {
        let exif = ParsedExif {
            gps_latitude: Some((RawGpsTuple::new(f64::INFINITY, 0.0, 0.0), Hemisphere::N)),
            ..sf_exif()
        };
        let c = classify(Some(&exif));
        assert!(!c.usable);
        assert!(c.coordinate.is_placeholder());

        let exif = ParsedExif {
            gps_latitude: Some((RawGpsTuple::new(95.0, 0.0, 0.0), Hemisphere::N)),
            ..sf_exif()
        };
        assert!(!classify(Some(&exif)).usable);
    }
}
