use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::io::Cursor;
use tracing::debug;

use crate::geo::{Hemisphere, RawGpsTuple};

/// EXIF fields the geotag pipeline cares about, validated out of the raw
/// reader output. `None` fields were absent or malformed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedExif {
    pub create_date: Option<NaiveDateTime>,
    pub gps_latitude: Option<(RawGpsTuple, Hemisphere)>,
    pub gps_longitude: Option<(RawGpsTuple, Hemisphere)>,
}

/// Read EXIF from raw image bytes (JPEG, PNG, HEIF, TIFF or WebP).
/// Returns `None` when the container carries no readable EXIF block.
pub fn read_exif(bytes: &[u8]) -> Option<ParsedExif> {
    let exif = Reader::new().read_from_container(&mut Cursor::new(bytes)).ok()?;

    Some(ParsedExif {
        create_date: extract_create_date(&exif),
        gps_latitude: extract_gps(
            &exif,
            Tag::GPSLatitude,
            Tag::GPSLatitudeRef,
            [Hemisphere::N, Hemisphere::S],
        ),
        gps_longitude: extract_gps(
            &exif,
            Tag::GPSLongitude,
            Tag::GPSLongitudeRef,
            [Hemisphere::E, Hemisphere::W],
        ),
    })
}

/// `CreateDate` is the digitized timestamp; fall back to the original and
/// file-level timestamps when a camera only writes those.
fn extract_create_date(exif: &exif::Exif) -> Option<NaiveDateTime> {
    let tags = [Tag::DateTimeDigitized, Tag::DateTimeOriginal, Tag::DateTime];

    for tag in &tags {
        if let Some(field) = exif.get_field(*tag, In::PRIMARY) {
            let val = field.display_value().to_string();
            if let Some(dt) = parse_exif_datetime(&val) {
                return Some(dt);
            }
        }
    }

    None
}

/// `axis` is `[positive, negative]` for the tag; a ref from the other axis
/// makes the tuple unusable.
fn extract_gps(
    exif: &exif::Exif,
    tag: Tag,
    ref_tag: Tag,
    axis: [Hemisphere; 2],
) -> Option<(RawGpsTuple, Hemisphere)> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let parts: Vec<f64> = match field.value {
        Value::Rational(ref v) => v.iter().map(|r| r.to_f64()).collect(),
        Value::SRational(ref v) => v.iter().map(|r| r.to_f64().abs()).collect(),
        _ => return None,
    };
    if parts.len() < 3 {
        return None;
    }

    // A missing ref tag means the positive hemisphere per the EXIF default.
    let hemisphere = match exif.get_field(ref_tag, In::PRIMARY) {
        None => axis[0],
        Some(f) => {
            let raw = match f.value {
                Value::Ascii(ref v) => v.first().map(|s| String::from_utf8_lossy(s).into_owned()),
                _ => None,
            }?;
            let found = Hemisphere::from_ref(&raw)?;
            if !axis.contains(&found) {
                debug!(%found, tag = %ref_tag, "GPS ref does not belong to this axis");
                return None;
            }
            found
        }
    };

    Some((RawGpsTuple::new(parts[0], parts[1], parts[2]), hemisphere))
}

fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s
        .trim_matches('"')
        .replace('-', ":")
        .replace('/', ":")
        .replace('T', " ");

    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }

    if let Ok(d) = chrono::NaiveDate::parse_from_str(cleaned.split(' ').next()?, "%Y:%m:%d") {
        return d.and_hms_opt(0, 0, 0);
    }

    None
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use exif::experimental::Writer;
    use exif::{Field, Rational};

    fn rational_triple(d: u32, m: u32, s_hundredths: u32) -> Value {
        Value::Rational(vec![
            Rational { num: d, denom: 1 },
            Rational { num: m, denom: 1 },
            Rational { num: s_hundredths, denom: 100 },
        ])
    }

    /// Build a bare TIFF blob carrying the San Francisco fixture used across
    /// the crate's tests.
    pub(crate) fn sample_tiff(with_gps: bool) -> Vec<u8> {
        if with_gps {
            tiff_with_refs(Some((&b"N"[..], &b"W"[..])))
        } else {
            tiff_with_refs(None)
        }
    }

    /// Same fixture with arbitrary latitude / longitude ref tags.
    pub(crate) fn tiff_with_refs(refs: Option<(&[u8], &[u8])>) -> Vec<u8> {
        let mut fields = vec![Field {
            tag: Tag::DateTimeOriginal,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![b"2023:05:01 10:20:30".to_vec()]),
        }];
        if let Some((lat_ref, lon_ref)) = refs {
            fields.push(Field {
                tag: Tag::GPSLatitudeRef,
                ifd_num: In::PRIMARY,
                value: Value::Ascii(vec![lat_ref.to_vec()]),
            });
            fields.push(Field {
                tag: Tag::GPSLatitude,
                ifd_num: In::PRIMARY,
                value: rational_triple(37, 34, 5988),
            });
            fields.push(Field {
                tag: Tag::GPSLongitudeRef,
                ifd_num: In::PRIMARY,
                value: Value::Ascii(vec![lon_ref.to_vec()]),
            });
            fields.push(Field {
                tag: Tag::GPSLongitude,
                ifd_num: In::PRIMARY,
                value: rational_triple(122, 25, 984),
            });
        }

        let mut writer = Writer::new();
        for f in &fields {
            writer.push_field(f);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, false).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_parse_datetime_variants() {
        let expected =
            NaiveDateTime::parse_from_str("2023-05-01 10:20:30", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(parse_exif_datetime("2023:05:01 10:20:30"), Some(expected));
        assert_eq!(parse_exif_datetime("2023-05-01 10:20:30"), Some(expected));
        assert!(parse_exif_datetime("2023:05:01").is_some());
        assert!(parse_exif_datetime("not a date").is_none());
    }

    #[test]
    fn test_garbage_bytes_have_no_exif() {
        assert!(read_exif(b"definitely not an image").is_none());
        assert!(read_exif(&[]).is_none());
    }

    #[test]
    fn test_read_gps_and_date_from_tiff() {
        let parsed = read_exif(&sample_tiff(true)).unwrap();
        assert!(parsed.create_date.is_some());

        let (lat, lat_ref) = parsed.gps_latitude.unwrap();
        assert_eq!(lat_ref, Hemisphere::N);
        assert_eq!(lat.degrees, 37.0);
        assert!((lat.seconds - 59.88).abs() < 1e-9);

        let (lon, lon_ref) = parsed.gps_longitude.unwrap();
        assert_eq!(lon_ref, Hemisphere::W);
        assert_eq!(lon.minutes, 25.0);
    }

    #[test]
    fn test_read_date_without_gps() {
        let parsed = read_exif(&sample_tiff(false)).unwrap();
        assert!(parsed.create_date.is_some());
        assert!(parsed.gps_latitude.is_none());
        assert!(parsed.gps_longitude.is_none());
    }

    #[test]
    fn test_ref_from_wrong_axis_is_rejected() {
        let swapped = read_exif(&tiff_with_refs(Some((&b"W"[..], &b"S"[..])))).unwrap();
        assert!(swapped.gps_latitude.is_none());
        assert!(swapped.gps_longitude.is_none());

        let half = read_exif(&tiff_with_refs(Some((&b"S"[..], &b"N"[..])))).unwrap();
        assert_eq!(half.gps_latitude.map(|(_, h)| h), Some(Hemisphere::S));
        assert!(half.gps_longitude.is_none());
    }
}
