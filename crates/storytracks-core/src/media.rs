use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::classify::Classification;
use crate::geo::GeoCoordinate;

/// Extensions accepted for upload (lowercase)
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", // JPEG
    "png",         // PNG
    "heic", "heif", // HEIF / iPhone
    "tif", "tiff", // TIFF
    "webp",        // WebP
];

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s").unwrap());

/// Where a record's location and capture time came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataStatus {
    /// Read from EXIF.
    Verified,
    /// Defaulted; the user should be asked to place the image.
    NeedsReview,
    /// Placed manually by the user.
    UserSupplied,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    /// Content-derived id, stable for the session
    pub id: String,
    /// Sanitized original filename
    pub filename: String,
    pub content_type: String,
    /// ISO-8601 capture time
    pub captured_at: String,
    pub coordinate: GeoCoordinate,
    pub status: MetadataStatus,
    #[serde(default)]
    pub featured: bool,
}

impl ImageRecord {
    pub fn new(original_name: &str, bytes: &[u8], classification: Classification) -> Self {
        let status = if classification.usable {
            MetadataStatus::Verified
        } else {
            MetadataStatus::NeedsReview
        };
        Self {
            id: content_id(bytes),
            filename: sanitize_filename(original_name),
            content_type: content_type(original_name),
            captured_at: classification.captured_at,
            coordinate: classification.coordinate,
            status,
            featured: false,
        }
    }

    pub fn needs_review(&self) -> bool {
        self.status == MetadataStatus::NeedsReview
    }
}

/// NFC-normalize and replace every whitespace character with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let normalized: String = name.nfc().collect();
    WHITESPACE_RE.replace_all(&normalized, "_").into_owned()
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .map_or(false, |e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

fn content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn content_id(bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    digest[..16].to_string()
}
