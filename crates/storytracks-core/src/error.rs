use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("coordinate is not finite: ({lat}, {lon})")]
    NotFinite { lat: f64, lon: f64 },
    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// Why a single file was left out of an ingestion batch.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file type: {}", .0.display())]
    UnsupportedExtension(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cluster request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("cluster endpoint returned {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to read cluster file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed cluster payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("no pending image with id {0}")]
    UnknownImage(String),
}
