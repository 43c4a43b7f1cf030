pub mod classify;
pub mod cluster;
pub mod config;
pub mod draft;
pub mod error;
pub mod geo;
pub mod media;
pub mod metadata;
pub mod source;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use classify::{classify, classify_at, Classification};
pub use cluster::{render_markers, ClusterLevel, ClusterPoint, Marker, MarkerStyle};
pub use config::Settings;
pub use draft::{DraftAction, DraftState, EditorStage};
pub use error::{CoordinateError, DraftError, IngestError, SourceError};
pub use geo::{normalize, GeoCoordinate, Hemisphere, RawGpsTuple};
pub use media::{ImageRecord, MetadataStatus};
pub use metadata::ParsedExif;
pub use source::{
    fetch_or_empty, markers_for_zoom, ClusterSource, FileClusterSource, HttpClusterSource,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Files in the order the user selected them
    pub files: Vec<PathBuf>,
}

/// A file left out of the batch, with its position in the selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedFile {
    pub index: usize,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestResult {
    pub records: Vec<ImageRecord>,
    #[serde(default)]
    pub rejected: Vec<RejectedFile>,
}

impl IngestResult {
    pub fn needs_review(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter().filter(|r| r.needs_review())
    }
}

/// `(stage, current, total, message)`; may borrow from the caller.
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + Send + Sync + 'a;

const PROGRESS_INTERVAL_MS: u128 = 200;

/// Forwards a progress report when the interval has passed since the last
/// one, and always forwards the final report of a stage.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback<'a>,
    last_emit: std::sync::Mutex<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback<'a>) -> Self {
        Self {
            inner,
            last_emit: std::sync::Mutex::new(Instant::now() - std::time::Duration::from_secs(1)),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            let mut last = self.last_emit.lock().unwrap();
            if last.elapsed().as_millis() < PROGRESS_INTERVAL_MS {
                return;
            }
            *last = Instant::now();
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Classify every selected file. A file that cannot be taken (unsupported
/// type, unreadable) is recorded in `rejected` and the rest of the batch
/// carries on; output keeps the selection order.
pub fn ingest(
    options: &IngestOptions,
    progress_callback: &ProgressCallback<'_>,
) -> IngestResult {
    let tp = ThrottledProgress::new(progress_callback);
    let now = Utc::now();
    let total = options.files.len() as u64;
    let counter = AtomicU64::new(0);

    let outcomes: Vec<Result<ImageRecord, IngestError>> = options
        .files
        .par_iter()
        .map(|path| {
            let outcome = ingest_file(path, now);
            let current = counter.fetch_add(1, Ordering::Relaxed);
            tp.report("exif", current, total, "Reading EXIF");
            outcome
        })
        .collect();

    let mut result = IngestResult::default();
    for (index, (path, outcome)) in options.files.iter().zip(outcomes).enumerate() {
        match outcome {
            Ok(record) => result.records.push(record),
            Err(err) => {
                warn!(?path, %err, "skipping file");
                result.rejected.push(RejectedFile {
                    index,
                    path: path.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        records = result.records.len(),
        needs_review = result.needs_review().count(),
        rejected = result.rejected.len(),
        "ingest complete"
    );

    result
}

/// Classify an upload already held in memory.
pub fn record_from_bytes(filename: &str, bytes: &[u8], now: DateTime<Utc>) -> ImageRecord {
    let exif = metadata::read_exif(bytes);
    let classification = classify_at(exif.as_ref(), now);
    ImageRecord::new(filename, bytes, classification)
}

fn ingest_file(path: &Path, now: DateTime<Utc>) -> Result<ImageRecord, IngestError> {
    if !media::is_supported(path) {
        return Err(IngestError::UnsupportedExtension(path.to_path_buf()));
    }

    let bytes = std::fs::read(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image");

    Ok(record_from_bytes(filename, &bytes, now))
}
