//! Where pre-aggregated clusters come from.
//!
//! Spatial grouping is done by the backend; this side only asks for the
//! granularity that matches the current zoom.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cluster::{self, ClusterLevel, ClusterPoint, Marker, MarkerStyle};
use crate::error::SourceError;

pub trait ClusterSource {
    fn fetch(&self, level: ClusterLevel) -> Result<Vec<ClusterPoint>, SourceError>;
}

/// Blocking client for the backend `image-markers` endpoint.
pub struct HttpClusterSource {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpClusterSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl ClusterSource for HttpClusterSource {
    fn fetch(&self, level: ClusterLevel) -> Result<Vec<ClusterPoint>, SourceError> {
        debug!(endpoint = %self.endpoint, level = level.as_u8(), "requesting clusters");
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("clusterLevel", level.as_u8())])
            .header("Accept", "application/json")
            .send()?;

        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }

        Ok(response.json::<Vec<ClusterPoint>>()?)
    }
}

/// Clusters saved as the endpoint's JSON payload, possibly for several levels.
pub struct FileClusterSource {
    path: PathBuf,
}

impl FileClusterSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ClusterSource for FileClusterSource {
    fn fetch(&self, level: ClusterLevel) -> Result<Vec<ClusterPoint>, SourceError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let points: Vec<ClusterPoint> = serde_json::from_str(&contents)?;
        Ok(cluster::select_level(points, level))
    }
}

/// Fetch clusters, degrading any failure to an empty set so the map still
/// renders.
pub fn fetch_or_empty(source: &dyn ClusterSource, level: ClusterLevel) -> Vec<ClusterPoint> {
    match source.fetch(level) {
        Ok(points) => points,
        Err(err) => {
            warn!(%err, level = level.as_u8(), "cluster fetch failed, rendering without markers");
            Vec::new()
        }
    }
}

/// Zoom to markers in one call: pick the level, fetch, size and label.
pub fn markers_for_zoom(source: &dyn ClusterSource, zoom: f64, style: &MarkerStyle) -> Vec<Marker> {
    let level = ClusterLevel::from_zoom(zoom);
    let points = cluster::select_level(fetch_or_empty(source, level), level);
    cluster::render_markers(&points, style)
}
