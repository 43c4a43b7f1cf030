use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geo::GeoCoordinate;

/// Granularity at which the backend groups images into one marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ClusterLevel {
    City = 1,
    Province = 2,
    Country = 3,
}

impl ClusterLevel {
    /// Zoom 12 and above is city scale, 8 up to 12 province, below 8 country.
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom >= 12.0 {
            ClusterLevel::City
        } else if zoom >= 8.0 {
            ClusterLevel::Province
        } else {
            ClusterLevel::Country
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ClusterLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ClusterLevel::City),
            2 => Ok(ClusterLevel::Province),
            3 => Ok(ClusterLevel::Country),
            other => Err(format!("unknown cluster level {other}")),
        }
    }
}

impl From<ClusterLevel> for u8 {
    fn from(level: ClusterLevel) -> u8 {
        level.as_u8()
    }
}

/// One pre-aggregated cluster as served by the `image-markers` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPoint {
    pub cluster_level: ClusterLevel,
    #[serde(default = "missing_coord", deserialize_with = "nullable_coord")]
    pub cluster_lat: f64,
    #[serde(default = "missing_coord", deserialize_with = "nullable_coord")]
    pub cluster_long: f64,
    pub image_count: u64,
    #[serde(default)]
    pub thumb_img_path: Option<String>,
}

// A null or absent coordinate becomes NaN so the render pass drops that one
// cluster instead of the whole payload failing to decode.
fn missing_coord() -> f64 {
    f64::NAN
}

fn nullable_coord<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Pixel sizing parameters for cluster markers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub base_size: f64,
    pub max_size: f64,
    pub scale_factor: f64,
    /// Counts above this are labelled `"{label_cap}+"`.
    pub label_cap: u64,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            base_size: 40.0,
            max_size: 100.0,
            scale_factor: 8.0,
            label_cap: 99,
        }
    }
}

impl MarkerStyle {
    /// Log-scaled diameter so large clusters don't swamp the viewport.
    pub fn size(&self, image_count: u64) -> f64 {
        let grown = self.base_size + (image_count as f64 + 1.0).ln() * self.scale_factor;
        grown.min(self.max_size)
    }

    pub fn label(&self, image_count: u64) -> String {
        if image_count > self.label_cap {
            format!("{}+", self.label_cap)
        } else {
            image_count.to_string()
        }
    }
}

/// A cluster ready for a map overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub position: GeoCoordinate,
    pub diameter: f64,
    pub label: String,
    pub image_count: u64,
    pub thumbnail: Option<String>,
}

/// Size and label every renderable cluster. Points with a non-finite or
/// out-of-range position are dropped from this pass.
pub fn render_markers(points: &[ClusterPoint], style: &MarkerStyle) -> Vec<Marker> {
    points
        .iter()
        .filter_map(|p| match GeoCoordinate::new(p.cluster_lat, p.cluster_long) {
            Ok(position) => Some(Marker {
                position,
                diameter: style.size(p.image_count),
                label: style.label(p.image_count),
                image_count: p.image_count,
                thumbnail: p.thumb_img_path.clone(),
            }),
            Err(err) => {
                warn!(%err, image_count = p.image_count, "dropping invalid cluster");
                None
            }
        })
        .collect()
}

/// Keep only the clusters aggregated at `level`.
pub fn select_level(points: Vec<ClusterPoint>, level: ClusterLevel) -> Vec<ClusterPoint> {
    points.into_iter().filter(|p| p.cluster_level == level).collect()
}
