use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::cluster::MarkerStyle;

fn default_timeout_secs() -> u64 {
    10
}

/// Backend cluster endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClusterSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings file layout:
///
/// ```toml
/// [markers]
/// base_size = 40.0
/// max_size = 100.0
/// scale_factor = 8.0
/// label_cap = 99
///
/// [clusters]
/// endpoint = "https://api.example.com/api/posts/image-markers"
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub markers: MarkerStyle,
    #[serde(default)]
    pub clusters: ClusterSettings,
}

impl Settings {
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("invalid settings")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read settings {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("parse settings {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.markers.base_size, 40.0);
        assert_eq!(settings.clusters.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_override() {
        let settings = Settings::from_toml(
            r#"
[markers]
max_size = 80.0

[clusters]
endpoint = "http://localhost:8080/api/posts/image-markers"
"#,
        )
        .unwrap();
        assert_eq!(settings.markers.max_size, 80.0);
        assert_eq!(settings.markers.scale_factor, 8.0);
        assert_eq!(settings.markers.label_cap, 99);
        assert_eq!(
            settings.clusters.endpoint.as_deref(),
            Some("http://localhost:8080/api/posts/image-markers")
        );
        assert_eq!(settings.clusters.timeout_secs, 10);
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[clusters]\ntimeout_secs = 3").unwrap();
        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.clusters.timeout(), Duration::from_secs(3));

        assert!(Settings::load(Path::new("/nonexistent/storytracks.toml")).is_err());
        assert!(Settings::from_toml("markers = 5").is_err());
    }
}
