use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::model::ChannelKind;

/// Optional settings file looked up in the working directory.
pub const CONFIG_FILE: &str = "fif-viewer.json";

// ---------------------------------------------------------------------------
// Viewer configuration
// ---------------------------------------------------------------------------

/// Viewer settings; every field falls back to its default when omitted.
///
/// ```json
/// { "duration": 20.0, "n_channels": 30, "scalings": { "eog": 2e-4 } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Initial window size in points.
    pub window_size: [f32; 2],
    /// Seconds shown at once.
    pub duration: f64,
    /// Channels per page.
    pub n_channels: usize,
    pub remove_dc: bool,
    /// Per-kind amplitude overrides keyed by kind label (`eeg`, `eog`, ...).
    pub scalings: BTreeMap<String, f64>,
    /// Per-trace point budget before min/max decimation kicks in.
    pub max_points: usize,
    pub show_annotations: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_size: [1200.0, 800.0],
            duration: 10.0,
            n_channels: 20,
            remove_dc: true,
            scalings: BTreeMap::new(),
            max_points: 4000,
            show_annotations: true,
        }
    }
}

impl ViewerConfig {
    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: ViewerConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config.sanitized())
    }

    /// Config from `path` when present; defaults when absent or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(config) => {
                log::info!("Using viewer settings from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring viewer settings: {e:#}");
                Self::default()
            }
        }
    }

    /// Clamp values that would make the plot unusable.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.duration > 0.0 && self.duration.is_finite()) {
            self.duration = defaults.duration;
        }
        if self.n_channels == 0 {
            self.n_channels = defaults.n_channels;
        }
        self.scalings.retain(|kind, v| {
            let keep = *v > 0.0 && v.is_finite();
            if !keep {
                log::warn!("Ignoring non-positive scaling {v} for {kind}");
            }
            keep
        });
        self
    }

    /// Amplitude spanning half a trace row for a channel kind.
    pub fn scaling_for(&self, kind: ChannelKind) -> f64 {
        self.scalings
            .get(&kind.to_string())
            .copied()
            .unwrap_or_else(|| kind.default_scaling())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "duration": 20.0, "scalings": { "eog": 0.0002 } }"#).unwrap();

        let config = ViewerConfig::from_file(&path).unwrap();
        assert_eq!(config.duration, 20.0);
        assert_eq!(config.n_channels, 20);
        assert!(config.remove_dc);
        assert_eq!(config.scaling_for(ChannelKind::Eog), 0.0002);
        assert_eq!(config.scaling_for(ChannelKind::Eeg), 20e-6);
    }

    #[test]
    fn test_invalid_values_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{ "duration": -1.0, "n_channels": 0, "scalings": { "eeg": -5.0 } }"#,
        )
        .unwrap();
        let config = ViewerConfig::from_file(&path).unwrap();
        assert_eq!(config.duration, 10.0);
        assert_eq!(config.n_channels, 20);
        assert!(config.scalings.is_empty());
    }

    #[test]
    fn test_missing_or_broken_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        assert_eq!(ViewerConfig::load_or_default(&path), ViewerConfig::default());

        std::fs::write(&path, "{ not json").unwrap();
        assert!(ViewerConfig::from_file(&path).is_err());
        assert_eq!(ViewerConfig::load_or_default(&path), ViewerConfig::default());
    }
}
