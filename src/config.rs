//! Configuration persistence for anklemark settings

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::import::DEFAULT_MAX_DIMENSION;

/// Serializable color representation for config storage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl OverlayColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from 8-bit channels
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Convert to image crate RGBA format (0-255)
    pub fn to_rgba_u8(self) -> [u8; 4] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
            255,
        ]
    }
}

/// Application configuration persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureConfig {
    /// Longest side of imported images, in pixels
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// Landmark marker radius in backing pixels; hits count within twice this
    #[serde(default = "default_point_radius")]
    pub point_radius: f64,
    /// Radius of the angle arc drawn at the vertex
    #[serde(default = "default_arc_radius")]
    pub arc_radius: f64,
    /// Color of the lines connecting landmarks
    #[serde(default = "default_line_color")]
    pub line_color: OverlayColor,
    /// Fill color of landmark markers
    #[serde(default = "default_point_color")]
    pub point_color: OverlayColor,
    /// Color of the angle arc and its label
    #[serde(default = "default_arc_color")]
    pub arc_color: OverlayColor,
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_point_radius() -> f64 {
    15.0
}

fn default_arc_radius() -> f64 {
    50.0
}

fn default_line_color() -> OverlayColor {
    OverlayColor::from_rgb8(0x25, 0x63, 0xEB) // Blue
}

fn default_point_color() -> OverlayColor {
    OverlayColor::from_rgb8(0xEF, 0x44, 0x44) // Red
}

fn default_arc_color() -> OverlayColor {
    OverlayColor::from_rgb8(0x10, 0xB9, 0x81) // Green
}

impl MeasureConfig {
    /// Configuration directory name under the platform config dir
    pub const ID: &'static str = "anklemark";

    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(Self::ID).join("config.json"))
    }

    /// Load configuration from disk, or return defaults if unavailable
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                log::warn!("Could not determine config directory, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from `path`, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Error loading config, using defaults: {:?}", err);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) {
        let Some(path) = Self::default_path() else {
            log::error!("Could not determine config directory for saving");
            return;
        };
        if let Err(err) = self.save_to(&path) {
            log::error!("Failed to save config: {:?}", err);
        }
    }

    /// Write configuration as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            point_radius: default_point_radius(),
            arc_radius: default_arc_radius(),
            line_color: default_line_color(),
            point_color: default_point_color(),
            arc_color: default_arc_color(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MeasureConfig::default();
        assert_eq!(config.max_dimension, 2048);
        assert_eq!(config.point_radius, 15.0);
        assert_eq!(config.point_color.to_rgba_u8(), [0xEF, 0x44, 0x44, 255]);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = MeasureConfig {
            max_dimension: 1024,
            point_radius: 20.0,
            ..MeasureConfig::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(MeasureConfig::load_from(&path), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "max_dimension": 512 }"#).unwrap();

        let config = MeasureConfig::load_from(&path);
        assert_eq!(config.max_dimension, 512);
        assert_eq!(config.arc_radius, 50.0);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert_eq!(MeasureConfig::load_from(&path), MeasureConfig::default());
        assert_eq!(
            MeasureConfig::load_from(&dir.path().join("absent.json")),
            MeasureConfig::default()
        );
    }

    #[test]
    fn test_color_channels_clamp() {
        let color = OverlayColor::new(1.5, -0.2, 0.5);
        assert_eq!(color.to_rgba_u8(), [255, 0, 128, 255]);
    }
}
