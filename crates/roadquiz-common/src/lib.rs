//! Common types shared across RoadQuiz crates

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Vehicle colour groups. Each group drives its own set of lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleGroup {
    Yellow,
    Red,
    Blue,
    Ambulance,
}

impl VehicleGroup {
    /// Get the display name for this group
    pub fn display_name(&self) -> &str {
        match self {
            VehicleGroup::Yellow => "yellow",
            VehicleGroup::Red => "red",
            VehicleGroup::Blue => "blue",
            VehicleGroup::Ambulance => "ambulance",
        }
    }

    /// Marker colour (0xRRGGBB) used by the top-down view
    pub fn marker_color(&self) -> u32 {
        match self {
            VehicleGroup::Yellow => 0xF2C300,
            VehicleGroup::Red => 0xD32F2F,
            VehicleGroup::Blue => 0x1E66D0,
            VehicleGroup::Ambulance => 0xFFFFFF,
        }
    }

    /// Get all groups
    pub fn all() -> Vec<VehicleGroup> {
        vec![
            VehicleGroup::Yellow,
            VehicleGroup::Red,
            VehicleGroup::Blue,
            VehicleGroup::Ambulance,
        ]
    }
}

/// A point or direction in scene space (y is up, cameras look down -z).
///
/// Serialized as a plain `[x, y, z]` array so data files stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance_to(&self, other: Vec3) -> f32 {
        (*self - other).length()
    }

    /// Unit vector in the same direction, or zero for a zero vector
    pub fn normalized(&self) -> Vec3 {
        let len = self.length();
        if len > 0.0 {
            *self * (1.0 / len)
        } else {
            Vec3::ZERO
        }
    }

    /// Rotate around the y axis by `yaw` radians
    pub fn rotated_y(&self, yaw: f32) -> Vec3 {
        let (s, c) = yaw.sin_cos();
        Vec3::new(self.x * c + self.z * s, self.y, -self.x * s + self.z * c)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

/// Application-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window_width: usize,
    pub window_height: usize,
    /// Directory holding the model files referenced by the scene script.
    /// `None` resolves every asset without touching the filesystem.
    pub asset_root: Option<PathBuf>,
    pub log_level: String,
    /// Fixed frame step for headless sessions (ms)
    pub step_ms: u32,
    pub audio: bool,
    /// Master volume for voice cues (0.0 - 1.0)
    pub volume: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            asset_root: None,
            log_level: "info".to_string(),
            step_ms: 16,
            audio: true,
            volume: 1.0,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(src)?)
    }

    /// Load from a TOML file; missing keys fall back to the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&src)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Viewport aspect ratio for the configured window size
    pub fn aspect(&self) -> f32 {
        self.window_width as f32 / self.window_height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_display_names() {
        assert_eq!(VehicleGroup::Ambulance.display_name(), "ambulance");
    }

    #[test]
    fn test_all_groups() {
        assert_eq!(VehicleGroup::all().len(), 4);
    }

    #[test]
    fn test_vec3_from_array() {
        let v: Vec3 = [1.0, 2.0, 3.0].into();
        assert_eq!(v, Vec3::new(1.0, 2.0, 3.0));
        assert!((Vec3::new(3.0, 0.0, 4.0).length() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotated_y_quarter_turn() {
        let v = Vec3::new(0.0, 0.0, 1.0).rotated_y(std::f32::consts::FRAC_PI_2);
        assert!((v.x - 1.0).abs() < 1e-5, "x = {}", v.x);
        assert!(v.z.abs() < 1e-5, "z = {}", v.z);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg = AppConfig::from_toml_str("step_ms = 10\naudio = false\n").unwrap();
        assert_eq!(cfg.step_ms, 10);
        assert!(!cfg.audio);
        assert_eq!(cfg.window_width, 1280);
        assert!(cfg.asset_root.is_none());
        assert_eq!(cfg.volume, 1.0);
    }

    #[test]
    fn test_bad_config_is_rejected() {
        assert!(matches!(
            AppConfig::from_toml_str("step_ms = \"fast\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
