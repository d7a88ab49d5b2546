//! Tracer configuration, loaded from YAML.
//!
//! Every field has a default, so a config file only needs the keys it changes:
//! ```yaml
//! width: 1024
//! height: 768
//! exposure: 1.5
//! drag_button: right
//! ```

use crate::types::{MouseButton, Resolution};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Narrowest field of view the camera zooms to.
pub const MIN_FOV_DEGREES: f32 = 10.0;
/// Widest field of view the camera zooms to.
pub const MAX_FOV_DEGREES: f32 = 120.0;
/// Upper bound on path depth; the kernel loops this many times per sample.
pub const MAX_BOUNCES: u32 = 64;

/// Errors from loading or validating a [`TracerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Initial window width in pixels.
    pub width: u32,
    /// Initial window height in pixels.
    pub height: u32,
    pub fov_degrees: f32,
    pub exposure: f32,
    pub samples_per_frame: u32,
    pub max_bounces: u32,
    /// Radians of rotation per pixel of cursor drag.
    pub look_sensitivity: f32,
    /// World units per movement key press.
    pub move_speed: f32,
    pub zoom_step_degrees: f32,
    /// Multiplicative exposure step for the exposure keys.
    pub exposure_step: f32,
    /// Button that must be held for cursor movement to rotate the camera.
    pub drag_button: MouseButton,
    pub start_position: Vec3,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fov_degrees: 60.0,
            exposure: 1.0,
            samples_per_frame: 1,
            max_bounces: 4,
            look_sensitivity: 0.005,
            move_speed: 0.25,
            zoom_step_degrees: 5.0,
            exposure_step: 1.25,
            drag_button: MouseButton::Left,
            start_position: Vec3::new(0.0, 1.0, 4.0),
        }
    }
}

impl TracerConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_degrees.to_radians()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(invalid("width/height", "must be non-zero"));
        }
        if !(MIN_FOV_DEGREES..=MAX_FOV_DEGREES).contains(&self.fov_degrees) {
            return Err(invalid(
                "fov_degrees",
                format!(
                    "must be in [{MIN_FOV_DEGREES}, {MAX_FOV_DEGREES}], got {}",
                    self.fov_degrees
                ),
            ));
        }
        positive("exposure", self.exposure)?;
        positive("look_sensitivity", self.look_sensitivity)?;
        positive("move_speed", self.move_speed)?;
        positive("zoom_step_degrees", self.zoom_step_degrees)?;
        if !(self.exposure_step.is_finite() && self.exposure_step > 1.0) {
            return Err(invalid(
                "exposure_step",
                format!("must be greater than 1, got {}", self.exposure_step),
            ));
        }
        if self.samples_per_frame == 0 {
            return Err(invalid("samples_per_frame", "must be at least 1"));
        }
        if self.max_bounces > MAX_BOUNCES {
            return Err(invalid(
                "max_bounces",
                format!("must be at most {MAX_BOUNCES}, got {}", self.max_bounces),
            ));
        }
        if !self.start_position.is_finite() {
            return Err(invalid("start_position", "must be finite"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        TracerConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = TracerConfig::from_yaml_str("width: 1024\nheight: 768\n").unwrap();
        assert_eq!(config.resolution(), Resolution::new(1024, 768));
        assert_eq!(config.exposure, TracerConfig::default().exposure);
        assert_eq!(config.drag_button, MouseButton::Left);
    }

    #[test]
    fn drag_button_parses() {
        let config = TracerConfig::from_yaml_str("drag_button: middle").unwrap();
        assert_eq!(config.drag_button, MouseButton::Middle);
    }

    #[test]
    fn zero_width_rejected() {
        let err = TracerConfig::from_yaml_str("width: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn bad_fov_rejected() {
        assert!(TracerConfig::from_yaml_str("fov_degrees: 180").is_err());
        assert!(TracerConfig::from_yaml_str("fov_degrees: -5").is_err());
        assert!(TracerConfig::from_yaml_str("fov_degrees: .nan").is_err());
    }

    #[test]
    fn fov_limited_to_zoom_range() {
        assert!(TracerConfig::from_yaml_str("fov_degrees: 5").is_err());
        assert!(TracerConfig::from_yaml_str("fov_degrees: 150").is_err());
        assert!(TracerConfig::from_yaml_str("fov_degrees: 10").is_ok());
        assert!(TracerConfig::from_yaml_str("fov_degrees: 120").is_ok());
    }

    #[test]
    fn bounce_count_is_capped() {
        assert!(TracerConfig::from_yaml_str("max_bounces: 64").is_ok());
        let err = TracerConfig::from_yaml_str("max_bounces: 65").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_bounces", .. }));
        assert!(TracerConfig::from_yaml_str("max_bounces: 4294967295").is_err());
    }

    #[test]
    fn zero_samples_rejected() {
        assert!(TracerConfig::from_yaml_str("samples_per_frame: 0").is_err());
    }

    #[test]
    fn malformed_yaml_is_yaml_error() {
        let err = TracerConfig::from_yaml_str("width: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "exposure: 2.0\nsamples_per_frame: 4").unwrap();
        let config = TracerConfig::load(file.path()).unwrap();
        assert_eq!(config.exposure, 2.0);
        assert_eq!(config.samples_per_frame, 4);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = TracerConfig::load("/nonexistent/pathtrace.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn yaml_output_parses_back() {
        let config = TracerConfig {
            exposure: 0.5,
            ..TracerConfig::default()
        };
        let text = config.to_yaml().unwrap();
        assert_eq!(TracerConfig::from_yaml_str(&text).unwrap(), config);
    }
}
