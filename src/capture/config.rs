//! Capture pipeline configuration.
//!
//! The CSI sensors are driven through a fixed GStreamer pipeline:
//! `nvarguscamerasrc` produces NV12 in NVMM memory, `nvvidconv` flips and
//! scales it, and `videoconvert` hands BGR frames to an `appsink`.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

use crate::preview::PreviewConfig;
use crate::reader::ReaderConfig;
use crate::snapshot::SnapshotConfig;

/// Largest `flip-method` accepted by `nvvidconv`.
const MAX_FLIP_METHOD: u32 = 7;

/// Parameters of the capture pipeline for one CSI sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// CSI sensor index (0 or 1 on dual-camera carriers).
    pub sensor_id: u32,
    /// Sensor capture width in pixels.
    pub capture_width: u32,
    /// Sensor capture height in pixels.
    pub capture_height: u32,
    /// Width of the frames delivered to the application.
    pub display_width: u32,
    /// Height of the frames delivered to the application.
    pub display_height: u32,
    /// Capture frame rate in frames per second.
    pub framerate: u32,
    /// `nvvidconv` flip method (0 = none, 2 = rotate 180, ...).
    pub flip_method: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sensor_id: 0,
            capture_width: 1280,
            capture_height: 720,
            display_width: 640,
            display_height: 360,
            framerate: 60,
            flip_method: 0,
        }
    }
}

impl PipelineConfig {
    /// Default pipeline for the given sensor.
    pub fn for_sensor(sensor_id: u32) -> Self {
        Self {
            sensor_id,
            ..Default::default()
        }
    }

    /// Square 720x720 pipeline at 120 fps, used by the stereo snapshot tool.
    pub fn square(sensor_id: u32) -> Self {
        Self {
            sensor_id,
            capture_width: 720,
            capture_height: 720,
            display_width: 720,
            display_height: 720,
            framerate: 120,
            flip_method: 0,
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture_width == 0
            || self.capture_height == 0
            || self.display_width == 0
            || self.display_height == 0
        {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.framerate == 0 || self.framerate > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if self.flip_method > MAX_FLIP_METHOD {
            return Err(ConfigError::InvalidFlipMethod(self.flip_method));
        }
        Ok(())
    }

    /// Builds the pipeline descriptor handed to the capture backend.
    pub fn descriptor(&self) -> PipelineDescriptor {
        PipelineDescriptor(format!(
            "nvarguscamerasrc sensor-id={} ! \
             video/x-raw(memory:NVMM), \
             width=(int){}, height=(int){}, \
             format=(string)NV12, framerate=(fraction){}/1 ! \
             nvvidconv flip-method={} ! \
             video/x-raw, width=(int){}, height=(int){}, format=(string)BGRx ! \
             videoconvert ! \
             video/x-raw, format=(string)BGR ! appsink",
            self.sensor_id,
            self.capture_width,
            self.capture_height,
            self.framerate,
            self.flip_method,
            self.display_width,
            self.display_height,
        ))
    }
}

/// Opaque pipeline description consumed by a capture backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDescriptor(String);

impl PipelineDescriptor {
    /// Returns the descriptor as a launch string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PipelineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("invalid flip method {0} (must be 0-7)")]
    InvalidFlipMethod(u32),
    #[error("invalid interval: {0}")]
    InvalidInterval(&'static str),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Pipeline for the single-camera demo.
    #[serde(default)]
    pub camera: PipelineConfig,
    /// Right-hand sensor of the stereo pair.
    #[serde(default = "default_right", deserialize_with = "deserialize_right")]
    pub right: PipelineConfig,
    /// Left-hand sensor of the stereo pair.
    #[serde(default = "default_left", deserialize_with = "deserialize_left")]
    pub left: PipelineConfig,
    /// Frame reader failure policy.
    #[serde(default)]
    pub reader: ReaderConfig,
    /// Preview window settings.
    #[serde(default)]
    pub preview: PreviewConfig,
    /// Stereo snapshot loop settings.
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

fn default_right() -> PipelineConfig {
    PipelineConfig::square(0)
}

fn default_left() -> PipelineConfig {
    PipelineConfig::square(1)
}

/// A stereo section as written in the file. Missing keys fall back to the
/// square stereo pipeline rather than to `PipelineConfig::default()`.
#[derive(Deserialize)]
struct StereoSection {
    sensor_id: Option<u32>,
    capture_width: Option<u32>,
    capture_height: Option<u32>,
    display_width: Option<u32>,
    display_height: Option<u32>,
    framerate: Option<u32>,
    flip_method: Option<u32>,
}

impl StereoSection {
    fn onto_square(self, default_sensor: u32) -> PipelineConfig {
        let base = PipelineConfig::square(self.sensor_id.unwrap_or(default_sensor));
        PipelineConfig {
            capture_width: self.capture_width.unwrap_or(base.capture_width),
            capture_height: self.capture_height.unwrap_or(base.capture_height),
            display_width: self.display_width.unwrap_or(base.display_width),
            display_height: self.display_height.unwrap_or(base.display_height),
            framerate: self.framerate.unwrap_or(base.framerate),
            flip_method: self.flip_method.unwrap_or(base.flip_method),
            ..base
        }
    }
}

fn deserialize_right<'de, D>(deserializer: D) -> Result<PipelineConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(StereoSection::deserialize(deserializer)?.onto_square(default_right().sensor_id))
}

fn deserialize_left<'de, D>(deserializer: D) -> Result<PipelineConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(StereoSection::deserialize(deserializer)?.onto_square(default_left().sensor_id))
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            camera: PipelineConfig::default(),
            right: default_right(),
            left: default_left(),
            reader: ReaderConfig::default(),
            preview: PreviewConfig::default(),
            snapshot: SnapshotConfig::default(),
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera.validate()?;
        self.right.validate()?;
        self.left.validate()?;
        self.preview.validate()?;
        self.snapshot.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_config_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert!(PipelineConfig::square(1).validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = PipelineConfig::default();
        config.display_width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_flip_method_range() {
        let mut config = PipelineConfig::default();
        config.flip_method = 8;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFlipMethod(8))
        ));
    }

    #[test]
    fn test_default_descriptor() {
        let descriptor = PipelineConfig::default().descriptor();
        assert_eq!(
            descriptor.as_str(),
            "nvarguscamerasrc sensor-id=0 ! \
             video/x-raw(memory:NVMM), width=(int)1280, height=(int)720, \
             format=(string)NV12, framerate=(fraction)60/1 ! \
             nvvidconv flip-method=0 ! \
             video/x-raw, width=(int)640, height=(int)360, format=(string)BGRx ! \
             videoconvert ! video/x-raw, format=(string)BGR ! appsink"
        );
    }

    #[test]
    fn test_file_config_partial_sections() {
        let config = FileConfig::from_toml(
            r#"
            [left]
            sensor_id = 1
            framerate = 30

            [snapshot]
            interval_secs = 2.5
            "#,
        )
        .unwrap();

        assert_eq!(config.left.framerate, 30);
        assert_eq!(config.left.capture_width, 720);
        assert_eq!(config.right, PipelineConfig::square(0));
        assert_eq!(config.snapshot.interval_secs, 2.5);
    }

    #[test]
    fn test_stereo_sections_default_to_square_pipeline() {
        let config =
            FileConfig::from_toml("[left]\nsensor_id = 1\n\n[right]\nflip_method = 2\n")
                .unwrap();

        assert_eq!(config.left, PipelineConfig::square(1));
        assert_eq!(
            config.right,
            PipelineConfig {
                flip_method: 2,
                ..PipelineConfig::square(0)
            }
        );
        assert_eq!(config.camera, PipelineConfig::default());
    }

    #[test]
    fn test_file_config_rejects_invalid_section() {
        let result = FileConfig::from_toml("[right]\nframerate = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidFrameRate)));
    }

    proptest! {
        #[test]
        fn descriptor_carries_every_parameter(
            sensor_id in 0u32..4,
            width in 1u32..4096,
            height in 1u32..4096,
            framerate in 1u32..=120,
            flip in 0u32..=7,
        ) {
            let config = PipelineConfig {
                sensor_id,
                capture_width: width,
                capture_height: height,
                display_width: width / 2 + 1,
                display_height: height / 2 + 1,
                framerate,
                flip_method: flip,
            };
            let text = config.descriptor().to_string();
            let sensor = format!("sensor-id={sensor_id} ");
            let rate = format!("framerate=(fraction){framerate}/1");
            let flip_method = format!("flip-method={flip} ");
            prop_assert!(text.starts_with("nvarguscamerasrc "));
            prop_assert!(text.contains(&sensor));
            prop_assert!(text.contains(&rate));
            prop_assert!(text.contains(&flip_method));
            prop_assert!(text.ends_with("appsink"));
        }
    }
}
