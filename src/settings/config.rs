use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width of the encoded output frame.
pub const OUTPUT_WIDTH: u32 = 480;
/// Height of the encoded output frame.
pub const OUTPUT_HEIGHT: u32 = 360;
/// Side lengths of the region sampled from the source frame.
pub const SAMPLE_WIDTH: u32 = 400;
pub const SAMPLE_HEIGHT: u32 = 400;
/// Centering targets used to position the sample region.
///
/// These intentionally differ from the sample size: the crop origin is
/// computed against 400x550 while 400x400 pixels are actually read.
pub const CROP_TARGET_WIDTH: u32 = 400;
pub const CROP_TARGET_HEIGHT: u32 = 550;
/// Matches the browser default for `image/jpeg` data URLs.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Geometry and encoding parameters for the capture pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureConfig {
    pub output_width: u32,
    pub output_height: u32,
    pub sample_width: u32,
    pub sample_height: u32,
    pub crop_target_width: u32,
    pub crop_target_height: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// Upper bound on frame decode time. `None` waits indefinitely.
    pub decode_timeout_ms: Option<u64>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_width: OUTPUT_WIDTH,
            output_height: OUTPUT_HEIGHT,
            sample_width: SAMPLE_WIDTH,
            sample_height: SAMPLE_HEIGHT,
            crop_target_width: CROP_TARGET_WIDTH,
            crop_target_height: CROP_TARGET_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            decode_timeout_ms: None,
        }
    }
}

impl CaptureConfig {
    /// Load a config from a JSON file, returning defaults when the file is missing.
    ///
    /// Fields absent from the file keep their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the geometry cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dims = [
            ("outputWidth", self.output_width),
            ("outputHeight", self.output_height),
            ("sampleWidth", self.sample_width),
            ("sampleHeight", self.sample_height),
        ];
        if let Some((name, _)) = dims.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be positive")));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "jpegQuality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}
