use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    CONTRAST_FACTOR_RANGE, DEFAULT_CONTRAST_FACTOR, DEFAULT_GLARE_THRESHOLD,
    DEFAULT_SATURATION_BOOST, DEFAULT_TARGET_ASPECT_RATIO, GLARE_THRESHOLD_RANGE,
    SATURATION_BOOST_RANGE,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("target aspect ratio must be a positive finite number, got {0}")]
    InvalidAspectRatio(f64),
    #[error("contrast factor must be between {min} and {max}, got {value}")]
    InvalidContrastFactor { value: f64, min: f64, max: f64 },
    #[error("saturation boost must be between {min} and {max}, got {value}")]
    InvalidSaturationBoost { value: f64, min: f64, max: f64 },
    #[error("glare threshold must be between {min} and {max}, got {value}")]
    InvalidGlareThreshold { value: f64, min: f64, max: f64 },
}

/// Options selected once per batch.
///
/// Every flag gates one stage; a disabled stage is an identity transform.
/// Field names serialize in camelCase so settings saved by the web front end
/// load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnhancementConfig {
    /// Rotate portrait captures 90 degrees clockwise.
    pub auto_rotate: bool,
    /// Analyze the background border and normalize tone.
    pub detect_background: bool,
    /// Locate a document and crop to its bounding box.
    pub edge_crop: bool,
    pub remove_glare: bool,
    /// Bias the final crop toward the located face.
    pub center_face: bool,
    /// Crop and zoom to `target_aspect_ratio`.
    pub auto_zoom: bool,
    pub target_aspect_ratio: f64,
    pub contrast_factor: f64,
    pub saturation_boost: f64,
    pub glare_threshold: f64,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            auto_rotate: true,
            detect_background: true,
            edge_crop: true,
            remove_glare: true,
            center_face: true,
            auto_zoom: true,
            target_aspect_ratio: DEFAULT_TARGET_ASPECT_RATIO,
            contrast_factor: DEFAULT_CONTRAST_FACTOR,
            saturation_boost: DEFAULT_SATURATION_BOOST,
            glare_threshold: DEFAULT_GLARE_THRESHOLD,
        }
    }
}

impl EnhancementConfig {
    /// Every stage off; the pipeline returns its input unchanged.
    pub fn disabled() -> Self {
        Self {
            auto_rotate: false,
            detect_background: false,
            edge_crop: false,
            remove_glare: false,
            center_face: false,
            auto_zoom: false,
            ..Self::default()
        }
    }

    /// Whether the face locator has a consumer in this configuration.
    pub fn needs_face(&self) -> bool {
        self.center_face || self.auto_zoom
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target_aspect_ratio.is_finite() || self.target_aspect_ratio <= 0.0 {
            return Err(ConfigError::InvalidAspectRatio(self.target_aspect_ratio));
        }
        if !CONTRAST_FACTOR_RANGE.contains(&self.contrast_factor) {
            return Err(ConfigError::InvalidContrastFactor {
                value: self.contrast_factor,
                min: *CONTRAST_FACTOR_RANGE.start(),
                max: *CONTRAST_FACTOR_RANGE.end(),
            });
        }
        if !SATURATION_BOOST_RANGE.contains(&self.saturation_boost) {
            return Err(ConfigError::InvalidSaturationBoost {
                value: self.saturation_boost,
                min: *SATURATION_BOOST_RANGE.start(),
                max: *SATURATION_BOOST_RANGE.end(),
            });
        }
        if !GLARE_THRESHOLD_RANGE.contains(&self.glare_threshold) {
            return Err(ConfigError::InvalidGlareThreshold {
                value: self.glare_threshold,
                min: *GLARE_THRESHOLD_RANGE.start(),
                max: *GLARE_THRESHOLD_RANGE.end(),
            });
        }
        Ok(())
    }
}
