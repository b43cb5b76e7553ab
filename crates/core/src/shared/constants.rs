use std::ops::RangeInclusive;

/// 16:9, the slideshow frame.
pub const DEFAULT_TARGET_ASPECT_RATIO: f64 = 16.0 / 9.0;

pub const DEFAULT_CONTRAST_FACTOR: f64 = 1.25;
pub const CONTRAST_FACTOR_RANGE: RangeInclusive<f64> = 1.1..=1.25;

/// 1.0 leaves saturation untouched.
pub const DEFAULT_SATURATION_BOOST: f64 = 1.0;
pub const SATURATION_BOOST_RANGE: RangeInclusive<f64> = 0.0..=2.0;

pub const DEFAULT_GLARE_THRESHOLD: f64 = 230.0;
pub const GLARE_THRESHOLD_RANGE: RangeInclusive<f64> = 230.0..=240.0;

/// Maximum allowed deviation between output and target aspect ratio.
pub const ASPECT_TOLERANCE: f64 = 1e-3;

/// Longest side of the JPEG sent to the remote detector.
pub const DETECTION_MAX_DIMENSION: u32 = 1024;
pub const DETECTION_JPEG_QUALITY: u8 = 92;
pub const DEFAULT_DETECTOR_TIMEOUT_MS: u64 = 5000;

/// Upper bound on concurrently processed images in a batch.
pub const MAX_BATCH_WORKERS: usize = 8;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
