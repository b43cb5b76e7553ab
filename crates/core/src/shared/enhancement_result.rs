use serde::Serialize;

use crate::shared::raw_image::RawImage;

/// Where a located region came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionOrigin {
    Remote,
    Heuristic,
}

/// Brightness of the outer image border.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundReport {
    /// Mean border luminance on a 0..=1 scale.
    pub brightness: f64,
    pub has_light_background: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementMetadata {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: f64,
    /// Clockwise rotation applied, in degrees.
    pub rotation: u32,
    /// True when a region was located and its centre is inside the enhanced image.
    pub region_detected: bool,
    /// Region centre in the enhanced image's pixel coordinates, for a focal marker.
    pub region_center: Option<(f64, f64)>,
    pub region_origin: Option<RegionOrigin>,
    pub background: Option<BackgroundReport>,
    pub zoom: f64,
    /// True when the pipeline failed and `enhanced` is a copy of `original`.
    pub fallback: bool,
}

impl EnhancementMetadata {
    /// Defaults describing an untouched image.
    pub fn untouched(image: &RawImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            aspect_ratio: image.aspect_ratio(),
            rotation: 0,
            region_detected: false,
            region_center: None,
            region_origin: None,
            background: None,
            zoom: 1.0,
            fallback: false,
        }
    }
}

/// The only artifact returned to callers; intermediate buffers stay internal.
#[derive(Clone, Debug, PartialEq)]
pub struct EnhancementResult {
    pub original: RawImage,
    pub enhanced: RawImage,
    pub metadata: EnhancementMetadata,
}

impl EnhancementResult {
    /// `enhanced == original`, used when an image's pipeline fails.
    pub fn fallback(original: RawImage) -> Self {
        let metadata = EnhancementMetadata {
            fallback: true,
            ..EnhancementMetadata::untouched(&original)
        };
        Self {
            enhanced: original.clone(),
            original,
            metadata,
        }
    }
}
