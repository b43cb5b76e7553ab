use std::path::Path;

use crate::shared::raw_image::RawImage;

/// Decodes an image file into RGBA pixels.
pub trait ImageReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<RawImage, Box<dyn std::error::Error>>;
}
