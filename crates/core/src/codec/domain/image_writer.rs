use std::path::Path;

use crate::shared::raw_image::RawImage;

/// Encodes an image to a file; the format follows the path's extension.
pub trait ImageWriter: Send + Sync {
    fn write(&self, path: &Path, image: &RawImage) -> Result<(), Box<dyn std::error::Error>>;
}
