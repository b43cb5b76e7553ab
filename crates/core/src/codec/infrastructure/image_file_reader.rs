use std::path::Path;

use crate::codec::domain::image_reader::ImageReader;
use crate::shared::raw_image::RawImage;

/// Decodes any format the `image` crate recognizes, converting to RGBA8.
///
/// The format is sniffed from the file contents, so a mislabelled extension
/// still decodes.
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<RawImage, Box<dyn std::error::Error>> {
        let decoded = image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?;
        Ok(RawImage::from_rgba(decoded.to_rgba8()))
    }
}
