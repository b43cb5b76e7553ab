use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, ImageFormat};

use crate::codec::domain::image_writer::ImageWriter;
use crate::shared::raw_image::RawImage;

pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Writes RGBA images with the `image` crate.
///
/// JPEG has no alpha channel, so JPEG output is composited over white first.
pub struct ImageFileWriter {
    jpeg_quality: u8,
}

impl ImageFileWriter {
    pub fn new() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Quality is clamped to 1..=100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, image: &RawImage) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let rgba = image
            .to_rgba()
            .ok_or("Pixel buffer does not match image dimensions")?;

        match ImageFormat::from_path(path)? {
            ImageFormat::Jpeg => {
                let rgb = flatten_onto_white(image);
                let file = BufWriter::new(File::create(path)?);
                JpegEncoder::new_with_quality(file, self.jpeg_quality).write_image(
                    &rgb,
                    image.width(),
                    image.height(),
                    image::ExtendedColorType::Rgb8,
                )?;
            }
            _ => rgba.save(path)?,
        }
        Ok(())
    }
}

fn flatten_onto_white(image: &RawImage) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(image.data().len() / 4 * 3);
    for pixel in image.pixels() {
        let alpha = pixel[3] as u32;
        for &c in &pixel[..3] {
            let blended = (c as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }
    rgb
}
