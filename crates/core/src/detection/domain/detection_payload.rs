use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageEncoder;

use crate::detection::domain::region_detector::DetectionError;
use crate::shared::constants::{DETECTION_JPEG_QUALITY, DETECTION_MAX_DIMENSION};
use crate::shared::raw_image::RawImage;

/// The downsampled JPEG sent to a remote detector.
///
/// Also carries the content hash used as the cache key and the factors that
/// map detector coordinates back to the source image.
#[derive(Clone, Debug)]
pub struct DetectionPayload {
    jpeg: Vec<u8>,
    hash: [u8; 32],
    width: u32,
    height: u32,
    scale_x: f64,
    scale_y: f64,
}

impl DetectionPayload {
    pub fn encode(image: &RawImage) -> Result<Self, DetectionError> {
        if image.is_empty() {
            return Err(DetectionError::Encode("zero-area image".into()));
        }
        let rgba = image
            .to_rgba()
            .ok_or_else(|| DetectionError::Encode("malformed pixel buffer".into()))?;
        let (width, height) = downsampled_size(image.width(), image.height());
        let resized = if (width, height) == (image.width(), image.height()) {
            rgba
        } else {
            image::imageops::resize(&rgba, width, height, FilterType::Triangle)
        };
        let rgb = image::DynamicImage::ImageRgba8(resized).to_rgb8();

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, DETECTION_JPEG_QUALITY)
            .write_image(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| DetectionError::Encode(e.to_string()))?;

        let hash = *blake3::hash(&jpeg).as_bytes();
        Ok(Self {
            jpeg,
            hash,
            width,
            height,
            scale_x: image.width() as f64 / width as f64,
            scale_y: image.height() as f64 / height as f64,
        })
    }

    pub fn jpeg(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Source pixels per payload pixel, horizontally.
    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.jpeg)
    }
}

/// Fits the longest side into `DETECTION_MAX_DIMENSION`, never upscaling.
fn downsampled_size(width: u32, height: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= DETECTION_MAX_DIMENSION {
        return (width, height);
    }
    let scale = DETECTION_MAX_DIMENSION as f64 / longest as f64;
    let fit = |v: u32| ((v as f64 * scale).round() as u32).clamp(1, DETECTION_MAX_DIMENSION);
    (fit(width), fit(height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::small(640, 480, (640, 480))]
    #[case::exact(1024, 768, (1024, 768))]
    #[case::landscape(4000, 3000, (1024, 768))]
    #[case::portrait(1080, 1920, (576, 1024))]
    #[case::sliver(5000, 2, (1024, 1))]
    fn test_downsampled_size(#[case] w: u32, #[case] h: u32, #[case] expected: (u32, u32)) {
        assert_eq!(downsampled_size(w, h), expected);
    }

    #[test]
    fn test_encode_produces_jpeg() {
        let payload = DetectionPayload::encode(&RawImage::filled(64, 48, [120, 80, 40, 255])).unwrap();
        assert_eq!(&payload.jpeg()[..2], &[0xFF, 0xD8]);
        assert_eq!((payload.width(), payload.height()), (64, 48));
        assert_relative_eq!(payload.scale_x(), 1.0);
    }

    #[test]
    fn test_encode_downsamples_and_reports_scale() {
        let payload = DetectionPayload::encode(&RawImage::filled(2048, 1536, [0, 0, 0, 255])).unwrap();
        assert_eq!((payload.width(), payload.height()), (1024, 768));
        assert_relative_eq!(payload.scale_x(), 2.0);
        assert_relative_eq!(payload.scale_y(), 2.0);
    }

    #[test]
    fn test_hash_is_content_addressed() {
        let a = DetectionPayload::encode(&RawImage::filled(32, 32, [10, 10, 10, 255])).unwrap();
        let b = DetectionPayload::encode(&RawImage::filled(32, 32, [10, 10, 10, 255])).unwrap();
        let c = DetectionPayload::encode(&RawImage::filled(32, 32, [200, 10, 10, 255])).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn test_base64_decodes_to_jpeg() {
        let payload = DetectionPayload::encode(&RawImage::filled(8, 8, [1, 2, 3, 255])).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(payload.to_base64())
            .unwrap();
        assert_eq!(decoded, payload.jpeg());
    }

    #[test]
    fn test_malformed_image_fails_to_encode() {
        let result = DetectionPayload::encode(&RawImage::new(vec![0; 3], 8, 8));
        assert!(matches!(result, Err(DetectionError::Encode(_))));
    }

    #[test]
    fn test_empty_image_fails_to_encode() {
        let result = DetectionPayload::encode(&RawImage::new(Vec::new(), 0, 8));
        assert!(matches!(result, Err(DetectionError::Encode(_))));
    }
}
