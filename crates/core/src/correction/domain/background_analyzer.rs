use crate::shared::enhancement_result::BackgroundReport;
use crate::shared::luminance::pixel_luminance;
use crate::shared::raw_image::RawImage;

/// Fraction of each dimension treated as border.
const BORDER_FRACTION: f64 = 0.1;

/// Sample every Nth pixel along each border strip.
const SAMPLE_STEP: usize = 4;

/// Mean border brightness above which the background counts as light.
const LIGHT_BACKGROUND_THRESHOLD: f64 = 0.6;

/// Samples the outer 10% of the image on every side.
///
/// Read-only: the report goes into metadata so callers can, for instance,
/// pick a dark or light card template.
pub struct BackgroundAnalyzer;

impl BackgroundAnalyzer {
    /// `None` when the border is too thin to sample or the buffer is malformed.
    pub fn analyze(&self, image: &RawImage) -> Option<BackgroundReport> {
        if !image.is_well_formed() || image.is_empty() {
            return None;
        }
        let w = image.width() as usize;
        let h = image.height() as usize;
        let edge_w = (w as f64 * BORDER_FRACTION).floor() as usize;
        let edge_h = (h as f64 * BORDER_FRACTION).floor() as usize;

        let mut sum = 0.0;
        let mut count = 0usize;
        let mut sample = |x: usize, y: usize| {
            sum += brightness_at(image, x, y);
            count += 1;
        };

        for y in (0..edge_h).chain(h - edge_h..h) {
            for x in (0..w).step_by(SAMPLE_STEP) {
                sample(x, y);
            }
        }
        for x in (0..edge_w).chain(w - edge_w..w) {
            for y in (0..h).step_by(SAMPLE_STEP) {
                sample(x, y);
            }
        }

        if count == 0 {
            return None;
        }
        let brightness = sum / count as f64;
        Some(BackgroundReport {
            brightness,
            has_light_background: brightness > LIGHT_BACKGROUND_THRESHOLD,
        })
    }
}

fn brightness_at(image: &RawImage, x: usize, y: usize) -> f64 {
    let pixel = image.pixel(x as u32, y as u32);
    pixel_luminance(&pixel) / 255.0
}
