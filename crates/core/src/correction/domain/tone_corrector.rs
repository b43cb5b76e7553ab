use crate::shared::luminance::{luminance, pixel_luminance};
use crate::shared::raw_image::{RawImage, CHANNELS};

/// Fixed sampling stride for the luminance mean, so results are reproducible.
pub const SAMPLE_STRIDE: usize = 100;

/// Pivot of the contrast stretch.
const MID_GRAY: f64 = 128.0;

/// How strongly the mean luminance pulls the brightness offset.
const BRIGHTNESS_WEIGHT: f64 = 0.25;

/// Global brightness/contrast normalization with an optional saturation boost.
///
/// Per channel: `(in - 128) * contrast + 128 + (128 - L * 0.25)` where `L` is
/// the stride-sampled mean luminance. The offset `128 - L * 0.25` is at least
/// 64 for any 8-bit mean, so every image is brightened: mid-gray (`L = 128`)
/// gains 96 and lands at 224, and darker images gain more.
///
/// The saturation boost scales each pixel's distance from its own luminance.
/// That keeps luma fixed and approximates an HSL saturation change without a
/// colour-space round trip.
pub struct ToneCorrector {
    contrast_factor: f64,
    saturation_boost: f64,
}

impl ToneCorrector {
    pub fn new(contrast_factor: f64, saturation_boost: f64) -> Self {
        Self {
            contrast_factor,
            saturation_boost,
        }
    }

    /// Mean luminance over every `SAMPLE_STRIDE`th pixel, starting at pixel 0.
    pub fn mean_luminance(image: &RawImage) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for pixel in image.pixels().step_by(SAMPLE_STRIDE) {
            sum += pixel_luminance(pixel);
            count += 1;
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    pub fn brightness_adjust(mean_luminance: f64) -> f64 {
        MID_GRAY - mean_luminance * BRIGHTNESS_WEIGHT
    }

    /// Returns a corrected copy; malformed buffers are returned unchanged.
    pub fn correct(&self, image: &RawImage) -> RawImage {
        if !image.is_well_formed() {
            return image.clone();
        }
        let adjust = Self::brightness_adjust(Self::mean_luminance(image));
        let mut out = Vec::with_capacity(image.data().len());
        for pixel in image.pixels() {
            let mut rgb = [0.0f64; 3];
            for (c, value) in rgb.iter_mut().enumerate() {
                *value = (pixel[c] as f64 - MID_GRAY) * self.contrast_factor + MID_GRAY + adjust;
            }
            if self.saturation_boost != 1.0 {
                rgb = self.saturate(rgb);
            }
            for value in rgb {
                out.push(to_channel(value));
            }
            out.push(pixel[CHANNELS - 1]);
        }
        RawImage::new(out, image.width(), image.height())
    }

    fn saturate(&self, rgb: [f64; 3]) -> [f64; 3] {
        let [r, g, b] = rgb.map(|v| v.clamp(0.0, 255.0));
        let y = luminance(r, g, b);
        [r, g, b].map(|v| y + (v - y) * self.saturation_boost)
    }
}

fn to_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0).round() as u8
}
