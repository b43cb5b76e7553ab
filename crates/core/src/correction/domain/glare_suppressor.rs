use crate::shared::luminance::pixel_luminance;
use crate::shared::raw_image::RawImage;

/// Fraction of the luminance excess removed from each channel.
const REDUCTION_FACTOR: f64 = 0.6;

/// Pulls blown-out pixels back toward the threshold.
///
/// Each channel of a pixel brighter than the threshold loses
/// `(luminance - threshold) * 0.6`. Pixels at or below the threshold are
/// copied bit-for-bit, so bright but properly exposed areas keep their values.
pub struct GlareSuppressor {
    threshold: f64,
}

impl GlareSuppressor {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Returns a suppressed copy; malformed buffers are returned unchanged.
    pub fn suppress(&self, image: &RawImage) -> RawImage {
        if !image.is_well_formed() {
            return image.clone();
        }
        let mut out = Vec::with_capacity(image.data().len());
        for pixel in image.pixels() {
            out.extend_from_slice(&self.suppress_pixel([pixel[0], pixel[1], pixel[2], pixel[3]]));
        }
        RawImage::new(out, image.width(), image.height())
    }

    pub fn suppress_pixel(&self, pixel: [u8; 4]) -> [u8; 4] {
        let lum = pixel_luminance(&pixel);
        if lum <= self.threshold {
            return pixel;
        }
        let reduction = (lum - self.threshold) * REDUCTION_FACTOR;
        let dim = |c: u8| (c as f64 - reduction).max(0.0).round() as u8;
        [dim(pixel[0]), dim(pixel[1]), dim(pixel[2]), pixel[3]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::DEFAULT_GLARE_THRESHOLD;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_white_is_dimmed() {
        // lum 255, excess 25, reduction 15
        let out = GlareSuppressor::new(230.0).suppress_pixel([255, 255, 255, 255]);
        assert_eq!(out, [240, 240, 240, 255]);
    }

    #[rstest]
    #[case::black([0, 0, 0, 255])]
    #[case::at_threshold([230, 230, 230, 255])]
    #[case::saturated_red([255, 0, 0, 255])]
    #[case::bright_but_ok([220, 235, 200, 128])]
    fn test_at_or_below_threshold_untouched(#[case] pixel: [u8; 4]) {
        assert_eq!(GlareSuppressor::new(230.0).suppress_pixel(pixel), pixel);
    }

    #[test]
    fn test_alpha_preserved() {
        let out = GlareSuppressor::new(230.0).suppress_pixel([250, 250, 250, 17]);
        assert_eq!(out[3], 17);
    }

    #[test]
    fn test_suppress_whole_image() {
        let image = RawImage::filled(8, 8, [255, 255, 255, 255]);
        let out = GlareSuppressor::new(240.0).suppress(&image);
        // excess 15, reduction 9
        assert!(out.pixels().all(|p| p == [246, 246, 246, 255]));
        assert_eq!(image.pixel(0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_malformed_returned_unchanged() {
        let image = RawImage::new(vec![255; 5], 2, 2);
        assert_eq!(GlareSuppressor::new(230.0).suppress(&image), image);
    }

    proptest! {
        #[test]
        fn prop_glare_monotonic(r in 0u8..=255, g in 0u8..=255, b in 0u8..=255, a in 0u8..=255) {
            let suppressor = GlareSuppressor::new(DEFAULT_GLARE_THRESHOLD);
            let input = [r, g, b, a];
            let output = suppressor.suppress_pixel(input);
            let before = pixel_luminance(&input);
            let after = pixel_luminance(&output);
            if before > DEFAULT_GLARE_THRESHOLD {
                prop_assert!(after <= before);
            } else {
                prop_assert_eq!(output, input);
            }
            prop_assert_eq!(output[3], a);
        }
    }
}
