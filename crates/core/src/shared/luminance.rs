/// Rec. 601 luma weights used for every brightness decision in the pipeline.
const RED_WEIGHT: f64 = 0.299;
const GREEN_WEIGHT: f64 = 0.587;
const BLUE_WEIGHT: f64 = 0.114;

/// Perceptual brightness of an RGB triple on the 0..=255 scale.
#[inline]
pub fn luminance(r: f64, g: f64, b: f64) -> f64 {
    r * RED_WEIGHT + g * GREEN_WEIGHT + b * BLUE_WEIGHT
}

/// Luminance of an `[r, g, b, a]` pixel; alpha is ignored.
#[inline]
pub fn pixel_luminance(pixel: &[u8]) -> f64 {
    luminance(pixel[0] as f64, pixel[1] as f64, pixel[2] as f64)
}
