use ndarray::{s, Array2, Axis};

use crate::shared::luminance::pixel_luminance;
use crate::shared::raw_image::RawImage;
use crate::shared::region_box::RegionBox;

/// The grid is roughly this many cells along the shorter side.
const GRID_DIVISIONS: u32 = 18;
const MIN_CELL_SIZE: u32 = 18;

const MEAN_WEIGHT: f64 = 0.7;
const CONTRAST_WEIGHT: f64 = 0.3;

/// Fractions of width and height, centred, in which a cell centre may win.
const SEARCH_WIDTH: f64 = 0.8;
const SEARCH_HEIGHT: f64 = 0.72;

/// The winner must beat the average candidate by more than this.
const MIN_PROMINENCE: f64 = 1.0;

/// Cells per side of the reported square.
const BOX_CELLS: u32 = 2;

/// Picks the brightest, busiest patch near the centre of the frame.
///
/// This is NOT face detection. It scores a coarse grid by
/// `0.7 * mean luminance + 0.3 * mean absolute deviation from the global
/// mean` and assumes the subject is the cell that wins inside the central
/// search window. That holds for a lit face on a darker background and fails
/// for most else. It exists so framing has something to aim at when no
/// remote detector is configured or reachable.
pub struct HeuristicFaceScanner;

impl HeuristicFaceScanner {
    pub fn cell_size(width: u32, height: u32) -> u32 {
        (width.min(height) / GRID_DIVISIONS).max(MIN_CELL_SIZE)
    }

    /// A square face box in source coordinates, or `None` when nothing stands out.
    pub fn scan(&self, image: &RawImage) -> Option<RegionBox> {
        if image.is_empty() || !image.is_well_formed() {
            return None;
        }
        let (w, h) = (image.width(), image.height());
        let cell = Self::cell_size(w, h);
        let (cols, rows) = (w / cell, h / cell);
        if cols == 0 || rows == 0 {
            return None;
        }

        let plane = luminance_plane(image)?;
        let global_mean = plane.mean()?;

        let (x_lo, x_hi) = search_band(w, SEARCH_WIDTH);
        let (y_lo, y_hi) = search_band(h, SEARCH_HEIGHT);

        let mut best: Option<(f64, f64, f64)> = None;
        let mut score_sum = 0.0;
        let mut candidates = 0usize;

        for row in 0..rows {
            for col in 0..cols {
                let (x0, y0) = ((col * cell) as usize, (row * cell) as usize);
                let cx = x0 as f64 + cell as f64 / 2.0;
                let cy = y0 as f64 + cell as f64 / 2.0;
                if cx < x_lo || cx > x_hi || cy < y_lo || cy > y_hi {
                    continue;
                }
                let patch = plane.slice(s![y0..y0 + cell as usize, x0..x0 + cell as usize]);
                let mean = patch.mean()?;
                let contrast = patch.mapv(|v| (v - global_mean).abs()).mean()?;
                let score = MEAN_WEIGHT * mean + CONTRAST_WEIGHT * contrast;

                score_sum += score;
                candidates += 1;
                if best.map_or(true, |(s, _, _)| score > s) {
                    best = Some((score, cx, cy));
                }
            }
        }

        let (best_score, cx, cy) = best?;
        let average = score_sum / candidates as f64;
        if best_score - average <= MIN_PROMINENCE {
            log::debug!(
                "Heuristic scan: no standout cell (best {best_score:.2}, average {average:.2})"
            );
            return None;
        }

        let side = (cell * BOX_CELLS).min(w).min(h) as f64;
        let left = (cx - side / 2.0).clamp(0.0, w as f64 - side);
        let top = (cy - side / 2.0).clamp(0.0, h as f64 - side);
        RegionBox::new(left, top, side, side).validated(w, h)
    }
}

fn luminance_plane(image: &RawImage) -> Option<Array2<f64>> {
    let pixels = image.as_ndarray()?;
    Some(pixels.map_axis(Axis(2), |px| px.as_slice().map_or(0.0, pixel_luminance)))
}

/// Centred `[lo, hi]` interval covering `fraction` of `extent`.
fn search_band(extent: u32, fraction: f64) -> (f64, f64) {
    let margin = extent as f64 * (1.0 - fraction) / 2.0;
    (margin, extent as f64 - margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    /// Dark image with a bright square of side `size` centred at `(cx, cy)`.
    fn spotlight(width: u32, height: u32, cx: u32, cy: u32, size: u32) -> RawImage {
        let half = size / 2;
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let lit = x + half >= cx && x < cx + half && y + half >= cy && y < cy + half;
                let v = if lit { 235 } else { 30 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        RawImage::new(data, width, height)
    }

    #[rstest]
    #[case::large(1920, 1080, 60)]
    #[case::medium(500, 500, 27)]
    #[case::small_floor(200, 300, 18)]
    fn test_cell_size(#[case] w: u32, #[case] h: u32, #[case] expected: u32) {
        assert_eq!(HeuristicFaceScanner::cell_size(w, h), expected);
    }

    #[test]
    fn test_finds_bright_patch() {
        let image = spotlight(540, 360, 300, 150, 40);
        let region = HeuristicFaceScanner.scan(&image).unwrap();
        let (cx, cy) = region.center();
        assert!((cx - 300.0).abs() <= 20.0, "cx = {cx}");
        assert!((cy - 150.0).abs() <= 20.0, "cy = {cy}");
        // cell 20, box of 2x2 cells
        assert_relative_eq!(region.width, 40.0);
        assert_relative_eq!(region.height, 40.0);
    }

    #[test]
    fn test_uniform_image_reports_nothing() {
        let image = RawImage::filled(500, 500, [128, 128, 128, 255]);
        assert!(HeuristicFaceScanner.scan(&image).is_none());
    }

    #[test]
    fn test_patch_outside_search_window_is_ignored() {
        // Spot in the top-left corner, outside the central window.
        let image = spotlight(540, 360, 15, 15, 30);
        assert!(HeuristicFaceScanner.scan(&image).is_none());
    }

    #[test]
    fn test_box_stays_inside_image() {
        let image = spotlight(200, 120, 100, 60, 30);
        if let Some(region) = HeuristicFaceScanner.scan(&image) {
            assert!(region.fits_within(200, 120));
        }
    }

    #[test]
    fn test_image_smaller_than_a_cell() {
        assert!(HeuristicFaceScanner
            .scan(&RawImage::filled(10, 10, [255; 4]))
            .is_none());
    }

    #[test]
    fn test_malformed_image() {
        assert!(HeuristicFaceScanner
            .scan(&RawImage::new(vec![0; 4], 100, 100))
            .is_none());
    }

    #[test]
    fn test_deterministic() {
        let image = spotlight(540, 360, 260, 180, 50);
        assert_eq!(
            HeuristicFaceScanner.scan(&image),
            HeuristicFaceScanner.scan(&image)
        );
    }

    #[test]
    fn test_search_band() {
        let (lo, hi) = search_band(1000, 0.8);
        assert_relative_eq!(lo, 100.0);
        assert_relative_eq!(hi, 900.0);
    }
}
