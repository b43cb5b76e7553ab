use image::imageops::FilterType;

use crate::detection::domain::region_locator::FaceLocation;
use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::constants::ASPECT_TOLERANCE;
use crate::shared::enhancement_result::RegionOrigin;
use crate::shared::raw_image::RawImage;
use crate::shared::region_box::RegionBox;

/// Share of the base crop height the subject should fill after zooming.
const SUBJECT_HEIGHT_SHARE: f64 = 0.42;
pub const MIN_ZOOM: f64 = 0.85;
pub const MAX_ZOOM: f64 = 2.5;
pub const DEFAULT_ZOOM: f64 = 1.0;

/// Window centre sits this many region heights below the region centre,
/// which leaves the face in the upper-middle third.
const VERTICAL_BIAS: f64 = 0.22;

#[derive(Clone, Debug, PartialEq)]
pub struct FramingOutcome {
    pub image: RawImage,
    /// The source window that was resampled, in whole pixels.
    pub window: RegionBox,
    pub zoom: f64,
    /// Region centre in output pixel coordinates; `None` when the region
    /// centre is not inside the output.
    pub region_center: Option<(f64, f64)>,
}

/// Crops and zooms into the target aspect ratio.
pub struct AspectRatioFramer {
    target: f64,
    center_on_region: bool,
}

impl AspectRatioFramer {
    pub fn new(target: f64, center_on_region: bool) -> Self {
        Self {
            target,
            center_on_region,
        }
    }

    pub fn frame(
        &self,
        image: &RawImage,
        face: Option<&FaceLocation>,
    ) -> Result<FramingOutcome, PipelineError> {
        image.check()?;
        let (sw, sh) = (image.width(), image.height());
        let (out_w, out_h) = output_dimensions(sw, sh, self.target).ok_or_else(|| {
            PipelineError::DegenerateGeometry(format!(
                "no output size for {sw}x{sh} at aspect {}",
                self.target
            ))
        })?;
        let (fw, fh) = (sw as f64, sh as f64);
        let (base_w, base_h) = base_crop(fw, fh, self.target);

        let zoom = face.map_or(DEFAULT_ZOOM, |f| zoom_for_face(base_h, fh, f));
        let (win_w, win_h) = fit_window(base_w / zoom, base_h / zoom, fw, fh);

        let (cx, cy) = match face {
            Some(f) if self.center_on_region => {
                let (rx, ry) = source_center(f, fw, fh);
                (rx, ry + VERTICAL_BIAS * f.height_ratio * fh)
            }
            _ => (fw / 2.0, fh / 2.0),
        };
        let left = (cx - win_w / 2.0).clamp(0.0, (fw - win_w).max(0.0));
        let top = (cy - win_h / 2.0).clamp(0.0, (fh - win_h).max(0.0));

        let (px_left, px_top, px_w, px_h) = RegionBox::new(left, top, win_w, win_h).to_pixel_rect();
        let cropped = image
            .crop(px_left, px_top, px_w, px_h)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                PipelineError::DegenerateGeometry(format!(
                    "window {px_w}x{px_h} at ({px_left}, {px_top}) in {sw}x{sh} image"
                ))
            })?;
        log::debug!(
            "Framing {sw}x{sh}: window {px_w}x{px_h} at ({px_left}, {px_top}), zoom {zoom:.3}, output {out_w}x{out_h}"
        );

        let framed = resample(cropped, out_w, out_h)?;
        let region_center = face.and_then(|f| {
            let (rx, ry) = source_center(f, fw, fh);
            let x = (rx - px_left as f64) * out_w as f64 / px_w as f64;
            let y = (ry - px_top as f64) * out_h as f64 / px_h as f64;
            let inside = (0.0..out_w as f64).contains(&x) && (0.0..out_h as f64).contains(&y);
            if !inside {
                log::debug!("Region centre ({rx:.0}, {ry:.0}) is outside the framed window");
            }
            inside.then_some((x, y))
        });

        Ok(FramingOutcome {
            image: framed,
            window: RegionBox::new(px_left as f64, px_top as f64, px_w as f64, px_h as f64),
            zoom,
            region_center,
        })
    }
}

/// Largest crop of the source at the target ratio, before zoom.
pub fn base_crop(sw: f64, sh: f64, target: f64) -> (f64, f64) {
    if sw / sh > target {
        (sh * target, sh)
    } else {
        (sw, sw / target)
    }
}

/// Integer output size within `ASPECT_TOLERANCE` of `target`.
///
/// Tries the rounded base crop first, then walks the height down from the
/// base crop until the rounded width lands close enough.
pub fn output_dimensions(sw: u32, sh: u32, target: f64) -> Option<(u32, u32)> {
    if sw == 0 || sh == 0 || !target.is_finite() || target <= 0.0 {
        return None;
    }
    let fits = |(w, h): (u32, u32)| {
        w > 0 && h > 0 && w <= sw && h <= sh && (w as f64 / h as f64 - target).abs() < ASPECT_TOLERANCE
    };

    let natural = if sw as f64 / sh as f64 > target {
        ((sh as f64 * target).round() as u32, sh)
    } else {
        (sw, (sw as f64 / target).round() as u32)
    };
    if fits(natural) {
        return Some(natural);
    }

    let (_, base_h) = base_crop(sw as f64, sh as f64, target);
    (1..=base_h.floor() as u32)
        .rev()
        .map(|h| ((h as f64 * target).round() as u32, h))
        .find(|&dims| fits(dims))
}

/// Zoom for a located face.
///
/// Only remote boxes are sized to the subject. A heuristic box is always two
/// grid cells, so it steers the window but leaves the zoom at the default.
pub fn zoom_for_face(base_height: f64, source_height: f64, face: &FaceLocation) -> f64 {
    match face.origin {
        RegionOrigin::Remote => zoom_for_region(base_height, face.height_ratio * source_height),
        RegionOrigin::Heuristic => DEFAULT_ZOOM,
    }
}

pub fn zoom_for_region(base_height: f64, region_height: f64) -> f64 {
    if region_height <= 0.0 || !region_height.is_finite() {
        return DEFAULT_ZOOM;
    }
    (SUBJECT_HEIGHT_SHARE * base_height / region_height).clamp(MIN_ZOOM, MAX_ZOOM)
}

fn source_center(face: &FaceLocation, sw: f64, sh: f64) -> (f64, f64) {
    let (px, py) = face.center_pct;
    (px / 100.0 * sw, py / 100.0 * sh)
}

/// Shrinks a window that is larger than the source, keeping its ratio.
fn fit_window(w: f64, h: f64, sw: f64, sh: f64) -> (f64, f64) {
    let scale = (sw / w).min(sh / h).min(1.0);
    (w * scale, h * scale)
}

fn resample(window: RawImage, out_w: u32, out_h: u32) -> Result<RawImage, PipelineError> {
    if (window.width(), window.height()) == (out_w, out_h) {
        return Ok(window);
    }
    let rgba = window
        .to_rgba()
        .ok_or_else(|| PipelineError::DegenerateGeometry("unreadable crop window".into()))?;
    Ok(RawImage::from_rgba(image::imageops::resize(
        &rgba,
        out_w,
        out_h,
        FilterType::Triangle,
    )))
}
