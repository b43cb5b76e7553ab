use crate::detection::domain::region_locator::DocumentLocation;
use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::raw_image::RawImage;
use crate::shared::region_box::polygon_area;

/// Crops a scanned document to the bounding box of its detected polygon.
///
/// Known limitation: there is no keystone correction. A photo taken at an
/// angle keeps its perspective and picks up background in the corners the
/// polygon does not fill. Framing downstream assumes axis-aligned regions, so
/// adding a real unwarp means re-deriving the crop and zoom math as well.
pub struct BoundingCropper;

impl BoundingCropper {
    pub fn crop(
        &self,
        image: &RawImage,
        document: &DocumentLocation,
    ) -> Result<RawImage, PipelineError> {
        image.check()?;
        let area = polygon_area(&document.vertices);
        if area <= 0.0 {
            return Err(PipelineError::DegenerateGeometry(format!(
                "document polygon of {} vertices encloses no area",
                document.vertices.len()
            )));
        }
        if document.bounds.covers(image.width(), image.height()) {
            return Ok(image.clone());
        }
        let (left, top, width, height) = document.bounds.to_pixel_rect();
        if width == 0 || height == 0 {
            return Err(PipelineError::DegenerateGeometry(format!(
                "document crop {width}x{height} at ({left}, {top})"
            )));
        }
        log::debug!(
            "Document polygon fills {:.0}% of its {width}x{height} crop",
            100.0 * area / (width as f64 * height as f64)
        );
        image.crop(left, top, width, height).ok_or_else(|| {
            PipelineError::DegenerateGeometry(format!(
                "document crop {width}x{height} at ({left}, {top}) leaves {}x{} image",
                image.width(),
                image.height()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::enhancement_result::RegionOrigin;
    use crate::shared::region_box::{Point, RegionBox};

    fn document(points: &[(f64, f64)]) -> DocumentLocation {
        let vertices: Vec<Point> = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        DocumentLocation {
            bounds: RegionBox::bounding(&vertices).unwrap(),
            vertices,
            origin: Some(RegionOrigin::Remote),
        }
    }

    #[test]
    fn test_quadrilateral_crops_to_bounding_box() {
        let image = RawImage::filled(1000, 800, [10, 20, 30, 255]);
        let doc = document(&[(100.0, 50.0), (900.0, 50.0), (900.0, 700.0), (100.0, 700.0)]);
        let out = BoundingCropper.crop(&image, &doc).unwrap();
        assert_eq!((out.width(), out.height()), (800, 650));
    }

    #[test]
    fn test_crop_keeps_source_pixels() {
        let mut data = vec![0u8; 20 * 10 * 4];
        // Mark pixel (5, 3).
        let idx = (3 * 20 + 5) * 4;
        data[idx..idx + 4].copy_from_slice(&[200, 100, 50, 255]);
        let image = RawImage::new(data, 20, 10);
        let doc = document(&[(5.0, 3.0), (15.0, 3.0), (15.0, 9.0), (5.0, 9.0)]);
        let out = BoundingCropper.crop(&image, &doc).unwrap();
        assert_eq!(out.pixel(0, 0), [200, 100, 50, 255]);
    }

    #[test]
    fn test_full_image_fallback_is_noop() {
        let image = RawImage::filled(40, 30, [1, 2, 3, 4]);
        let doc = DocumentLocation::full_image(&image);
        assert_eq!(BoundingCropper.crop(&image, &doc).unwrap(), image);
    }

    #[test]
    fn test_degenerate_polygon_errors() {
        let image = RawImage::filled(40, 30, [0; 4]);
        let doc = document(&[(10.0, 10.0), (10.2, 10.0), (10.2, 20.0), (10.0, 20.0)]);
        assert!(matches!(
            BoundingCropper.crop(&image, &doc),
            Err(PipelineError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_flat_polygon_errors() {
        // Diagonal zig-zag: a 20x10 bounding box around a polygon with no area.
        let image = RawImage::filled(40, 30, [0; 4]);
        let doc = document(&[(5.0, 5.0), (15.0, 10.0), (25.0, 15.0), (15.0, 10.0)]);
        assert!(matches!(
            BoundingCropper.crop(&image, &doc),
            Err(PipelineError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_malformed_image_errors() {
        let image = RawImage::new(vec![0; 3], 40, 30);
        let doc = DocumentLocation::full_image(&RawImage::filled(40, 30, [0; 4]));
        assert!(matches!(
            BoundingCropper.crop(&image, &doc),
            Err(PipelineError::DecodeFailure { .. })
        ));
    }
}
