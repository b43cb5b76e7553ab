use crate::shared::raw_image::RawImage;

/// Output of the orientation stage.
#[derive(Clone, Debug, PartialEq)]
pub struct Oriented {
    pub image: RawImage,
    /// Clockwise degrees applied: 0 or 90.
    pub rotation: u32,
}

/// Rotates portrait captures to landscape ahead of any analysis.
///
/// Phone captures arrive portrait while every downstream layout is landscape.
/// There is no EXIF handling: the decision is made on dimensions alone.
pub struct OrientationNormalizer {
    auto_rotate: bool,
}

impl OrientationNormalizer {
    pub fn new(auto_rotate: bool) -> Self {
        Self { auto_rotate }
    }

    /// Never fails; zero-area and malformed buffers pass through unchanged.
    pub fn normalize(&self, image: &RawImage) -> Oriented {
        let portrait = image.height() > image.width();
        if !self.auto_rotate || !portrait || image.is_empty() {
            return Oriented {
                image: image.clone(),
                rotation: 0,
            };
        }
        match image.to_rgba() {
            Some(rgba) => Oriented {
                image: RawImage::from_rgba(image::imageops::rotate90(&rgba)),
                rotation: 90,
            },
            None => Oriented {
                image: image.clone(),
                rotation: 0,
            },
        }
    }
}
