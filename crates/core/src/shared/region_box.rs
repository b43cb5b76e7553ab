use serde::{Deserialize, Serialize};

/// A vertex of a detected document polygon, in source pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Shoelace area of a simple polygon, in either winding order.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice.abs() / 2.0
}

/// Axis-aligned rectangle identifying a detected face or document.
///
/// Coordinates are source-image pixels. A box is only usable once it has
/// passed [`RegionBox::validated`]; detector output that leaves the image is
/// discarded rather than clamped so detector bugs stay visible.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl RegionBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// The whole `width x height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    /// Axis-aligned bounding box of a polygon. `None` for an empty slice.
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.left + self.width / 2.0,
            self.top + self.height / 2.0,
        )
    }

    /// True when the box has positive area and lies inside the source bounds.
    pub fn fits_within(&self, source_width: u32, source_height: u32) -> bool {
        let finite = [self.left, self.top, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.left >= 0.0
            && self.top >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.right() <= source_width as f64
            && self.bottom() <= source_height as f64
    }

    pub fn validated(self, source_width: u32, source_height: u32) -> Option<Self> {
        self.fits_within(source_width, source_height).then_some(self)
    }

    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self::new(self.left * sx, self.top * sy, self.width * sx, self.height * sy)
    }

    /// True when the box covers the whole `width x height` image.
    pub fn covers(&self, width: u32, height: u32) -> bool {
        self.to_pixel_rect() == (0, 0, width, height)
    }

    /// Rounds to whole pixels: `(left, top, width, height)`.
    ///
    /// Edges are rounded independently so a box inside the image stays inside
    /// after rounding.
    pub fn to_pixel_rect(&self) -> (u32, u32, u32, u32) {
        let left = self.left.round().max(0.0) as u32;
        let top = self.top.round().max(0.0) as u32;
        let right = self.right().round().max(0.0) as u32;
        let bottom = self.bottom().round().max(0.0) as u32;
        (
            left,
            top,
            right.saturating_sub(left),
            bottom.saturating_sub(top),
        )
    }
}
