use serde::{Deserialize, Serialize};

use crate::shared::region_box::{Point, RegionBox};

/// What the locator is looking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    Face,
    Document,
}

/// A raw detector answer, before bounds validation.
#[derive(Clone, Debug, PartialEq)]
pub enum Detection {
    Face(RegionBox),
    /// Document polygon; always at least four vertices.
    Document(Vec<Point>),
}

impl Detection {
    pub fn mode(&self) -> DetectionMode {
        match self {
            Detection::Face(_) => DetectionMode::Face,
            Detection::Document(_) => DetectionMode::Document,
        }
    }

    /// Maps coordinates from detector space back to source space.
    pub fn scaled(&self, sx: f64, sy: f64) -> Detection {
        match self {
            Detection::Face(region) => Detection::Face(region.scaled(sx, sy)),
            Detection::Document(vertices) => Detection::Document(
                vertices
                    .iter()
                    .map(|p| Point::new(p.x * sx, p.y * sy))
                    .collect(),
            ),
        }
    }
}
