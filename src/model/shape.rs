//! Shape types stored per image.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ClassId;

/// A pixel position in image space.
pub type Point = (u32, u32);

/// Which id counter a shape id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Axis-aligned rectangle
    BBox,
    /// Closed polygon
    Polygon,
}

impl ShapeKind {
    /// Name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::BBox => "bbox",
            ShapeKind::Polygon => "polygon",
        }
    }
}

/// Identifies one shape in a store.
///
/// Bounding boxes and polygons number independently, so an id is only
/// meaningful together with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeId {
    /// Bounding box id
    BBox(u32),
    /// Polygon id
    Polygon(u32),
}

impl ShapeId {
    /// The numeric id within its kind.
    pub fn value(&self) -> u32 {
        match self {
            ShapeId::BBox(id) | ShapeId::Polygon(id) => *id,
        }
    }

    /// The kind of shape this id refers to.
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeId::BBox(_) => ShapeKind::BBox,
            ShapeId::Polygon(_) => ShapeKind::Polygon,
        }
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind().name(), self.value())
    }
}

/// Land-use category attached to a shape by the tile classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLabel {
    /// Category name, e.g. "Forest"
    pub category: String,
    /// Category color as `#rrggbb`
    pub color: String,
}

/// Axis-aligned bounding box in image pixels.
///
/// `x + width <= image width` and `y + height <= image height` always hold
/// for boxes owned by a [`ShapeStore`](crate::model::ShapeStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BBox {
    pub id: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub class_id: ClassId,
    /// Optional classifier output for tile-based labelling
    pub tile_label: Option<TileLabel>,
}

impl BBox {
    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Area in square pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Whether the pixel `(px, py)` lies inside the box.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= f64::from(self.x)
            && py >= f64::from(self.y)
            && px < f64::from(self.right())
            && py < f64::from(self.bottom())
    }
}

/// Closed polygon in image pixels.
///
/// Point order is insertion order and defines the winding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    pub id: u32,
    pub points: Vec<Point>,
    pub class_id: ClassId,
}

impl Polygon {
    /// Bounding rectangle as `(x, y, width, height)` from the min/max vertex.
    pub fn bounding_rect(&self) -> (u32, u32, u32, u32) {
        let min_x = self.points.iter().map(|p| p.0).min().unwrap_or(0);
        let max_x = self.points.iter().map(|p| p.0).max().unwrap_or(0);
        let min_y = self.points.iter().map(|p| p.1).min().unwrap_or(0);
        let max_y = self.points.iter().map(|p| p.1).max().unwrap_or(0);
        (min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Enclosed area using the shoelace formula.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }

        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            let (xi, yi) = (f64::from(self.points[i].0), f64::from(self.points[i].1));
            let (xj, yj) = (f64::from(self.points[j].0), f64::from(self.points[j].1));
            area += xi * yj - xj * yi;
        }
        (area / 2.0).abs()
    }

    /// Even-odd point-in-polygon test.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        let n = self.points.len();
        let mut inside = false;
        let mut j = n.wrapping_sub(1);
        for i in 0..n {
            let (xi, yi) = (f64::from(self.points[i].0), f64::from(self.points[i].1));
            let (xj, yj) = (f64::from(self.points[j].0), f64::from(self.points[j].1));
            if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Requested geometry for [`ShapeStore::move_or_resize`](crate::model::ShapeStore::move_or_resize).
///
/// Coordinates are signed so pointer positions outside the image can be
/// passed straight through and clamped by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Geometry {
    /// New rectangle for a bounding box
    Rect {
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    },
    /// New vertex list for a polygon
    Points(Vec<(i64, i64)>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon {
            id: 1,
            points: vec![(10, 20), (50, 20), (50, 80), (10, 80)],
            class_id: 0,
        }
    }

    #[test]
    fn test_polygon_area() {
        assert!((square().area() - 2400.0).abs() < 1e-9);

        let triangle = Polygon {
            id: 2,
            points: vec![(0, 0), (2, 0), (1, 2)],
            class_id: 0,
        };
        assert!((triangle.area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_bounding_rect() {
        assert_eq!(square().bounding_rect(), (10, 20, 40, 60));
    }

    #[test]
    fn test_polygon_contains() {
        let poly = square();
        assert!(poly.contains(30.0, 50.0));
        assert!(!poly.contains(5.0, 50.0));
        assert!(!poly.contains(30.0, 90.0));
    }

    #[test]
    fn test_bbox_edges() {
        let bbox = BBox {
            id: 1,
            x: 100,
            y: 200,
            width: 64,
            height: 64,
            class_id: 0,
            tile_label: None,
        };
        assert_eq!(bbox.right(), 164);
        assert_eq!(bbox.bottom(), 264);
        assert_eq!(bbox.area(), 4096);
        assert!(bbox.contains(100.0, 200.0));
        assert!(!bbox.contains(164.0, 200.0));
    }

    #[test]
    fn test_shape_id_display() {
        assert_eq!(ShapeId::BBox(3).to_string(), "bbox 3");
        assert_eq!(ShapeId::Polygon(7).to_string(), "polygon 7");
    }
}
