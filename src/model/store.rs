//! Per-image shape storage.

use crate::error::ValidationError;
use crate::model::{
    BBox, ClassId, ClassRegistry, Geometry, Point, Polygon, ShapeId, TileLabel,
};

/// Owns the bounding boxes and polygons of one image.
///
/// Every mutation validates against the registry and the image size first
/// and only then touches the store, so a rejected call changes nothing.
/// Bounding box and polygon ids come from two independent counters that
/// start at 1 and never go backwards, not even across [`clear`](Self::clear).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeStore {
    width: u32,
    height: u32,
    bboxes: Vec<BBox>,
    polygons: Vec<Polygon>,
    next_bbox_id: u32,
    next_polygon_id: u32,
}

impl ShapeStore {
    /// Create an empty store for an image of `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bboxes: Vec::new(),
            polygons: Vec::new(),
            next_bbox_id: 1,
            next_polygon_id: 1,
        }
    }

    /// Rebuild a store from already-valid parts.
    ///
    /// Counters are raised past the highest id present.
    pub(crate) fn from_parts(
        width: u32,
        height: u32,
        bboxes: Vec<BBox>,
        polygons: Vec<Polygon>,
        next_bbox_id: u32,
        next_polygon_id: u32,
    ) -> Self {
        let max_bbox = bboxes.iter().map(|b| b.id).max().unwrap_or(0);
        let max_polygon = polygons.iter().map(|p| p.id).max().unwrap_or(0);
        Self {
            width,
            height,
            bboxes,
            polygons,
            next_bbox_id: next_bbox_id.max(max_bbox + 1),
            next_polygon_id: next_polygon_id.max(max_polygon + 1),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Image dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn bboxes(&self) -> &[BBox] {
        &self.bboxes
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn bbox(&self, id: u32) -> Option<&BBox> {
        self.bboxes.iter().find(|b| b.id == id)
    }

    pub fn polygon(&self, id: u32) -> Option<&Polygon> {
        self.polygons.iter().find(|p| p.id == id)
    }

    /// Next ids the counters will hand out, as `(bbox, polygon)`.
    pub fn next_ids(&self) -> (u32, u32) {
        (self.next_bbox_id, self.next_polygon_id)
    }

    /// Total number of shapes.
    pub fn len(&self) -> usize {
        self.bboxes.len() + self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bboxes.is_empty() && self.polygons.is_empty()
    }

    /// Number of shapes carrying `class_id`.
    pub fn count_class(&self, class_id: ClassId) -> usize {
        self.bboxes.iter().filter(|b| b.class_id == class_id).count()
            + self
                .polygons
                .iter()
                .filter(|p| p.class_id == class_id)
                .count()
    }

    /// Add a bounding box, clamped into the image.
    ///
    /// A box larger than the image is shrunk to the image size, then
    /// shifted back inside while keeping its size.
    pub fn add_bbox(
        &mut self,
        registry: &ClassRegistry,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
        class_id: ClassId,
    ) -> Result<ShapeId, ValidationError> {
        registry.require(class_id)?;
        let (x, y, width, height) = self.clamp_rect(x, y, width, height)?;

        let id = self.next_bbox_id;
        self.next_bbox_id += 1;
        self.bboxes.push(BBox {
            id,
            x,
            y,
            width,
            height,
            class_id,
            tile_label: None,
        });
        log::debug!("Added bbox {} at ({}, {}) {}x{}", id, x, y, width, height);
        Ok(ShapeId::BBox(id))
    }

    /// Add a polygon with every vertex clamped into the image.
    pub fn add_polygon(
        &mut self,
        registry: &ClassRegistry,
        points: &[(i64, i64)],
        class_id: ClassId,
    ) -> Result<ShapeId, ValidationError> {
        registry.require(class_id)?;
        let points = self.clamp_points(points)?;

        let id = self.next_polygon_id;
        self.next_polygon_id += 1;
        log::debug!("Added polygon {} with {} points", id, points.len());
        self.polygons.push(Polygon {
            id,
            points,
            class_id,
        });
        Ok(ShapeId::Polygon(id))
    }

    /// Replace the geometry of an existing shape.
    pub fn move_or_resize(&mut self, id: ShapeId, geometry: Geometry) -> Result<(), ValidationError> {
        match (id, geometry) {
            (
                ShapeId::BBox(raw),
                Geometry::Rect {
                    x,
                    y,
                    width,
                    height,
                },
            ) => {
                let index = self.bbox_index(raw)?;
                let (x, y, width, height) = self.clamp_rect(x, y, width, height)?;
                let bbox = &mut self.bboxes[index];
                bbox.x = x;
                bbox.y = y;
                bbox.width = width;
                bbox.height = height;
                Ok(())
            }
            (ShapeId::Polygon(raw), Geometry::Points(points)) => {
                let index = self.polygon_index(raw)?;
                let points = self.clamp_points(&points)?;
                self.polygons[index].points = points;
                Ok(())
            }
            (ShapeId::BBox(_), Geometry::Points(_)) => {
                self.require(id)?;
                Err(ValidationError::GeometryMismatch {
                    id,
                    expected: "rect",
                })
            }
            (ShapeId::Polygon(_), Geometry::Rect { .. }) => {
                self.require(id)?;
                Err(ValidationError::GeometryMismatch {
                    id,
                    expected: "points",
                })
            }
        }
    }

    /// Remove a shape. Its id is not handed out again.
    pub fn remove(&mut self, id: ShapeId) -> Result<(), ValidationError> {
        match id {
            ShapeId::BBox(raw) => {
                let index = self.bbox_index(raw)?;
                self.bboxes.remove(index);
            }
            ShapeId::Polygon(raw) => {
                let index = self.polygon_index(raw)?;
                self.polygons.remove(index);
            }
        }
        log::debug!("Removed {}", id);
        Ok(())
    }

    /// Assign a different class to a shape.
    pub fn reclassify(
        &mut self,
        registry: &ClassRegistry,
        id: ShapeId,
        class_id: ClassId,
    ) -> Result<(), ValidationError> {
        registry.require(class_id)?;
        match id {
            ShapeId::BBox(raw) => {
                let index = self.bbox_index(raw)?;
                self.bboxes[index].class_id = class_id;
            }
            ShapeId::Polygon(raw) => {
                let index = self.polygon_index(raw)?;
                self.polygons[index].class_id = class_id;
            }
        }
        Ok(())
    }

    /// Attach or clear the tile classifier label of a bounding box.
    pub fn set_tile_label(&mut self, id: u32, label: Option<TileLabel>) -> Result<(), ValidationError> {
        let index = self.bbox_index(id)?;
        self.bboxes[index].tile_label = label;
        Ok(())
    }

    /// Remove every shape. Id counters keep their position.
    pub fn clear(&mut self) {
        self.bboxes.clear();
        self.polygons.clear();
    }

    /// Topmost shape under an image-space point.
    ///
    /// The most recently added bounding box wins, then polygons.
    pub fn shape_at(&self, x: f64, y: f64) -> Option<ShapeId> {
        if let Some(bbox) = self.bboxes.iter().rev().find(|b| b.contains(x, y)) {
            return Some(ShapeId::BBox(bbox.id));
        }
        self.polygons
            .iter()
            .rev()
            .find(|p| p.contains(x, y))
            .map(|p| ShapeId::Polygon(p.id))
    }

    fn require(&self, id: ShapeId) -> Result<(), ValidationError> {
        match id {
            ShapeId::BBox(raw) => self.bbox_index(raw).map(|_| ()),
            ShapeId::Polygon(raw) => self.polygon_index(raw).map(|_| ()),
        }
    }

    fn bbox_index(&self, id: u32) -> Result<usize, ValidationError> {
        self.bboxes
            .iter()
            .position(|b| b.id == id)
            .ok_or(ValidationError::UnknownShape {
                id: ShapeId::BBox(id),
            })
    }

    fn polygon_index(&self, id: u32) -> Result<usize, ValidationError> {
        self.polygons
            .iter()
            .position(|p| p.id == id)
            .ok_or(ValidationError::UnknownShape {
                id: ShapeId::Polygon(id),
            })
    }

    fn clamp_rect(
        &self,
        x: i64,
        y: i64,
        width: i64,
        height: i64,
    ) -> Result<(u32, u32, u32, u32), ValidationError> {
        let degenerate = ValidationError::DegenerateShape { width, height };
        if width <= 0 || height <= 0 {
            return Err(degenerate);
        }

        let max_w = i64::from(self.width);
        let max_h = i64::from(self.height);
        let w = width.min(max_w);
        let h = height.min(max_h);
        if w <= 0 || h <= 0 {
            return Err(degenerate);
        }

        let x = x.clamp(0, max_w - w);
        let y = y.clamp(0, max_h - h);
        Ok((x as u32, y as u32, w as u32, h as u32))
    }

    fn clamp_points(&self, points: &[(i64, i64)]) -> Result<Vec<Point>, ValidationError> {
        if points.len() < 3 {
            return Err(ValidationError::InsufficientPoints {
                count: points.len(),
            });
        }

        let max_x = i64::from(self.width.saturating_sub(1));
        let max_y = i64::from(self.height.saturating_sub(1));
        Ok(points
            .iter()
            .map(|&(x, y)| (x.clamp(0, max_x) as u32, y.clamp(0, max_y) as u32))
            .collect())
    }
}
