//! Geometric transforms applied consistently to pixels and shapes.
//!
//! Point remaps on a `W x H` image:
//!
//! | op       | new dims | `(x, y)` maps to     |
//! |----------|----------|----------------------|
//! | rot90    | `H x W`  | `(H-1-y, x)`         |
//! | rot180   | `W x H`  | `(W-1-x, H-1-y)`     |
//! | rot270   | `H x W`  | `(y, W-1-x)`         |
//! | flipH    | `W x H`  | `(W-1-x, y)`         |
//! | flipV    | `W x H`  | `(x, H-1-y)`         |
//!
//! Rotations remap a bounding box through its two opposite corners `(x, y)`
//! and `(x + w, y + h)` and re-derive a normalized box from the min/max.
//! Flips mirror the covered pixel span, so `x' = W - x - w` and
//! `y' = H - y - h`, which is exact for every box inside the image.

use image::DynamicImage;

use crate::augment::Rotation;
use crate::model::{BBox, Polygon, ShapeStore};

/// One pure geometric remap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometricOp {
    Rotate(Rotation),
    FlipHorizontal,
    FlipVertical,
}

impl GeometricOp {
    /// Short label used in variant names.
    pub fn label(&self) -> &'static str {
        match self {
            GeometricOp::Rotate(rotation) => rotation.label(),
            GeometricOp::FlipHorizontal => "flipH",
            GeometricOp::FlipVertical => "flipV",
        }
    }

    /// Image dimensions after the op.
    pub fn output_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        match self {
            GeometricOp::Rotate(Rotation::Cw90 | Rotation::Cw270) => (height, width),
            _ => (width, height),
        }
    }

    /// Remap a point on a `width x height` image.
    ///
    /// Works in signed space so exclusive box corners (which may map to -1)
    /// stay representable.
    pub fn map_point(&self, x: i64, y: i64, width: u32, height: u32) -> (i64, i64) {
        let w = i64::from(width);
        let h = i64::from(height);
        match self {
            GeometricOp::Rotate(Rotation::None) => (x, y),
            GeometricOp::Rotate(Rotation::Cw90) => (h - 1 - y, x),
            GeometricOp::Rotate(Rotation::Cw180) => (w - 1 - x, h - 1 - y),
            GeometricOp::Rotate(Rotation::Cw270) => (y, w - 1 - x),
            GeometricOp::FlipHorizontal => (w - 1 - x, y),
            GeometricOp::FlipVertical => (x, h - 1 - y),
        }
    }

    /// Apply the op to pixel data.
    pub fn apply_to_image(&self, image: &DynamicImage) -> DynamicImage {
        match self {
            GeometricOp::Rotate(Rotation::None) => image.clone(),
            GeometricOp::Rotate(Rotation::Cw90) => image.rotate90(),
            GeometricOp::Rotate(Rotation::Cw180) => image.rotate180(),
            GeometricOp::Rotate(Rotation::Cw270) => image.rotate270(),
            GeometricOp::FlipHorizontal => image.fliph(),
            GeometricOp::FlipVertical => image.flipv(),
        }
    }

    /// Apply the op to every shape, producing a store sized for the new image.
    ///
    /// Shape ids, classes, tile labels and id counters carry over unchanged.
    pub fn apply_to_store(&self, store: &ShapeStore) -> ShapeStore {
        let (width, height) = store.dimensions();
        let (new_w, new_h) = self.output_dimensions(width, height);

        let bboxes = store
            .bboxes()
            .iter()
            .map(|b| self.map_bbox(b, width, height, new_w, new_h))
            .collect();
        let polygons = store
            .polygons()
            .iter()
            .map(|p| self.map_polygon(p, width, height))
            .collect();

        let (next_bbox, next_polygon) = store.next_ids();
        ShapeStore::from_parts(new_w, new_h, bboxes, polygons, next_bbox, next_polygon)
    }

    fn map_bbox(&self, bbox: &BBox, width: u32, height: u32, new_w: u32, new_h: u32) -> BBox {
        match self {
            GeometricOp::FlipHorizontal => {
                return BBox {
                    x: width.saturating_sub(bbox.x + bbox.width),
                    ..bbox.clone()
                };
            }
            GeometricOp::FlipVertical => {
                return BBox {
                    y: height.saturating_sub(bbox.y + bbox.height),
                    ..bbox.clone()
                };
            }
            GeometricOp::Rotate(_) => {}
        }

        let x0 = i64::from(bbox.x);
        let y0 = i64::from(bbox.y);
        let (ax, ay) = self.map_point(x0, y0, width, height);
        let (bx, by) = self.map_point(
            x0 + i64::from(bbox.width),
            y0 + i64::from(bbox.height),
            width,
            height,
        );

        let box_w = (ax - bx).unsigned_abs() as u32;
        let box_h = (ay - by).unsigned_abs() as u32;
        // A box flush with the far edge maps its min corner to -1; shift it
        // back inside, keeping the size.
        let x = ax.min(bx).clamp(0, i64::from(new_w.saturating_sub(box_w)));
        let y = ay.min(by).clamp(0, i64::from(new_h.saturating_sub(box_h)));

        BBox {
            x: x as u32,
            y: y as u32,
            width: box_w,
            height: box_h,
            ..bbox.clone()
        }
    }

    fn map_polygon(&self, polygon: &Polygon, width: u32, height: u32) -> Polygon {
        let points = polygon
            .points
            .iter()
            .map(|&(x, y)| {
                let (nx, ny) = self.map_point(i64::from(x), i64::from(y), width, height);
                (nx.max(0) as u32, ny.max(0) as u32)
            })
            .collect();
        Polygon {
            points,
            ..polygon.clone()
        }
    }
}

/// Apply a sequence of ops in order to both image and shapes.
pub fn apply_all(
    ops: &[GeometricOp],
    image: &DynamicImage,
    store: &ShapeStore,
) -> (DynamicImage, ShapeStore) {
    let mut image = image.clone();
    let mut store = store.clone();
    for op in ops {
        image = op.apply_to_image(&image);
        store = op.apply_to_store(&store);
    }
    (image, store)
}

/// Apply a sequence of ops to shapes only.
pub fn apply_all_to_store(ops: &[GeometricOp], store: &ShapeStore) -> ShapeStore {
    ops.iter()
        .fold(store.clone(), |acc, op| op.apply_to_store(&acc))
}

#[cfg(test)]
mod tests {
    use image::{GenericImageView, Rgba, RgbaImage};

    use super::*;
    use crate::model::{ClassRegistry, ShapeId};

    const ROT90: GeometricOp = GeometricOp::Rotate(Rotation::Cw90);

    fn scenario_store() -> (ShapeStore, ShapeId) {
        let registry = ClassRegistry::with_defaults();
        let mut store = ShapeStore::new(1920, 1080);
        let id = store.add_bbox(&registry, 100, 200, 64, 64, 0).unwrap();
        (store, id)
    }

    #[test]
    fn test_rotate90_bbox_uses_corner_remap() {
        let (store, id) = scenario_store();
        let rotated = ROT90.apply_to_store(&store);

        assert_eq!(rotated.dimensions(), (1080, 1920));
        let bbox = rotated.bbox(id.value()).unwrap();
        assert_eq!((bbox.x, bbox.y), (1080 - 1 - 264, 100));
        assert_eq!((bbox.width, bbox.height), (64, 64));
    }

    #[test]
    fn test_rotate90_swaps_box_extent() {
        let registry = ClassRegistry::with_defaults();
        let mut store = ShapeStore::new(200, 100);
        let id = store.add_bbox(&registry, 10, 20, 30, 40, 0).unwrap();

        let rotated = ROT90.apply_to_store(&store);
        let bbox = rotated.bbox(id.value()).unwrap();
        assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (39, 10, 40, 30));
    }

    #[test]
    fn test_rotate90_four_times_is_identity() {
        let registry = ClassRegistry::with_defaults();
        let mut store = ShapeStore::new(300, 200);
        store.add_bbox(&registry, 10, 20, 30, 40, 0).unwrap();
        store
            .add_polygon(&registry, &[(0, 0), (299, 5), (150, 199)], 0)
            .unwrap();

        let ops = [ROT90; 4];
        assert_eq!(apply_all_to_store(&ops, &store), store);
    }

    #[test]
    fn test_rotations_compose() {
        let (store, _) = scenario_store();
        let twice = apply_all_to_store(&[ROT90, ROT90], &store);
        let once = GeometricOp::Rotate(Rotation::Cw180).apply_to_store(&store);
        assert_eq!(twice, once);

        let thrice = apply_all_to_store(&[ROT90, ROT90, ROT90], &store);
        let direct = GeometricOp::Rotate(Rotation::Cw270).apply_to_store(&store);
        assert_eq!(thrice, direct);
    }

    #[test]
    fn test_flip_is_involution() {
        let (store, id) = scenario_store();
        let flipped = GeometricOp::FlipHorizontal.apply_to_store(&store);
        let bbox = flipped.bbox(id.value()).unwrap();
        assert_eq!((bbox.x, bbox.y), (1920 - 164, 200));

        for op in [GeometricOp::FlipHorizontal, GeometricOp::FlipVertical] {
            assert_eq!(apply_all_to_store(&[op, op], &store), store);
        }
    }

    #[test]
    fn test_flip_of_box_flush_with_far_edge_is_involution() {
        let registry = ClassRegistry::with_defaults();
        let mut store = ShapeStore::new(100, 100);
        let id = store.add_bbox(&registry, 90, 90, 10, 10, 0).unwrap();

        let flipped = GeometricOp::FlipHorizontal.apply_to_store(&store);
        assert_eq!(flipped.bbox(id.value()).unwrap().x, 0);
        let flipped = GeometricOp::FlipVertical.apply_to_store(&store);
        assert_eq!(flipped.bbox(id.value()).unwrap().y, 0);

        for op in [GeometricOp::FlipHorizontal, GeometricOp::FlipVertical] {
            assert_eq!(apply_all_to_store(&[op, op], &store), store);
        }
    }

    #[test]
    fn test_flipped_box_covers_flipped_pixels() {
        let mut img = RgbaImage::new(6, 4);
        for x in 3..6 {
            img.put_pixel(x, 1, Rgba([0, 255, 0, 255]));
        }
        let image = DynamicImage::ImageRgba8(img);
        let registry = ClassRegistry::with_defaults();
        let mut store = ShapeStore::new(6, 4);
        let id = store.add_bbox(&registry, 3, 1, 3, 1, 0).unwrap();

        let (out, flipped) = apply_all(&[GeometricOp::FlipHorizontal], &image, &store);
        let bbox = flipped.bbox(id.value()).unwrap();
        assert_eq!((bbox.x, bbox.width), (0, 3));
        for x in bbox.x..bbox.right() {
            assert_eq!(out.get_pixel(x, 1), Rgba([0, 255, 0, 255]));
        }
    }

    #[test]
    fn test_box_flush_with_far_edge_stays_inside() {
        let registry = ClassRegistry::with_defaults();
        let mut store = ShapeStore::new(100, 50);
        let id = store.add_bbox(&registry, 0, 30, 10, 20, 0).unwrap();

        let rotated = ROT90.apply_to_store(&store);
        let bbox = rotated.bbox(id.value()).unwrap();
        assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (0, 0, 20, 10));
    }

    #[test]
    fn test_pixels_follow_point_remap() {
        let mut img = RgbaImage::new(4, 3);
        img.put_pixel(1, 0, Rgba([255, 0, 0, 255]));
        let image = DynamicImage::ImageRgba8(img);

        for op in [
            ROT90,
            GeometricOp::Rotate(Rotation::Cw180),
            GeometricOp::Rotate(Rotation::Cw270),
            GeometricOp::FlipHorizontal,
            GeometricOp::FlipVertical,
        ] {
            let out = op.apply_to_image(&image);
            assert_eq!(out.dimensions(), op.output_dimensions(4, 3));
            let (x, y) = op.map_point(1, 0, 4, 3);
            assert_eq!(
                out.get_pixel(x as u32, y as u32),
                Rgba([255, 0, 0, 255]),
                "{} moved the pixel somewhere else",
                op.label()
            );
        }
    }

    #[test]
    fn test_ids_and_counters_preserved() {
        let (mut store, _) = scenario_store();
        let registry = ClassRegistry::with_defaults();
        store.remove(ShapeId::BBox(1)).unwrap();
        store.add_bbox(&registry, 0, 0, 5, 5, 0).unwrap();

        let rotated = ROT90.apply_to_store(&store);
        assert_eq!(rotated.next_ids(), store.next_ids());
        assert_eq!(rotated.bboxes()[0].id, 2);
    }
}
