//! Annotation data model: classes, shapes and the per-image shape store.

mod class;
mod shape;
mod store;

pub use class::{ClassDef, ClassId, ClassRegistry};
pub use shape::{BBox, Geometry, Point, Polygon, ShapeId, ShapeKind, TileLabel};
pub use store::ShapeStore;
