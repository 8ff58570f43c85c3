//! Error types for synchronous model operations.
//!
//! Every mutating call on [`ClassRegistry`](crate::model::ClassRegistry) or
//! [`ShapeStore`](crate::model::ShapeStore) returns a [`ValidationError`] when
//! it rejects its input. A rejected call never leaves partial changes behind.

use thiserror::Error;

use crate::model::{ClassId, ShapeId};

/// Errors raised when a model mutation is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Class id is not present in the registry
    #[error("Unknown class id {class_id}")]
    UnknownClass {
        /// The class id that was referenced
        class_id: ClassId,
    },

    /// Bounding box with zero or negative extent
    #[error("Degenerate bounding box: {width}x{height} (width and height must be positive)")]
    DegenerateShape {
        /// Requested width
        width: i64,
        /// Requested height
        height: i64,
    },

    /// Polygon with fewer than three vertices
    #[error("Polygon needs at least 3 points, got {count}")]
    InsufficientPoints {
        /// Number of points supplied
        count: usize,
    },

    /// Shape id not present in the store
    #[error("Unknown shape: {id}")]
    UnknownShape {
        /// The missing shape
        id: ShapeId,
    },

    /// Geometry variant does not match the shape kind
    #[error("Geometry mismatch for {id}: expected {expected} geometry")]
    GeometryMismatch {
        /// The shape being edited
        id: ShapeId,
        /// The geometry kind the shape requires
        expected: &'static str,
    },

    /// Class name already used by another class
    #[error("Class name '{name}' already exists")]
    DuplicateClassName {
        /// The conflicting name
        name: String,
    },

    /// Class name is empty or whitespace
    #[error("Class name must not be empty")]
    EmptyClassName,

    /// Class cannot be deleted while shapes reference it
    #[error("Class {class_id} is still referenced by {shape_count} shape(s)")]
    ClassInUse {
        /// The class that was targeted for deletion
        class_id: ClassId,
        /// How many shapes still reference it
        shape_count: usize,
    },

    /// Colour string is not `#rrggbb`
    #[error("Invalid color '{value}': expected #rrggbb")]
    InvalidColor {
        /// The rejected colour string
        value: String,
    },
}
