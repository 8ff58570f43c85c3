//! Error types for export and import operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::error::ValidationError;
use crate::format::ExportFormat;
use crate::format::traits::ExportResult;

/// Export configuration problems, detected before any file is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Format name not recognised
    #[error("Unknown export format '{name}' (expected json, coco, voc or yolo)")]
    UnknownFormat {
        /// The rejected name
        name: String,
    },

    /// Format needs at least one class
    #[error("Format '{format}' requires at least one class in the registry")]
    EmptyRegistry {
        /// The format that was requested
        format: ExportFormat,
    },

    /// Nothing to export
    #[error("No images to export")]
    NoImages,

    /// Pixel output requested for an image without pixel data
    #[error("Image '{image}' has no pixel data but the export writes images, crops or variants")]
    MissingPixels {
        /// The image missing pixels
        image: String,
    },

    /// Pixel data and shape store disagree on dimensions
    #[error("Image '{image}' is {actual:?} but its annotations expect {expected:?}")]
    DimensionMismatch {
        /// The inconsistent image
        image: String,
        /// Dimensions recorded in the shape store
        expected: (u32, u32),
        /// Dimensions of the pixel data
        actual: (u32, u32),
    },

    /// Tile crops with a zero tile size
    #[error("Tile size must be positive")]
    InvalidTileSize,
}

/// Errors produced while exporting or importing annotations.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Configuration rejected before any I/O
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error on a specific path
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML serialization error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Image encoding error
    #[error("Image error on {path:?}: {source}")]
    Image {
        /// Output file being encoded
        path: PathBuf,
        /// Underlying error
        #[source]
        source: image::ImageError,
    },

    /// Imported annotations violate the model
    #[error("Invalid annotation: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid format structure or content
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// Stopped by request. Files already written are left in place.
    #[error("Export cancelled after {} image(s)", .partial.images_exported)]
    Cancelled {
        /// Everything done before the cancellation was seen
        partial: Box<ExportResult>,
    },

    /// Background task could not run to completion
    #[error("Export task failed: {0}")]
    Task(String),
}

impl ExportError {
    /// Create an I/O error tagged with a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Whether this is a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportError::Cancelled { .. })
    }
}
