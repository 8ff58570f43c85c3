//! regionmark - region annotation engine
//!
//! Shape model, image/view coordinate transform, augmentation and
//! multi-format dataset export for rectangle and polygon annotations.
//!
//! # Modules
//!
//! - [`model`]: classes, shapes and the per-image [`ShapeStore`](model::ShapeStore)
//! - [`view`]: zoom and pan mapping between image and canvas coordinates
//! - [`augment`]: geometric and photometric variants that keep shapes aligned
//! - [`format`]: JSON, COCO, Pascal VOC and YOLO export
//! - [`task`]: background export with progress and cancellation

pub mod augment;
pub mod color;
pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod session;
pub mod task;
pub mod tiles;
pub mod view;

pub use error::ValidationError;
pub use format::{ExportError, ExportFormat, ExportOptions, ExportResult, Exporter};
pub use model::{ClassRegistry, ShapeStore};
pub use session::{Session, SessionSnapshot};
pub use task::{CancelToken, ExportOutcome, ExportTask};
pub use view::ViewState;
