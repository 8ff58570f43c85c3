//! Format trait, output sink abstraction and export result types.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};

use crate::format::ExportOptions;
use crate::format::error::ExportError;
use crate::model::{ClassDef, ClassId, ClassRegistry, ShapeStore};

/// Trait for annotation export formats.
///
/// The exporter drives a format one image at a time and calls
/// [`finish`](Self::finish) once at the end. Per-image formats write their
/// file in `write_image`; aggregate formats stage entries there and write
/// everything in `finish`.
pub trait AnnotationFormat {
    /// Human-readable name for display.
    fn display_name(&self) -> &'static str;

    /// Export one image. Returns the number of annotations written.
    fn write_image(
        &mut self,
        ctx: &ExportContext<'_>,
        unit: &ExportUnit<'_>,
        result: &mut ExportResult,
    ) -> Result<usize, ExportError>;

    /// Write dataset-level files once every image has been seen.
    fn finish(
        &mut self,
        _ctx: &ExportContext<'_>,
        _result: &mut ExportResult,
    ) -> Result<(), ExportError> {
        Ok(())
    }
}

/// Everything shared by the images of one export call.
pub struct ExportContext<'a> {
    /// Output directory
    pub root: &'a Path,
    pub registry: &'a ClassRegistry,
    pub sink: &'a dyn OutputSink,
    pub options: &'a ExportOptions,
}

impl ExportContext<'_> {
    /// Look up the class of a shape being exported.
    pub fn class(&self, class_id: ClassId) -> Result<&ClassDef, ExportError> {
        Ok(self.registry.require(class_id)?)
    }
}

/// One image as seen by a format: the original or an augmented variant.
pub struct ExportUnit<'a> {
    /// Image file name recorded in the annotations
    pub file_name: String,
    /// Base name for every file derived from this image
    pub stem: String,
    pub store: &'a ShapeStore,
    /// Pixels, when the export needs them
    pub image: Option<&'a DynamicImage>,
}

/// Destination for exported files.
///
/// The exporter never touches the filesystem directly, so tests can swap in
/// a sink that fails on chosen paths.
pub trait OutputSink: Send + Sync {
    /// Write `bytes` to `path`, creating parent directories as needed.
    fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()>;
}

/// Sink that writes to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

impl OutputSink for FsSink {
    fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)
    }
}

/// Write bytes through a sink, attaching the path to any error.
pub(crate) fn write_bytes(
    sink: &dyn OutputSink,
    path: PathBuf,
    bytes: &[u8],
) -> Result<PathBuf, ExportError> {
    sink.write(&path, bytes)
        .map_err(|e| ExportError::io(&path, e))?;
    log::debug!("Wrote {:?} ({} bytes)", path, bytes.len());
    Ok(path)
}

/// Encode an image as PNG and write it through a sink.
pub(crate) fn write_png(
    sink: &dyn OutputSink,
    path: PathBuf,
    image: &DynamicImage,
) -> Result<PathBuf, ExportError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| ExportError::Image {
            path: path.clone(),
            source: e,
        })?;
    write_bytes(sink, path, &bytes)
}

/// Result of an export operation.
#[derive(Debug, Default)]
pub struct ExportResult {
    /// Files written, in write order.
    pub written: Vec<PathBuf>,

    /// Items that could not be written. The export carried on past them.
    pub failures: Vec<ExportFailure>,

    /// Warnings generated during export (e.g., lossy polygon conversion).
    pub warnings: Vec<FormatWarning>,

    /// Number of images (including variants) whose annotations were exported.
    pub images_exported: usize,

    /// Number of annotations exported.
    pub annotations_exported: usize,
}

impl ExportResult {
    /// Create a new export result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the result.
    pub fn add_warning(&mut self, warning: FormatWarning) {
        log::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Record a failed write.
    pub fn add_failure(&mut self, image: Option<&str>, error: ExportError) {
        let path = match &error {
            ExportError::Io { path, .. } | ExportError::Image { path, .. } => Some(path.clone()),
            _ => None,
        };
        log::warn!(
            "Export of {} failed: {}",
            image.unwrap_or("dataset"),
            error
        );
        self.failures.push(ExportFailure {
            image: image.map(str::to_string),
            path,
            error,
        });
    }

    /// Check if there were any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if any item failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// One item the exporter could not write.
#[derive(Debug)]
pub struct ExportFailure {
    /// Image the failure belongs to; `None` for dataset-level files
    pub image: Option<String>,
    /// Output path that failed, when known
    pub path: Option<PathBuf>,
    pub error: ExportError,
}

/// Warning generated during format conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatWarning {
    /// Image this warning relates to (if applicable).
    pub image: Option<String>,

    /// Human-readable warning message.
    pub message: String,

    /// Severity level of the warning.
    pub severity: WarningSeverity,
}

impl FormatWarning {
    /// Create a new warning.
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            image: None,
            message: message.into(),
            severity,
        }
    }

    /// Create an info-level warning.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Info)
    }

    /// Create a warning-level warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }

    /// Set the image this warning relates to.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Severity level for format warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational message, not a problem.
    Info,
    /// Warning that something was skipped or modified.
    Warning,
}
