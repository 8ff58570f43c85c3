//! Annotation export system.
//!
//! Each output format implements the [`AnnotationFormat`] trait. The
//! [`Exporter`] drives a format over a list of images: it validates the
//! configuration before any I/O, expands augmentation variants, writes
//! images, annotations and crops through an [`OutputSink`], and collects
//! per-item failures instead of stopping at the first one.
//!
//! ## Supported Formats
//!
//! - **JSON**: Native per-image format with full fidelity, readable back
//! - **COCO JSON**: One aggregate file with boxes and polygon segmentation
//! - **Pascal VOC XML**: One XML file per image, boxes only
//! - **YOLO TXT**: One label file per image plus a shared `classes.txt`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use regionmark::format::{ExportFormat, Exporter};
//!
//! let result = Exporter::new(ExportFormat::Coco, &registry).run(&items, out_dir)?;
//! println!("{} files written", result.written.len());
//! ```

pub mod crops;
mod error;
pub mod formats;
mod traits;

pub use error::{ConfigError, ExportError};
pub use formats::{ImageAnnotations, read_annotations};
pub use traits::{
    AnnotationFormat, ExportContext, ExportFailure, ExportResult, ExportUnit, FormatWarning,
    FsSink, OutputSink, WarningSeverity,
};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use crate::augment::{AugmentationSpec, VariantPlan};
use crate::model::{ClassRegistry, ShapeStore};
use crate::task::{CancelToken, ExportProgress};
use formats::{CocoFormat, JsonFormat, PascalVocFormat, YoloFormat};
use traits::write_png;

/// Directory that receives exported image files.
pub const IMAGES_DIR: &str = "images";

static FS_SINK: FsSink = FsSink;

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Per-image JSON
    #[default]
    Json,
    Coco,
    #[serde(alias = "pascal-voc")]
    Voc,
    Yolo,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Json,
        ExportFormat::Coco,
        ExportFormat::Voc,
        ExportFormat::Yolo,
    ];

    /// Identifier used on the command line and in config files.
    pub fn id(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Coco => "coco",
            ExportFormat::Voc => "voc",
            ExportFormat::Yolo => "yolo",
        }
    }

    /// Whether the format cannot be written without any class.
    pub fn requires_classes(&self) -> bool {
        matches!(self, ExportFormat::Coco | ExportFormat::Yolo)
    }

    /// Fresh format state for one export call.
    pub fn handler(&self) -> Box<dyn AnnotationFormat> {
        match self {
            ExportFormat::Json => Box::new(JsonFormat),
            ExportFormat::Coco => Box::new(CocoFormat::new()),
            ExportFormat::Voc => Box::new(PascalVocFormat),
            ExportFormat::Yolo => Box::new(YoloFormat::new()),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "coco" => Ok(ExportFormat::Coco),
            "voc" | "pascal-voc" | "pascal_voc" => Ok(ExportFormat::Voc),
            "yolo" => Ok(ExportFormat::Yolo),
            _ => Err(ConfigError::UnknownFormat {
                name: s.to_string(),
            }),
        }
    }
}

/// What box-only formats do with polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolygonPolicy {
    /// Export the axis-aligned bounding rectangle
    #[default]
    BoundingRect,
    /// Leave polygons out
    Skip,
}

/// Which cropped PNGs to write next to the annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropMode {
    #[default]
    None,
    /// One crop per bounding box and per polygon
    Shapes,
    /// Fixed-size tiles covering the whole image
    Tiles(u32),
}

/// Options for an export call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportOptions {
    pub polygon_policy: PolygonPolicy,
    /// Write each image as PNG under `images/`
    pub write_images: bool,
    pub crops: CropMode,
    /// Expand every image into augmented variants. Variants are always
    /// written as images since they exist nowhere else.
    pub augmentation: AugmentationSpec,
}

impl ExportOptions {
    /// Whether any output needs pixel data.
    pub fn needs_pixels(&self) -> bool {
        self.write_images || self.crops != CropMode::None || self.augmentation.is_enabled()
    }
}

/// Identity of a source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMeta {
    /// File name recorded in the annotations, e.g. `field.png`
    pub file_name: String,
    /// Where the pixels were loaded from, if anywhere
    pub source: Option<PathBuf>,
}

impl ImageMeta {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// File name without extension, the base of every derived file name.
    pub fn stem(&self) -> String {
        Path::new(&self.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_name.clone())
    }
}

/// One image handed to the exporter.
#[derive(Debug, Clone)]
pub struct ExportItem {
    pub meta: ImageMeta,
    pub store: ShapeStore,
    /// Pixel data; only required when the options need pixels
    pub pixels: Option<Arc<DynamicImage>>,
}

/// Builder for one export call.
pub struct Exporter<'a> {
    format: ExportFormat,
    registry: &'a ClassRegistry,
    options: ExportOptions,
    sink: &'a dyn OutputSink,
    cancel: Option<CancelToken>,
    progress: Option<Box<dyn FnMut(ExportProgress) + 'a>>,
}

impl<'a> Exporter<'a> {
    /// Exporter writing to the local filesystem with default options.
    pub fn new(format: ExportFormat, registry: &'a ClassRegistry) -> Self {
        Self {
            format,
            registry,
            options: ExportOptions::default(),
            sink: &FS_SINK,
            cancel: None,
            progress: None,
        }
    }

    pub fn options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sink(mut self, sink: &'a dyn OutputSink) -> Self {
        self.sink = sink;
        self
    }

    /// Stop between images once `token` is cancelled.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Called after each source image.
    pub fn on_progress(mut self, callback: impl FnMut(ExportProgress) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Check the configuration without writing anything.
    pub fn validate(&self, items: &[ExportItem]) -> Result<(), ConfigError> {
        if items.is_empty() {
            return Err(ConfigError::NoImages);
        }
        if self.format.requires_classes() && self.registry.is_empty() {
            return Err(ConfigError::EmptyRegistry {
                format: self.format,
            });
        }
        if self.options.crops == CropMode::Tiles(0) {
            return Err(ConfigError::InvalidTileSize);
        }

        let needs_pixels = self.options.needs_pixels();
        for item in items {
            match &item.pixels {
                None if needs_pixels => {
                    return Err(ConfigError::MissingPixels {
                        image: item.meta.file_name.clone(),
                    });
                }
                Some(pixels) if pixels.dimensions() != item.store.dimensions() => {
                    return Err(ConfigError::DimensionMismatch {
                        image: item.meta.file_name.clone(),
                        expected: item.store.dimensions(),
                        actual: pixels.dimensions(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Run the export into `root`.
    ///
    /// Configuration errors fail before any I/O. Per-item write errors are
    /// collected in [`ExportResult::failures`] and the export goes on. A
    /// cancellation returns [`ExportError::Cancelled`] with everything done
    /// so far; files already written stay on disk and the aggregate files
    /// are not written.
    pub fn run(self, items: &[ExportItem], root: &Path) -> Result<ExportResult, ExportError> {
        self.validate(items)?;

        let Exporter {
            format,
            registry,
            options,
            sink,
            cancel,
            mut progress,
        } = self;

        log::info!(
            "Exporting {} images as {} to {:?}",
            items.len(),
            format,
            root
        );

        let mut handler = format.handler();
        let ctx = ExportContext {
            root,
            registry,
            sink,
            options: &options,
        };
        let plan = options
            .augmentation
            .is_enabled()
            .then(|| VariantPlan::new(&options.augmentation));
        let mut result = ExportResult::new();

        for (index, item) in items.iter().enumerate() {
            if cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                log::info!("Export cancelled after {} of {} images", index, items.len());
                return Err(ExportError::Cancelled {
                    partial: Box::new(result),
                });
            }

            export_item(handler.as_mut(), &ctx, item, plan.as_ref(), &mut result);

            if let Some(callback) = progress.as_mut() {
                callback(ExportProgress {
                    completed: index + 1,
                    total: items.len(),
                    image: item.meta.file_name.clone(),
                });
            }
        }

        if let Err(e) = handler.finish(&ctx, &mut result) {
            result.add_failure(None, e);
        }

        log::info!(
            "Exported {} images with {} annotations ({} warnings, {} failures)",
            result.images_exported,
            result.annotations_exported,
            result.warnings.len(),
            result.failures.len()
        );

        Ok(result)
    }
}

/// Export `items` into `root` with default options.
pub fn export(
    format: ExportFormat,
    items: &[ExportItem],
    registry: &ClassRegistry,
    root: &Path,
) -> Result<ExportResult, ExportError> {
    Exporter::new(format, registry).run(items, root)
}

fn export_item(
    handler: &mut dyn AnnotationFormat,
    ctx: &ExportContext<'_>,
    item: &ExportItem,
    plan: Option<&VariantPlan>,
    result: &mut ExportResult,
) {
    let stem = item.meta.stem();
    match (plan, item.pixels.as_deref()) {
        (Some(plan), Some(pixels)) => {
            for variant in plan.variants(pixels, &item.store) {
                let stem = format!("{}_{}", stem, variant.label);
                let unit = ExportUnit {
                    file_name: format!("{}.png", stem),
                    stem,
                    store: &variant.store,
                    image: Some(&variant.image),
                };
                export_unit(handler, ctx, &unit, true, result);
            }
        }
        (_, pixels) => {
            let write_image = ctx.options.write_images;
            let file_name = if write_image {
                format!("{}.png", stem)
            } else {
                item.meta.file_name.clone()
            };
            let unit = ExportUnit {
                file_name,
                stem,
                store: &item.store,
                image: pixels,
            };
            export_unit(handler, ctx, &unit, write_image, result);
        }
    }
}

/// Image first, then annotations, then crops. A failed image write skips
/// the annotations that would reference it.
fn export_unit(
    handler: &mut dyn AnnotationFormat,
    ctx: &ExportContext<'_>,
    unit: &ExportUnit<'_>,
    write_image: bool,
    result: &mut ExportResult,
) {
    if let (true, Some(image)) = (write_image, unit.image) {
        let path = ctx.root.join(IMAGES_DIR).join(&unit.file_name);
        match write_png(ctx.sink, path, image) {
            Ok(path) => result.written.push(path),
            Err(e) => {
                result.add_failure(Some(&unit.file_name), e);
                return;
            }
        }
    }

    match handler.write_image(ctx, unit, result) {
        Ok(count) => {
            result.images_exported += 1;
            result.annotations_exported += count;
        }
        Err(e) => result.add_failure(Some(&unit.file_name), e),
    }

    let Some(image) = unit.image else {
        return;
    };
    match ctx.options.crops {
        CropMode::None => {}
        CropMode::Shapes => crops::write_shape_crops(ctx, unit, image, result),
        CropMode::Tiles(size) => {
            if let Err(e) = crops::write_tiles(ctx, unit, image, size, result) {
                result.add_failure(Some(&unit.file_name), e);
            }
        }
    }
}
