//! Tests for the export formats and the exporter that drives them.
//!
//! Exports write into a temporary directory through the real filesystem
//! sink, or through [`FailingSink`] when a test needs a write to fail.

mod export_tests;
mod yolo_tests;

use std::io;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, Rgba, RgbaImage};

use crate::format::{ExportItem, FsSink, ImageMeta, OutputSink};
use crate::model::{ClassId, ClassRegistry, ShapeStore};

/// Class id of "Water" in [`registry`].
pub(super) const WATER: ClassId = 1;

/// "Class 1" (id 0) and "Water" (id 1).
pub(super) fn registry() -> ClassRegistry {
    let mut registry = ClassRegistry::with_defaults();
    registry.add("Water", "#0000ff").unwrap();
    registry
}

/// The reference box: x=100, y=200, 64x64 on a 1920x1080 image, class 0.
pub(super) fn reference_store() -> ShapeStore {
    let registry = registry();
    let mut store = ShapeStore::new(1920, 1080);
    store.add_bbox(&registry, 100, 200, 64, 64, 0).unwrap();
    store
}

pub(super) fn item(file_name: &str, store: ShapeStore) -> ExportItem {
    ExportItem {
        meta: ImageMeta::new(file_name),
        store,
        pixels: None,
    }
}

/// Item with solid pixels matching the store size.
pub(super) fn item_with_pixels(file_name: &str, store: ShapeStore) -> ExportItem {
    let (width, height) = store.dimensions();
    let pixels = RgbaImage::from_pixel(width, height, Rgba([90, 140, 60, 255]));
    ExportItem {
        meta: ImageMeta::new(file_name),
        store,
        pixels: Some(Arc::new(DynamicImage::ImageRgba8(pixels))),
    }
}

pub(super) fn read_string(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {:?}: {}", path, e))
}

pub(super) fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&read_string(path)).unwrap()
}

/// Filesystem sink that refuses any path containing `fail_on`.
pub(super) struct FailingSink {
    pub fail_on: &'static str,
}

impl OutputSink for FailingSink {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if path.to_string_lossy().contains(self.fail_on) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "write refused",
            ));
        }
        FsSink.write(path, bytes)
    }
}
