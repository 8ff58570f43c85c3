//! YOLO format implementation.
//!
//! YOLO uses one text file per image with normalized coordinates:
//! `class_id x_center y_center width height`, each divided by the image
//! width or height and printed with six decimals. A shared `classes.txt`
//! maps line numbers to class names.
//!
//! Class indices follow the order in which classes first appear across the
//! export, not the registry order. An index is fixed the moment a class is
//! first seen, so label files written early stay valid.

use crate::format::error::ExportError;
use crate::format::formats::{RectEntry, rect_entries};
use crate::format::traits::{
    AnnotationFormat, ExportContext, ExportResult, ExportUnit, write_bytes,
};
use crate::model::ClassId;

/// Directory holding the per-image label files.
pub const LABELS_DIR: &str = "labels";

/// Class list written at the output root.
pub const CLASSES_FILE_NAME: &str = "classes.txt";

/// YOLO format.
#[derive(Debug, Default)]
pub struct YoloFormat {
    /// Classes in first-appearance order; the position is the YOLO index
    seen: Vec<ClassId>,
}

impl YoloFormat {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Position of a class in `seen`, appending it on first sight.
fn index_of(seen: &mut Vec<ClassId>, class_id: ClassId) -> usize {
    match seen.iter().position(|&c| c == class_id) {
        Some(index) => index,
        None => {
            seen.push(class_id);
            seen.len() - 1
        }
    }
}

impl AnnotationFormat for YoloFormat {
    fn display_name(&self) -> &'static str {
        "YOLO (TXT)"
    }

    fn write_image(
        &mut self,
        ctx: &ExportContext<'_>,
        unit: &ExportUnit<'_>,
        result: &mut ExportResult,
    ) -> Result<usize, ExportError> {
        let rects = rect_entries(ctx, unit, self.display_name(), result);
        for rect in &rects {
            ctx.class(rect.class_id)?;
        }

        // A failed write must not claim class indices.
        let mut seen = self.seen.clone();
        let mut content = String::new();
        for rect in &rects {
            let index = index_of(&mut seen, rect.class_id);
            content.push_str(&format_line(index, rect, unit.store.dimensions()));
        }

        let path = ctx.root.join(LABELS_DIR).join(format!("{}.txt", unit.stem));
        result
            .written
            .push(write_bytes(ctx.sink, path, content.as_bytes())?);
        self.seen = seen;
        Ok(rects.len())
    }

    fn finish(
        &mut self,
        ctx: &ExportContext<'_>,
        result: &mut ExportResult,
    ) -> Result<(), ExportError> {
        let mut content = String::new();
        for &class_id in &self.seen {
            content.push_str(&ctx.class(class_id)?.name);
            content.push('\n');
        }
        let path = ctx.root.join(CLASSES_FILE_NAME);
        result
            .written
            .push(write_bytes(ctx.sink, path, content.as_bytes())?);
        Ok(())
    }
}

/// One label line, newline included.
pub(crate) fn format_line(index: usize, rect: &RectEntry, (width, height): (u32, u32)) -> String {
    let (img_w, img_h) = (f64::from(width), f64::from(height));
    let w = f64::from(rect.width);
    let h = f64::from(rect.height);
    let x_center = (f64::from(rect.x) + w / 2.0) / img_w;
    let y_center = (f64::from(rect.y) + h / 2.0) / img_h;
    format!(
        "{} {:.6} {:.6} {:.6} {:.6}\n",
        index,
        x_center,
        y_center,
        w / img_w,
        h / img_h
    )
}
