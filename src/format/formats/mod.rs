//! Annotation format implementations.

pub(crate) mod coco;
pub(crate) mod json;
pub(crate) mod pascal_voc;
pub(crate) mod yolo;

#[cfg(test)]
mod tests;

pub use coco::CocoFormat;
pub use json::{BBoxEntry, ImageAnnotations, JsonFormat, PolygonEntry, read_annotations};
pub use pascal_voc::PascalVocFormat;
pub use yolo::YoloFormat;

use crate::format::PolygonPolicy;
use crate::format::traits::{ExportContext, ExportResult, ExportUnit, FormatWarning};
use crate::model::ClassId;

/// Axis-aligned rectangle ready for a box-only format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RectEntry {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub class_id: ClassId,
}

/// Every shape of a unit as a rectangle, for formats without polygons.
///
/// Bounding boxes come first in store order, then polygons handled per the
/// polygon policy. A converted polygon adds an info entry, a skipped one
/// a warning.
pub(crate) fn rect_entries(
    ctx: &ExportContext<'_>,
    unit: &ExportUnit<'_>,
    format: &str,
    result: &mut ExportResult,
) -> Vec<RectEntry> {
    let mut rects: Vec<RectEntry> = unit
        .store
        .bboxes()
        .iter()
        .map(|b| RectEntry {
            x: b.x,
            y: b.y,
            width: b.width,
            height: b.height,
            class_id: b.class_id,
        })
        .collect();

    for polygon in unit.store.polygons() {
        match ctx.options.polygon_policy {
            PolygonPolicy::BoundingRect => {
                let (x, y, width, height) = polygon.bounding_rect();
                rects.push(RectEntry {
                    x,
                    y,
                    width,
                    height,
                    class_id: polygon.class_id,
                });
                result.add_warning(
                    FormatWarning::info(format!(
                        "Polygon {} exported to {} as its bounding rectangle",
                        polygon.id, format
                    ))
                    .with_image(&unit.file_name),
                );
            }
            PolygonPolicy::Skip => {
                result.add_warning(
                    FormatWarning::warning(format!(
                        "Polygon {} skipped: {} has no polygon support",
                        polygon.id, format
                    ))
                    .with_image(&unit.file_name),
                );
            }
        }
    }

    rects
}
