//! COCO JSON format implementation.
//!
//! Implements the COCO (Common Objects in Context) annotation format,
//! which is widely used for object detection and segmentation tasks.
//! Everything lands in a single `annotations_coco.json`.

use serde::Serialize;

use crate::format::error::ExportError;
use crate::format::traits::{
    AnnotationFormat, ExportContext, ExportResult, ExportUnit, write_bytes,
};
use crate::model::{ClassId, ClassRegistry};

/// File name of the aggregate dataset.
pub const COCO_FILE_NAME: &str = "annotations_coco.json";

/// COCO JSON format.
///
/// Supports:
/// - Bounding boxes (bbox)
/// - Polygons (segmentation plus their enclosing bbox)
///
/// Category ids are 1-based positions in the class registry. Image and
/// annotation ids count up from 1 across the whole export call.
#[derive(Debug, Default)]
pub struct CocoFormat {
    dataset: CocoDataset,
}

impl CocoFormat {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_annotation_id(&self) -> u64 {
        self.dataset.annotations.len() as u64 + 1
    }
}

impl AnnotationFormat for CocoFormat {
    fn display_name(&self) -> &'static str {
        "COCO (JSON)"
    }

    fn write_image(
        &mut self,
        ctx: &ExportContext<'_>,
        unit: &ExportUnit<'_>,
        _result: &mut ExportResult,
    ) -> Result<usize, ExportError> {
        let store = unit.store;

        // Resolve every category first so a bad class stages nothing.
        let bbox_categories = store
            .bboxes()
            .iter()
            .map(|b| category_id(ctx.registry, b.class_id))
            .collect::<Result<Vec<_>, _>>()?;
        let polygon_categories = store
            .polygons()
            .iter()
            .map(|p| category_id(ctx.registry, p.class_id))
            .collect::<Result<Vec<_>, _>>()?;

        let image_id = self.dataset.images.len() as u64 + 1;
        self.dataset.images.push(CocoImage {
            id: image_id,
            file_name: unit.file_name.clone(),
            width: store.width(),
            height: store.height(),
        });

        for (bbox, category_id) in store.bboxes().iter().zip(bbox_categories) {
            let id = self.next_annotation_id();
            self.dataset.annotations.push(CocoAnnotation {
                id,
                image_id,
                category_id,
                bbox: [bbox.x, bbox.y, bbox.width, bbox.height],
                area: area_number(bbox.area() as f64),
                segmentation: None,
                iscrowd: 0,
            });
        }

        for (polygon, category_id) in store.polygons().iter().zip(polygon_categories) {
            let (x, y, width, height) = polygon.bounding_rect();
            let flat = polygon.points.iter().flat_map(|&(px, py)| [px, py]).collect();
            let id = self.next_annotation_id();
            self.dataset.annotations.push(CocoAnnotation {
                id,
                image_id,
                category_id,
                bbox: [x, y, width, height],
                area: area_number(polygon.area()),
                segmentation: Some(vec![flat]),
                iscrowd: 0,
            });
        }

        Ok(store.len())
    }

    fn finish(
        &mut self,
        ctx: &ExportContext<'_>,
        result: &mut ExportResult,
    ) -> Result<(), ExportError> {
        self.dataset.categories = ctx
            .registry
            .iter()
            .enumerate()
            .map(|(index, class)| CocoCategory {
                id: index as u32 + 1,
                name: class.name.clone(),
                supercategory: "object".to_string(),
            })
            .collect();

        let path = ctx.root.join(COCO_FILE_NAME);
        log::info!("Exporting COCO annotations to {:?}", path);
        let bytes = serde_json::to_vec_pretty(&self.dataset)?;
        result.written.push(write_bytes(ctx.sink, path, &bytes)?);
        Ok(())
    }
}

fn category_id(registry: &ClassRegistry, class_id: ClassId) -> Result<u32, ExportError> {
    registry.require(class_id)?;
    let position = registry.position(class_id).unwrap_or_default();
    Ok(position as u32 + 1)
}

/// Whole areas are written as integers, fractional ones as floats.
fn area_number(area: f64) -> serde_json::Number {
    if area.fract() == 0.0 && area >= 0.0 {
        serde_json::Number::from(area as u64)
    } else {
        serde_json::Number::from_f64(area).unwrap_or_else(|| serde_json::Number::from(0))
    }
}

// COCO data structures

#[derive(Debug, Serialize)]
struct CocoDataset {
    info: CocoInfo,
    images: Vec<CocoImage>,
    annotations: Vec<CocoAnnotation>,
    categories: Vec<CocoCategory>,
}

impl Default for CocoDataset {
    fn default() -> Self {
        Self {
            info: CocoInfo {
                description: "regionmark annotations".to_string(),
                version: "1.0".to_string(),
            },
            images: Vec::new(),
            annotations: Vec::new(),
            categories: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CocoInfo {
    description: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct CocoImage {
    id: u64,
    file_name: String,
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: u32,
    bbox: [u32; 4],
    area: serde_json::Number,
    #[serde(skip_serializing_if = "Option::is_none")]
    segmentation: Option<Vec<Vec<u32>>>,
    iscrowd: u8,
}

#[derive(Debug, Serialize)]
struct CocoCategory {
    id: u32,
    name: String,
    supercategory: String,
}
