//! Per-image JSON format.
//!
//! The native format: one `{stem}_annotations.json` per image holding every
//! bounding box and polygon with its class name and color. It is the only
//! format that can be read back, so it doubles as the save file.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::format::error::ExportError;
use crate::format::traits::{
    AnnotationFormat, ExportContext, ExportResult, ExportUnit, write_bytes,
};
use crate::model::{BBox, ClassId, ClassRegistry, Polygon, ShapeStore, TileLabel};

/// Serialized annotations of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAnnotations {
    /// Image file name
    pub image: String,
    pub image_width: u32,
    pub image_height: u32,
    #[serde(default)]
    pub bboxes: Vec<BBoxEntry>,
    #[serde(default)]
    pub polygons: Vec<PolygonEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBoxEntry {
    pub id: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub class: String,
    pub class_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_label: Option<TileLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolygonEntry {
    pub id: u32,
    pub points: Vec<[u32; 2]>,
    pub class: String,
    pub class_color: String,
}

/// Per-image JSON format.
pub struct JsonFormat;

impl AnnotationFormat for JsonFormat {
    fn display_name(&self) -> &'static str {
        "JSON (per image)"
    }

    fn write_image(
        &mut self,
        ctx: &ExportContext<'_>,
        unit: &ExportUnit<'_>,
        result: &mut ExportResult,
    ) -> Result<usize, ExportError> {
        let doc = to_document(ctx.registry, &unit.file_name, unit.store)?;
        let bytes = serde_json::to_vec_pretty(&doc)?;
        let path = ctx.root.join(format!("{}_annotations.json", unit.stem));
        result.written.push(write_bytes(ctx.sink, path, &bytes)?);
        Ok(unit.store.len())
    }
}

/// Build the serializable document for one image.
pub fn to_document(
    registry: &ClassRegistry,
    file_name: &str,
    store: &ShapeStore,
) -> Result<ImageAnnotations, ExportError> {
    let bboxes = store
        .bboxes()
        .iter()
        .map(|b| {
            let class = registry.require(b.class_id)?;
            Ok(BBoxEntry {
                id: b.id,
                x: b.x,
                y: b.y,
                width: b.width,
                height: b.height,
                class: class.name.clone(),
                class_color: class.color.clone(),
                tile_label: b.tile_label.clone(),
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    let polygons = store
        .polygons()
        .iter()
        .map(|p| {
            let class = registry.require(p.class_id)?;
            Ok(PolygonEntry {
                id: p.id,
                points: p.points.iter().map(|&(x, y)| [x, y]).collect(),
                class: class.name.clone(),
                class_color: class.color.clone(),
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    Ok(ImageAnnotations {
        image: file_name.to_string(),
        image_width: store.width(),
        image_height: store.height(),
        bboxes,
        polygons,
    })
}

/// Parse a JSON annotation file and rebuild its store.
///
/// Class names missing from `registry` are added with the color stored in
/// the file. Shape ids are kept, and the store's counters continue after
/// the highest one. Shapes that do not fit the image are rejected.
pub fn read_annotations(
    bytes: &[u8],
    registry: &mut ClassRegistry,
) -> Result<(ImageAnnotations, ShapeStore), ExportError> {
    let doc: ImageAnnotations = serde_json::from_slice(bytes)?;
    let (width, height) = (doc.image_width, doc.image_height);
    if width == 0 || height == 0 {
        return Err(ExportError::invalid_format(format!(
            "Image '{}' has zero size {}x{}",
            doc.image, width, height
        )));
    }

    let mut seen = HashSet::new();
    let mut bboxes = Vec::with_capacity(doc.bboxes.len());
    for entry in &doc.bboxes {
        if !seen.insert(entry.id) {
            return Err(ExportError::invalid_format(format!(
                "Duplicate bbox id {} in '{}'",
                entry.id, doc.image
            )));
        }
        if entry.width == 0 || entry.height == 0 {
            return Err(ValidationError::DegenerateShape {
                width: i64::from(entry.width),
                height: i64::from(entry.height),
            }
            .into());
        }
        let fits = u64::from(entry.x) + u64::from(entry.width) <= u64::from(width)
            && u64::from(entry.y) + u64::from(entry.height) <= u64::from(height);
        if !fits {
            return Err(ExportError::invalid_format(format!(
                "Bbox {} in '{}' extends past the {}x{} image",
                entry.id, doc.image, width, height
            )));
        }
        bboxes.push(BBox {
            id: entry.id,
            x: entry.x,
            y: entry.y,
            width: entry.width,
            height: entry.height,
            class_id: resolve_class(registry, &entry.class, &entry.class_color)?,
            tile_label: entry.tile_label.clone(),
        });
    }

    seen.clear();
    let mut polygons = Vec::with_capacity(doc.polygons.len());
    for entry in &doc.polygons {
        if !seen.insert(entry.id) {
            return Err(ExportError::invalid_format(format!(
                "Duplicate polygon id {} in '{}'",
                entry.id, doc.image
            )));
        }
        if entry.points.len() < 3 {
            return Err(ValidationError::InsufficientPoints {
                count: entry.points.len(),
            }
            .into());
        }
        if entry.points.iter().any(|&[x, y]| x >= width || y >= height) {
            return Err(ExportError::invalid_format(format!(
                "Polygon {} in '{}' has a vertex outside the {}x{} image",
                entry.id, doc.image, width, height
            )));
        }
        polygons.push(Polygon {
            id: entry.id,
            points: entry.points.iter().map(|&[x, y]| (x, y)).collect(),
            class_id: resolve_class(registry, &entry.class, &entry.class_color)?,
        });
    }

    log::debug!(
        "Read {} bboxes and {} polygons for '{}'",
        bboxes.len(),
        polygons.len(),
        doc.image
    );
    let store = ShapeStore::from_parts(width, height, bboxes, polygons, 1, 1);
    Ok((doc, store))
}

fn resolve_class(
    registry: &mut ClassRegistry,
    name: &str,
    color: &str,
) -> Result<ClassId, ValidationError> {
    if let Some(class) = registry.by_name(name) {
        return Ok(class.id);
    }
    log::info!("Registering class '{}' from imported annotations", name);
    match registry.add(name, color) {
        Err(ValidationError::InvalidColor { .. }) => registry.add_with_palette_color(name),
        other => other,
    }
}
