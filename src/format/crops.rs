//! Cropped PNG output.
//!
//! Shape crops cut each bounding box out of the image as is. Polygon crops
//! take the polygon's bounding rectangle plus [`POLYGON_PADDING`] pixels on
//! every side and make everything outside the polygon transparent. Tile
//! crops cover the whole image with a [`TileGrid`]; tiles carrying a
//! classifier label land in a subfolder named after the category.

use std::path::PathBuf;

use image::{DynamicImage, Rgba, RgbaImage};

use crate::format::error::{ConfigError, ExportError};
use crate::format::traits::{ExportContext, ExportResult, ExportUnit, write_png};
use crate::model::Polygon;
use crate::tiles::TileGrid;

/// Directory holding every crop.
pub const CROPS_DIR: &str = "crops";

/// Context kept around polygon crops.
pub const POLYGON_PADDING: u32 = 5;

/// Write one crop per shape. Each failure is recorded and the rest go on.
pub(crate) fn write_shape_crops(
    ctx: &ExportContext<'_>,
    unit: &ExportUnit<'_>,
    image: &DynamicImage,
    result: &mut ExportResult,
) {
    let dir = ctx.root.join(CROPS_DIR);

    for bbox in unit.store.bboxes() {
        let crop = image.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height);
        let path = dir.join(format!("{}_shape_{}.png", unit.stem, bbox.id));
        record(result, &unit.file_name, write_png(ctx.sink, path, &crop));
    }

    for polygon in unit.store.polygons() {
        let crop = DynamicImage::ImageRgba8(masked_polygon_crop(image, polygon));
        let path = dir.join(format!("{}_polygon_{}.png", unit.stem, polygon.id));
        record(result, &unit.file_name, write_png(ctx.sink, path, &crop));
    }
}

/// Write every tile of the grid.
pub(crate) fn write_tiles(
    ctx: &ExportContext<'_>,
    unit: &ExportUnit<'_>,
    image: &DynamicImage,
    tile_size: u32,
    result: &mut ExportResult,
) -> Result<(), ExportError> {
    let grid = TileGrid::new(unit.store.width(), unit.store.height(), tile_size)
        .ok_or(ConfigError::InvalidTileSize)?;
    let dir = ctx.root.join(CROPS_DIR);

    for (row, col) in grid.cells() {
        let name = TileGrid::tile_name(&unit.stem, row, col);
        let path = match grid.label(unit.store, row, col) {
            Some(label) => dir.join(&label.category).join(name),
            None => dir.join(name),
        };
        let tile = DynamicImage::ImageRgba8(grid.crop(image, row, col));
        record(result, &unit.file_name, write_png(ctx.sink, path, &tile));
    }
    Ok(())
}

/// Padded bounding-rectangle crop with pixels outside the polygon cleared.
///
/// A pixel is kept when its center lies inside the polygon.
pub fn masked_polygon_crop(image: &DynamicImage, polygon: &Polygon) -> RgbaImage {
    let (x, y, width, height) = polygon.bounding_rect();
    let left = x.saturating_sub(POLYGON_PADDING);
    let top = y.saturating_sub(POLYGON_PADDING);
    let right = (x + width + 1 + POLYGON_PADDING).min(image.width());
    let bottom = (y + height + 1 + POLYGON_PADDING).min(image.height());

    let mut crop = image
        .crop_imm(left, top, right.saturating_sub(left), bottom.saturating_sub(top))
        .to_rgba8();
    for (px, py, pixel) in crop.enumerate_pixels_mut() {
        let cx = f64::from(left + px) + 0.5;
        let cy = f64::from(top + py) + 0.5;
        if !polygon.contains(cx, cy) {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }
    crop
}

fn record(result: &mut ExportResult, image: &str, outcome: Result<PathBuf, ExportError>) {
    match outcome {
        Ok(path) => result.written.push(path),
        Err(e) => result.add_failure(Some(image), e),
    }
}
