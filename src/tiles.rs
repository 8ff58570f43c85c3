//! Fixed-size tile grid over an image.
//!
//! The image is conceptually padded with black on the right and bottom up
//! to a multiple of the tile size, so every tile has the same dimensions.
//! Tiles are addressed by `(row, col)` and named
//! `{image}_tile_r{row}_c{col}.png` when exported.

use image::{DynamicImage, Rgba, RgbaImage};

use crate::model::{BBox, ShapeStore, TileLabel};

/// Grid of square tiles covering an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub image_width: u32,
    pub image_height: u32,
    pub tile_size: u32,
}

impl TileGrid {
    /// Create a grid. Returns `None` for a zero tile size.
    pub fn new(image_width: u32, image_height: u32, tile_size: u32) -> Option<Self> {
        (tile_size > 0).then_some(Self {
            image_width,
            image_height,
            tile_size,
        })
    }

    /// Number of tile rows.
    pub fn rows(&self) -> u32 {
        self.image_height.div_ceil(self.tile_size)
    }

    /// Number of tile columns.
    pub fn cols(&self) -> u32 {
        self.image_width.div_ceil(self.tile_size)
    }

    /// Dimensions of the padded image.
    pub fn padded_dimensions(&self) -> (u32, u32) {
        (self.cols() * self.tile_size, self.rows() * self.tile_size)
    }

    /// Iterate `(row, col)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> {
        let cols = self.cols();
        (0..self.rows()).flat_map(move |row| (0..cols).map(move |col| (row, col)))
    }

    /// Tile containing an image pixel.
    pub fn tile_at(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        if x >= self.image_width || y >= self.image_height {
            return None;
        }
        Some((y / self.tile_size, x / self.tile_size))
    }

    /// Part of a tile that overlaps the real image, as `(x, y, width, height)`.
    pub fn image_rect(&self, row: u32, col: u32) -> (u32, u32, u32, u32) {
        let x = col * self.tile_size;
        let y = row * self.tile_size;
        let w = self.tile_size.min(self.image_width.saturating_sub(x));
        let h = self.tile_size.min(self.image_height.saturating_sub(y));
        (x, y, w, h)
    }

    /// Export file name of a tile.
    pub fn tile_name(stem: &str, row: u32, col: u32) -> String {
        format!("{}_tile_r{}_c{}.png", stem, row, col)
    }

    /// Cut one full-size tile, padding outside the image with opaque black.
    pub fn crop(&self, image: &DynamicImage, row: u32, col: u32) -> RgbaImage {
        let (x, y, w, h) = self.image_rect(row, col);
        let mut tile = RgbaImage::from_pixel(self.tile_size, self.tile_size, Rgba([0, 0, 0, 255]));
        if w > 0 && h > 0 {
            let source = image::imageops::crop_imm(image, x, y, w, h).to_image();
            image::imageops::replace(&mut tile, &source, 0, 0);
        }
        tile
    }

    /// Classifier label for a tile, taken from a labelled box covering it exactly.
    pub fn label<'a>(&self, store: &'a ShapeStore, row: u32, col: u32) -> Option<&'a TileLabel> {
        let rect = self.image_rect(row, col);
        store
            .bboxes()
            .iter()
            .filter(|b| covers(b, rect))
            .find_map(|b| b.tile_label.as_ref())
    }
}

fn covers(bbox: &BBox, (x, y, w, h): (u32, u32, u32, u32)) -> bool {
    bbox.x == x && bbox.y == y && bbox.width == w && bbox.height == h
}
