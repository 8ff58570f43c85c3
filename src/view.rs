//! Image/view coordinate transform and zoom-to-cursor mathematics.
//!
//! The canvas owns a [`ViewState`] and passes it by value into every
//! conversion. Nothing here keeps global state: each operation returns a
//! new `ViewState`.
//!
//! View space is canvas pixels after zoom and pan:
//!
//! ```text
//! view  = image * zoom + pan
//! image = (view - pan) / zoom
//! ```

/// Smallest zoom factor the canvas allows.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom factor the canvas allows.
pub const MAX_ZOOM: f64 = 5.0;
/// Multiplicative step for one zoom-in or zoom-out action.
pub const ZOOM_STEP: f64 = 1.2;

/// Pan/zoom state of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Scale from image pixels to canvas pixels, within `[min_zoom, max_zoom]`
    pub zoom: f64,
    /// Horizontal offset of the image origin, in canvas pixels
    pub pan_x: f64,
    /// Vertical offset of the image origin, in canvas pixels
    pub pan_y: f64,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl ViewState {
    /// Identity view (zoom 1, no pan) for a canvas of the given size.
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            canvas_width,
            canvas_height,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }

    /// Replace the zoom limits, clamping the current zoom into them.
    ///
    /// Inverted limits are swapped. NaN limits leave the view unchanged.
    pub fn with_zoom_limits(self, min_zoom: f64, max_zoom: f64) -> Self {
        let (min_zoom, max_zoom) = (min_zoom.min(max_zoom), min_zoom.max(max_zoom));
        if min_zoom.is_nan() || max_zoom.is_nan() {
            return self;
        }
        let zoom = self.zoom.clamp(min_zoom, max_zoom);
        Self {
            zoom,
            min_zoom,
            max_zoom,
            ..self
        }
    }

    /// Map an image-space point to view space.
    pub fn image_to_view(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.zoom + self.pan_x, y * self.zoom + self.pan_y)
    }

    /// Map a view-space point to image space.
    pub fn view_to_image(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pan_x) / self.zoom, (y - self.pan_y) / self.zoom)
    }

    /// Image pixel under a view-space point, or `None` outside the image.
    pub fn view_to_pixel(&self, x: f64, y: f64, image_width: u32, image_height: u32) -> Option<(u32, u32)> {
        let (ix, iy) = self.view_to_image(x, y);
        let (px, py) = (ix.floor(), iy.floor());
        if px < 0.0 || py < 0.0 || px >= f64::from(image_width) || py >= f64::from(image_height) {
            return None;
        }
        Some((px as u32, py as u32))
    }

    /// Map an image-space rectangle to view space as `(x, y, width, height)`.
    pub fn image_rect_to_view(&self, x: f64, y: f64, width: f64, height: f64) -> (f64, f64, f64, f64) {
        let (vx, vy) = self.image_to_view(x, y);
        (vx, vy, width * self.zoom, height * self.zoom)
    }

    /// Set a new zoom level while keeping the image point under the cursor fixed.
    ///
    /// The algorithm:
    /// 1. Find the image-space point under the cursor
    /// 2. Clamp the requested zoom to the limits
    /// 3. Choose the pan that puts that image point back under the cursor
    pub fn zoom_to(&self, new_zoom: f64, cursor_x: f64, cursor_y: f64) -> ViewState {
        let (img_x, img_y) = self.view_to_image(cursor_x, cursor_y);
        let zoom = new_zoom.clamp(self.min_zoom, self.max_zoom);

        ViewState {
            zoom,
            pan_x: cursor_x - img_x * zoom,
            pan_y: cursor_y - img_y * zoom,
            ..*self
        }
    }

    /// Multiply the zoom by `factor` around the cursor.
    pub fn zoom_at(&self, cursor_x: f64, cursor_y: f64, factor: f64) -> ViewState {
        self.zoom_to(self.zoom * factor, cursor_x, cursor_y)
    }

    /// One zoom-in step around the cursor.
    pub fn zoom_in_at(&self, cursor_x: f64, cursor_y: f64) -> ViewState {
        self.zoom_at(cursor_x, cursor_y, ZOOM_STEP)
    }

    /// One zoom-out step around the cursor.
    pub fn zoom_out_at(&self, cursor_x: f64, cursor_y: f64) -> ViewState {
        self.zoom_at(cursor_x, cursor_y, 1.0 / ZOOM_STEP)
    }

    /// Apply a pan delta in canvas pixels.
    pub fn pan_by(&self, dx: f64, dy: f64) -> ViewState {
        ViewState {
            pan_x: self.pan_x + dx,
            pan_y: self.pan_y + dy,
            ..*self
        }
    }

    /// Center the image in the canvas at the current zoom.
    ///
    /// An image larger than the canvas along an axis is pinned to the
    /// canvas origin on that axis.
    pub fn centered(&self, image_width: u32, image_height: u32) -> ViewState {
        let zoomed_w = f64::from(image_width) * self.zoom;
        let zoomed_h = f64::from(image_height) * self.zoom;
        ViewState {
            pan_x: ((f64::from(self.canvas_width) - zoomed_w) / 2.0).max(0.0),
            pan_y: ((f64::from(self.canvas_height) - zoomed_h) / 2.0).max(0.0),
            ..*self
        }
    }

    /// Zoom so the whole image fits the canvas, then center it.
    pub fn fit(&self, image_width: u32, image_height: u32) -> ViewState {
        if image_width == 0 || image_height == 0 {
            return *self;
        }
        let scale_x = f64::from(self.canvas_width) / f64::from(image_width);
        let scale_y = f64::from(self.canvas_height) / f64::from(image_height);
        let zoom = scale_x.min(scale_y).clamp(self.min_zoom, self.max_zoom);
        ViewState { zoom, ..*self }.centered(image_width, image_height)
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(800, 600)
    }
}
