//! Pan and zoom state for the graph canvas.
//!
//! The scale is applied when the graph is rasterized, so every change here
//! means a fresh render. Offsets are whole pixels of the scaled image.

/// Multiplier applied per zoom step (button press or wheel notch).
pub const ZOOM_STEP: f64 = 1.1;
/// Smallest scale the viewer will render at.
pub const MIN_SCALE: f64 = 0.1;
/// Largest scale the viewer will render at.
pub const MAX_SCALE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Render scale (1.0 = the engine's native size).
    pub scale: f64,
    /// Horizontal offset of the image's top-left corner, in pixels.
    pub offset_x: i32,
    /// Vertical offset of the image's top-left corner, in pixels.
    pub offset_y: i32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0,
            offset_y: 0,
        }
    }
}

impl ViewState {
    /// Move the image by a cursor delta.
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.offset_x = self.offset_x.saturating_add(dx);
        self.offset_y = self.offset_y.saturating_add(dy);
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / ZOOM_STEP);
    }

    /// One wheel notch: positive deltas zoom in, everything else zooms out.
    pub fn zoom_wheel(&mut self, delta: i32) {
        if delta > 0 {
            self.zoom_in();
        } else {
            self.zoom_out();
        }
    }

    /// Multiply the scale by `factor`, keeping it inside `[MIN_SCALE, MAX_SCALE]`.
    pub fn zoom_by(&mut self, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
    }

    /// Back to scale 1.0 with no offset.
    pub fn center(&mut self) {
        *self = Self::default();
    }
}
