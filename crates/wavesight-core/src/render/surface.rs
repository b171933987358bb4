//! Paint target abstraction
//!
//! The drawer speaks in device pixels. Implementations that work in logical
//! units (an iced frame) divide by the pixel ratio themselves.

use crate::config::Rgba;

/// Horizontal anchoring of a text label relative to its x coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// A canvas the drawer can paint onto
pub trait Surface {
    /// Size in device pixels (width, height)
    fn size(&self) -> (f32, f32);

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba);

    /// Text label with its top edge at `y`; `size` is the font size in device pixels
    fn text(&mut self, x: f32, y: f32, label: &str, size: f32, align: TextAlign, color: Rgba);

    /// Vertical line `width` pixels wide centered on `x`
    fn vline(&mut self, x: f32, top: f32, bottom: f32, width: f32, color: Rgba) {
        self.fill_rect(x - width / 2.0, top, width, bottom - top, color);
    }

    fn clear(&mut self, color: Rgba) {
        let (width, height) = self.size();
        self.fill_rect(0.0, 0.0, width, height, color);
    }
}
