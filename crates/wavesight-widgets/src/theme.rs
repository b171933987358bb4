//! Color conversion and visual constants for the waveform widget

use iced::Color;
use wavesight_core::Rgba;

/// Default widget height in logical pixels
pub const WAVEFORM_HEIGHT: f32 = 128.0;

/// Pointer travel (logical pixels) before a press counts as a drag
pub const DRAG_THRESHOLD: f32 = 3.0;

/// Convert an option color into an iced color
pub fn to_iced(color: Rgba) -> Color {
    Color::from_rgba(color.r, color.g, color.b, color.a)
}
