//! Drawing: the layered painter and the surfaces it paints onto

mod drawer;
mod pixel;
mod surface;

pub use drawer::{format_time, DrawInput, Drawer, LayoutMetrics, RULER_HEIGHT};
pub use pixel::{Label, PixelCanvas};
pub use surface::{Surface, TextAlign};
