//! Waveform display widget
//!
//! - **Canvas Program** (`WaveformCanvas`): paints a core `Waveform` and turns
//!   pointer input into seek / drag / resize callbacks
//! - **View function** (`waveform_view`): wraps the program in an `Element`
//! - **Subscription** (`tick_subscription`): timer the app routes to `Waveform::tick`

mod canvas;
mod subscription;
mod view;

pub use canvas::{FrameSurface, WaveformCanvas, WaveformFrame, WaveformInteraction};
pub use subscription::{tick_interval, tick_subscription};
pub use view::waveform_view;
