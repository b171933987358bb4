//! Wavesight Widgets - iced integration for wavesight waveform displays
//!
//! ## Architecture (iced 0.14 patterns)
//!
//! - **State**: the application owns a `wavesight_core::Waveform`
//! - **View function**: `waveform_view` takes the waveform + callbacks, returns `Element<Message>`
//! - **Canvas Program**: paints through the core drawer and translates events to callbacks
//! - **Subscription**: `tick_subscription` drives coalesced redraws and media polling

pub mod theme;
pub mod waveform;

pub use theme::{to_iced, DRAG_THRESHOLD, WAVEFORM_HEIGHT};
pub use waveform::{
    tick_interval, tick_subscription, waveform_view, FrameSurface, WaveformCanvas, WaveformFrame,
    WaveformInteraction,
};
