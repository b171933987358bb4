//! Waveform view function
//!
//! ## Usage
//!
//! ```ignore
//! fn view(&self) -> Element<Message> {
//!     let waveform = waveform_view(
//!         &self.waveform,
//!         &self.waveform_frame,
//!         WAVEFORM_HEIGHT,
//!         Message::Seek,
//!         Message::Drag,
//!         Message::Resized,
//!     );
//!
//!     column![waveform, /* other widgets */].into()
//! }
//! ```
//!
//! The tick handler goes through `WaveformFrame::tick` so the cached
//! geometry is rebuilt only for coalesced frames:
//!
//! ```ignore
//! Message::Tick(now) => {
//!     self.waveform_frame.tick(&mut self.waveform, now);
//! }
//! ```

use iced::widget::Canvas;
use iced::{Element, Length, Size};
use wavesight_core::Waveform;

use super::canvas::{WaveformCanvas, WaveformFrame};

/// Create a waveform element filling the available width
///
/// * `frame` - geometry cache, invalidated by `WaveformFrame::tick`
/// * `on_seek` - called with the logical x of a click
/// * `on_drag` - called with the horizontal delta of a drag step
/// * `on_resize` - called when the canvas bounds change size
pub fn waveform_view<'a, Message>(
    waveform: &'a Waveform,
    frame: &'a WaveformFrame,
    height: f32,
    on_seek: impl Fn(f32) -> Message + 'a,
    on_drag: impl Fn(f32) -> Message + 'a,
    on_resize: impl Fn(Size) -> Message + 'a,
) -> Element<'a, Message>
where
    Message: Clone + 'a,
{
    Canvas::new(WaveformCanvas {
        waveform,
        frame,
        on_seek,
        on_drag,
        on_resize,
    })
    .width(Length::Fill)
    .height(Length::Fixed(height))
    .into()
}
