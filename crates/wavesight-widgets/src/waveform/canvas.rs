//! Canvas program for the waveform display
//!
//! Painting goes through the core drawer via [`FrameSurface`], so the widget
//! and the headless renderer produce the same layers. The geometry lives in a
//! [`WaveformFrame`] cache that is only invalidated when `Waveform::tick`
//! reports a coalesced frame; view passes in between reuse it. Pointer input becomes
//! callbacks: a press and release without movement seeks, a press followed by
//! movement pans the view (scrollable mode only).

use iced::alignment::{Horizontal, Vertical};
use std::time::Instant;

use iced::widget::canvas::{self, Cache, Event, Frame, Geometry, Program, Text};
use iced::{mouse, Point, Rectangle, Size, Theme};
use wavesight_core::{Rgba, Surface, TextAlign, Waveform};

use crate::theme::{to_iced, DRAG_THRESHOLD};

/// Adapter exposing an iced frame as a device-pixel [`Surface`]
pub struct FrameSurface<'a> {
    frame: &'a mut Frame,
    /// Device pixels per logical pixel
    scale: f32,
}

impl<'a> FrameSurface<'a> {
    pub fn new(frame: &'a mut Frame, pixel_ratio: f32) -> Self {
        Self {
            frame,
            scale: pixel_ratio.max(1.0),
        }
    }
}

impl Surface for FrameSurface<'_> {
    fn size(&self) -> (f32, f32) {
        let size = self.frame.size();
        (size.width * self.scale, size.height * self.scale)
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
        self.frame.fill_rectangle(
            Point::new(x / self.scale, y / self.scale),
            Size::new(width / self.scale, height / self.scale),
            to_iced(color),
        );
    }

    fn text(&mut self, x: f32, y: f32, label: &str, size: f32, align: TextAlign, color: Rgba) {
        let align_x = match align {
            TextAlign::Left => Horizontal::Left,
            TextAlign::Center => Horizontal::Center,
            TextAlign::Right => Horizontal::Right,
        };
        self.frame.fill_text(Text {
            content: label.to_string(),
            position: Point::new(x / self.scale, y / self.scale),
            size: (size / self.scale).into(),
            color: to_iced(color),
            align_x: align_x.into(),
            align_y: Vertical::Top.into(),
            ..Text::default()
        });
    }
}

/// Cached widget frame following the waveform's redraw schedule
pub struct WaveformFrame {
    cache: Cache,
    painted: u64,
}

impl Default for WaveformFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveformFrame {
    pub fn new() -> Self {
        Self {
            cache: Cache::new(),
            painted: 0,
        }
    }

    /// Tick the waveform and invalidate the cached geometry when a frame is due
    pub fn tick(&mut self, waveform: &mut Waveform, now: Instant) -> bool {
        let due = waveform.tick(now);
        if due {
            self.cache.clear();
            self.painted += 1;
        }
        due
    }

    /// Frames invalidated so far
    pub fn painted(&self) -> u64 {
        self.painted
    }

    pub(crate) fn cache(&self) -> &Cache {
        &self.cache
    }
}

/// Pointer state between events
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveformInteraction {
    /// X where the left button went down, `None` when released
    press_x: Option<f32>,
    /// X of the last drag step
    last_x: f32,
    dragged: bool,
    /// Bounds size last reported through `on_resize`
    size: Option<Size>,
}

impl WaveformInteraction {
    pub fn is_pressed(&self) -> bool {
        self.press_x.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragged
    }

    fn press(&mut self, x: f32) {
        self.press_x = Some(x);
        self.last_x = x;
        self.dragged = false;
    }

    /// Horizontal movement since the previous step, once past the drag threshold
    fn moved(&mut self, x: f32) -> Option<f32> {
        let press_x = self.press_x?;
        if !self.dragged && (x - press_x).abs() < DRAG_THRESHOLD {
            return None;
        }
        self.dragged = true;
        let dx = x - self.last_x;
        self.last_x = x;
        (dx != 0.0).then_some(dx)
    }

    /// Click position if the press ended without dragging
    fn release(&mut self, x: f32) -> Option<f32> {
        let clicked = self.press_x.is_some() && !self.dragged;
        self.press_x = None;
        self.dragged = false;
        clicked.then_some(x)
    }
}

/// Canvas program painting one [`Waveform`]
///
/// Callbacks receive logical x coordinates and deltas; the application feeds
/// them to `Waveform::click_at`, `Waveform::drag_by_pixels` and `Waveform::resize`.
pub struct WaveformCanvas<'a, Message, SeekFn, DragFn, ResizeFn>
where
    SeekFn: Fn(f32) -> Message,
    DragFn: Fn(f32) -> Message,
    ResizeFn: Fn(Size) -> Message,
{
    pub waveform: &'a Waveform,
    pub frame: &'a WaveformFrame,
    pub on_seek: SeekFn,
    pub on_drag: DragFn,
    pub on_resize: ResizeFn,
}

impl<'a, Message, SeekFn, DragFn, ResizeFn> Program<Message>
    for WaveformCanvas<'a, Message, SeekFn, DragFn, ResizeFn>
where
    Message: Clone,
    SeekFn: Fn(f32) -> Message,
    DragFn: Fn(f32) -> Message,
    ResizeFn: Fn(Size) -> Message,
{
    type State = WaveformInteraction;

    fn update(
        &self,
        interaction: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        if interaction.size != Some(bounds.size()) {
            interaction.size = Some(bounds.size());
            log::debug!("Waveform canvas resized to {}x{}", bounds.width, bounds.height);
            return Some(canvas::Action::publish((self.on_resize)(bounds.size())));
        }

        let scrollable = self.waveform.options().scrollable;

        match event {
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(position) = cursor.position_in(bounds) {
                    interaction.press(position.x);
                    return Some(canvas::Action::capture());
                }
            }
            Event::Mouse(mouse::Event::CursorMoved { position }) => {
                if interaction.is_pressed() && scrollable {
                    if let Some(dx) = interaction.moved(position.x - bounds.x) {
                        return Some(canvas::Action::publish((self.on_drag)(dx)));
                    }
                }
            }
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                let x = cursor
                    .position()
                    .map(|position| (position.x - bounds.x).clamp(0.0, bounds.width));
                if let Some(clicked) = x.and_then(|x| interaction.release(x)) {
                    return Some(canvas::Action::publish((self.on_seek)(clicked)));
                }
                interaction.release(0.0);
            }
            _ => {}
        }

        None
    }

    fn mouse_interaction(
        &self,
        interaction: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if interaction.is_dragging() {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            if self.waveform.options().scrollable {
                mouse::Interaction::Grab
            } else {
                mouse::Interaction::Pointer
            }
        } else {
            mouse::Interaction::default()
        }
    }

    fn draw(
        &self,
        _interaction: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let geometry = self.frame.cache().draw(renderer, bounds.size(), |frame| {
            let mut surface = FrameSurface::new(frame, self.waveform.options().pixel_ratio);
            self.waveform.draw_to(&mut surface);
        });
        vec![geometry]
    }
}
