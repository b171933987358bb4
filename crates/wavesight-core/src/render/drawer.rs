//! Layered waveform painter
//!
//! Layers, back to front, each switchable through the options:
//!
//! 1. background fill
//! 2. grid lines at a fixed time step
//! 3. waveform: one min/max bar per device-pixel column
//! 4. progress: the waveform repainted in `progress_color` up to the playhead
//! 5. ruler: tick marks and time labels along the top or bottom edge
//! 6. cursor: the playhead line, always last
//!
//! Column `x` of a `W`-pixel-wide surface shows time `start + (x / W) * visible`.
//! Columns read the nearest peak bucket; a column wider than a bucket takes the
//! min/max of every bucket it spans. Nothing is interpolated.
//!
//! The only state kept between frames is the lane layout, recomputed when the
//! surface size or a layout option changes. Drawing takes `&self` so it can
//! run from a widget's draw pass.

use std::cell::Cell;

use super::surface::{Surface, TextAlign};
use crate::config::{Rgba, WaveformOptions};
use crate::peaks::PeakTable;
use crate::playback::PlaybackState;
use crate::view::ViewWindow;

/// Ruler lane height in CSS pixels
pub const RULER_HEIGHT: f32 = 18.0;

/// Ruler label font size in CSS pixels
const RULER_FONT_SIZE: f32 = 10.0;

/// Tick mark length in CSS pixels
const TICK_LENGTH: f32 = 4.0;

/// Placeholder font size in CSS pixels
const PLACEHOLDER_FONT_SIZE: f32 = 13.0;

/// Smallest gap between grid lines in CSS pixels
const MIN_GRID_SPACING: f32 = 48.0;

/// Candidate grid steps in seconds, finest first
const GRID_STEPS: [f64; 13] = [
    0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0,
];

/// Everything that changes from frame to frame
#[derive(Debug, Clone, Copy)]
pub struct DrawInput<'a> {
    /// Active channel's peaks; `None` draws the no-data state
    pub peaks: Option<&'a PeakTable>,
    pub playback: PlaybackState,
    pub view: ViewWindow,
    /// Message shown in the wave lane when there are no peaks
    pub placeholder: Option<&'a str>,
}

/// Lane geometry in device pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
    pub wave_top: f32,
    pub wave_height: f32,
    /// Ruler lane, `None` when the ruler is off
    pub ruler: Option<(f32, f32)>,
}

impl LayoutMetrics {
    pub fn compute(width: f32, height: f32, options: &WaveformOptions) -> Self {
        let ratio = options.pixel_ratio.max(1.0);
        let ruler_height = (RULER_HEIGHT * ratio).min(height);
        let gap = options.padding as f32 * ratio;

        let (wave_top, wave_height, ruler) = if !options.ruler {
            (0.0, height, None)
        } else if options.ruler_at_top {
            let top = ruler_height + gap;
            (top, (height - top).max(0.0), Some((0.0, ruler_height)))
        } else {
            let wave_height = (height - ruler_height - gap).max(0.0);
            (0.0, wave_height, Some((height - ruler_height, ruler_height)))
        };

        Self {
            width,
            height,
            pixel_ratio: ratio,
            wave_top,
            wave_height,
            ruler,
        }
    }

    pub fn wave_center(&self) -> f32 {
        self.wave_top + self.wave_height / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LayoutKey {
    width: f32,
    height: f32,
    pixel_ratio: f32,
    padding: u32,
    ruler: bool,
    ruler_at_top: bool,
}

impl LayoutKey {
    fn new(width: f32, height: f32, options: &WaveformOptions) -> Self {
        Self {
            width,
            height,
            pixel_ratio: options.pixel_ratio,
            padding: options.padding,
            ruler: options.ruler,
            ruler_at_top: options.ruler_at_top,
        }
    }
}

#[derive(Debug, Default)]
pub struct Drawer {
    layout: Cell<Option<(LayoutKey, LayoutMetrics)>>,
}

impl Drawer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached layout (on resize)
    pub fn invalidate(&self) {
        self.layout.set(None);
    }

    pub fn layout(&self) -> Option<LayoutMetrics> {
        self.layout.get().map(|(_, metrics)| metrics)
    }

    fn metrics(&self, width: f32, height: f32, options: &WaveformOptions) -> LayoutMetrics {
        let key = LayoutKey::new(width, height, options);
        match self.layout.get() {
            Some((cached, metrics)) if cached == key => metrics,
            _ => {
                let metrics = LayoutMetrics::compute(width, height, options);
                log::debug!("Waveform layout recomputed: {:?}", metrics);
                self.layout.set(Some((key, metrics)));
                metrics
            }
        }
    }

    /// Paint one full frame
    pub fn draw(&self, input: &DrawInput<'_>, options: &WaveformOptions, surface: &mut dyn Surface) {
        let (width, height) = surface.size();
        if width < 1.0 || height < 1.0 {
            return;
        }
        let metrics = self.metrics(width, height, options);
        let view = input.view;
        let cursor_x = (view.fraction_of(input.playback.current_time) * width as f64) as f32;

        surface.clear(options.background_color);

        let grid_step = grid_step(&metrics, view.visible_duration);
        if options.grid {
            draw_grid(surface, &metrics, view, grid_step, options.grid_color);
        }

        match input.peaks {
            Some(peaks) => {
                if options.wave {
                    draw_columns(surface, &metrics, view, peaks, options, 0, metrics.width as usize, options.wave_color);
                }
                if options.progress && cursor_x > 0.0 {
                    let end = (cursor_x.ceil() as usize).min(metrics.width as usize);
                    draw_columns(surface, &metrics, view, peaks, options, 0, end, options.progress_color);
                }
            }
            None => {
                if options.progress && cursor_x > 0.0 {
                    // No bars to repaint: a strip along the bottom of the wave lane
                    let strip = 2.0 * metrics.pixel_ratio;
                    surface.fill_rect(
                        0.0,
                        metrics.wave_top + metrics.wave_height - strip,
                        cursor_x.min(width),
                        strip,
                        options.progress_color,
                    );
                }
                if let Some(message) = input.placeholder {
                    surface.text(
                        width / 2.0,
                        metrics.wave_center() - PLACEHOLDER_FONT_SIZE * metrics.pixel_ratio / 2.0,
                        message,
                        PLACEHOLDER_FONT_SIZE * metrics.pixel_ratio,
                        TextAlign::Center,
                        options.ruler_color,
                    );
                }
            }
        }

        if options.ruler {
            draw_ruler(surface, &metrics, view, grid_step, options);
        }

        if options.cursor && cursor_x >= 0.0 && cursor_x <= width {
            surface.vline(cursor_x, 0.0, height, metrics.pixel_ratio, options.cursor_color);
        }
    }
}

/// Coarsest-needed grid step so lines stay at least `MIN_GRID_SPACING` apart
fn grid_step(metrics: &LayoutMetrics, visible_duration: f64) -> f64 {
    if visible_duration <= 0.0 {
        return GRID_STEPS[GRID_STEPS.len() - 1];
    }
    let pixels_per_second = metrics.width as f64 / visible_duration;
    let min_spacing = (MIN_GRID_SPACING * metrics.pixel_ratio) as f64;
    GRID_STEPS
        .iter()
        .copied()
        .find(|step| step * pixels_per_second >= min_spacing)
        .unwrap_or(GRID_STEPS[GRID_STEPS.len() - 1])
}

/// Multiples of `step` inside the view, with their x coordinate
fn grid_times(metrics: &LayoutMetrics, view: ViewWindow, step: f64) -> impl Iterator<Item = (f64, f32)> {
    let first = (view.start_time / step).ceil() as i64;
    let last = (view.end_time() / step).floor() as i64;
    let width = metrics.width as f64;
    (first..=last).filter_map(move |i| {
        let time = i as f64 * step;
        let x = view.fraction_of(time) * width;
        (x >= 0.0 && x < width).then_some((time, x as f32))
    })
}

fn draw_grid(surface: &mut dyn Surface, metrics: &LayoutMetrics, view: ViewWindow, step: f64, color: Rgba) {
    for (_, x) in grid_times(metrics, view, step) {
        surface.vline(x, metrics.wave_top, metrics.wave_top + metrics.wave_height, 1.0, color);
    }
}

/// Paint min/max bars for columns `[from, to)`
#[allow(clippy::too_many_arguments)]
fn draw_columns(
    surface: &mut dyn Surface,
    metrics: &LayoutMetrics,
    view: ViewWindow,
    peaks: &PeakTable,
    options: &WaveformOptions,
    from: usize,
    to: usize,
    color: Rgba,
) {
    let width = metrics.width as f64;
    let center = metrics.wave_center();
    let half = metrics.wave_height / 2.0;
    let lane_bottom = metrics.wave_top + metrics.wave_height;

    for x in from..to {
        let t0 = view.time_at_fraction(x as f64 / width);
        let t1 = view.time_at_fraction((x + 1) as f64 / width);
        let Some((min, max)) = peaks.range_peak(t0, t1) else {
            continue;
        };

        let top = (center - max * options.wave_scale * half).clamp(metrics.wave_top, lane_bottom);
        let bottom = (center - min * options.wave_scale * half).clamp(metrics.wave_top, lane_bottom);
        surface.fill_rect(x as f32, top, 1.0, (bottom - top).max(1.0), color);
    }
}

fn draw_ruler(surface: &mut dyn Surface, metrics: &LayoutMetrics, view: ViewWindow, step: f64, options: &WaveformOptions) {
    let Some((top, height)) = metrics.ruler else {
        return;
    };
    let ratio = metrics.pixel_ratio;
    let tick = TICK_LENGTH * ratio;
    let font = RULER_FONT_SIZE * ratio;
    let color = options.ruler_color;

    // Baseline and ticks sit on the edge facing the waveform
    let (edge, tick_top, label_y) = if options.ruler_at_top {
        let edge = top + height - ratio;
        (edge, edge - tick, (edge - tick - font).max(top))
    } else {
        (top, top, top + tick + ratio)
    };

    surface.fill_rect(0.0, edge, metrics.width, ratio, color);
    for (time, x) in grid_times(metrics, view, step) {
        surface.vline(x, tick_top, tick_top + tick, ratio, color);
        surface.text(x + 2.0 * ratio, label_y, &format_time(time, step), font, TextAlign::Left, color);
    }
}

/// `m:ss`, or `m:ss.s` when the step is below a second
pub fn format_time(seconds: f64, step: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u64;
    let rest = seconds - minutes as f64 * 60.0;
    if step < 1.0 {
        format!("{}:{:04.1}", minutes, rest)
    } else {
        format!("{}:{:02}", minutes, rest.round() as u64)
    }
}
