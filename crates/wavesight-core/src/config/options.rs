//! Typed waveform options with per-field validation
//!
//! Options are validated once, at assignment time. `set_options` applies an
//! `OptionsPatch` to a copy of the current options and only commits the copy
//! when every field passes.

use serde::{Deserialize, Serialize};

use super::color::Rgba;
use crate::error::ConfigError;

/// Accepted range for `refresh_delay` (milliseconds)
pub const REFRESH_DELAY_RANGE: (u32, u32) = (16, 1000);

/// Accepted range for `channel`
pub const CHANNEL_RANGE: (usize, usize) = (0, 5);

/// Accepted range for `duration` (seconds)
pub const DURATION_RANGE: (u32, u32) = (1, 100);

/// Accepted range for `padding` (pixels)
pub const PADDING_RANGE: (u32, u32) = (1, 100);

/// Accepted range for `wave_scale`
pub const WAVE_SCALE_RANGE: (f32, f32) = (0.1, 10.0);

/// Accepted range for `pixel_ratio`
pub const PIXEL_RATIO_RANGE: (f32, f32) = (1.0, 10.0);

/// Rendering and behaviour options for one waveform instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformOptions {
    /// Draw the waveform layer
    pub wave: bool,
    pub wave_color: Rgba,
    /// Draw the playhead cursor
    pub cursor: bool,
    pub cursor_color: Rgba,
    /// Repaint the waveform up to the playhead in `progress_color`
    pub progress: bool,
    pub progress_color: Rgba,
    /// Draw vertical grid lines
    pub grid: bool,
    pub grid_color: Rgba,
    /// Draw time ticks and labels
    pub ruler: bool,
    pub ruler_color: Rgba,
    pub background_color: Rgba,
    /// Ruler along the top edge instead of the bottom
    pub ruler_at_top: bool,
    /// Allow drag-panning instead of a fixed paged view
    pub scrollable: bool,
    /// Redraw coalescing window in milliseconds
    pub refresh_delay: u32,
    /// Channel whose peaks are displayed
    pub channel: usize,
    /// Visible window size in seconds
    pub duration: u32,
    /// Pixels between the ruler lane and the waveform lane
    pub padding: u32,
    /// Vertical amplitude multiplier
    pub wave_scale: f32,
    /// Backing-store scale (device pixels per CSS pixel)
    pub pixel_ratio: f32,
    /// Decode byte streams on a background thread
    pub use_worker: bool,
}

impl Default for WaveformOptions {
    fn default() -> Self {
        Self {
            wave: true,
            wave_color: Rgba::rgb(0.2, 0.8, 0.4),
            cursor: true,
            cursor_color: Rgba::rgb(1.0, 1.0, 1.0),
            progress: true,
            progress_color: Rgba::rgb(0.0, 0.8, 0.8),
            grid: true,
            grid_color: Rgba::new(0.4, 0.4, 0.4, 0.6),
            ruler: true,
            ruler_color: Rgba::rgb(0.7, 0.7, 0.8),
            background_color: Rgba::rgb(0.1, 0.1, 0.12),
            ruler_at_top: false,
            scrollable: false,
            refresh_delay: 50,
            channel: 0,
            duration: 10,
            padding: 5,
            wave_scale: 0.8,
            pixel_ratio: 1.0,
            use_worker: false,
        }
    }
}

/// Round a device pixel ratio up to the next whole number, clamped to the accepted range
///
/// Fractional ratios (1.25, 1.5) render at the next integer scale.
pub fn default_pixel_ratio(device_pixel_ratio: f64) -> f32 {
    let ratio = if device_pixel_ratio.is_finite() {
        device_pixel_ratio.ceil() as f32
    } else {
        1.0
    };
    ratio.clamp(PIXEL_RATIO_RANGE.0, PIXEL_RATIO_RANGE.1)
}

fn check_range<T>(field: &'static str, value: T, (min, max): (T, T)) -> Result<(), ConfigError>
where
    T: PartialOrd + Copy + Into<f64>,
{
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value: value.into(),
            min: min.into(),
            max: max.into(),
        });
    }
    Ok(())
}

impl WaveformOptions {
    /// Defaults with the pixel ratio derived from the display's device pixel ratio
    pub fn for_device(device_pixel_ratio: f64) -> Self {
        Self {
            pixel_ratio: default_pixel_ratio(device_pixel_ratio),
            ..Self::default()
        }
    }

    /// Check every numeric field against its accepted range
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("refresh_delay", self.refresh_delay, REFRESH_DELAY_RANGE)?;
        check_range("channel", self.channel.min(u32::MAX as usize) as u32, (CHANNEL_RANGE.0 as u32, CHANNEL_RANGE.1 as u32))?;
        check_range("duration", self.duration, DURATION_RANGE)?;
        check_range("padding", self.padding, PADDING_RANGE)?;
        // NaN fails both comparisons, reject it explicitly
        if self.wave_scale.is_nan() {
            return Err(ConfigError::OutOfRange {
                field: "wave_scale",
                value: f64::NAN,
                min: WAVE_SCALE_RANGE.0 as f64,
                max: WAVE_SCALE_RANGE.1 as f64,
            });
        }
        check_range("wave_scale", self.wave_scale, WAVE_SCALE_RANGE)?;
        if self.pixel_ratio.is_nan() {
            return Err(ConfigError::OutOfRange {
                field: "pixel_ratio",
                value: f64::NAN,
                min: PIXEL_RATIO_RANGE.0 as f64,
                max: PIXEL_RATIO_RANGE.1 as f64,
            });
        }
        check_range("pixel_ratio", self.pixel_ratio, PIXEL_RATIO_RANGE)?;
        Ok(())
    }

    /// Apply a patch and validate the result without touching `self`
    pub fn merged(&self, patch: &OptionsPatch) -> Result<WaveformOptions, ConfigError> {
        let mut next = self.clone();
        patch.apply_to(&mut next);
        next.validate()?;
        Ok(next)
    }

    /// Visible window in seconds, as a float
    pub fn visible_seconds(&self) -> f64 {
        self.duration as f64
    }
}

/// Partial options update; `None` fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsPatch {
    pub wave: Option<bool>,
    pub wave_color: Option<Rgba>,
    pub cursor: Option<bool>,
    pub cursor_color: Option<Rgba>,
    pub progress: Option<bool>,
    pub progress_color: Option<Rgba>,
    pub grid: Option<bool>,
    pub grid_color: Option<Rgba>,
    pub ruler: Option<bool>,
    pub ruler_color: Option<Rgba>,
    pub background_color: Option<Rgba>,
    pub ruler_at_top: Option<bool>,
    pub scrollable: Option<bool>,
    pub refresh_delay: Option<u32>,
    pub channel: Option<usize>,
    pub duration: Option<u32>,
    pub padding: Option<u32>,
    pub wave_scale: Option<f32>,
    pub pixel_ratio: Option<f32>,
    pub use_worker: Option<bool>,
}

impl OptionsPatch {
    fn apply_to(&self, options: &mut WaveformOptions) {
        options.wave = self.wave.unwrap_or(options.wave);
        options.wave_color = self.wave_color.unwrap_or(options.wave_color);
        options.cursor = self.cursor.unwrap_or(options.cursor);
        options.cursor_color = self.cursor_color.unwrap_or(options.cursor_color);
        options.progress = self.progress.unwrap_or(options.progress);
        options.progress_color = self.progress_color.unwrap_or(options.progress_color);
        options.grid = self.grid.unwrap_or(options.grid);
        options.grid_color = self.grid_color.unwrap_or(options.grid_color);
        options.ruler = self.ruler.unwrap_or(options.ruler);
        options.ruler_color = self.ruler_color.unwrap_or(options.ruler_color);
        options.background_color = self.background_color.unwrap_or(options.background_color);
        options.ruler_at_top = self.ruler_at_top.unwrap_or(options.ruler_at_top);
        options.scrollable = self.scrollable.unwrap_or(options.scrollable);
        options.refresh_delay = self.refresh_delay.unwrap_or(options.refresh_delay);
        options.channel = self.channel.unwrap_or(options.channel);
        options.duration = self.duration.unwrap_or(options.duration);
        options.padding = self.padding.unwrap_or(options.padding);
        options.wave_scale = self.wave_scale.unwrap_or(options.wave_scale);
        options.pixel_ratio = self.pixel_ratio.unwrap_or(options.pixel_ratio);
        options.use_worker = self.use_worker.unwrap_or(options.use_worker);
    }

    /// Whether applying this patch can change what the current frame looks like
    pub fn affects_layout(&self) -> bool {
        self.duration.is_some()
            || self.pixel_ratio.is_some()
            || self.scrollable.is_some()
            || self.padding.is_some()
            || self.channel.is_some()
    }
}
