//! Waveform options: typed fields, validation and YAML persistence
//!
//! # Usage
//!
//! ```ignore
//! use wavesight_core::config::{load_options, save_options, default_config_path};
//!
//! let options = load_options(&default_config_path())?;
//! save_options(&options, &default_config_path())?;
//! ```

mod color;
mod io;
mod options;

pub use color::Rgba;
pub use io::{default_config_path, load_options, parse_options, save_options};
pub use options::{
    default_pixel_ratio, OptionsPatch, WaveformOptions, CHANNEL_RANGE, DURATION_RANGE,
    PADDING_RANGE, PIXEL_RATIO_RANGE, REFRESH_DELAY_RANGE, WAVE_SCALE_RANGE,
};
