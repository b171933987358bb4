//! Error taxonomy for the waveform pipeline

use thiserror::Error;

/// Invalid option value, reported by `WaveformOptions::validate`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Numeric option outside its accepted range
    #[error("Option `{field}` = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Color string that is not `#rrggbb` or `#rrggbbaa`
    #[error("Invalid color `{0}` (expected #rrggbb or #rrggbbaa)")]
    InvalidColor(String),

    /// Options file could not be parsed
    #[error("Failed to parse options: {0}")]
    Parse(String),
}

/// Errors surfaced by the decoder, controller and facade
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WaveformError {
    /// Invalid option value or type
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Source bytes could not be fetched
    #[error("Failed to load audio source: {0}")]
    Load(String),

    /// Malformed or unsupported audio data
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// Channel index outside the current audio's channels (or the [0, 5] option range)
    #[error("Channel {index} is not available (audio has {channel_count} channels)")]
    InvalidChannel { index: usize, channel_count: usize },

    /// `load` called with something that cannot be used as a source
    #[error("Invalid load target: {0}")]
    InvalidTarget(String),
}

/// Result type for waveform operations
pub type WaveformResult<T> = Result<T, WaveformError>;
