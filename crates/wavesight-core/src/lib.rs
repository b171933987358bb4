//! Wavesight Core - decode-to-pixel waveform pipeline
//!
//! Audio goes in as a decoded buffer, a compressed byte stream, a URL or a
//! playing media element. It is reduced to a per-channel min/max peak table
//! once, then a bounded window of that table is painted onto a [`Surface`]
//! whenever a coalesced redraw is due.
//!
//! ```text
//! AudioSource ─▶ Decoder ─▶ PeakTable ─▶ Drawer ─▶ Surface
//!                              ▲
//!          PlaybackClock ─▶ Controller (ViewWindow, RedrawScheduler)
//! ```

pub mod config;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod events;
pub mod peaks;
pub mod playback;
pub mod registry;
pub mod render;
pub mod scheduler;
pub mod source;
pub mod view;
pub mod waveform;

pub use config::{OptionsPatch, Rgba, WaveformOptions};
pub use decoder::DecoderState;
pub use error::{ConfigError, WaveformError, WaveformResult};
pub use events::{ListenerId, WaveformEvent};
pub use peaks::PeakTable;
pub use playback::{MediaElement, PlaybackState, ReadyState};
pub use registry::{live_instances, InstanceId};
pub use render::{PixelCanvas, Surface, TextAlign};
pub use source::{AudioDecoder, AudioSource, DecodedAudio, FileLoader, Loader, SymphoniaDecoder};
pub use view::ViewWindow;
pub use waveform::Waveform;
