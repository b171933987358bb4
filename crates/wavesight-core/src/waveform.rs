//! Waveform instance: the public face of the pipeline
//!
//! Owns one decoder, controller and drawer plus a backing raster canvas.
//! All methods run on the caller's thread; the only background work is the
//! optional decode worker, whose results are applied on [`Waveform::tick`].
//!
//! # Example
//!
//! ```ignore
//! use std::time::Instant;
//! use wavesight_core::{AudioSource, Waveform, WaveformOptions};
//!
//! let mut waveform = Waveform::with_defaults(WaveformOptions::default())?;
//! waveform.load(AudioSource::Url("track.flac".into()), Instant::now())?;
//!
//! // Called from the app's timer
//! if waveform.tick(Instant::now()) {
//!     let png = waveform.export_image()?;
//! }
//! ```

use std::sync::Arc;
use std::time::Instant;

use crate::config::{OptionsPatch, WaveformOptions, CHANNEL_RANGE};
use crate::controller::Controller;
use crate::decoder::{DecodeInput, Decoder, DecoderState, Resolution};
use crate::error::{WaveformError, WaveformResult};
use crate::events::{EventEmitter, ListenerId, WaveformEvent};
use crate::peaks::PeakTable;
use crate::playback::PlaybackState;
use crate::registry::{self, InstanceId};
use crate::render::{DrawInput, Drawer, PixelCanvas, Surface};
use crate::source::{AudioDecoder, AudioSource, FileLoader, Loader, SymphoniaDecoder};
use crate::view::ViewWindow;

/// Canvas width in CSS pixels until the first `resize`
pub const DEFAULT_WIDTH: f32 = 800.0;

/// Canvas height in CSS pixels until the first `resize`
pub const DEFAULT_HEIGHT: f32 = 128.0;

const LOADING_MESSAGE: &str = "Loading waveform";
const NO_DATA_MESSAGE: &str = "No waveform data";

pub struct Waveform {
    id: InstanceId,
    options: WaveformOptions,
    decoder: Decoder,
    controller: Controller,
    drawer: Drawer,
    events: EventEmitter,
    /// Canvas size in CSS pixels
    css_size: (f32, f32),
    /// Backing store the coalesced frames are painted into
    canvas: PixelCanvas,
    destroyed: bool,
}

impl Waveform {
    /// Validate `options` and register a new instance
    pub fn new(
        options: WaveformOptions,
        audio_decoder: Arc<dyn AudioDecoder>,
        loader: Arc<dyn Loader>,
    ) -> WaveformResult<Self> {
        options.validate()?;

        let mut decoder = Decoder::new(audio_decoder, loader);
        decoder.set_use_worker(options.use_worker);
        decoder.set_preferred_channel(options.channel);

        let css_size = (DEFAULT_WIDTH, DEFAULT_HEIGHT);
        let (device_width, device_height) = device_size(css_size, options.pixel_ratio);
        decoder.set_resolution(resolution(&options, css_size.0));

        let mut controller = Controller::new(&options);
        controller.resize(css_size.0, Instant::now());

        let id = registry::register();
        log::info!(
            "Waveform {} created ({}x{} css px, pixel ratio {})",
            id.get(),
            css_size.0,
            css_size.1,
            options.pixel_ratio
        );

        Ok(Self {
            id,
            options,
            decoder,
            controller,
            drawer: Drawer::new(),
            events: EventEmitter::new(),
            css_size,
            canvas: PixelCanvas::new(device_width, device_height),
            destroyed: false,
        })
    }

    /// Instance using the symphonia decoder and the local file loader
    pub fn with_defaults(options: WaveformOptions) -> WaveformResult<Self> {
        Self::new(options, Arc::new(SymphoniaDecoder), Arc::new(FileLoader))
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn options(&self) -> &WaveformOptions {
        &self.options
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // ────────────────────────────────────────────────────────────────────────
    // Events
    // ────────────────────────────────────────────────────────────────────────

    pub fn on(&mut self, listener: impl FnMut(&WaveformEvent) + 'static) -> ListenerId {
        self.events.on(listener)
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Options
    // ────────────────────────────────────────────────────────────────────────

    /// Apply a partial update; on any invalid field nothing changes
    ///
    /// A new `channel` switches the displayed channel right away when audio
    /// is ready, and is picked up by the next decode otherwise.
    pub fn set_options(&mut self, patch: &OptionsPatch, now: Instant) -> WaveformResult<()> {
        let next = self.options.merged(patch)?;

        let can_switch = self.decoder.state() == DecoderState::Ready && self.decoder.audio().is_some();
        if next.channel != self.options.channel {
            if can_switch {
                self.decoder.change_channel(next.channel, &mut self.events)?;
            } else {
                self.decoder.set_preferred_channel(next.channel);
            }
        }

        self.options = next;
        self.decoder.set_use_worker(self.options.use_worker);
        if patch.affects_layout() {
            self.apply_layout(now);
        }
        self.controller.apply_options(&self.options, now);
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Loading
    // ────────────────────────────────────────────────────────────────────────

    /// Replace the current audio with `source`
    ///
    /// Only an unusable target fails synchronously. Load and decode failures
    /// arrive as `LoadFailed` / `DecodeFailed` events.
    pub fn load(&mut self, source: AudioSource, now: Instant) -> WaveformResult<()> {
        if self.destroyed {
            return Err(WaveformError::InvalidTarget("waveform has been destroyed".to_string()));
        }
        source.validate()?;
        self.events.emit(&WaveformEvent::Loading { source: source.kind() });
        log::info!("Waveform {} loading {:?}", self.id.get(), source);

        let input = match source {
            AudioSource::Media(media) => {
                self.decoder.track_media(media.duration(), &mut self.events);
                self.controller.attach_media(media, now);
                return Ok(());
            }
            AudioSource::Decoded(audio) => DecodeInput::Decoded(audio),
            AudioSource::Bytes(bytes) => DecodeInput::Bytes(bytes),
            AudioSource::Url(url) => DecodeInput::Url(url),
        };

        self.controller.use_internal_clock(0.0, now);
        self.decoder.decode(input, &mut self.events);
        self.after_decode(now);
        Ok(())
    }

    fn after_decode(&mut self, now: Instant) {
        if self.decoder.audio().is_some() {
            self.options.channel = self.decoder.channel();
            self.controller.set_duration(self.decoder.duration(), now);
        } else {
            self.controller.request_redraw(now);
        }
    }

    pub fn decoder_state(&self) -> DecoderState {
        self.decoder.state()
    }

    pub fn channel_count(&self) -> usize {
        self.decoder.channel_count()
    }

    pub fn duration(&self) -> f64 {
        self.controller.total_duration()
    }

    pub fn peaks(&self) -> Option<&PeakTable> {
        self.decoder.peaks()
    }

    // ────────────────────────────────────────────────────────────────────────
    // Playback and interaction
    // ────────────────────────────────────────────────────────────────────────

    /// Move the playhead, clamped to `[0, duration]`; returns the applied time
    pub fn seek(&mut self, seconds: f64, now: Instant) -> f64 {
        let time = self.controller.seek(seconds, now);
        self.events.emit(&WaveformEvent::Seeked { time });
        time
    }

    /// Show a different channel of the current audio
    pub fn change_channel(&mut self, index: usize, now: Instant) -> WaveformResult<()> {
        if index > CHANNEL_RANGE.1 {
            return Err(WaveformError::InvalidChannel {
                index,
                channel_count: self.decoder.channel_count(),
            });
        }
        self.decoder.change_channel(index, &mut self.events)?;
        self.options.channel = index;
        self.controller.request_redraw(now);
        Ok(())
    }

    pub fn playback(&self) -> PlaybackState {
        self.controller.playback()
    }

    pub fn view(&self) -> ViewWindow {
        self.controller.view()
    }

    /// New canvas size in CSS pixels
    pub fn resize(&mut self, css_width: f32, css_height: f32, now: Instant) {
        let css_size = (css_width.max(0.0), css_height.max(0.0));
        if css_size == self.css_size {
            return;
        }
        self.css_size = css_size;
        self.apply_layout(now);
    }

    pub fn css_size(&self) -> (f32, f32) {
        self.css_size
    }

    fn apply_layout(&mut self, now: Instant) {
        let (width, height) = device_size(self.css_size, self.options.pixel_ratio);
        if (width, height) != (self.canvas.width(), self.canvas.height()) {
            self.canvas.resize(width, height);
        }
        self.drawer.invalidate();
        self.decoder.set_resolution(resolution(&self.options, self.css_size.0));
        self.controller.resize(self.css_size.0, now);
    }

    /// Pan by a pointer drag of `dx` CSS pixels (scrollable mode only)
    pub fn drag_by_pixels(&mut self, dx: f32, now: Instant) {
        self.controller.drag_by_pixels(dx, now);
    }

    pub fn drag_by_seconds(&mut self, seconds: f64, now: Instant) {
        self.controller.drag_by_seconds(seconds, now);
    }

    /// Put the left edge at `start_time` (scrollable mode only), clamped
    pub fn scroll_to(&mut self, start_time: f64, now: Instant) {
        self.controller.scroll_to(start_time, now);
    }

    pub fn time_at_x(&self, css_x: f32) -> f64 {
        self.controller.time_at_x(css_x)
    }

    /// Seek to the time under CSS x coordinate `css_x`
    pub fn click_at(&mut self, css_x: f32, now: Instant) -> f64 {
        let time = self.controller.click_at(css_x, now);
        self.events.emit(&WaveformEvent::Seeked { time });
        time
    }

    // ────────────────────────────────────────────────────────────────────────
    // Rendering
    // ────────────────────────────────────────────────────────────────────────

    /// Drive the instance: apply decode results, poll the media element and
    /// paint the backing canvas if a coalesced frame is due
    ///
    /// Returns true when a frame was painted.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.destroyed {
            return false;
        }

        if self.controller.has_media() {
            self.decoder.update_media_duration(self.controller.total_duration());
        }
        if self.decoder.poll(&mut self.events) {
            self.after_decode(now);
        }

        if !self.controller.tick(now) {
            return false;
        }

        let mut canvas = std::mem::replace(&mut self.canvas, PixelCanvas::new(0, 0));
        self.draw_to(&mut canvas);
        self.canvas = canvas;

        let view = self.controller.view();
        let playback = self.controller.playback();
        log::debug!(
            "Redraw at {:.3}s (window {:.3}s + {:.3}s)",
            playback.current_time,
            view.start_time,
            view.visible_duration
        );
        self.events.emit(&WaveformEvent::Redrawn {
            start_time: view.start_time,
            current_time: playback.current_time,
        });
        true
    }

    /// Paint the current state onto any surface, immediately
    pub fn draw_to(&self, surface: &mut dyn Surface) {
        let placeholder = match self.decoder.state() {
            DecoderState::Decoding => Some(LOADING_MESSAGE),
            DecoderState::Ready if self.controller.has_media() => None,
            _ => Some(NO_DATA_MESSAGE),
        };
        let input = DrawInput {
            peaks: self.decoder.peaks(),
            playback: self.controller.playback(),
            view: self.controller.view(),
            placeholder,
        };
        self.drawer.draw(&input, &self.options, surface);
    }

    /// The backing canvas as of the last painted frame
    pub fn canvas(&self) -> &PixelCanvas {
        &self.canvas
    }

    /// PNG snapshot of the last painted frame (blank before the first one)
    pub fn export_image(&self) -> anyhow::Result<Vec<u8>> {
        self.canvas.export_png()
    }

    // ────────────────────────────────────────────────────────────────────────
    // Teardown
    // ────────────────────────────────────────────────────────────────────────

    /// Drop the audio and return to an empty display; the instance stays usable
    pub fn reset(&mut self, now: Instant) {
        self.decoder.reset();
        if !self.destroyed {
            self.controller.use_internal_clock(0.0, now);
        }
        self.canvas.resize(self.canvas.width(), self.canvas.height());
    }

    /// Release everything and unregister; idempotent
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.decoder.destroy();
        self.controller.destroy();
        registry::unregister(self.id);
        log::info!("Waveform {} destroyed", self.id.get());
        self.events.emit(&WaveformEvent::Destroyed);
        self.events.clear();
    }
}

impl Drop for Waveform {
    fn drop(&mut self) {
        if !self.destroyed {
            registry::unregister(self.id);
        }
    }
}

fn device_size(css_size: (f32, f32), pixel_ratio: f32) -> (usize, usize) {
    (
        (css_size.0 * pixel_ratio).round() as usize,
        (css_size.1 * pixel_ratio).round() as usize,
    )
}

fn resolution(options: &WaveformOptions, css_width: f32) -> Resolution {
    Resolution {
        visible_duration: options.visible_seconds(),
        css_width,
        pixel_ratio: options.pixel_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DecodedAudio;

    fn mono(seconds: u32) -> AudioSource {
        let samples = vec![0.5; seconds as usize * 8];
        AudioSource::Decoded(DecodedAudio::from_channels(8, vec![samples]).unwrap())
    }

    #[test]
    fn test_new_rejects_invalid_options() {
        let options = WaveformOptions {
            pixel_ratio: 20.0,
            ..WaveformOptions::default()
        };
        assert!(matches!(
            Waveform::with_defaults(options),
            Err(WaveformError::Config(_))
        ));
    }

    #[test]
    fn test_set_options_channel_beyond_audio_rejected() {
        let now = Instant::now();
        let mut waveform = Waveform::with_defaults(WaveformOptions::default()).unwrap();
        waveform.load(mono(2), now).unwrap();

        let patch = OptionsPatch {
            channel: Some(1),
            ..OptionsPatch::default()
        };
        assert!(matches!(
            waveform.set_options(&patch, now),
            Err(WaveformError::InvalidChannel { index: 1, .. })
        ));
        assert_eq!(waveform.options().channel, 0);
    }

    #[test]
    fn test_resize_rebuilds_backing_canvas() {
        let now = Instant::now();
        let options = WaveformOptions {
            pixel_ratio: 2.0,
            ..WaveformOptions::default()
        };
        let mut waveform = Waveform::with_defaults(options).unwrap();
        waveform.resize(300.0, 50.0, now);

        assert_eq!(waveform.canvas().width(), 600);
        assert_eq!(waveform.canvas().height(), 100);
    }

    #[test]
    fn test_load_after_destroy_fails() {
        let mut waveform = Waveform::with_defaults(WaveformOptions::default()).unwrap();
        waveform.destroy();
        assert!(waveform.load(mono(1), Instant::now()).is_err());
        assert!(!waveform.tick(Instant::now()));
    }

    #[test]
    fn test_reset_clears_audio() {
        let now = Instant::now();
        let mut waveform = Waveform::with_defaults(WaveformOptions::default()).unwrap();
        waveform.load(mono(3), now).unwrap();
        assert_eq!(waveform.duration(), 3.0);

        waveform.reset(now);
        assert_eq!(waveform.decoder_state(), DecoderState::Empty);
        assert_eq!(waveform.duration(), 0.0);
        assert!(waveform.peaks().is_none());
    }
}
