//! Decoder: owns the decoded audio and the active channel's peak table
//!
//! ## State machine
//!
//! ```text
//! Empty ──decode──▶ Decoding ──ok──▶ Ready
//!                      │
//!                      └──err──▶ Error      (any state ──destroy/reset──▶ Empty)
//! ```
//!
//! Every `decode` bumps a generation counter. Results carry the generation
//! they were started with and are dropped unless it is still the latest, so a
//! slow superseded decode can never overwrite a newer one.
//!
//! Byte streams and URLs are decoded inline, or on the `decode-worker` thread
//! when the worker is enabled. Worker results are picked up by [`Decoder::poll`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::error::{WaveformError, WaveformResult};
use crate::events::{EventEmitter, WaveformEvent};
use crate::peaks::{bucket_count_for, reduce, PeakTable};
use crate::source::{AudioDecoder, DecodedAudio, Loader};
use crate::config::CHANNEL_RANGE;

/// Decoder lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    #[default]
    Empty,
    Decoding,
    Ready,
    Error,
}

/// What the decoder is asked to decode
#[derive(Debug)]
pub enum DecodeInput {
    Decoded(DecodedAudio),
    Bytes(Vec<u8>),
    Url(String),
}

/// Inputs that determine how many buckets the peak table has
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Seconds shown across the canvas width
    pub visible_duration: f64,
    /// Canvas width in CSS pixels
    pub css_width: f32,
    pub pixel_ratio: f32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            visible_duration: 10.0,
            css_width: 800.0,
            pixel_ratio: 1.0,
        }
    }
}

impl Resolution {
    /// Buckets for `audio`, never more than it has samples per channel
    fn bucket_count(&self, audio: &DecodedAudio) -> usize {
        let buckets = bucket_count_for(audio.duration(), self.visible_duration, self.css_width, self.pixel_ratio);
        buckets.min(audio.frames().max(1))
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Decode worker
// ────────────────────────────────────────────────────────────────────────────────

struct DecodeJob {
    generation: u64,
    input: DecodeInput,
}

struct DecodeOutcome {
    generation: u64,
    result: WaveformResult<DecodedAudio>,
}

/// Background thread that fetches and decodes byte streams
struct DecodeWorker {
    tx: Sender<DecodeJob>,
    rx: Receiver<DecodeOutcome>,
    /// Latest generation requested; the thread skips jobs older than this
    latest: Arc<AtomicU64>,
    _handle: JoinHandle<()>,
}

impl DecodeWorker {
    fn spawn(audio_decoder: Arc<dyn AudioDecoder>, loader: Arc<dyn Loader>) -> WaveformResult<Self> {
        let (job_tx, job_rx) = std::sync::mpsc::channel::<DecodeJob>();
        let (outcome_tx, outcome_rx) = std::sync::mpsc::channel::<DecodeOutcome>();
        let latest = Arc::new(AtomicU64::new(0));
        let latest_clone = latest.clone();

        let handle = thread::Builder::new()
            .name("decode-worker".to_string())
            .spawn(move || {
                worker_thread(job_rx, outcome_tx, latest_clone, audio_decoder, loader);
            })
            .map_err(|e| WaveformError::Decode(format!("failed to spawn decode worker: {}", e)))?;

        log::info!("Decode worker thread started");

        Ok(Self {
            tx: job_tx,
            rx: outcome_rx,
            latest,
            _handle: handle,
        })
    }

    fn submit(&self, job: DecodeJob) -> WaveformResult<()> {
        self.latest.store(job.generation, Ordering::Release);
        self.tx
            .send(job)
            .map_err(|e| WaveformError::Decode(format!("decode worker disconnected: {}", e)))
    }

    fn supersede(&self, generation: u64) {
        self.latest.store(generation, Ordering::Release);
    }

    fn try_recv(&self) -> Option<DecodeOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::error!("Decode worker thread disconnected unexpectedly");
                None
            }
        }
    }
}

fn run_job(
    input: DecodeInput,
    audio_decoder: &dyn AudioDecoder,
    loader: &dyn Loader,
) -> WaveformResult<DecodedAudio> {
    match input {
        DecodeInput::Decoded(audio) => Ok(audio),
        DecodeInput::Bytes(bytes) => audio_decoder.decode_bytes(&bytes),
        DecodeInput::Url(url) => {
            let bytes = loader.load_bytes(&url)?;
            audio_decoder.decode_bytes(&bytes)
        }
    }
}

fn worker_thread(
    rx: Receiver<DecodeJob>,
    tx: Sender<DecodeOutcome>,
    latest: Arc<AtomicU64>,
    audio_decoder: Arc<dyn AudioDecoder>,
    loader: Arc<dyn Loader>,
) {
    log::debug!("Decode worker thread starting");

    while let Ok(job) = rx.recv() {
        if job.generation < latest.load(Ordering::Acquire) {
            log::debug!("Skipping superseded decode job (generation {})", job.generation);
            continue;
        }

        let start_time = Instant::now();
        let result = run_job(job.input, audio_decoder.as_ref(), loader.as_ref());
        log::debug!(
            "Decode job {} finished in {:?} (ok={})",
            job.generation,
            start_time.elapsed(),
            result.is_ok()
        );

        if tx
            .send(DecodeOutcome {
                generation: job.generation,
                result,
            })
            .is_err()
        {
            break;
        }
    }

    log::debug!("Decode worker thread shutting down");
}

// ────────────────────────────────────────────────────────────────────────────────
// Decoder
// ────────────────────────────────────────────────────────────────────────────────

pub struct Decoder {
    state: DecoderState,
    generation: u64,
    audio: Option<Arc<DecodedAudio>>,
    /// Duration tracked for media elements, which have no samples
    media_duration: Option<f64>,
    peaks: Option<PeakTable>,
    channel: usize,
    resolution: Resolution,
    last_error: Option<WaveformError>,
    audio_decoder: Arc<dyn AudioDecoder>,
    loader: Arc<dyn Loader>,
    use_worker: bool,
    worker: Option<DecodeWorker>,
}

impl Decoder {
    pub fn new(audio_decoder: Arc<dyn AudioDecoder>, loader: Arc<dyn Loader>) -> Self {
        Self {
            state: DecoderState::Empty,
            generation: 0,
            audio: None,
            media_duration: None,
            peaks: None,
            channel: 0,
            resolution: Resolution::default(),
            last_error: None,
            audio_decoder,
            loader,
            use_worker: false,
            worker: None,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn audio(&self) -> Option<&Arc<DecodedAudio>> {
        self.audio.as_ref()
    }

    /// Peak table of the active channel (`None` for media elements or before decode)
    pub fn peaks(&self) -> Option<&PeakTable> {
        self.peaks.as_ref()
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn channel_count(&self) -> usize {
        self.audio.as_ref().map_or(0, |audio| audio.channel_count())
    }

    /// Duration of the decoded audio or tracked media, in seconds
    pub fn duration(&self) -> f64 {
        match (&self.audio, self.media_duration) {
            (Some(audio), _) => audio.duration(),
            (None, Some(duration)) => duration,
            (None, None) => 0.0,
        }
    }

    pub fn last_error(&self) -> Option<&WaveformError> {
        self.last_error.as_ref()
    }

    /// Turning the worker off keeps it alive until an in-flight decode lands
    pub fn set_use_worker(&mut self, use_worker: bool) {
        self.use_worker = use_worker;
        self.release_idle_worker();
    }

    /// Set the channel to display after the next decode (clamped on decode)
    pub fn set_preferred_channel(&mut self, channel: usize) {
        self.channel = channel;
    }

    /// Update the peak resolution, rebuilding the table only when the bucket count changes
    pub fn set_resolution(&mut self, resolution: Resolution) {
        if self.resolution == resolution {
            return;
        }
        self.resolution = resolution;

        let Some(audio) = self.audio.clone() else {
            return;
        };
        let buckets = resolution.bucket_count(&audio);
        if self.peaks.as_ref().map(PeakTable::len) != Some(buckets) {
            self.peaks = Some(build_table(&audio, self.channel, buckets));
        }
    }

    /// Start decoding `input`; returns the generation assigned to it
    ///
    /// Failures are reported through `events` and leave the decoder in
    /// `Error`; nothing is returned to the caller.
    pub fn decode(&mut self, input: DecodeInput, events: &mut EventEmitter) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        self.state = DecoderState::Decoding;
        self.last_error = None;
        self.audio = None;
        self.media_duration = None;
        self.peaks = None;

        let offload = self.use_worker && !matches!(input, DecodeInput::Decoded(_));
        if offload {
            if let Err(error) = self.submit(DecodeJob { generation, input }) {
                self.complete(DecodeOutcome { generation, result: Err(error) }, events);
            }
            return generation;
        }

        self.supersede_worker();
        let result = run_job(input, self.audio_decoder.as_ref(), self.loader.as_ref());
        self.complete(DecodeOutcome { generation, result }, events);
        self.release_idle_worker();
        generation
    }

    /// Track a media element's duration in place of decoded samples
    pub fn track_media(&mut self, duration: f64, events: &mut EventEmitter) {
        self.generation += 1;
        self.supersede_worker();
        self.audio = None;
        self.peaks = None;
        self.last_error = None;
        self.media_duration = Some(if duration.is_finite() { duration.max(0.0) } else { 0.0 });
        self.state = DecoderState::Ready;
        self.release_idle_worker();
        events.emit(&WaveformEvent::MediaAttached {
            duration: self.duration(),
        });
    }

    /// Update the tracked media duration once the element reports metadata
    pub fn update_media_duration(&mut self, duration: f64) {
        if self.media_duration.is_some() && duration.is_finite() {
            self.media_duration = Some(duration.max(0.0));
        }
    }

    /// Apply finished worker results; returns true if new audio became ready
    pub fn poll(&mut self, events: &mut EventEmitter) -> bool {
        let mut outcomes = Vec::new();
        if let Some(worker) = self.worker.as_ref() {
            while let Some(outcome) = worker.try_recv() {
                outcomes.push(outcome);
            }
        }

        let mut ready = false;
        for outcome in outcomes {
            ready |= self.complete(outcome, events);
        }
        self.release_idle_worker();
        ready
    }

    /// Switch the displayed channel using the audio already held
    ///
    /// Requires `Ready` and `index < channel_count`; on failure nothing changes.
    pub fn change_channel(&mut self, index: usize, events: &mut EventEmitter) -> WaveformResult<()> {
        let channel_count = self.channel_count();
        let audio = match (&self.audio, self.state) {
            (Some(audio), DecoderState::Ready) if index < channel_count && index <= CHANNEL_RANGE.1 => {
                audio.clone()
            }
            _ => {
                return Err(WaveformError::InvalidChannel {
                    index,
                    channel_count,
                })
            }
        };

        let buckets = self.resolution.bucket_count(&audio);
        self.peaks = Some(build_table(&audio, index, buckets));
        self.channel = index;
        events.emit(&WaveformEvent::ChannelChanged { channel: index });
        Ok(())
    }

    /// Release audio and peaks and return to `Empty`; idempotent
    pub fn reset(&mut self) {
        if self.state != DecoderState::Empty || self.audio.is_some() || self.media_duration.is_some() {
            log::debug!("Decoder reset (generation {})", self.generation);
        }
        self.generation += 1;
        self.supersede_worker();
        self.audio = None;
        self.media_duration = None;
        self.peaks = None;
        self.last_error = None;
        self.state = DecoderState::Empty;
        self.release_idle_worker();
    }

    /// Reset and shut down the worker thread
    pub fn destroy(&mut self) {
        self.reset();
        self.worker = None;
    }

    fn submit(&mut self, job: DecodeJob) -> WaveformResult<()> {
        if self.worker.is_none() {
            self.worker = Some(DecodeWorker::spawn(self.audio_decoder.clone(), self.loader.clone())?);
        }
        match self.worker.as_ref() {
            Some(worker) => worker.submit(job),
            None => Err(WaveformError::Decode("decode worker unavailable".to_string())),
        }
    }

    /// Drop a disabled worker once no decode of the current generation is pending
    fn release_idle_worker(&mut self) {
        if !self.use_worker && self.state != DecoderState::Decoding && self.worker.take().is_some() {
            log::debug!("Decode worker released");
        }
    }

    fn supersede_worker(&self) {
        if let Some(worker) = self.worker.as_ref() {
            worker.supersede(self.generation);
        }
    }

    fn complete(&mut self, outcome: DecodeOutcome, events: &mut EventEmitter) -> bool {
        if outcome.generation != self.generation {
            log::debug!(
                "Discarding stale decode result (generation {}, current {})",
                outcome.generation,
                self.generation
            );
            return false;
        }

        match outcome.result {
            Ok(audio) => {
                let channel_count = audio.channel_count();
                if self.channel >= channel_count {
                    log::info!(
                        "Channel {} not present in decoded audio, clamping to {}",
                        self.channel,
                        channel_count - 1
                    );
                    self.channel = channel_count - 1;
                }

                let audio = Arc::new(audio);
                let buckets = self.resolution.bucket_count(&audio);
                self.peaks = Some(build_table(&audio, self.channel, buckets));
                self.media_duration = None;
                self.audio = Some(audio.clone());
                self.state = DecoderState::Ready;

                events.emit(&WaveformEvent::Decoded {
                    generation: outcome.generation,
                    channel_count,
                    duration: audio.duration(),
                });
                true
            }
            Err(error) => {
                log::warn!("Decode failed: {}", error);
                self.state = DecoderState::Error;
                self.last_error = Some(error.clone());
                let event = match error {
                    WaveformError::Load(_) => WaveformEvent::LoadFailed { error },
                    _ => WaveformEvent::DecodeFailed { error },
                };
                events.emit(&event);
                false
            }
        }
    }
}

fn build_table(audio: &DecodedAudio, channel: usize, buckets: usize) -> PeakTable {
    let start_time = Instant::now();
    let samples = audio.channel(channel).unwrap_or(&[]);
    let table = reduce(samples, buckets).with_duration(audio.duration());
    log::debug!(
        "Peak table for channel {} built in {:?} ({} samples -> {} buckets)",
        channel,
        start_time.elapsed(),
        samples.len(),
        table.len()
    );
    table
}
