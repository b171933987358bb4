//! Sample sources: normalizing load targets into decoded audio
//!
//! A load target is one of four shapes (see [`AudioSource`]). Already-decoded
//! buffers are used as-is; byte streams go through an [`AudioDecoder`]; URLs are
//! fetched by a [`Loader`] first. Media elements carry no addressable samples
//! and bypass decoding entirely.

use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{WaveformError, WaveformResult};
use crate::playback::MediaElement;

/// Fully decoded multi-channel audio
///
/// Immutable once produced; the decoder replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    sample_rate: u32,
    duration: f64,
    channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    /// Build from per-channel sample arrays
    ///
    /// Fails when there are no channels or the sample rate is zero.
    pub fn from_channels(sample_rate: u32, channels: Vec<Vec<f32>>) -> WaveformResult<Self> {
        if channels.is_empty() {
            return Err(WaveformError::Decode("audio has no channels".to_string()));
        }
        if sample_rate == 0 {
            return Err(WaveformError::Decode("sample rate is zero".to_string()));
        }

        let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
        Ok(Self {
            sample_rate,
            duration: frames as f64 / sample_rate as f64,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Samples per channel (the longest channel)
    pub fn frames(&self) -> usize {
        self.channels.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Samples of one channel, `None` if out of range
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }
}

/// Something `load` can consume
pub enum AudioSource {
    /// Samples already decoded by the caller
    Decoded(DecodedAudio),
    /// Compressed audio bytes (WAV, FLAC, Ogg Vorbis)
    Bytes(Vec<u8>),
    /// A playing media element; no samples, duration only
    Media(Box<dyn MediaElement>),
    /// Location handed to the [`Loader`]
    Url(String),
}

impl AudioSource {
    /// Reject targets that can never produce audio, before any state changes
    pub fn validate(&self) -> WaveformResult<()> {
        match self {
            AudioSource::Url(url) if url.trim().is_empty() => {
                Err(WaveformError::InvalidTarget("empty URL".to_string()))
            }
            AudioSource::Bytes(bytes) if bytes.is_empty() => {
                Err(WaveformError::InvalidTarget("empty byte stream".to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AudioSource::Decoded(_) => "decoded buffer",
            AudioSource::Bytes(_) => "byte stream",
            AudioSource::Media(_) => "media element",
            AudioSource::Url(_) => "url",
        }
    }
}

impl std::fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioSource::Decoded(audio) => write!(
                f,
                "Decoded(<{} ch, {} Hz, {:.2}s>)",
                audio.channel_count(),
                audio.sample_rate(),
                audio.duration()
            ),
            AudioSource::Bytes(bytes) => write!(f, "Bytes(<{} bytes>)", bytes.len()),
            AudioSource::Media(_) => write!(f, "Media(<element>)"),
            AudioSource::Url(url) => write!(f, "Url({:?})", url),
        }
    }
}

/// Decodes compressed bytes into samples
///
/// Implementations must be shareable with the decode worker thread.
pub trait AudioDecoder: Send + Sync {
    fn decode_bytes(&self, bytes: &[u8]) -> WaveformResult<DecodedAudio>;
}

/// Fetches the bytes behind a URL
pub trait Loader: Send + Sync {
    fn load_bytes(&self, url: &str) -> WaveformResult<Vec<u8>>;
}

/// Loader for local paths and `file://` URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl Loader for FileLoader {
    fn load_bytes(&self, url: &str) -> WaveformResult<Vec<u8>> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        if path.contains("://") {
            return Err(WaveformError::Load(format!("unsupported URL scheme: {}", url)));
        }

        std::fs::read(Path::new(path)).map_err(|e| WaveformError::Load(format!("{}: {}", path, e)))
    }
}

/// Symphonia-backed decoder for in-memory byte streams
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    fn decode_bytes(&self, bytes: &[u8]) -> WaveformResult<DecodedAudio> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        let probed = symphonia::default::get_probe()
            .format(&Hint::new(), mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| WaveformError::Decode(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| WaveformError::Decode("no audio track found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| WaveformError::Decode("unknown sample rate".to_string()))?;
        let mut channel_count = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| WaveformError::Decode(e.to_string()))?;

        let mut channels: Vec<Vec<f32>> = vec![Vec::new(); channel_count];
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(WaveformError::Decode(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // Corrupt packets are skipped, the rest of the stream is still usable
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(WaveformError::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            let decoded_channels = spec.channels.count();
            if decoded_channels == 0 {
                continue;
            }
            if channels.len() < decoded_channels {
                channels.resize_with(decoded_channels, Vec::new);
                channel_count = decoded_channels;
            }

            let needs_alloc = sample_buf
                .as_ref()
                .map_or(true, |buf| buf.capacity() < decoded.capacity() * decoded_channels);
            if needs_alloc {
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            if let Some(buf) = sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                for frame in buf.samples().chunks_exact(decoded_channels) {
                    for (channel, &sample) in frame.iter().enumerate() {
                        channels[channel].push(sample);
                    }
                }
            }
        }

        log::debug!(
            "Decoded {} bytes: {} channels at {} Hz, {} frames",
            bytes.len(),
            channel_count,
            sample_rate,
            channels.first().map_or(0, Vec::len)
        );

        DecodedAudio::from_channels(sample_rate, channels)
    }
}
