//! End-to-end scenarios through the `Waveform` facade

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use wavesight_core::config::OptionsPatch;
use wavesight_core::{
    live_instances, AudioDecoder, AudioSource, ConfigError, DecodedAudio, DecoderState, FileLoader,
    MediaElement, ReadyState, Waveform, WaveformError, WaveformEvent, WaveformOptions,
    WaveformResult,
};

fn record(waveform: &mut Waveform) -> Rc<RefCell<Vec<WaveformEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    waveform.on(move |event| sink.borrow_mut().push(event.clone()));
    seen
}

fn frame_after(waveform: &Waveform, now: Instant) -> Instant {
    now + Duration::from_millis(waveform.options().refresh_delay as u64)
}

fn two_channel_clip() -> (Vec<f32>, Vec<f32>) {
    // 4 seconds at 8 Hz
    let left = vec![0.1; 32];
    let right = (0..32).map(|i| if i % 2 == 0 { 0.9 } else { -0.9 }).collect();
    (left, right)
}

#[test]
fn test_channel_switch_and_cursor_column() {
    let now = Instant::now();
    let options = WaveformOptions {
        duration: 4,
        ..WaveformOptions::default()
    };
    let mut waveform = Waveform::with_defaults(options).unwrap();

    let (left, right) = two_channel_clip();
    let audio = DecodedAudio::from_channels(8, vec![left, right.clone()]).unwrap();
    waveform.load(AudioSource::Decoded(audio), now).unwrap();
    assert_eq!(waveform.decoder_state(), DecoderState::Ready);
    assert_eq!(waveform.channel_count(), 2);

    waveform.change_channel(1, now).unwrap();
    assert_eq!(waveform.options().channel, 1);

    // 800 columns over 4 seconds, but only 32 samples: one bucket per sample
    let table = waveform.peaks().unwrap().clone();
    assert_eq!(table.len(), 32);
    for (bucket, sample) in table.peaks().iter().zip(&right) {
        assert_eq!(*bucket, (*sample, *sample));
    }
    assert_eq!(table.bucket_at(2.0), Some(16));
    assert_eq!(table.range_peak(2.0, 2.005), Some((0.9, 0.9)));

    assert_eq!(waveform.seek(2.0, now), 2.0);
    assert!(waveform.tick(frame_after(&waveform, now)));

    // Playhead at 2s of 4s lands on column 400 of 800
    let cursor = waveform.options().cursor_color.to_rgba8();
    assert_eq!(waveform.canvas().pixel(400, 5), Some(cursor));
    assert_ne!(waveform.canvas().pixel(200, 5), Some(cursor));
}

#[test]
fn test_peaks_follow_time_at_default_width() {
    let now = Instant::now();
    let options = WaveformOptions {
        duration: 4,
        ..WaveformOptions::default()
    };
    let mut waveform = Waveform::with_defaults(options).unwrap();

    // Silent first half, constant 0.5 second half
    let samples = (0..32).map(|i| if i < 16 { 0.0 } else { 0.5 }).collect();
    let audio = DecodedAudio::from_channels(8, vec![samples]).unwrap();
    waveform.load(AudioSource::Decoded(audio), now).unwrap();

    let table = waveform.peaks().unwrap();
    for tenth in 0..40 {
        let time = tenth as f64 * 0.1;
        let expected = if time < 1.95 { 0.0 } else { 0.5 };
        let peak = table.range_peak(time, time + 0.005).unwrap();
        assert_eq!(peak, (expected, expected), "at {}s", time);
    }

    // A longer recording with more samples than buckets keeps its timing too
    let mut long = vec![0.0f32; 8000 * 4 - 1];
    long[3 * 8000] = 1.0;
    let audio = DecodedAudio::from_channels(8000, vec![long]).unwrap();
    waveform.load(AudioSource::Decoded(audio), now).unwrap();

    let table = waveform.peaks().unwrap();
    assert!(table.len() < 8000 * 4);
    let spike = table.peaks().iter().position(|&(_, max)| max == 1.0).unwrap();
    let spike_time = spike as f64 / table.resolution();
    assert!((spike_time - 3.0).abs() < 0.01, "spike drawn at {}s", spike_time);
}

#[test]
fn test_scrollable_drag_clamps_to_last_window() {
    let now = Instant::now();
    let options = WaveformOptions {
        scrollable: true,
        duration: 10,
        ..WaveformOptions::default()
    };
    let mut waveform = Waveform::with_defaults(options).unwrap();
    let audio = DecodedAudio::from_channels(8, vec![vec![0.0; 800]]).unwrap();
    waveform.load(AudioSource::Decoded(audio), now).unwrap();
    assert_eq!(waveform.duration(), 100.0);

    waveform.scroll_to(95.0, now);
    assert_eq!(waveform.view().start_time, 90.0);

    waveform.drag_by_seconds(10.0, now);
    assert_eq!(waveform.view().start_time, 90.0);

    waveform.resize(100.0, 50.0, now);
    waveform.drag_by_pixels(50.0, now);
    assert_eq!(waveform.view().start_time, 85.0);
}

/// Decoder whose speed depends on the first byte; returns that many seconds of audio
struct SlowDecoder;

impl AudioDecoder for SlowDecoder {
    fn decode_bytes(&self, bytes: &[u8]) -> WaveformResult<DecodedAudio> {
        let seconds = bytes[0] as usize;
        if seconds == 1 {
            thread::sleep(Duration::from_millis(150));
        }
        DecodedAudio::from_channels(8, vec![vec![0.25; seconds * 8]])
    }
}

#[test]
fn test_superseded_decode_is_discarded() {
    let options = WaveformOptions {
        use_worker: true,
        ..WaveformOptions::default()
    };
    let mut waveform = Waveform::new(options, Arc::new(SlowDecoder), Arc::new(FileLoader)).unwrap();
    let seen = record(&mut waveform);

    let now = Instant::now();
    waveform.load(AudioSource::Bytes(vec![1]), now).unwrap();
    waveform.load(AudioSource::Bytes(vec![2]), now).unwrap();
    assert_eq!(waveform.decoder_state(), DecoderState::Decoding);

    let deadline = Instant::now() + Duration::from_secs(5);
    while waveform.decoder_state() == DecoderState::Decoding && Instant::now() < deadline {
        waveform.tick(Instant::now());
        thread::sleep(Duration::from_millis(10));
    }
    // Give a late result from the first job a chance to arrive
    thread::sleep(Duration::from_millis(200));
    waveform.tick(Instant::now());

    assert_eq!(waveform.decoder_state(), DecoderState::Ready);
    assert_eq!(waveform.duration(), 2.0);

    let decoded: Vec<_> = seen
        .borrow()
        .iter()
        .filter(|event| matches!(event, WaveformEvent::Decoded { .. }))
        .cloned()
        .collect();
    assert_eq!(decoded.len(), 1);
    assert!(matches!(decoded[0], WaveformEvent::Decoded { duration, .. } if duration == 2.0));
}

#[test]
fn test_worker_turned_off_mid_decode_still_finishes() {
    let options = WaveformOptions {
        use_worker: true,
        ..WaveformOptions::default()
    };
    let mut waveform = Waveform::new(options, Arc::new(SlowDecoder), Arc::new(FileLoader)).unwrap();
    let seen = record(&mut waveform);

    let now = Instant::now();
    waveform.load(AudioSource::Bytes(vec![1]), now).unwrap();
    let patch = OptionsPatch {
        use_worker: Some(false),
        ..OptionsPatch::default()
    };
    waveform.set_options(&patch, now).unwrap();
    assert_eq!(waveform.decoder_state(), DecoderState::Decoding);

    let deadline = Instant::now() + Duration::from_secs(5);
    while waveform.decoder_state() == DecoderState::Decoding && Instant::now() < deadline {
        waveform.tick(Instant::now());
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(waveform.decoder_state(), DecoderState::Ready);
    assert_eq!(waveform.duration(), 1.0);
    assert!(seen
        .borrow()
        .iter()
        .any(|event| matches!(event, WaveformEvent::Decoded { duration, .. } if *duration == 1.0)));
}

struct FakeMedia {
    time: Rc<Cell<f64>>,
    duration: f64,
}

impl MediaElement for FakeMedia {
    fn current_time(&self) -> f64 {
        self.time.get()
    }
    fn set_current_time(&mut self, seconds: f64) {
        self.time.set(seconds);
    }
    fn duration(&self) -> f64 {
        self.duration
    }
    fn paused(&self) -> bool {
        true
    }
    fn ended(&self) -> bool {
        false
    }
    fn ready_state(&self) -> ReadyState {
        ReadyState::HaveMetadata
    }
}

#[test]
fn test_seek_clamps_and_writes_through_to_media() {
    let now = Instant::now();
    let time = Rc::new(Cell::new(0.0));
    let mut waveform = Waveform::with_defaults(WaveformOptions::default()).unwrap();
    let seen = record(&mut waveform);

    waveform
        .load(
            AudioSource::Media(Box::new(FakeMedia {
                time: time.clone(),
                duration: 30.0,
            })),
            now,
        )
        .unwrap();
    assert!(waveform.peaks().is_none());

    assert_eq!(waveform.seek(45.0, now), 30.0);
    assert_eq!(time.get(), 30.0);
    assert_eq!(waveform.seek(-3.0, now), 0.0);
    assert_eq!(time.get(), 0.0);

    assert!(seen.borrow().contains(&WaveformEvent::Seeked { time: 30.0 }));

    // The element moving on its own shows up on the next frame
    time.set(12.0);
    let later = frame_after(&waveform, now);
    waveform.tick(later);
    assert!(waveform.tick(frame_after(&waveform, later)));
    assert_eq!(waveform.playback().current_time, 12.0);
    assert_eq!(waveform.view().start_time, 10.0);
}

#[test]
fn test_invalid_channel_leaves_display_unchanged() {
    let now = Instant::now();
    let mut waveform = Waveform::with_defaults(WaveformOptions::default()).unwrap();
    let (left, right) = two_channel_clip();
    let audio = DecodedAudio::from_channels(8, vec![left, right]).unwrap();
    waveform.load(AudioSource::Decoded(audio), now).unwrap();
    let before = waveform.peaks().cloned();

    let err = waveform.change_channel(3, now).unwrap_err();
    assert_eq!(
        err,
        WaveformError::InvalidChannel {
            index: 3,
            channel_count: 2
        }
    );
    assert_eq!(waveform.options().channel, 0);
    assert_eq!(waveform.peaks().cloned(), before);

    assert!(waveform.change_channel(6, now).is_err());
}

#[test]
fn test_out_of_range_option_is_rejected_atomically() {
    let now = Instant::now();
    let mut waveform = Waveform::with_defaults(WaveformOptions::default()).unwrap();
    let before = waveform.options().clone();

    let patch = OptionsPatch {
        refresh_delay: Some(5),
        wave: Some(false),
        ..OptionsPatch::default()
    };
    let err = waveform.set_options(&patch, now).unwrap_err();
    assert!(matches!(
        err,
        WaveformError::Config(ConfigError::OutOfRange {
            field: "refresh_delay",
            ..
        })
    ));
    assert_eq!(waveform.options(), &before);

    let patch = OptionsPatch {
        refresh_delay: Some(100),
        ..OptionsPatch::default()
    };
    waveform.set_options(&patch, now).unwrap();
    assert_eq!(waveform.options().refresh_delay, 100);
}

#[test]
fn test_destroy_twice_is_harmless() {
    let mut waveform = Waveform::with_defaults(WaveformOptions::default()).unwrap();
    let id = waveform.id();
    assert!(live_instances().contains(&id));

    let destroyed = Rc::new(Cell::new(0));
    let counter = destroyed.clone();
    waveform.on(move |event| {
        if *event == WaveformEvent::Destroyed {
            counter.set(counter.get() + 1);
        }
    });

    waveform.destroy();
    waveform.destroy();

    assert_eq!(destroyed.get(), 1);
    assert!(waveform.is_destroyed());
    assert!(!live_instances().contains(&id));
}

#[test]
fn test_dropped_instance_leaves_registry() {
    let waveform = Waveform::with_defaults(WaveformOptions::default()).unwrap();
    let id = waveform.id();
    drop(waveform);
    assert!(!live_instances().contains(&id));
}

#[test]
fn test_export_before_first_frame_is_blank() {
    let waveform = Waveform::with_defaults(WaveformOptions::default()).unwrap();
    let png = waveform.export_image().unwrap();

    assert_eq!(&png[1..4], b"PNG");
    assert!(waveform.canvas().pixels().iter().all(|&byte| byte == 0));
}

#[test]
fn test_garbage_bytes_report_decode_failure() {
    let now = Instant::now();
    let mut waveform = Waveform::with_defaults(WaveformOptions::default()).unwrap();
    let seen = record(&mut waveform);

    waveform.load(AudioSource::Bytes(b"not audio at all".to_vec()), now).unwrap();

    assert_eq!(waveform.decoder_state(), DecoderState::Error);
    assert!(seen
        .borrow()
        .iter()
        .any(|event| matches!(event, WaveformEvent::DecodeFailed { .. })));

    // Still paints the no-data state
    assert!(waveform.tick(frame_after(&waveform, now)));
}

#[test]
fn test_rapid_seeks_coalesce_into_one_frame() {
    let start = Instant::now();
    let mut waveform = Waveform::with_defaults(WaveformOptions::default()).unwrap();
    let audio = DecodedAudio::from_channels(8, vec![vec![0.5; 160]]).unwrap();
    waveform.load(AudioSource::Decoded(audio), start).unwrap();
    let seen = record(&mut waveform);

    for step in 0..10u64 {
        let at = start + Duration::from_millis(step * 10);
        waveform.seek(step as f64, at);
        assert!(!waveform.tick(at));
    }

    let last = start + Duration::from_millis(90);
    assert!(waveform.tick(frame_after(&waveform, last)));
    assert!(!waveform.tick(frame_after(&waveform, last) + Duration::from_secs(1)));

    let redraws: Vec<_> = seen
        .borrow()
        .iter()
        .filter_map(|event| match event {
            WaveformEvent::Redrawn { current_time, .. } => Some(*current_time),
            _ => None,
        })
        .collect();
    assert_eq!(redraws, vec![9.0]);
}

#[test]
fn test_wav_file_through_file_loader() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..16000 {
        let sample = ((i as f32 * 0.05).sin() * 20000.0) as i16;
        writer.write_sample(sample).unwrap();
        writer.write_sample(sample / 2).unwrap();
    }
    writer.finalize().unwrap();

    let now = Instant::now();
    let mut waveform = Waveform::with_defaults(WaveformOptions::default()).unwrap();
    waveform
        .load(AudioSource::Url(format!("file://{}", path.display())), now)
        .unwrap();

    assert_eq!(waveform.decoder_state(), DecoderState::Ready);
    assert_eq!(waveform.channel_count(), 2);
    assert!((waveform.duration() - 2.0).abs() < 1e-9);

    let (min, max) = waveform
        .peaks()
        .unwrap()
        .peaks()
        .iter()
        .fold((0.0f32, 0.0f32), |(lo, hi), &(a, b)| (lo.min(a), hi.max(b)));
    assert!(min < -0.5 && max > 0.5);
}
