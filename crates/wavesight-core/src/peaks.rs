//! Peak reduction for waveform display
//!
//! Downsamples one channel into a fixed number of min/max buckets. Runs once
//! per decode or channel change; drawing only ever reads the resulting table.

/// Min/max summary of one channel at a fixed time resolution
#[derive(Debug, Clone, PartialEq)]
pub struct PeakTable {
    /// (min, max) per bucket, in time order
    peaks: Vec<(f32, f32)>,
    /// Seconds of audio the table covers
    duration: f64,
}

impl PeakTable {
    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn peaks(&self) -> &[(f32, f32)] {
        &self.peaks
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Buckets per second of audio
    pub fn resolution(&self) -> f64 {
        if self.duration > 0.0 {
            self.peaks.len() as f64 / self.duration
        } else {
            0.0
        }
    }

    /// Attach the time span the buckets cover
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        self
    }

    /// Index of the bucket whose start is nearest to `time`, `None` outside the audio
    pub fn bucket_at(&self, time: f64) -> Option<usize> {
        if self.peaks.is_empty() || self.duration <= 0.0 || time < 0.0 || time >= self.duration {
            return None;
        }
        let index = (time * self.resolution()).round() as usize;
        Some(index.min(self.peaks.len() - 1))
    }

    /// Min/max over the buckets starting in `[from, to)`
    ///
    /// When no bucket starts in the span (buckets wider than the span), the
    /// nearest bucket to `from` is used alone.
    pub fn range_peak(&self, from: f64, to: f64) -> Option<(f32, f32)> {
        let first = self.bucket_at(from)?;
        let resolution = self.resolution();
        let last = ((to * resolution).round() as usize).min(self.peaks.len());

        if last <= first + 1 {
            return Some(self.peaks[first]);
        }

        let (mut min, mut max) = self.peaks[first];
        for &(lo, hi) in &self.peaks[first + 1..last] {
            min = min.min(lo);
            max = max.max(hi);
        }
        Some((min, max))
    }
}

/// Split `samples` into `bucket_count` contiguous runs and keep each run's min/max
///
/// Run `i` covers `[i * len / bucket_count, (i + 1) * len / bucket_count)`, so
/// runs differ by at most one sample and bucket `i` starts at the same fraction
/// of the input as of the table. The last run ends at `len`. With fewer samples
/// than buckets, bucket `i` holds sample `i` and trailing buckets are `(0, 0)`.
/// Empty input yields a flat table; NaN samples are skipped.
pub fn reduce(samples: &[f32], bucket_count: usize) -> PeakTable {
    let len = samples.len();
    let mut peaks = vec![(0.0f32, 0.0f32); bucket_count];

    if len == 0 || bucket_count == 0 {
        return PeakTable { peaks, duration: 0.0 };
    }

    if len < bucket_count {
        for (bucket, &sample) in peaks.iter_mut().zip(samples) {
            if !sample.is_nan() {
                *bucket = (sample, sample);
            }
        }
        return PeakTable { peaks, duration: 0.0 };
    }

    for (index, bucket) in peaks.iter_mut().enumerate() {
        let start = run_boundary(index, len, bucket_count);
        let end = run_boundary(index + 1, len, bucket_count);

        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &sample in &samples[start..end] {
            min = min.min(sample);
            max = max.max(sample);
        }
        // f32::min/max skip NaN, so an all-NaN run stays inverted
        if min <= max {
            *bucket = (min, max);
        }
    }

    PeakTable { peaks, duration: 0.0 }
}

fn run_boundary(index: usize, len: usize, bucket_count: usize) -> usize {
    (index as u128 * len as u128 / bucket_count as u128) as usize
}

/// Number of buckets for a recording so that the visible window always has
/// at least one bucket per device pixel
///
/// `visible_duration` is the number of seconds shown across `css_width` pixels.
/// Callers holding samples cap the result at the sample count; the drawer
/// repeats buckets across columns when the recording is coarser than the canvas.
pub fn bucket_count_for(
    total_duration: f64,
    visible_duration: f64,
    css_width: f32,
    pixel_ratio: f32,
) -> usize {
    if !(total_duration > 0.0) || !(visible_duration > 0.0) {
        return 1;
    }
    let device_width = (css_width.max(1.0) * pixel_ratio.max(1.0)) as f64;
    let resolution = (device_width / visible_duration).ceil();
    ((total_duration * resolution).round() as usize).max(1)
}
