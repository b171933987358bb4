//! Playback position tracking
//!
//! Exactly one clock is authoritative at a time: an attached media element,
//! or the internal clock advanced by explicit seeks.

/// Loading progress reported by a media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadyState {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// A playing media element whose samples are not addressable
///
/// Polled by the controller on every tick; a change in `current_time` is the
/// time-update signal.
pub trait MediaElement {
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    /// Total duration in seconds (may be NaN before metadata is available)
    fn duration(&self) -> f64;
    fn paused(&self) -> bool;
    fn ended(&self) -> bool;
    fn ready_state(&self) -> ReadyState;
}

/// Snapshot of the playback position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackState {
    /// Position in seconds
    pub current_time: f64,
    /// Total duration in seconds
    pub duration: f64,
    pub playing: bool,
}

impl PlaybackState {
    /// Playhead as a fraction of the duration (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Source of truth for the playback position
pub enum PlaybackClock {
    Internal { current_time: f64, duration: f64 },
    Media(Box<dyn MediaElement>),
}

impl Default for PlaybackClock {
    fn default() -> Self {
        PlaybackClock::Internal {
            current_time: 0.0,
            duration: 0.0,
        }
    }
}

impl PlaybackClock {
    pub fn is_media(&self) -> bool {
        matches!(self, PlaybackClock::Media(_))
    }

    pub fn duration(&self) -> f64 {
        match self {
            PlaybackClock::Internal { duration, .. } => *duration,
            PlaybackClock::Media(media) if media.ready_state() >= ReadyState::HaveMetadata => {
                finite_or_zero(media.duration())
            }
            PlaybackClock::Media(_) => 0.0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        match self {
            PlaybackClock::Internal {
                current_time,
                duration,
            } => PlaybackState {
                current_time: *current_time,
                duration: *duration,
                playing: false,
            },
            PlaybackClock::Media(media) => {
                let duration = self.duration();
                PlaybackState {
                    current_time: finite_or_zero(media.current_time()).min(duration.max(0.0)),
                    duration,
                    playing: !media.paused() && !media.ended(),
                }
            }
        }
    }

    /// Update the internal clock's duration; media elements report their own
    pub fn set_duration(&mut self, seconds: f64) {
        if let PlaybackClock::Internal {
            current_time,
            duration,
        } = self
        {
            *duration = finite_or_zero(seconds);
            *current_time = current_time.clamp(0.0, *duration);
        }
    }

    /// Move the playhead, clamped to `[0, duration]`; returns the applied position
    pub fn seek(&mut self, seconds: f64) -> f64 {
        let duration = self.duration();
        let target = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, duration)
        };

        match self {
            PlaybackClock::Internal { current_time, .. } => *current_time = target,
            PlaybackClock::Media(media) => media.set_current_time(target),
        }
        target
    }
}
