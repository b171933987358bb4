//! Trailing-edge redraw coalescing
//!
//! Every request pushes the deadline out to `now + delay`; the frame fires
//! once no request arrives for a full delay. A burst that keeps requesting
//! (continuous playback, a long drag) is capped at `MAX_WAIT_FACTOR * delay`
//! after its first request, so frames keep coming while the latest state is
//! still what gets painted. Time is passed in by the caller so the scheduler
//! has no clock of its own.

use std::time::{Duration, Instant};

/// Longest a burst may postpone its frame, in multiples of the delay
pub const MAX_WAIT_FACTOR: u32 = 2;

#[derive(Debug, Clone)]
pub struct RedrawScheduler {
    delay: Duration,
    deadline: Option<Instant>,
    /// First request of the pending burst
    burst_start: Option<Instant>,
}

impl RedrawScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            burst_start: None,
        }
    }

    pub fn from_millis(delay_ms: u32) -> Self {
        Self::new(Duration::from_millis(delay_ms as u64))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Change the coalescing window; a pending deadline keeps its old value
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Request a redraw, pushing the pending deadline out up to the burst cap
    pub fn request(&mut self, now: Instant) {
        let burst_start = *self.burst_start.get_or_insert(now);
        let cap = burst_start + self.delay * MAX_WAIT_FACTOR;
        self.deadline = Some((now + self.delay).min(cap));
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Take the pending frame if its deadline has passed
    pub fn due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.burst_start = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.burst_start = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_collapses_into_one_frame() {
        let start = Instant::now();
        let mut scheduler = RedrawScheduler::from_millis(50);

        for i in 0..4 {
            scheduler.request(start + Duration::from_millis(i * 10));
        }
        // Last request at +30ms, so nothing before +80ms
        assert!(!scheduler.due(start + Duration::from_millis(79)));
        assert!(scheduler.due(start + Duration::from_millis(80)));
        assert!(!scheduler.due(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_endless_burst_capped_at_max_wait() {
        let start = Instant::now();
        let mut scheduler = RedrawScheduler::from_millis(50);

        for i in 0..10 {
            scheduler.request(start + Duration::from_millis(i * 10));
        }
        // Requests until +90ms, but the burst began at 0
        assert_eq!(scheduler.deadline(), Some(start + Duration::from_millis(100)));
        assert!(!scheduler.due(start + Duration::from_millis(99)));
        assert!(scheduler.due(start + Duration::from_millis(100)));

        // The next request opens a new burst
        scheduler.request(start + Duration::from_millis(110));
        assert_eq!(scheduler.deadline(), Some(start + Duration::from_millis(160)));
    }

    #[test]
    fn test_sustained_requests_keep_painting() {
        let start = Instant::now();
        let mut scheduler = RedrawScheduler::from_millis(50);

        // A request and a poll every 25ms for 5s
        let mut frames = 0;
        for step in 0..200u64 {
            let now = start + Duration::from_millis(step * 25);
            scheduler.request(now);
            if scheduler.due(now) {
                frames += 1;
            }
        }
        assert!(frames >= 35, "only {} frames", frames);
        assert!(frames <= 100, "{} frames", frames);
    }

    #[test]
    fn test_cancel_drops_pending_frame() {
        let start = Instant::now();
        let mut scheduler = RedrawScheduler::from_millis(16);
        scheduler.request(start);
        assert!(scheduler.is_pending());

        scheduler.cancel();
        assert!(!scheduler.is_pending());
        assert!(!scheduler.due(start + Duration::from_secs(1)));
    }
}
