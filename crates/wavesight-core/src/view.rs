//! Visible slice of the timeline

/// The currently rendered time span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewWindow {
    /// Seconds at the left edge
    pub start_time: f64,
    /// Seconds across the full width
    pub visible_duration: f64,
}

impl Default for ViewWindow {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            visible_duration: 10.0,
        }
    }
}

impl ViewWindow {
    pub fn new(start_time: f64, visible_duration: f64) -> Self {
        Self {
            start_time,
            visible_duration,
        }
    }

    /// Page-anchored window containing `current_time`
    ///
    /// Pages are `visible_duration` long and start at multiples of it, so the
    /// view flips to the next page when the playhead crosses the right edge.
    pub fn paged(current_time: f64, visible_duration: f64) -> Self {
        let visible_duration = visible_duration.max(f64::EPSILON);
        let current_time = if current_time.is_finite() {
            current_time.max(0.0)
        } else {
            0.0
        };
        Self {
            start_time: (current_time / visible_duration).floor() * visible_duration,
            visible_duration,
        }
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.visible_duration
    }

    /// Largest valid start time for a timeline of `total_duration` seconds
    pub fn max_start(&self, total_duration: f64) -> f64 {
        (total_duration - self.visible_duration).max(0.0)
    }

    /// Move the left edge to `start_time`, clamped to `[0, total - visible]`
    pub fn scroll_to(&mut self, start_time: f64, total_duration: f64) {
        let target = if start_time.is_nan() { 0.0 } else { start_time };
        self.start_time = target.clamp(0.0, self.max_start(total_duration));
    }

    /// Shift by `delta` seconds, clamped
    pub fn scroll_by(&mut self, delta: f64, total_duration: f64) {
        self.scroll_to(self.start_time + delta, total_duration);
    }

    /// Time at fraction `x` (0.0 left edge, 1.0 right edge) of the width
    pub fn time_at_fraction(&self, x: f64) -> f64 {
        self.start_time + x * self.visible_duration
    }

    /// Fraction of the width at which `time` falls (may lie outside 0..1)
    pub fn fraction_of(&self, time: f64) -> f64 {
        if self.visible_duration > 0.0 {
            (time - self.start_time) / self.visible_duration
        } else {
            0.0
        }
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paged_window_anchors_on_page() {
        assert_eq!(ViewWindow::paged(0.0, 10.0).start_time, 0.0);
        assert_eq!(ViewWindow::paged(9.99, 10.0).start_time, 0.0);
        assert_eq!(ViewWindow::paged(10.0, 10.0).start_time, 10.0);
        assert_eq!(ViewWindow::paged(25.0, 10.0).start_time, 20.0);
        assert_eq!(ViewWindow::paged(f64::NAN, 10.0).start_time, 0.0);
    }

    #[test]
    fn test_scroll_clamps_to_timeline() {
        let mut view = ViewWindow::new(0.0, 10.0);
        view.scroll_to(95.0, 100.0);
        assert_eq!(view.start_time, 90.0);

        view.scroll_by(-200.0, 100.0);
        assert_eq!(view.start_time, 0.0);

        // Timeline shorter than the window pins to zero
        view.scroll_to(3.0, 4.0);
        assert_eq!(view.start_time, 0.0);
    }

    #[test]
    fn test_fraction_mapping() {
        let view = ViewWindow::new(20.0, 10.0);
        assert_eq!(view.time_at_fraction(0.5), 25.0);
        assert_eq!(view.fraction_of(22.5), 0.25);
        assert!(view.contains(20.0));
        assert!(!view.contains(30.0));
    }
}
