//! Render-loop driver
//!
//! Observes the playback clock and user interaction, keeps the visible
//! [`ViewWindow`] and decides when a frame is due. Every position or layout
//! change goes through the [`RedrawScheduler`], so bursts of changes produce
//! a single trailing redraw, and endless bursts such as playback still paint
//! at a bounded rate.

use std::time::Instant;

use crate::config::WaveformOptions;
use crate::playback::{MediaElement, PlaybackClock, PlaybackState};
use crate::scheduler::RedrawScheduler;
use crate::view::ViewWindow;

pub struct Controller {
    clock: PlaybackClock,
    scheduler: RedrawScheduler,
    /// Window used in scrollable mode; recomputed from the playhead otherwise
    scroll_view: ViewWindow,
    visible_duration: f64,
    scrollable: bool,
    /// Canvas width in CSS pixels
    css_width: f32,
    /// Media position seen on the previous tick
    last_media_time: Option<f64>,
    observing: bool,
}

impl Controller {
    pub fn new(options: &WaveformOptions) -> Self {
        Self {
            clock: PlaybackClock::default(),
            scheduler: RedrawScheduler::from_millis(options.refresh_delay),
            scroll_view: ViewWindow::new(0.0, options.visible_seconds()),
            visible_duration: options.visible_seconds(),
            scrollable: options.scrollable,
            css_width: 0.0,
            last_media_time: None,
            observing: false,
        }
    }

    /// Start observing `clock`, replacing any previous one
    pub fn init(&mut self, clock: PlaybackClock, now: Instant) {
        self.clock = clock;
        self.last_media_time = self.clock.is_media().then(|| self.clock.state().current_time);
        self.observing = true;
        self.scroll_view.scroll_to(self.scroll_view.start_time, self.clock.duration());
        self.scheduler.request(now);
    }

    pub fn attach_media(&mut self, media: Box<dyn MediaElement>, now: Instant) {
        self.init(PlaybackClock::Media(media), now);
    }

    /// Fall back to the internal clock at position 0
    pub fn use_internal_clock(&mut self, duration: f64, now: Instant) {
        let mut clock = PlaybackClock::default();
        clock.set_duration(duration);
        self.scroll_view.start_time = 0.0;
        self.init(clock, now);
    }

    /// Update the internal clock's duration once decoding finishes
    pub fn set_duration(&mut self, duration: f64, now: Instant) {
        self.clock.set_duration(duration);
        self.scroll_view.scroll_to(self.scroll_view.start_time, self.total_duration());
        self.request_redraw(now);
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn has_media(&self) -> bool {
        self.clock.is_media()
    }

    pub fn playback(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn total_duration(&self) -> f64 {
        self.clock.duration()
    }

    /// Pick up option changes that alter timing or layout
    pub fn apply_options(&mut self, options: &WaveformOptions, now: Instant) {
        self.scheduler.set_delay(std::time::Duration::from_millis(options.refresh_delay as u64));
        self.visible_duration = options.visible_seconds();
        self.scroll_view.visible_duration = self.visible_duration;

        if options.scrollable && !self.scrollable {
            // Start panning from where the page view currently is
            self.scroll_view.start_time = self.paged_view().start_time;
        }
        self.scrollable = options.scrollable;
        self.scroll_view.scroll_to(self.scroll_view.start_time, self.total_duration());
        self.request_redraw(now);
    }

    pub fn resize(&mut self, css_width: f32, now: Instant) {
        self.css_width = css_width.max(0.0);
        self.request_redraw(now);
    }

    pub fn css_width(&self) -> f32 {
        self.css_width
    }

    /// The slice of the timeline to draw
    pub fn view(&self) -> ViewWindow {
        if self.scrollable {
            self.scroll_view
        } else {
            self.paged_view()
        }
    }

    fn paged_view(&self) -> ViewWindow {
        ViewWindow::paged(self.playback().current_time, self.visible_duration)
    }

    /// Move the playhead, clamped to `[0, duration]`; returns the applied time
    pub fn seek(&mut self, seconds: f64, now: Instant) -> f64 {
        let applied = self.clock.seek(seconds);
        if self.clock.is_media() {
            self.last_media_time = Some(applied);
        }
        self.request_redraw(now);
        applied
    }

    /// Pan by a pointer drag of `dx` CSS pixels; dragging right reveals earlier audio
    pub fn drag_by_pixels(&mut self, dx: f32, now: Instant) {
        if self.css_width <= 0.0 {
            return;
        }
        let seconds = -(dx as f64) / self.css_width as f64 * self.visible_duration;
        self.drag_by_seconds(seconds, now);
    }

    pub fn drag_by_seconds(&mut self, seconds: f64, now: Instant) {
        if !self.scrollable {
            return;
        }
        self.scroll_view.scroll_by(seconds, self.total_duration());
        self.request_redraw(now);
    }

    /// Set the left edge directly (scrollable mode only), clamped
    pub fn scroll_to(&mut self, start_time: f64, now: Instant) {
        if !self.scrollable {
            return;
        }
        self.scroll_view.scroll_to(start_time, self.total_duration());
        self.request_redraw(now);
    }

    /// Timeline position under CSS x coordinate `css_x`
    pub fn time_at_x(&self, css_x: f32) -> f64 {
        if self.css_width <= 0.0 {
            return self.view().start_time;
        }
        self.view().time_at_fraction(css_x as f64 / self.css_width as f64)
    }

    /// Seek to the position under `css_x`; returns the applied time
    pub fn click_at(&mut self, css_x: f32, now: Instant) -> f64 {
        let target = self.time_at_x(css_x);
        self.seek(target, now)
    }

    pub fn request_redraw(&mut self, now: Instant) {
        if self.observing {
            self.scheduler.request(now);
        }
    }

    pub fn scheduler(&self) -> &RedrawScheduler {
        &self.scheduler
    }

    /// Poll the media element and report whether a frame is due now
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.observing {
            return false;
        }

        if self.clock.is_media() {
            let position = self.playback().current_time;
            if self.last_media_time != Some(position) {
                self.last_media_time = Some(position);
                self.scheduler.request(now);
            }
        }

        self.scheduler.due(now)
    }

    /// Stop observing and drop any pending frame; idempotent
    pub fn destroy(&mut self) {
        if self.observing {
            log::debug!("Controller stopped observing playback");
        }
        self.observing = false;
        self.scheduler.cancel();
        self.clock = PlaybackClock::default();
        self.last_media_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::ReadyState;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    struct SharedMedia {
        time: Rc<Cell<f64>>,
        duration: f64,
    }

    impl MediaElement for SharedMedia {
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
            false
        }
        fn ended(&self) -> bool {
            false
        }
        fn ready_state(&self) -> ReadyState {
            ReadyState::HaveEnoughData
        }
    }

    fn scrollable_options() -> WaveformOptions {
        WaveformOptions {
            scrollable: true,
            duration: 10,
            ..WaveformOptions::default()
        }
    }

    #[test]
    fn test_scroll_clamped_to_last_window() {
        let now = Instant::now();
        let mut controller = Controller::new(&scrollable_options());
        controller.use_internal_clock(100.0, now);

        controller.scroll_to(95.0, now);
        assert_eq!(controller.view().start_time, 90.0);

        controller.drag_by_seconds(-500.0, now);
        assert_eq!(controller.view().start_time, 0.0);
    }

    #[test]
    fn test_drag_pixels_to_seconds() {
        let now = Instant::now();
        let mut controller = Controller::new(&scrollable_options());
        controller.use_internal_clock(100.0, now);
        controller.resize(200.0, now);

        // Dragging left by half the width moves half a window forward
        controller.drag_by_pixels(-100.0, now);
        assert_eq!(controller.view().start_time, 5.0);
    }

    #[test]
    fn test_drag_ignored_when_not_scrollable() {
        let now = Instant::now();
        let mut controller = Controller::new(&WaveformOptions::default());
        controller.use_internal_clock(100.0, now);
        controller.resize(200.0, now);

        controller.drag_by_pixels(-100.0, now);
        controller.seek(25.0, now);
        assert_eq!(controller.view().start_time, 20.0);
    }

    #[test]
    fn test_click_seeks_within_window() {
        let now = Instant::now();
        let mut controller = Controller::new(&WaveformOptions::default());
        controller.use_internal_clock(40.0, now);
        controller.resize(400.0, now);
        controller.seek(12.0, now);

        // Window is [10, 20); x = 100 of 400 is a quarter in
        assert_eq!(controller.click_at(100.0, now), 12.5);
        assert_eq!(controller.playback().current_time, 12.5);
    }

    #[test]
    fn test_media_time_update_triggers_one_redraw() {
        let start = Instant::now();
        let time = Rc::new(Cell::new(0.0));
        let mut controller = Controller::new(&WaveformOptions::default());
        controller.attach_media(
            Box::new(SharedMedia {
                time: time.clone(),
                duration: 60.0,
            }),
            start,
        );

        let delay = controller.scheduler().delay();
        assert!(controller.tick(start + delay));
        assert!(!controller.tick(start + delay * 2));

        // Continuous playback: position changes every few ms, one trailing frame
        for step in 1..=5u32 {
            time.set(step as f64 * 0.01);
            assert!(!controller.tick(start + delay * 2 + Duration::from_millis(step as u64 * 5)));
        }
        let last = start + delay * 2 + Duration::from_millis(25);
        assert!(controller.tick(last + delay));
    }

    #[test]
    fn test_sustained_playback_keeps_painting() {
        let start = Instant::now();
        let time = Rc::new(Cell::new(0.0));
        let mut controller = Controller::new(&WaveformOptions::default());
        controller.attach_media(
            Box::new(SharedMedia {
                time: time.clone(),
                duration: 60.0,
            }),
            start,
        );

        // Media advances 25ms per 25ms tick for 5s, faster than the 50ms delay
        let mut frames = Vec::new();
        for step in 1..=200u64 {
            time.set(step as f64 * 0.025);
            if controller.tick(start + Duration::from_millis(step * 25)) {
                frames.push(controller.playback().current_time);
            }
        }

        assert!(frames.len() >= 35, "only {} frames painted", frames.len());
        let last = *frames.last().unwrap();
        assert!(last > 4.5, "cursor stopped at {}", last);
    }

    #[test]
    fn test_destroy_cancels_pending_redraw() {
        let now = Instant::now();
        let mut controller = Controller::new(&WaveformOptions::default());
        controller.use_internal_clock(10.0, now);
        assert!(controller.scheduler().is_pending());

        controller.destroy();
        controller.destroy();
        assert!(!controller.scheduler().is_pending());
        assert!(!controller.tick(now + Duration::from_secs(5)));
    }
}
