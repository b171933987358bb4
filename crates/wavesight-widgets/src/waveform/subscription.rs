//! Timer driving `Waveform::tick`
//!
//! # Usage
//!
//! ```ignore
//! fn subscription(&self) -> Subscription<Message> {
//!     tick_subscription(self.waveform.options().refresh_delay).map(Message::Tick)
//! }
//!
//! // in update
//! Message::Tick(now) => { self.waveform.tick(now); }
//! ```

use std::time::{Duration, Instant};

use iced::Subscription;

/// Floor on the tick interval in milliseconds
const MIN_TICK_MS: u64 = 8;

/// Tick interval for a redraw coalescing window of `refresh_delay_ms`
///
/// Ticks run at twice the coalescing rate so a due frame is never late by
/// more than half a window.
pub fn tick_interval(refresh_delay_ms: u32) -> Duration {
    Duration::from_millis((refresh_delay_ms as u64 / 2).max(MIN_TICK_MS))
}

/// Periodic instants for polling the media element and painting due frames
pub fn tick_subscription(refresh_delay_ms: u32) -> Subscription<Instant> {
    iced::time::every(tick_interval(refresh_delay_ms))
}
