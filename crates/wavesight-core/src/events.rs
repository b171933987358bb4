//! Typed notifications emitted by the decoder, controller and drawer
//!
//! Listeners are plain closures keyed by a [`ListenerId`] so they can be
//! removed again. Dispatch is synchronous on the caller's thread.

use crate::error::WaveformError;

/// Everything a waveform instance reports to its listeners
#[derive(Debug, Clone, PartialEq)]
pub enum WaveformEvent {
    /// A load started (source kind)
    Loading { source: &'static str },
    /// Decoding finished and a peak table is available
    Decoded {
        generation: u64,
        channel_count: usize,
        duration: f64,
    },
    /// A media element was attached; only its duration is known
    MediaAttached { duration: f64 },
    /// The displayed channel changed
    ChannelChanged { channel: usize },
    /// Source bytes could not be fetched
    LoadFailed { error: WaveformError },
    /// Source bytes could not be decoded
    DecodeFailed { error: WaveformError },
    /// The playhead moved through `seek`
    Seeked { time: f64 },
    /// A coalesced redraw was painted
    Redrawn { start_time: f64, current_time: f64 },
    /// The instance was torn down
    Destroyed,
}

/// Handle returned by [`EventEmitter::on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&WaveformEvent)>;

/// Listener registry with on/off/emit
#[derive(Default)]
pub struct EventEmitter {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, listener: impl FnMut(&WaveformEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &WaveformEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
