// Transport - Playback state shared with the control thread
//
// The render thread owns the sequencer; it publishes the playhead here after
// every tick so the UI can follow it without touching the sequencer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped)
    }
}

/// Playhead position as seen by the control thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportSnapshot {
    pub state: TransportState,
    pub page_index: usize,
    /// Next tick to be played within the page
    pub tick: u32,
}

/// Shared transport state
/// Thread-safe via atomics for communication with audio thread
#[derive(Debug, Default)]
pub struct SharedTransportState {
    playing: AtomicBool,
    page_index: AtomicUsize,
    tick: AtomicU32,
    /// Engine render gate (start/stop)
    running: AtomicBool,
}

impl SharedTransportState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> TransportState {
        if self.playing.load(Ordering::Relaxed) {
            TransportState::Playing
        } else {
            TransportState::Stopped
        }
    }

    /// Each field is read atomically; the combination may straddle a tick
    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            state: self.state(),
            page_index: self.page_index.load(Ordering::Relaxed),
            tick: self.tick.load(Ordering::Relaxed),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    pub(crate) fn publish(&self, state: TransportState, page_index: usize, tick: u32) {
        self.page_index.store(page_index, Ordering::Relaxed);
        self.tick.store(tick, Ordering::Relaxed);
        self.playing.store(state.is_playing(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_state_default() {
        assert_eq!(TransportState::default(), TransportState::Stopped);
        assert!(TransportState::Stopped.is_stopped());
        assert!(TransportState::Playing.is_playing());
    }

    #[test]
    fn test_shared_state_publish() {
        let shared = SharedTransportState::new();
        assert_eq!(shared.snapshot(), TransportSnapshot::default());

        shared.publish(TransportState::Playing, 2, 17);
        let snapshot = shared.snapshot();
        assert_eq!(snapshot.state, TransportState::Playing);
        assert_eq!(snapshot.page_index, 2);
        assert_eq!(snapshot.tick, 17);

        shared.publish(TransportState::Stopped, 2, 17);
        assert!(shared.state().is_stopped());
    }

    #[test]
    fn test_running_flag() {
        let shared = SharedTransportState::new();
        assert!(!shared.is_running());
        shared.set_running(true);
        assert!(shared.is_running());
    }
}
