// Notifications - Render thread → control thread

use crate::model::EntityKey;
use ringbuf::traits::Producer;
use std::sync::Arc;

/// Events reported by the render thread.
///
/// Pushing one never allocates: label text is a shared handle to the
/// pattern's own string.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    PlaybackStarted { page_index: usize, tick: u32 },
    PlaybackStopped,
    PageChanged { page_index: usize },
    /// Wrapped from the last page back to the first
    SongLooped,
    /// Reached the end of the last page with `EndOfSong::Stop`
    SongEnded,
    /// A label event was reached on a playing track
    Label {
        track: EntityKey,
        page_index: usize,
        tick: u32,
        text: Arc<str>,
    },
    /// Voices were taken over because the pool was full
    VoicesStolen { count: u32 },
}

/// Destination for render-thread notifications
pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

impl NotificationSink for ringbuf::HeapProd<Notification> {
    /// Dropped when the queue is full: the control side is not listening
    fn notify(&mut self, notification: Notification) {
        let _ = self.try_push(notification);
    }
}

impl NotificationSink for Vec<Notification> {
    fn notify(&mut self, notification: Notification) {
        self.push(notification);
    }
}
