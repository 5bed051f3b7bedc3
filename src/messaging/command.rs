// Command types - Control thread → render thread

use crate::model::EntityKey;

/// Requests queued for the render thread.
///
/// Live-performance commands address the single live channel, which is
/// independent from the voices driven by pattern tracks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Resume rendering
    Start,
    /// Silence everything and output zeros until `Start`
    Stop,
    TriggerNote {
        instrument: EntityKey,
        pitch: i32,
        velocity: f32,
        modulation: f32,
    },
    ReleaseNote,
    CutNote,
    Glide(i32),
    SetVelocity { velocity: f32, slide_ticks: u32 },
    SetModulation { modulation: f32, slide_ticks: u32 },
    StartPlayback,
    StopPlayback,
    PlayFrom { page: usize, tick: u32 },
    /// Cut every voice, live and sequenced
    StopAllNotes,
}
