// Tracker core - Song model, sample voices and real-time sequencer
//
// The song graph (`model`) is edited from a control thread while the render
// thread (`audio::Engine`) reads it without locks. Live performance commands
// and transport requests travel through `audio::EngineHandle`.

pub mod audio;
pub mod config;
pub mod error;
pub mod messaging;
pub mod model;
pub mod sequencer;
pub mod synth;
pub mod units;

// Re-export commonly used types for convenience
pub use audio::engine::{Engine, EngineHandle};
pub use audio::export::{ExportLength, ExportSampleFormat, ExportSettings, render_to_wav};
pub use config::{EndOfSong, EngineConfig, OutputLimiter};
pub use error::{ConfigError, ExportError, ModelError, ModelResult};
pub use messaging::{Command, Notification};
pub use model::{
    EntityId, EntityKey, Envelope, Event, EventKind, Instrument, Keyed, LabelEvent, LoopType,
    NewNoteAction, NoteEvent, Page, Pattern, PlaybackMode, Sample, SampleOverlapMode,
    SampleSettings, Song, Track, Waveform,
};
pub use sequencer::{TransportSnapshot, TransportState};
pub use synth::envelope::AdsrParams;
