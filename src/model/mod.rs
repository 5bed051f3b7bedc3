// Entity model - Song / Page / Track / Pattern / Event / Instrument / Sample
//
// Every entity lives behind an `Arc` and stores its fields in atomic cells,
// so the render thread can read the graph while an editor thread mutates it.
// Cross-references are `EntityKey`s resolved against the owning collection.

pub mod atomic;
pub mod instrument;
pub mod key;
pub mod list;
pub mod page;
pub mod pattern;
pub mod sample;
pub mod song;
pub mod track;

pub use instrument::{Color, Envelope, Instrument, InstrumentSnapshot, NewNoteAction, SampleOverlapMode};
pub use key::{EntityId, EntityKey};
pub use list::{EntityList, Keyed};
pub use page::{Page, PageSlot};
pub use pattern::{Event, EventKind, LabelEvent, NoteEvent, Pattern};
pub use sample::{LoopType, PlaybackMode, Sample, SampleSettings, SampleSnapshot, Waveform};
pub use song::Song;
pub use track::Track;
