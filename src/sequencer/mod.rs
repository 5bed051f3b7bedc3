// Sequencer module - Page/pattern playback and transport state

pub mod player;
pub mod transport;

pub use player::Sequencer;
pub use transport::{SharedTransportState, TransportSnapshot, TransportState};
