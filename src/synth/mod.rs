// Synth module - Sample voices and their per-tick controllers

pub mod envelope;
pub mod portamento;
pub mod sampler;
pub mod voice;
pub mod voice_manager;

pub use envelope::{AdsrEnvelope, AdsrParams, EnvelopeStage};
pub use voice::{Voice, VoiceOwner};
pub use voice_manager::{NoteTrigger, VoicePool};
