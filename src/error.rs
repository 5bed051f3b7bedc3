// Error types - Structural edits and configuration loading
//
// Render-side code never returns these: inconsistencies seen while rendering
// are clamped or treated as silence. Errors only surface at the edit boundary
// (entity construction, structural edits) and when loading configuration.

use crate::model::EntityKey;

/// Rejected structural edit or invalid entity construction
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Length must be greater than zero")]
    InvalidLength,

    #[error("Event at tick {time} is outside pattern of length {length}")]
    EventOutOfRange { time: u32, length: u32 },

    #[error("Identifier '{0}' is already used in this collection")]
    DuplicateId(String),

    #[error("Invalid identifier '{0}': expected two printable ASCII characters")]
    InvalidId(String),

    #[error("Reversed range: start {start} is after end {end}")]
    ReversedRange { start: i64, end: i64 },

    #[error("Loop [{start}, {end}) does not fit in a waveform of {frames} frames")]
    LoopOutOfBounds { start: usize, end: usize, frames: usize },

    #[error("Tempo must be a positive number, got {0}")]
    InvalidTempo(f32),

    #[error("Invalid waveform: {0}")]
    InvalidWaveform(String),

    #[error("Entity {0:?} does not belong to this collection")]
    UnknownEntity(EntityKey),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// Configuration loading / validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("RON serialization error: {0}")]
    RonSerialize(#[from] ron::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported configuration file extension: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Offline rendering errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Nothing to render: {0}")]
    Empty(String),
}
