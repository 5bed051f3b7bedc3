// Audio module - Render loop, output stage and offline export

pub mod dsp_utils;
pub mod engine;
pub mod export;
pub mod format_conversion;
pub mod timing;

pub use engine::{Engine, EngineHandle};
pub use export::{AudioExporter, ExportLength, ExportSampleFormat, ExportSettings, render_to_wav};
pub use timing::TickClock;
