// Musical units and constants shared by the model and the engine

/// Pitch at which a sample with default settings plays at its native rate
pub const MIDDLE_C: i32 = 60;
pub const MIN_KEY: i32 = 0;
pub const MAX_KEY: i32 = 119;
pub const OCTAVE: i32 = 12;

/// Tempo used when the song has no page to read it from (beats per minute)
pub const DEFAULT_TEMPO: f32 = 125.0;
/// Sequencer resolution
pub const TICKS_PER_BEAT: u32 = 192;

pub const MIN_TEMPO: f32 = 1.0;
pub const MAX_TEMPO: f32 = 999.0;

const NOTE_NAMES: [&str; 12] = [
    "C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-",
];

/// Tracker-style name of a pitch, e.g. `C-5` for middle C or `F#3`
pub fn pitch_name(pitch: i32) -> String {
    let octave = pitch.div_euclid(OCTAVE);
    let note = pitch.rem_euclid(OCTAVE) as usize;
    format!("{}{}", NOTE_NAMES[note], octave)
}

/// Frequency ratio for an offset in (fractional) semitones
#[inline]
pub fn semitone_ratio(semitones: f64) -> f64 {
    (semitones / OCTAVE as f64).exp2()
}

/// Keep a tempo read from the model inside the range the clock can handle
#[inline]
pub fn sanitize_tempo(tempo: f32) -> f32 {
    if tempo.is_finite() {
        tempo.clamp(MIN_TEMPO, MAX_TEMPO)
    } else {
        DEFAULT_TEMPO
    }
}
