// Sample - Decoded PCM waveform plus playback settings
//
// The waveform is immutable once built and is only ever replaced wholesale,
// so voices can keep playing an `Arc<Waveform>` after the sample is edited
// or deleted.

use super::atomic::{AtomicEnum, AtomicF32, atomic_code_enum, clamp_finite};
use super::key::EntityKey;
use super::list::Keyed;
use crate::error::{ModelError, ModelResult};
use crate::units::{MAX_KEY, MIDDLE_C, MIN_KEY};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

/// Immutable interleaved PCM buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    channels: usize,
    frame_rate: u32,
    data: Vec<f32>,
}

impl Waveform {
    /// Build a waveform from interleaved samples
    pub fn new(channels: usize, frame_rate: u32, data: Vec<f32>) -> ModelResult<Self> {
        if channels == 0 {
            return Err(ModelError::InvalidWaveform("no channels".to_string()));
        }
        if frame_rate == 0 {
            return Err(ModelError::InvalidWaveform("zero frame rate".to_string()));
        }
        if data.len() % channels != 0 {
            return Err(ModelError::InvalidWaveform(format!(
                "{} samples do not divide into {} channels",
                data.len(),
                channels
            )));
        }
        Ok(Self {
            channels,
            frame_rate,
            data,
        })
    }

    pub fn mono(frame_rate: u32, data: Vec<f32>) -> ModelResult<Self> {
        Self::new(1, frame_rate, data)
    }

    /// Zero-length placeholder used before any audio is attached
    pub fn empty() -> Self {
        Self {
            channels: 1,
            frame_rate: 48_000,
            data: Vec::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frame_count(&self) -> usize {
        self.data.len() / self.channels
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Stereo view of one frame: first channel left, last channel right.
    /// Out-of-range frames read as silence.
    #[inline]
    pub fn stereo_frame(&self, frame: usize) -> (f32, f32) {
        let base = frame * self.channels;
        match self.data.get(base..base + self.channels) {
            Some(channels) => (channels[0], channels[self.channels - 1]),
            None => (0.0, 0.0),
        }
    }
}

/// How long a triggered sample keeps playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    /// Play through once, ignoring loop points
    #[default]
    OneShot,
    /// Loop for the whole life of the voice
    Loop,
    /// Loop while the note is held, then play out to the end
    SustainLoop,
}

atomic_code_enum!(PlaybackMode { OneShot = 0, Loop = 1, SustainLoop = 2 });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopType {
    #[default]
    None,
    Forward,
    PingPong,
}

atomic_code_enum!(LoopType { None = 0, Forward = 1, PingPong = 2 });

/// Plain-value settings used to build a sample in one validated step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSettings {
    pub playback_mode: PlaybackMode,
    pub loop_type: LoopType,
    pub loop_start: usize,
    /// `None` means "end of waveform"
    pub loop_end: Option<usize>,
    pub volume: f32,
    pub panning: f32,
    pub base_key: i32,
    pub finetune: f32,
    pub key_start: i32,
    pub key_end: i32,
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self {
            playback_mode: PlaybackMode::OneShot,
            loop_type: LoopType::None,
            loop_start: 0,
            loop_end: None,
            volume: 1.0,
            panning: 0.0,
            base_key: MIDDLE_C,
            finetune: 0.0,
            key_start: MIN_KEY,
            key_end: MAX_KEY,
        }
    }
}

/// Values read from a sample at trigger time.
/// Loop points are already clamped against the waveform they were read with.
#[derive(Debug, Clone)]
pub struct SampleSnapshot {
    pub waveform: Arc<Waveform>,
    pub playback_mode: PlaybackMode,
    pub loop_type: LoopType,
    pub loop_start: usize,
    pub loop_end: usize,
    pub volume: f32,
    pub panning: f32,
    pub base_key: i32,
    pub finetune: f32,
}

#[derive(Debug)]
pub struct Sample {
    key: EntityKey,
    name: ArcSwap<String>,
    waveform: ArcSwap<Waveform>,
    playback_mode: AtomicEnum<PlaybackMode>,
    loop_type: AtomicEnum<LoopType>,
    loop_start: AtomicUsize,
    loop_end: AtomicUsize,
    volume: AtomicF32,
    panning: AtomicF32,
    base_key: AtomicI32,
    finetune: AtomicF32,
    key_start: AtomicI32,
    key_end: AtomicI32,
}

impl Keyed for Sample {
    fn key(&self) -> EntityKey {
        self.key
    }
}

impl Sample {
    /// New sample covering the whole keyboard, no loop
    pub fn new(name: &str, waveform: Waveform) -> Arc<Self> {
        let frames = waveform.frame_count();
        Arc::new(Self::build(name, waveform, SampleSettings::default(), frames))
    }

    /// New sample with validated settings
    pub fn with_settings(
        name: &str,
        waveform: Waveform,
        settings: SampleSettings,
    ) -> ModelResult<Arc<Self>> {
        let frames = waveform.frame_count();
        let loop_end = settings.loop_end.unwrap_or(frames);
        validate_loop(settings.loop_start, loop_end, frames)?;
        validate_key_range(settings.key_start, settings.key_end)?;
        Ok(Arc::new(Self::build(name, waveform, settings, loop_end)))
    }

    fn build(name: &str, waveform: Waveform, settings: SampleSettings, loop_end: usize) -> Self {
        Self {
            key: EntityKey::generate(),
            name: ArcSwap::from_pointee(name.to_string()),
            waveform: ArcSwap::from_pointee(waveform),
            playback_mode: AtomicEnum::new(settings.playback_mode),
            loop_type: AtomicEnum::new(settings.loop_type),
            loop_start: AtomicUsize::new(settings.loop_start),
            loop_end: AtomicUsize::new(loop_end),
            volume: AtomicF32::new(clamp_finite(settings.volume, 0.0, 1.0, 1.0)),
            panning: AtomicF32::new(clamp_finite(settings.panning, -1.0, 1.0, 0.0)),
            base_key: AtomicI32::new(settings.base_key),
            finetune: AtomicF32::new(clamp_finite(settings.finetune, -1.0, 1.0, 0.0)),
            key_start: AtomicI32::new(settings.key_start),
            key_end: AtomicI32::new(settings.key_end),
        }
    }

    pub fn name(&self) -> String {
        self.name.load().as_ref().clone()
    }

    pub fn set_name(&self, name: &str) {
        self.name.store(Arc::new(name.to_string()));
    }

    pub fn waveform(&self) -> Arc<Waveform> {
        self.waveform.load_full()
    }

    /// Replace the audio; loop points are pulled inside the new frame count
    pub fn set_waveform(&self, waveform: Waveform) {
        let frames = waveform.frame_count();
        self.waveform.store(Arc::new(waveform));
        let end = self.loop_end.load(Ordering::Relaxed).min(frames);
        let start = self.loop_start.load(Ordering::Relaxed).min(end);
        self.loop_end.store(end, Ordering::Relaxed);
        self.loop_start.store(start, Ordering::Relaxed);
        log::debug!("Sample '{}' waveform replaced ({} frames)", self.name(), frames);
    }

    pub fn playback_mode(&self) -> PlaybackMode {
        self.playback_mode.get()
    }

    pub fn set_playback_mode(&self, mode: PlaybackMode) {
        self.playback_mode.set(mode);
    }

    pub fn loop_type(&self) -> LoopType {
        self.loop_type.get()
    }

    pub fn set_loop_type(&self, loop_type: LoopType) {
        self.loop_type.set(loop_type);
    }

    pub fn loop_start(&self) -> usize {
        self.loop_start.load(Ordering::Relaxed)
    }

    /// Clamped into `[0, frame count]`; ordering against loop end is re-checked on playback
    pub fn set_loop_start(&self, frame: usize) {
        let frames = self.waveform.load().frame_count();
        self.loop_start.store(frame.min(frames), Ordering::Relaxed);
    }

    pub fn loop_end(&self) -> usize {
        self.loop_end.load(Ordering::Relaxed)
    }

    pub fn set_loop_end(&self, frame: usize) {
        let frames = self.waveform.load().frame_count();
        self.loop_end.store(frame.min(frames), Ordering::Relaxed);
    }

    /// Set both loop points, rejecting a reversed or oversized region
    pub fn set_loop_points(&self, start: usize, end: usize) -> ModelResult<()> {
        validate_loop(start, end, self.waveform.load().frame_count())?;
        self.loop_start.store(start, Ordering::Relaxed);
        self.loop_end.store(end, Ordering::Relaxed);
        Ok(())
    }

    pub fn volume(&self) -> f32 {
        self.volume.get()
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume.set(clamp_finite(volume, 0.0, 1.0, 1.0));
    }

    pub fn panning(&self) -> f32 {
        self.panning.get()
    }

    pub fn set_panning(&self, panning: f32) {
        self.panning.set(clamp_finite(panning, -1.0, 1.0, 0.0));
    }

    pub fn base_key(&self) -> i32 {
        self.base_key.load(Ordering::Relaxed)
    }

    pub fn set_base_key(&self, key: i32) {
        self.base_key.store(key, Ordering::Relaxed);
    }

    pub fn finetune(&self) -> f32 {
        self.finetune.get()
    }

    pub fn set_finetune(&self, finetune: f32) {
        self.finetune.set(clamp_finite(finetune, -1.0, 1.0, 0.0));
    }

    pub fn key_start(&self) -> i32 {
        self.key_start.load(Ordering::Relaxed)
    }

    pub fn set_key_start(&self, key: i32) {
        self.key_start.store(key, Ordering::Relaxed);
    }

    pub fn key_end(&self) -> i32 {
        self.key_end.load(Ordering::Relaxed)
    }

    pub fn set_key_end(&self, key: i32) {
        self.key_end.store(key, Ordering::Relaxed);
    }

    pub fn set_key_range(&self, start: i32, end: i32) -> ModelResult<()> {
        validate_key_range(start, end)?;
        self.key_start.store(start, Ordering::Relaxed);
        self.key_end.store(end, Ordering::Relaxed);
        Ok(())
    }

    /// Whether this sample is eligible for `pitch`
    #[inline]
    pub fn covers(&self, pitch: i32) -> bool {
        let start = self.key_start.load(Ordering::Relaxed);
        let end = self.key_end.load(Ordering::Relaxed);
        start <= pitch && pitch <= end
    }

    /// Read every playback field once, re-validating loop points
    pub fn snapshot(&self) -> SampleSnapshot {
        let waveform = self.waveform.load_full();
        let frames = waveform.frame_count();
        let loop_end = self.loop_end.load(Ordering::Relaxed).min(frames);
        let loop_start = self.loop_start.load(Ordering::Relaxed).min(loop_end);

        SampleSnapshot {
            waveform,
            playback_mode: self.playback_mode.get(),
            loop_type: self.loop_type.get(),
            loop_start,
            loop_end,
            volume: self.volume.get(),
            panning: self.panning.get(),
            base_key: self.base_key.load(Ordering::Relaxed),
            finetune: self.finetune.get(),
        }
    }
}

fn validate_loop(start: usize, end: usize, frames: usize) -> ModelResult<()> {
    if start > end {
        return Err(ModelError::ReversedRange {
            start: start as i64,
            end: end as i64,
        });
    }
    if end > frames {
        return Err(ModelError::LoopOutOfBounds { start, end, frames });
    }
    Ok(())
}

fn validate_key_range(start: i32, end: i32) -> ModelResult<()> {
    if start > end {
        return Err(ModelError::ReversedRange {
            start: start as i64,
            end: end as i64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> Waveform {
        Waveform::mono(48_000, (0..frames).map(|i| i as f32).collect()).unwrap()
    }

    #[test]
    fn test_waveform_validation() {
        assert!(Waveform::new(0, 48_000, vec![]).is_err());
        assert!(Waveform::new(2, 0, vec![0.0; 4]).is_err());
        assert!(Waveform::new(2, 48_000, vec![0.0; 3]).is_err());

        let stereo = Waveform::new(2, 44_100, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(stereo.frame_count(), 2);
        assert_eq!(stereo.channels(), 2);
        assert_eq!(stereo.frame_rate(), 44_100);
    }

    #[test]
    fn test_stereo_frame_reads_first_and_last_channel() {
        let wave = Waveform::new(3, 48_000, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(wave.stereo_frame(0), (1.0, 3.0));
        assert_eq!(wave.stereo_frame(1), (4.0, 6.0));
        assert_eq!(wave.stereo_frame(2), (0.0, 0.0));

        let mono = ramp(3);
        assert_eq!(mono.stereo_frame(2), (2.0, 2.0));
    }

    #[test]
    fn test_defaults() {
        let sample = Sample::new("kick", ramp(100));
        assert_eq!(sample.name(), "kick");
        assert_eq!(sample.loop_start(), 0);
        assert_eq!(sample.loop_end(), 100);
        assert_eq!(sample.base_key(), MIDDLE_C);
        assert_eq!(sample.key_start(), MIN_KEY);
        assert_eq!(sample.key_end(), MAX_KEY);
        assert_eq!(sample.volume(), 1.0);
        assert_eq!(sample.loop_type(), LoopType::None);
        assert_eq!(sample.playback_mode(), PlaybackMode::OneShot);
    }

    #[test]
    fn test_construction_rejects_bad_ranges() {
        let reversed_keys = SampleSettings {
            key_start: 73,
            key_end: 72,
            ..Default::default()
        };
        assert!(matches!(
            Sample::with_settings("s", ramp(10), reversed_keys),
            Err(ModelError::ReversedRange { .. })
        ));

        let reversed_loop = SampleSettings {
            loop_start: 8,
            loop_end: Some(4),
            ..Default::default()
        };
        assert!(Sample::with_settings("s", ramp(10), reversed_loop).is_err());

        let oversized_loop = SampleSettings {
            loop_end: Some(11),
            ..Default::default()
        };
        assert!(matches!(
            Sample::with_settings("s", ramp(10), oversized_loop),
            Err(ModelError::LoopOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_setters_clamp() {
        let sample = Sample::new("s", ramp(10));
        sample.set_loop_end(500);
        assert_eq!(sample.loop_end(), 10);
        sample.set_volume(3.0);
        assert_eq!(sample.volume(), 1.0);
        sample.set_panning(f32::NAN);
        assert_eq!(sample.panning(), 0.0);
        assert!(sample.set_loop_points(6, 2).is_err());
        assert!(sample.set_loop_points(2, 6).is_ok());
        assert_eq!((sample.loop_start(), sample.loop_end()), (2, 6));
    }

    #[test]
    fn test_snapshot_reclamps_inconsistent_loop() {
        let sample = Sample::new("s", ramp(10));
        // Individually valid writes that leave start > end
        sample.set_loop_end(3);
        sample.set_loop_start(8);

        let snapshot = sample.snapshot();
        assert!(snapshot.loop_start <= snapshot.loop_end);
        assert!(snapshot.loop_end <= snapshot.waveform.frame_count());
    }

    #[test]
    fn test_replacing_waveform_keeps_old_handle_alive() {
        let sample = Sample::new("s", ramp(10));
        let held = sample.waveform();
        sample.set_waveform(ramp(4));

        assert_eq!(held.frame_count(), 10);
        assert_eq!(sample.waveform().frame_count(), 4);
        assert_eq!(sample.loop_end(), 4);
    }

    #[test]
    fn test_covers() {
        let sample = Sample::new("s", ramp(1));
        sample.set_key_range(48, 72).unwrap();
        assert!(sample.covers(48));
        assert!(sample.covers(72));
        assert!(!sample.covers(73));
        assert!(!sample.covers(47));
    }
}
