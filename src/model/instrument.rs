// Instrument - Key-mapped set of samples with shared playback settings

use super::atomic::{AtomicEnum, AtomicF32, AtomicId, atomic_code_enum, clamp_finite};
use super::key::{EntityId, EntityKey};
use super::list::{EntityList, Keyed};
use super::sample::Sample;
use crate::synth::envelope::AdsrParams;
use crate::units::MAX_KEY;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

/// Which samples sound when several key ranges contain the played pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleOverlapMode {
    /// First matching sample in instrument order
    #[default]
    First,
    /// Every matching sample, one voice each
    Mix,
    /// One matching sample picked at random
    Random,
}

atomic_code_enum!(SampleOverlapMode { First = 0, Mix = 1, Random = 2 });

/// What happens to a channel's sounding note when the next one starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewNoteAction {
    /// Silence it immediately
    Cut,
    /// Move it to its release stage
    #[default]
    Release,
    /// Leave it ringing
    Continue,
}

atomic_code_enum!(NewNoteAction { Cut = 0, Release = 1, Continue = 2 });

/// Display color, packed 0xRRGGBB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color(pub u32);

/// Volume envelope; durations are in ticks
#[derive(Debug)]
pub struct Envelope {
    attack: AtomicU32,
    decay: AtomicU32,
    sustain: AtomicF32,
    release: AtomicU32,
}

impl Envelope {
    pub fn new(params: AdsrParams) -> Self {
        Self {
            attack: AtomicU32::new(params.attack),
            decay: AtomicU32::new(params.decay),
            sustain: AtomicF32::new(clamp_finite(params.sustain, 0.0, 1.0, 1.0)),
            release: AtomicU32::new(params.release),
        }
    }

    pub fn attack(&self) -> u32 {
        self.attack.load(Ordering::Relaxed)
    }

    pub fn set_attack(&self, ticks: u32) {
        self.attack.store(ticks, Ordering::Relaxed);
    }

    pub fn decay(&self) -> u32 {
        self.decay.load(Ordering::Relaxed)
    }

    pub fn set_decay(&self, ticks: u32) {
        self.decay.store(ticks, Ordering::Relaxed);
    }

    pub fn sustain(&self) -> f32 {
        self.sustain.get()
    }

    pub fn set_sustain(&self, level: f32) {
        self.sustain.set(clamp_finite(level, 0.0, 1.0, 1.0));
    }

    pub fn release(&self) -> u32 {
        self.release.load(Ordering::Relaxed)
    }

    pub fn set_release(&self, ticks: u32) {
        self.release.store(ticks, Ordering::Relaxed);
    }

    pub fn params(&self) -> AdsrParams {
        AdsrParams::new(self.attack(), self.decay(), self.sustain(), self.release())
    }

    pub fn set_params(&self, params: AdsrParams) {
        self.set_attack(params.attack);
        self.set_decay(params.decay);
        self.set_sustain(params.sustain);
        self.set_release(params.release);
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(AdsrParams::default())
    }
}

/// Instrument scalars copied into a voice when it is triggered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstrumentSnapshot {
    pub key: EntityKey,
    pub overlap_mode: SampleOverlapMode,
    pub new_note_action: NewNoteAction,
    pub random_delay: u32,
    pub volume: f32,
    pub panning: f32,
    pub transpose: i32,
    pub finetune: f32,
    pub glide: f32,
    pub envelope: AdsrParams,
}

#[derive(Debug)]
pub struct Instrument {
    key: EntityKey,
    id: AtomicId,
    name: ArcSwap<String>,
    color: AtomicU32,
    samples: EntityList<Sample>,
    overlap_mode: AtomicEnum<SampleOverlapMode>,
    new_note_action: AtomicEnum<NewNoteAction>,
    random_delay: AtomicU32,
    volume: AtomicF32,
    panning: AtomicF32,
    transpose: AtomicI32,
    finetune: AtomicF32,
    glide: AtomicF32,
    envelope: Envelope,
}

impl Keyed for Instrument {
    fn key(&self) -> EntityKey {
        self.key
    }
}

impl Instrument {
    pub fn new(id: EntityId, name: &str) -> Arc<Self> {
        Arc::new(Self {
            key: EntityKey::generate(),
            id: AtomicId::new(id),
            name: ArcSwap::from_pointee(name.to_string()),
            color: AtomicU32::new(0xFF_FF_FF),
            samples: EntityList::new(),
            overlap_mode: AtomicEnum::new(SampleOverlapMode::default()),
            new_note_action: AtomicEnum::new(NewNoteAction::default()),
            random_delay: AtomicU32::new(0),
            volume: AtomicF32::new(1.0),
            panning: AtomicF32::new(0.0),
            transpose: AtomicI32::new(0),
            finetune: AtomicF32::new(0.0),
            glide: AtomicF32::new(0.0),
            envelope: Envelope::default(),
        })
    }

    pub fn id(&self) -> EntityId {
        self.id.get()
    }

    /// Unchecked rename; `Song::rename_instrument` enforces uniqueness
    pub(crate) fn set_id(&self, id: EntityId) {
        self.id.set(id);
    }

    pub fn name(&self) -> String {
        self.name.load().as_ref().clone()
    }

    pub fn set_name(&self, name: &str) {
        self.name.store(Arc::new(name.to_string()));
    }

    pub fn color(&self) -> Color {
        Color(self.color.load(Ordering::Relaxed))
    }

    pub fn set_color(&self, color: Color) {
        self.color.store(color.0 & 0xFF_FF_FF, Ordering::Relaxed);
    }

    /// Samples in key-mapping order
    pub fn samples(&self) -> &EntityList<Sample> {
        &self.samples
    }

    pub fn add_sample(&self, sample: Arc<Sample>) {
        log::debug!("Instrument {}: add sample '{}'", self.id(), sample.name());
        self.samples.push(sample);
    }

    pub fn remove_sample(&self, key: EntityKey) -> Option<Arc<Sample>> {
        self.samples.remove(key)
    }

    pub fn overlap_mode(&self) -> SampleOverlapMode {
        self.overlap_mode.get()
    }

    pub fn set_overlap_mode(&self, mode: SampleOverlapMode) {
        self.overlap_mode.set(mode);
    }

    pub fn new_note_action(&self) -> NewNoteAction {
        self.new_note_action.get()
    }

    pub fn set_new_note_action(&self, action: NewNoteAction) {
        self.new_note_action.set(action);
    }

    /// Maximum trigger jitter in ticks
    pub fn random_delay(&self) -> u32 {
        self.random_delay.load(Ordering::Relaxed)
    }

    pub fn set_random_delay(&self, ticks: u32) {
        self.random_delay.store(ticks, Ordering::Relaxed);
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

    pub fn transpose(&self) -> i32 {
        self.transpose.load(Ordering::Relaxed)
    }

    pub fn set_transpose(&self, semitones: i32) {
        self.transpose
            .store(semitones.clamp(-MAX_KEY, MAX_KEY), Ordering::Relaxed);
    }

    pub fn finetune(&self) -> f32 {
        self.finetune.get()
    }

    pub fn set_finetune(&self, finetune: f32) {
        self.finetune.set(clamp_finite(finetune, -1.0, 1.0, 0.0));
    }

    /// Portamento rate in semitones per tick, 0 = instant
    pub fn glide(&self) -> f32 {
        self.glide.get()
    }

    pub fn set_glide(&self, rate: f32) {
        self.glide.set(clamp_finite(rate, 0.0, MAX_KEY as f32, 0.0));
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn snapshot(&self) -> InstrumentSnapshot {
        InstrumentSnapshot {
            key: self.key,
            overlap_mode: self.overlap_mode.get(),
            new_note_action: self.new_note_action.get(),
            random_delay: self.random_delay(),
            volume: self.volume.get(),
            panning: self.panning.get(),
            transpose: self.transpose(),
            finetune: self.finetune.get(),
            glide: self.glide.get(),
            envelope: self.envelope.params(),
        }
    }
}
