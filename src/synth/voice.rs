// Voice - One sounding note
//
// A voice copies everything it needs at trigger time (instrument scalars,
// clamped loop points, envelope shape) and keeps only a shared handle to the
// waveform, so edits or deletions in the model never reach a playing voice.

use super::envelope::AdsrEnvelope;
use super::portamento::{LinearSlide, PitchGlide};
use super::sampler::SamplePlayer;
use crate::audio::dsp_utils::constant_power_pan;
use crate::model::EntityKey;
use crate::model::atomic::clamp_finite;
use crate::model::instrument::{InstrumentSnapshot, NewNoteAction};
use crate::model::sample::{SampleSnapshot, Waveform};
use crate::units::semitone_ratio;
use std::sync::Arc;

/// Who controls a voice: a sequencer track or the live performance channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceOwner {
    Track(EntityKey),
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoiceState {
    Free,
    /// Waiting out a random trigger delay
    Pending { ticks: u32 },
    Playing,
}

/// Everything needed to start a voice
#[derive(Debug, Clone)]
pub struct VoiceStart<'a> {
    pub owner: VoiceOwner,
    pub instrument: &'a InstrumentSnapshot,
    pub sample: &'a SampleSnapshot,
    pub pitch: i32,
    pub velocity: f32,
    pub modulation: f32,
    pub delay: u32,
    pub age: u64,
    pub output_rate: f32,
    pub master_volume: f32,
}

#[derive(Debug, Clone)]
pub struct Voice {
    state: VoiceState,
    owner: VoiceOwner,
    /// Still the channel's current note (not yet superseded or released)
    held: bool,
    age: u64,
    new_note_action: NewNoteAction,
    player: SamplePlayer,
    envelope: AdsrEnvelope,
    pitch: PitchGlide,
    velocity: LinearSlide,
    modulation: LinearSlide,
    /// transpose - base key + instrument finetune + sample finetune
    pitch_offset: f32,
    /// waveform frame rate / output rate
    rate_scale: f64,
    volume: f32,
    pan_gains: (f32, f32),
    gains: (f32, f32),
}

impl Voice {
    pub fn new() -> Self {
        Self {
            state: VoiceState::Free,
            owner: VoiceOwner::Live,
            held: false,
            age: 0,
            new_note_action: NewNoteAction::default(),
            player: SamplePlayer::new(),
            envelope: AdsrEnvelope::new(Default::default()),
            pitch: PitchGlide::new(0.0, 0.0),
            velocity: LinearSlide::new(0.0),
            modulation: LinearSlide::new(0.0),
            pitch_offset: 0.0,
            rate_scale: 1.0,
            volume: 0.0,
            pan_gains: (0.0, 0.0),
            gains: (0.0, 0.0),
        }
    }

    pub fn start(&mut self, start: &VoiceStart<'_>) {
        let inst = start.instrument;
        let sample = start.sample;

        self.owner = start.owner;
        self.held = true;
        self.age = start.age;
        self.new_note_action = inst.new_note_action;

        self.pitch_offset =
            (inst.transpose - sample.base_key) as f32 + inst.finetune + sample.finetune;
        self.rate_scale = sample.waveform.frame_rate() as f64 / start.output_rate.max(1.0) as f64;
        self.pitch = PitchGlide::new(start.pitch as f32, inst.glide);
        self.velocity = LinearSlide::new(unit(start.velocity));
        self.modulation = LinearSlide::new(unit(start.modulation));

        self.volume = inst.volume * sample.volume;
        self.pan_gains = constant_power_pan((inst.panning + sample.panning).clamp(-1.0, 1.0));

        self.player.start(sample, self.playback_step());
        self.envelope = AdsrEnvelope::new(inst.envelope);

        if start.delay > 0 {
            self.state = VoiceState::Pending { ticks: start.delay };
            self.gains = (0.0, 0.0);
        } else {
            self.activate(start.master_volume);
        }
    }

    fn activate(&mut self, master_volume: f32) {
        self.state = VoiceState::Playing;
        self.envelope.note_on();
        self.update_gains(master_volume);
    }

    /// Current playback rate in waveform frames per output frame
    fn playback_step(&self) -> f64 {
        let semitones = self.pitch.current() as f64 + self.pitch_offset as f64;
        self.rate_scale * semitone_ratio(semitones)
    }

    fn update_gains(&mut self, master_volume: f32) {
        let gain = self.envelope.level() * self.velocity.value() * self.volume * master_volume;
        self.gains = (gain * self.pan_gains.0, gain * self.pan_gains.1);
    }

    /// Move the voice to its release stage
    pub fn release(&mut self, master_volume: f32) {
        self.held = false;
        if self.state == VoiceState::Playing {
            self.envelope.note_off();
            self.player.release();
            self.update_gains(master_volume);
        }
    }

    /// Return the voice to the free state, handing back its waveform handle
    pub fn clear(&mut self) -> Option<Arc<Waveform>> {
        self.state = VoiceState::Free;
        self.held = false;
        self.gains = (0.0, 0.0);
        self.envelope.reset();
        self.player.take_waveform()
    }

    /// Slide toward `pitch` at the instrument's glide rate
    pub fn glide_to(&mut self, pitch: i32) {
        self.pitch.set_target(pitch as f32);
        if !self.pitch.is_gliding() {
            self.player.set_step(self.playback_step());
        }
    }

    /// Set velocity now (`slide_ticks` = 0) or slide to it
    pub fn set_velocity(&mut self, velocity: f32, slide_ticks: u32, master_volume: f32) {
        self.velocity.slide_to(unit(velocity), slide_ticks);
        self.update_gains(master_volume);
    }

    pub fn set_modulation(&mut self, modulation: f32, slide_ticks: u32) {
        self.modulation.slide_to(unit(modulation), slide_ticks);
    }

    /// Advance one sequencer tick; returns false when the voice has finished
    pub fn tick(&mut self, master_volume: f32) -> bool {
        match self.state {
            VoiceState::Free => return false,
            VoiceState::Pending { ticks } => {
                if ticks > 1 {
                    self.state = VoiceState::Pending { ticks: ticks - 1 };
                } else {
                    self.activate(master_volume);
                }
                return true;
            }
            VoiceState::Playing => {}
        }

        self.envelope.advance();
        if !self.envelope.is_active() {
            return false;
        }
        if self.pitch.tick() {
            self.player.set_step(self.playback_step());
        }
        self.velocity.tick();
        self.modulation.tick();
        self.update_gains(master_volume);
        true
    }

    /// Mix into an interleaved stereo buffer; returns false when the sample ran out
    pub fn render(&mut self, out: &mut [f32]) -> bool {
        match self.state {
            VoiceState::Free => return false,
            VoiceState::Pending { .. } => return true,
            VoiceState::Playing => {}
        }
        let (gain_l, gain_r) = self.gains;
        for frame in out.chunks_exact_mut(2) {
            match self.player.next_frame() {
                Some((left, right)) => {
                    frame[0] += left * gain_l;
                    frame[1] += right * gain_r;
                }
                None => return false,
            }
        }
        true
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, VoiceState::Pending { .. })
    }

    pub fn is_releasing(&self) -> bool {
        self.state == VoiceState::Playing && self.envelope.is_releasing()
    }

    pub fn release_progress(&self) -> f32 {
        self.envelope.release_progress()
    }

    pub fn owner(&self) -> VoiceOwner {
        self.owner
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub(crate) fn set_held(&mut self, held: bool) {
        self.held = held;
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn new_note_action(&self) -> NewNoteAction {
        self.new_note_action
    }

    /// Current envelope gain (0 while pending)
    pub fn envelope_level(&self) -> f32 {
        self.envelope.level()
    }

    pub fn envelope(&self) -> &AdsrEnvelope {
        &self.envelope
    }

    pub fn pitch(&self) -> f32 {
        self.pitch.current()
    }

    pub fn velocity(&self) -> f32 {
        self.velocity.value()
    }

    pub fn modulation(&self) -> f32 {
        self.modulation.value()
    }

    /// Playback rate in waveform frames per output frame
    pub fn step(&self) -> f64 {
        self.player.step()
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

/// Velocity and mod live in [0, 1]; NaN reads as silence
fn unit(value: f32) -> f32 {
    clamp_finite(value, 0.0, 1.0, 0.0)
}
