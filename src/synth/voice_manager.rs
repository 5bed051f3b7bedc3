// Voice Manager - Fixed voice pool shared by sequencer tracks and live play
//
// All voices are allocated up front; a free list hands them out without
// touching the allocator. When the pool is full a voice is stolen rather than
// dropping the trigger. Only the render thread touches the pool.

use super::voice::{Voice, VoiceOwner, VoiceStart};
use crate::messaging::channels::GarbageProducer;
use crate::model::instrument::{Instrument, InstrumentSnapshot, NewNoteAction, SampleOverlapMode};
use crate::model::sample::{Sample, Waveform};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use ringbuf::traits::Producer;
use std::sync::Arc;

/// Pitch / velocity / mod of a note to start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteTrigger {
    pub pitch: i32,
    pub velocity: f32,
    pub modulation: f32,
}

impl NoteTrigger {
    pub fn new(pitch: i32, velocity: f32) -> Self {
        Self {
            pitch,
            velocity,
            modulation: 0.0,
        }
    }
}

pub struct VoicePool {
    voices: Vec<Voice>,
    /// Indices of free voices; capacity reserved for every voice
    free: Vec<usize>,
    /// Age counter incremented on each voice start for voice stealing priority
    age_counter: u64,
    rng: SmallRng,
    output_rate: f32,
    garbage: Option<GarbageProducer>,
    steal_count: u64,
}

impl VoicePool {
    pub fn new(capacity: usize, output_rate: f32, rng: SmallRng) -> Self {
        let capacity = capacity.max(1);
        let voices = (0..capacity).map(|_| Voice::new()).collect();
        // Pop order hands out voice 0 first
        let free = (0..capacity).rev().collect();

        Self {
            voices,
            free,
            age_counter: 0,
            rng,
            output_rate,
            garbage: None,
            steal_count: 0,
        }
    }

    pub fn with_seed(capacity: usize, output_rate: f32, seed: u64) -> Self {
        Self::new(capacity, output_rate, SmallRng::seed_from_u64(seed))
    }

    /// Waveforms whose last handle is released by a voice are sent here
    /// so they are deallocated off the render thread
    pub fn set_garbage_channel(&mut self, producer: GarbageProducer) {
        self.garbage = Some(producer);
    }

    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.len() - self.free.len()
    }

    /// Number of voices taken over because the pool was full
    pub fn steal_count(&self) -> u64 {
        self.steal_count
    }

    /// Active voices, in pool order
    pub fn active_voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter().filter(|v| !v.is_free())
    }

    /// Start a note of `instrument` for `owner`.
    ///
    /// The owner's current note gets its instrument's new-note action first.
    /// Returns the number of voices started (0 when no sample covers the pitch).
    pub fn trigger(
        &mut self,
        owner: VoiceOwner,
        instrument: &Instrument,
        note: NoteTrigger,
        master_volume: f32,
    ) -> usize {
        self.apply_new_note_action(owner, master_volume);

        let snapshot = instrument.snapshot();
        let delay = if snapshot.random_delay > 0 {
            self.rng.gen_range(0..=snapshot.random_delay)
        } else {
            0
        };

        let samples = instrument.samples().load();
        let mut matching = samples.iter().filter(|s| s.covers(note.pitch));

        match snapshot.overlap_mode {
            SampleOverlapMode::First => match matching.next() {
                Some(sample) => {
                    self.start_voice(owner, &snapshot, sample, note, delay, master_volume);
                    1
                }
                None => 0,
            },
            SampleOverlapMode::Mix => {
                let mut started = 0;
                for sample in matching {
                    self.start_voice(owner, &snapshot, sample, note, delay, master_volume);
                    started += 1;
                }
                started
            }
            SampleOverlapMode::Random => {
                let count = samples.iter().filter(|s| s.covers(note.pitch)).count();
                if count == 0 {
                    return 0;
                }
                let pick = self.rng.gen_range(0..count);
                match matching.nth(pick) {
                    Some(sample) => {
                        self.start_voice(owner, &snapshot, sample, note, delay, master_volume);
                        1
                    }
                    None => 0,
                }
            }
        }
    }

    fn start_voice(
        &mut self,
        owner: VoiceOwner,
        instrument: &InstrumentSnapshot,
        sample: &Sample,
        note: NoteTrigger,
        delay: u32,
        master_volume: f32,
    ) {
        let sample = sample.snapshot();
        let index = self.allocate();
        self.age_counter = self.age_counter.wrapping_add(1);

        self.voices[index].start(&VoiceStart {
            owner,
            instrument,
            sample: &sample,
            pitch: note.pitch,
            velocity: note.velocity,
            modulation: note.modulation,
            delay,
            age: self.age_counter,
            output_rate: self.output_rate,
            master_volume,
        });
    }

    fn apply_new_note_action(&mut self, owner: VoiceOwner, master_volume: f32) {
        for index in 0..self.voices.len() {
            let voice = &self.voices[index];
            if voice.is_free() || !voice.is_held() || voice.owner() != owner {
                continue;
            }
            match voice.new_note_action() {
                NewNoteAction::Cut => self.free_voice(index),
                NewNoteAction::Release => self.release_voice(index, master_volume),
                NewNoteAction::Continue => self.voices[index].set_held(false),
            }
        }
    }

    fn allocate(&mut self) -> usize {
        if let Some(index) = self.free.pop() {
            return index;
        }
        let victim = self.find_voice_to_steal();
        let waveform = self.voices[victim].clear();
        self.retire(waveform);
        self.steal_count += 1;
        victim
    }

    /// Find the best voice to steal
    ///
    /// Priority (best to worst):
    /// 1. Releasing voice furthest into its release (already fading out)
    /// 2. Oldest voice (started longest ago)
    fn find_voice_to_steal(&self) -> usize {
        let releasing = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_releasing())
            .max_by(|(_, a), (_, b)| a.release_progress().total_cmp(&b.release_progress()))
            .map(|(i, _)| i);

        releasing.unwrap_or_else(|| {
            self.voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.age())
                .map_or(0, |(i, _)| i)
        })
    }

    fn free_voice(&mut self, index: usize) {
        if self.voices[index].is_free() {
            return;
        }
        let waveform = self.voices[index].clear();
        self.retire(waveform);
        self.free.push(index);
    }

    /// Release a voice; one still waiting on its trigger delay never sounds
    fn release_voice(&mut self, index: usize, master_volume: f32) {
        if self.voices[index].is_pending() {
            self.free_voice(index);
        } else {
            self.voices[index].release(master_volume);
        }
    }

    /// Hand a waveform handle back; the last one goes to the garbage channel
    fn retire(&mut self, waveform: Option<Arc<Waveform>>) {
        let Some(waveform) = waveform else { return };
        if Arc::strong_count(&waveform) == 1 {
            if let Some(garbage) = self.garbage.as_mut() {
                // A full channel means the control side is not collecting; drop in place
                let _ = garbage.try_push(waveform);
            }
        }
    }

    /// Release the owner's current note
    pub fn release_owner(&mut self, owner: VoiceOwner, master_volume: f32) {
        for index in 0..self.voices.len() {
            let voice = &self.voices[index];
            if !voice.is_free() && voice.owner() == owner && voice.is_held() {
                self.release_voice(index, master_volume);
            }
        }
    }

    /// Silence every voice of the owner immediately
    pub fn cut_owner(&mut self, owner: VoiceOwner) {
        for index in 0..self.voices.len() {
            let voice = &self.voices[index];
            if !voice.is_free() && voice.owner() == owner {
                self.free_voice(index);
            }
        }
    }

    pub fn glide_owner(&mut self, owner: VoiceOwner, pitch: i32) {
        for voice in self.voices.iter_mut() {
            if !voice.is_free() && voice.owner() == owner && voice.is_held() {
                voice.glide_to(pitch);
            }
        }
    }

    pub fn set_velocity_owner(&mut self, owner: VoiceOwner, velocity: f32, slide_ticks: u32, master_volume: f32) {
        for voice in self.voices.iter_mut() {
            if !voice.is_free() && voice.owner() == owner && voice.is_held() {
                voice.set_velocity(velocity, slide_ticks, master_volume);
            }
        }
    }

    pub fn set_modulation_owner(&mut self, owner: VoiceOwner, modulation: f32, slide_ticks: u32) {
        for voice in self.voices.iter_mut() {
            if !voice.is_free() && voice.owner() == owner && voice.is_held() {
                voice.set_modulation(modulation, slide_ticks);
            }
        }
    }

    pub fn owner_voice_count(&self, owner: VoiceOwner) -> usize {
        self.voices
            .iter()
            .filter(|v| !v.is_free() && v.owner() == owner)
            .count()
    }

    /// Graceful fade of every voice
    pub fn release_all(&mut self, master_volume: f32) {
        for index in 0..self.voices.len() {
            if !self.voices[index].is_free() {
                self.release_voice(index, master_volume);
            }
        }
    }

    /// Immediate silence
    pub fn cut_all(&mut self) {
        for index in 0..self.voices.len() {
            self.free_voice(index);
        }
    }

    /// Advance envelopes, glides and slides by one tick
    pub fn tick(&mut self, master_volume: f32) {
        for index in 0..self.voices.len() {
            if !self.voices[index].is_free() && !self.voices[index].tick(master_volume) {
                self.free_voice(index);
            }
        }
    }

    /// Mix all voices into `out` (interleaved stereo, accumulated)
    pub fn render(&mut self, out: &mut [f32]) {
        for index in 0..self.voices.len() {
            if !self.voices[index].is_free() && !self.voices[index].render(out) {
                self.free_voice(index);
            }
        }
    }
}
