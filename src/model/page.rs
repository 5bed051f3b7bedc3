// Page - One segment of the arrangement
//
// A page sets tempo, meter and length, and selects at most one pattern per
// track. Slots are keyed by track so they survive track reordering.

use super::atomic::{AtomicF32, AtomicKey};
use super::key::EntityKey;
use super::list::{EntityList, Keyed};
use crate::error::{ModelError, ModelResult};
use crate::units::{DEFAULT_TEMPO, MAX_TEMPO, MIN_TEMPO};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Pattern selection for one track
#[derive(Debug)]
pub struct PageSlot {
    track: EntityKey,
    pattern: AtomicKey,
}

impl Keyed for PageSlot {
    fn key(&self) -> EntityKey {
        self.track
    }
}

impl PageSlot {
    fn new(track: EntityKey) -> Arc<Self> {
        Arc::new(Self {
            track,
            pattern: AtomicKey::new(None),
        })
    }

    pub fn track(&self) -> EntityKey {
        self.track
    }

    pub fn pattern(&self) -> Option<EntityKey> {
        self.pattern.get()
    }
}

#[derive(Debug)]
pub struct Page {
    key: EntityKey,
    length: AtomicU32,
    tempo: AtomicF32,
    meter: AtomicU32,
    comment: ArcSwap<String>,
    slots: EntityList<PageSlot>,
}

impl Keyed for Page {
    fn key(&self) -> EntityKey {
        self.key
    }
}

impl Page {
    /// `length` in ticks (> 0), `tempo` in beats per minute (> 0)
    pub fn new(length: u32, tempo: f32) -> ModelResult<Arc<Self>> {
        if length == 0 {
            return Err(ModelError::InvalidLength);
        }
        check_tempo(tempo)?;
        Ok(Arc::new(Self {
            key: EntityKey::generate(),
            length: AtomicU32::new(length),
            tempo: AtomicF32::new(tempo),
            meter: AtomicU32::new(4),
            comment: ArcSwap::from_pointee(String::new()),
            slots: EntityList::new(),
        }))
    }

    pub fn with_default_tempo(length: u32) -> ModelResult<Arc<Self>> {
        Self::new(length, DEFAULT_TEMPO)
    }

    pub fn length(&self) -> u32 {
        self.length.load(Ordering::Relaxed)
    }

    pub fn set_length(&self, length: u32) -> ModelResult<()> {
        if length == 0 {
            return Err(ModelError::InvalidLength);
        }
        self.length.store(length, Ordering::Relaxed);
        Ok(())
    }

    pub fn tempo(&self) -> f32 {
        self.tempo.get()
    }

    pub fn set_tempo(&self, tempo: f32) -> ModelResult<()> {
        check_tempo(tempo)?;
        self.tempo.set(tempo);
        Ok(())
    }

    /// Beats per measure (display only)
    pub fn meter(&self) -> u32 {
        self.meter.load(Ordering::Relaxed)
    }

    pub fn set_meter(&self, beats: u32) {
        self.meter.store(beats.max(1), Ordering::Relaxed);
    }

    pub fn comment(&self) -> String {
        self.comment.load().as_ref().clone()
    }

    pub fn set_comment(&self, comment: &str) {
        self.comment.store(Arc::new(comment.to_string()));
    }

    pub fn slots(&self) -> &EntityList<PageSlot> {
        &self.slots
    }

    /// Pattern selected for `track`, if any
    pub fn pattern_for(&self, track: EntityKey) -> Option<EntityKey> {
        self.slots
            .load()
            .iter()
            .find(|slot| slot.track == track)
            .and_then(|slot| slot.pattern.get())
    }

    /// Select a pattern (or none) for a track of the song
    pub fn select_pattern(&self, track: EntityKey, pattern: Option<EntityKey>) -> ModelResult<()> {
        let slots = self.slots.load();
        let slot = slots
            .iter()
            .find(|slot| slot.track == track)
            .ok_or(ModelError::UnknownEntity(track))?;
        slot.pattern.set(pattern);
        Ok(())
    }

    /// Drop any selection of `pattern` (after it was deleted)
    pub(crate) fn forget_pattern(&self, pattern: EntityKey) {
        for slot in self.slots.load().iter() {
            slot.pattern.clear_if(pattern);
        }
    }

    /// Bring the slot list in line with the song's tracks, keeping existing selections
    pub(crate) fn align_slots(&self, tracks: &[EntityKey]) {
        self.slots.update(|slots| {
            tracks
                .iter()
                .map(|&track| {
                    slots
                        .iter()
                        .find(|slot| slot.track == track)
                        .cloned()
                        .unwrap_or_else(|| PageSlot::new(track))
                })
                .collect()
        });
    }
}

fn check_tempo(tempo: f32) -> ModelResult<()> {
    if tempo.is_finite() && (MIN_TEMPO..=MAX_TEMPO).contains(&tempo) {
        Ok(())
    } else {
        Err(ModelError::InvalidTempo(tempo))
    }
}
