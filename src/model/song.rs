// Song - Root of the entity model
//
// Owns instruments, tracks and pages. Structural edits keep the cross-entity
// invariants (unique instrument ids, one page slot per track); scalar edits go
// straight to the entities.

use super::atomic::{AtomicF32, clamp_finite};
use super::instrument::Instrument;
use super::key::{EntityId, EntityKey, ID_SPACE};
use super::list::{EntityList, Keyed};
use super::page::Page;
use super::pattern::Pattern;
use super::track::Track;
use crate::error::{ModelError, ModelResult};
use std::sync::Arc;

#[derive(Debug)]
pub struct Song {
    master_volume: AtomicF32,
    instruments: EntityList<Instrument>,
    tracks: EntityList<Track>,
    pages: EntityList<Page>,
}

impl Song {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            master_volume: AtomicF32::new(1.0),
            instruments: EntityList::new(),
            tracks: EntityList::new(),
            pages: EntityList::new(),
        })
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume.get()
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.master_volume.set(clamp_finite(volume, 0.0, 1.0, 1.0));
    }

    // ---- Instruments ----

    pub fn instruments(&self) -> &EntityList<Instrument> {
        &self.instruments
    }

    /// Resolve an instrument reference; `None` when it was deleted
    pub fn instrument(&self, key: EntityKey) -> Option<Arc<Instrument>> {
        self.instruments.find(key)
    }

    pub fn instrument_by_id(&self, id: EntityId) -> Option<Arc<Instrument>> {
        self.instruments.load().iter().find(|i| i.id() == id).cloned()
    }

    pub fn add_instrument(&self, instrument: Arc<Instrument>) -> ModelResult<()> {
        if self.instrument_by_id(instrument.id()).is_some() {
            log::warn!("Rejected instrument with duplicate id {}", instrument.id());
            return Err(ModelError::DuplicateId(instrument.id().to_string()));
        }
        log::debug!("Add instrument {} '{}'", instrument.id(), instrument.name());
        self.instruments.push(instrument);
        Ok(())
    }

    /// Remove an instrument. Events still naming it become "no instrument" and
    /// voices already playing it ring out on their own copies.
    pub fn remove_instrument(&self, key: EntityKey) -> Option<Arc<Instrument>> {
        let removed = self.instruments.remove(key);
        if let Some(instrument) = &removed {
            log::debug!("Removed instrument {}", instrument.id());
        }
        removed
    }

    pub fn rename_instrument(&self, key: EntityKey, id: EntityId) -> ModelResult<()> {
        let instrument = self.instrument(key).ok_or(ModelError::UnknownEntity(key))?;
        if let Some(other) = self.instrument_by_id(id) {
            if other.key() != key {
                return Err(ModelError::DuplicateId(id.to_string()));
            }
        }
        instrument.set_id(id);
        Ok(())
    }

    /// First instrument id not in use
    pub fn next_free_instrument_id(&self) -> EntityId {
        let instruments = self.instruments.load();
        (0..ID_SPACE)
            .map(EntityId::from_index)
            .find(|id| instruments.iter().all(|i| i.id() != *id))
            .unwrap_or_else(|| EntityId::from_index(0))
    }

    // ---- Tracks ----

    pub fn tracks(&self) -> &EntityList<Track> {
        &self.tracks
    }

    pub fn track(&self, key: EntityKey) -> Option<Arc<Track>> {
        self.tracks.find(key)
    }

    /// Append a track; every page gets an empty slot for it
    pub fn add_track(&self, track: Arc<Track>) {
        log::debug!("Add track '{}'", track.name());
        self.tracks.push(track);
        self.align_page_slots();
    }

    pub fn remove_track(&self, key: EntityKey) -> Option<Arc<Track>> {
        let removed = self.tracks.remove(key);
        if removed.is_some() {
            self.align_page_slots();
        }
        removed
    }

    pub fn move_track(&self, key: EntityKey, index: usize) -> bool {
        let moved = self.tracks.move_to(key, index);
        if moved {
            self.align_page_slots();
        }
        moved
    }

    /// Remove a pattern from its track and clear every page selection of it
    pub fn remove_pattern(&self, track: EntityKey, pattern: EntityKey) -> Option<Arc<Pattern>> {
        let removed = self.track(track)?.remove_pattern(pattern)?;
        for page in self.pages.load().iter() {
            page.forget_pattern(pattern);
        }
        Some(removed)
    }

    // ---- Pages ----

    pub fn pages(&self) -> &EntityList<Page> {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<Arc<Page>> {
        self.pages.get(index)
    }

    pub fn add_page(&self, page: Arc<Page>) {
        page.align_slots(&self.track_keys());
        self.pages.push(page);
    }

    pub fn insert_page(&self, index: usize, page: Arc<Page>) {
        page.align_slots(&self.track_keys());
        self.pages.insert(index, page);
    }

    pub fn remove_page(&self, key: EntityKey) -> Option<Arc<Page>> {
        self.pages.remove(key)
    }

    pub fn move_page(&self, key: EntityKey, index: usize) -> bool {
        self.pages.move_to(key, index)
    }

    /// Select a pattern of `track` on `page`; the pattern must belong to the track
    pub fn select_pattern(
        &self,
        page: EntityKey,
        track: EntityKey,
        pattern: Option<EntityKey>,
    ) -> ModelResult<()> {
        let page = self.pages.find(page).ok_or(ModelError::UnknownEntity(page))?;
        let owner = self.track(track).ok_or(ModelError::UnknownEntity(track))?;
        if let Some(pattern) = pattern {
            if !owner.patterns().contains(pattern) {
                return Err(ModelError::UnknownEntity(pattern));
            }
        }
        page.select_pattern(track, pattern)
    }

    /// Total length of one pass through the song, in ticks
    pub fn length_ticks(&self) -> u64 {
        self.pages.load().iter().map(|p| p.length() as u64).sum()
    }

    fn track_keys(&self) -> Vec<EntityKey> {
        self.tracks.load().iter().map(|t| t.key()).collect()
    }

    fn align_page_slots(&self) {
        let keys = self.track_keys();
        for page in self.pages.load().iter() {
            page.align_slots(&keys);
        }
    }
}
