// Track - Named channel owning a pool of patterns

use super::key::{EntityId, EntityKey, ID_SPACE};
use super::list::{EntityList, Keyed};
use super::pattern::Pattern;
use crate::error::{ModelError, ModelResult};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub struct Track {
    key: EntityKey,
    name: ArcSwap<String>,
    mute: AtomicBool,
    patterns: EntityList<Pattern>,
}

impl Keyed for Track {
    fn key(&self) -> EntityKey {
        self.key
    }
}

impl Track {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            key: EntityKey::generate(),
            name: ArcSwap::from_pointee(name.to_string()),
            mute: AtomicBool::new(false),
            patterns: EntityList::new(),
        })
    }

    pub fn name(&self) -> String {
        self.name.load().as_ref().clone()
    }

    pub fn set_name(&self, name: &str) {
        self.name.store(Arc::new(name.to_string()));
    }

    pub fn is_muted(&self) -> bool {
        self.mute.load(Ordering::Relaxed)
    }

    pub fn set_muted(&self, muted: bool) {
        self.mute.store(muted, Ordering::Relaxed);
    }

    pub fn patterns(&self) -> &EntityList<Pattern> {
        &self.patterns
    }

    pub fn pattern(&self, key: EntityKey) -> Option<Arc<Pattern>> {
        self.patterns.find(key)
    }

    pub fn pattern_by_id(&self, id: EntityId) -> Option<Arc<Pattern>> {
        self.patterns.load().iter().find(|p| p.id() == id).cloned()
    }

    /// Add a pattern to the pool; its id must be unique within this track
    pub fn add_pattern(&self, pattern: Arc<Pattern>) -> ModelResult<()> {
        if self.pattern_by_id(pattern.id()).is_some() {
            return Err(ModelError::DuplicateId(pattern.id().to_string()));
        }
        log::debug!("Track '{}': add pattern {}", self.name(), pattern.id());
        self.patterns.push(pattern);
        Ok(())
    }

    /// Remove a pattern from the pool. Page slots still naming it resolve to "no pattern".
    pub fn remove_pattern(&self, key: EntityKey) -> Option<Arc<Pattern>> {
        self.patterns.remove(key)
    }

    pub fn rename_pattern(&self, key: EntityKey, id: EntityId) -> ModelResult<()> {
        let pattern = self.pattern(key).ok_or(ModelError::UnknownEntity(key))?;
        if let Some(other) = self.pattern_by_id(id) {
            if other.key() != key {
                return Err(ModelError::DuplicateId(id.to_string()));
            }
        }
        pattern.set_id(id);
        Ok(())
    }

    /// First id not used by any pattern of this track
    pub fn next_free_pattern_id(&self) -> EntityId {
        let patterns = self.patterns.load();
        (0..ID_SPACE)
            .map(EntityId::from_index)
            .find(|id| patterns.iter().all(|p| p.id() != *id))
            .unwrap_or_else(|| EntityId::from_index(0))
    }
}
