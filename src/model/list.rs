// EntityList - Copy-on-write ordered collection
//
// Readers take a snapshot of the current `Vec<Arc<T>>` without locking;
// writers build a new vector and swap it in. Entities themselves are shared,
// so an entity removed from the list stays alive for anyone still holding it.

use super::key::EntityKey;
use arc_swap::{ArcSwap, Guard};
use std::sync::Arc;

/// Anything stored in an `EntityList`
pub trait Keyed {
    fn key(&self) -> EntityKey;
}

pub struct EntityList<T> {
    items: ArcSwap<Vec<Arc<T>>>,
}

impl<T: Keyed> EntityList<T> {
    pub fn new() -> Self {
        Self {
            items: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Lock-free view of the current contents (render thread)
    pub fn load(&self) -> Guard<Arc<Vec<Arc<T>>>> {
        self.items.load()
    }

    /// Owned snapshot of the current contents
    pub fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.items.load_full()
    }

    pub fn len(&self) -> usize {
        self.items.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.load().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Arc<T>> {
        self.items.load().get(index).cloned()
    }

    /// Resolve a reference; `None` when the entity is not (or no longer) here
    pub fn find(&self, key: EntityKey) -> Option<Arc<T>> {
        self.items.load().iter().find(|item| item.key() == key).cloned()
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.items.load().iter().any(|item| item.key() == key)
    }

    pub fn position(&self, key: EntityKey) -> Option<usize> {
        self.items.load().iter().position(|item| item.key() == key)
    }

    pub fn push(&self, item: Arc<T>) {
        self.items.rcu(|items| {
            let mut next = Vec::with_capacity(items.len() + 1);
            next.extend(items.iter().cloned());
            next.push(item.clone());
            next
        });
    }

    /// Insert at `index`, appending when the index is past the end
    pub fn insert(&self, index: usize, item: Arc<T>) {
        self.items.rcu(|items| {
            let mut next: Vec<Arc<T>> = items.iter().cloned().collect();
            next.insert(index.min(next.len()), item.clone());
            next
        });
    }

    pub fn remove(&self, key: EntityKey) -> Option<Arc<T>> {
        let mut removed = None;
        self.items.rcu(|items| {
            let mut next: Vec<Arc<T>> = items.iter().cloned().collect();
            removed = next
                .iter()
                .position(|item| item.key() == key)
                .map(|index| next.remove(index));
            next
        });
        removed
    }

    /// Move an entity to a new position; returns false if it is not in the list
    pub fn move_to(&self, key: EntityKey, index: usize) -> bool {
        let mut moved = false;
        self.items.rcu(|items| {
            let mut next: Vec<Arc<T>> = items.iter().cloned().collect();
            moved = match next.iter().position(|item| item.key() == key) {
                Some(from) => {
                    let item = next.remove(from);
                    next.insert(index.min(next.len()), item);
                    true
                }
                None => false,
            };
            next
        });
        moved
    }

    /// Atomically rebuild the contents; `update` may run more than once under contention
    pub fn update<F>(&self, mut update: F)
    where
        F: FnMut(&[Arc<T>]) -> Vec<Arc<T>>,
    {
        self.items.rcu(|items| update(items));
    }
}

impl<T: Keyed> Default for EntityList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EntityList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityList")
            .field("len", &self.items.load().len())
            .finish()
    }
}
