// Pattern - Time-ordered events forming a reusable, track-scoped sequence
//
// Events are immutable values; editing a pattern swaps in a new event list.
// Every event time lies in [0, length).

use super::atomic::AtomicId;
use super::key::{EntityId, EntityKey};
use super::list::Keyed;
use crate::error::{ModelError, ModelResult};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Note data carried by an event; absent fields leave the channel unchanged
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NoteEvent {
    /// Instrument to start; `None` means "no instrument change" (glide / parameter event)
    pub instrument: Option<EntityKey>,
    pub pitch: Option<i32>,
    pub velocity: Option<f32>,
    pub modulation: Option<f32>,
    pub velocity_slide: bool,
    pub mod_slide: bool,
    /// Note-off: release the channel's held note
    pub release: bool,
}

impl NoteEvent {
    /// Start `instrument` at `pitch`
    pub fn note_on(instrument: EntityKey, pitch: i32, velocity: f32) -> Self {
        Self {
            instrument: Some(instrument),
            pitch: Some(pitch),
            velocity: Some(velocity),
            ..Default::default()
        }
    }

    pub fn note_off() -> Self {
        Self {
            release: true,
            ..Default::default()
        }
    }

    /// Slide the held note to `pitch`
    pub fn glide(pitch: i32) -> Self {
        Self {
            pitch: Some(pitch),
            ..Default::default()
        }
    }
}

/// Marker text for external tooling; no audio effect
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEvent {
    pub text: Arc<str>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Note(NoteEvent),
    Label(LabelEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Tick offset from the start of the pattern
    pub time: u32,
    pub kind: EventKind,
}

impl Event {
    pub fn note(time: u32, note: NoteEvent) -> Self {
        Self {
            time,
            kind: EventKind::Note(note),
        }
    }

    pub fn label(time: u32, text: &str) -> Self {
        Self {
            time,
            kind: EventKind::Label(LabelEvent { text: text.into() }),
        }
    }
}

#[derive(Debug)]
pub struct Pattern {
    key: EntityKey,
    id: AtomicId,
    length: AtomicU32,
    events: ArcSwap<Vec<Event>>,
}

impl Keyed for Pattern {
    fn key(&self) -> EntityKey {
        self.key
    }
}

impl Pattern {
    /// Create an empty pattern; `length` is in ticks and must be > 0
    pub fn new(id: EntityId, length: u32) -> ModelResult<Arc<Self>> {
        Self::with_events(id, length, Vec::new())
    }

    /// Create a pattern from events in any order, rejecting any event outside `[0, length)`
    pub fn with_events(id: EntityId, length: u32, mut events: Vec<Event>) -> ModelResult<Arc<Self>> {
        if length == 0 {
            return Err(ModelError::InvalidLength);
        }
        if let Some(event) = events.iter().find(|e| e.time >= length) {
            return Err(ModelError::EventOutOfRange {
                time: event.time,
                length,
            });
        }
        // Stable: simultaneous events keep their given order
        events.sort_by_key(|e| e.time);

        Ok(Arc::new(Self {
            key: EntityKey::generate(),
            id: AtomicId::new(id),
            length: AtomicU32::new(length),
            events: ArcSwap::from_pointee(events),
        }))
    }

    pub fn id(&self) -> EntityId {
        self.id.get()
    }

    /// Unchecked rename; `Track::rename_pattern` enforces uniqueness
    pub(crate) fn set_id(&self, id: EntityId) {
        self.id.set(id);
    }

    pub fn length(&self) -> u32 {
        self.length.load(Ordering::Relaxed)
    }

    /// Resize the pattern, dropping events that no longer fit
    pub fn set_length(&self, length: u32) -> ModelResult<()> {
        if length == 0 {
            return Err(ModelError::InvalidLength);
        }
        let old = self.length.swap(length, Ordering::Relaxed);
        if length < old {
            self.events.rcu(|events| {
                events
                    .iter()
                    .filter(|e| e.time < length)
                    .cloned()
                    .collect::<Vec<_>>()
            });
        }
        Ok(())
    }

    /// Snapshot of the events, sorted by time
    pub fn events(&self) -> Arc<Vec<Event>> {
        self.events.load_full()
    }

    pub fn event_count(&self) -> usize {
        self.events.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.load().is_empty()
    }

    /// Insert an event, after any existing events at the same tick
    pub fn add_event(&self, event: Event) -> ModelResult<()> {
        self.check_time(event.time)?;
        self.events.rcu(|events| {
            let mut next = Vec::with_capacity(events.len() + 1);
            let insert_pos = events.partition_point(|e| e.time <= event.time);
            next.extend_from_slice(&events[..insert_pos]);
            next.push(event.clone());
            next.extend_from_slice(&events[insert_pos..]);
            next
        });
        Ok(())
    }

    /// Remove the event at `index` (in time order)
    pub fn remove_event(&self, index: usize) -> Option<Event> {
        let mut removed = None;
        self.events.rcu(|events| {
            let mut next = events.to_vec();
            removed = (index < next.len()).then(|| next.remove(index));
            next
        });
        removed
    }

    /// Replace the event at `index`, keeping time order
    pub fn replace_event(&self, index: usize, event: Event) -> ModelResult<()> {
        self.check_time(event.time)?;
        self.events.rcu(|events| {
            let mut next = events.to_vec();
            if index < next.len() {
                next.remove(index);
                let insert_pos = next.partition_point(|e| e.time <= event.time);
                next.insert(insert_pos, event.clone());
            }
            next
        });
        Ok(())
    }

    pub fn clear(&self) {
        self.events.store(Arc::new(Vec::new()));
    }

    /// Visit the events scheduled exactly at `tick` without allocating.
    /// `next_time` is the time of the first later event, or the pattern length.
    pub fn for_each_at<F>(&self, tick: u32, mut visit: F)
    where
        F: FnMut(&Event, u32),
    {
        let events = self.events.load();
        let length = self.length();
        let start = events.partition_point(|e| e.time < tick);
        let end = start + events[start..].partition_point(|e| e.time == tick);
        let next_time = events.get(end).map_or(length, |e| e.time).max(tick + 1);
        for event in &events[start..end] {
            visit(event, next_time);
        }
    }

    fn check_time(&self, time: u32) -> ModelResult<()> {
        let length = self.length();
        if time >= length {
            log::warn!("Pattern {}: rejected event at tick {} (length {})", self.id(), time, length);
            return Err(ModelError::EventOutOfRange { time, length });
        }
        Ok(())
    }
}
