//! EventStore - Session-scoped event registry
//!
//! Maps event id -> event for one explanation session. Append-only except
//! for in-place updates applied by the merge step: inserting an id that is
//! already present replaces the stored event.
//!
//! This is a pure data container. Fingerprinting, clustering, and merge
//! decisions live elsewhere.

use std::collections::HashMap;

use super::Event;

/// In-memory id -> event mapping for one explanation session.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: HashMap<String, Event>,
}

impl EventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the event stored under `event.id`.
    pub fn insert(&mut self, event: Event) {
        self.events.insert(event.id.clone(), event);
    }

    /// Returns the event stored under `id`, if any.
    pub fn get(&self, id: &str) -> Option<&Event> {
        self.events.get(id)
    }

    /// Returns true if an event is stored under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.events.contains_key(id)
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the store holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Removes every stored event.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
