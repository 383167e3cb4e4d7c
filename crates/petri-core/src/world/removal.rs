//! Deferred entity removal
//!
//! Collision resolution only enqueues removals; the arena applies them after
//! every organism has been processed, so nothing is removed from a collection
//! while it is being iterated and nothing can be consumed twice in a tick.

use ahash::AHashSet;
use petri_simulation::EntityKey;

#[derive(Debug, Clone, Default)]
pub struct RemovalQueue {
    pending: Vec<EntityKey>,
    queued: AHashSet<EntityKey>,
}

impl RemovalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `key`; returns false when it was already queued this tick
    pub fn enqueue(&mut self, key: EntityKey) -> bool {
        if self.queued.insert(key) {
            self.pending.push(key);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.queued.contains(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every queued key in insertion order
    pub fn drain(&mut self) -> impl Iterator<Item = EntityKey> + '_ {
        self.queued.clear();
        self.pending.drain(..)
    }
}
