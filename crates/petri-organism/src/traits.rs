//! Arena access traits for organism-world interaction
//!
//! The decision engine only needs to look around, so it sees the arena through
//! this read-only trait instead of depending on the arena type itself.

use glam::Vec2;
use petri_simulation::{CategoryMask, EntityKey, EntityRef, QueryResult, SpatialIndex};

/// Read-only view of the arena used by bots
pub trait ArenaView {
    /// Entities of the requested categories touching the circle
    fn query_range(&self, center: Vec2, radius: f32, categories: CategoryMask) -> QueryResult;

    /// Current snapshot of a single entity, if it still exists
    fn locate(&self, key: EntityKey) -> Option<EntityRef>;
}

impl ArenaView for SpatialIndex {
    fn query_range(&self, center: Vec2, radius: f32, categories: CategoryMask) -> QueryResult {
        self.query(center, radius, categories)
    }

    fn locate(&self, key: EntityKey) -> Option<EntityRef> {
        SpatialIndex::locate(self, key)
    }
}
