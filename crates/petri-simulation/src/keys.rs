//! Stable handles for arena entities
//!
//! Entities live in generational slot maps owned by the arena, so a handle to a
//! removed entity simply fails to resolve instead of aliasing a new one.

use slotmap::new_key_type;

new_key_type! {
    /// Handle of one player- or bot-controlled organism
    pub struct OrganismId;
    /// Handle of a food pellet
    pub struct FoodId;
    /// Handle of a virus
    pub struct VirusId;
    /// Handle of a power-up pickup
    pub struct PowerUpId;
    /// Handle of a free-floating ejected mass
    pub struct MassId;
}

/// Reference to any entity that can appear in the spatial index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Food(FoodId),
    Mass(MassId),
    Virus(VirusId),
    PowerUp(PowerUpId),
    /// One cell slot of an organism; slots are stable for the duration of a tick
    Cell { organism: OrganismId, slot: usize },
}

impl EntityKey {
    /// Owning organism for cell keys
    pub fn organism(&self) -> Option<OrganismId> {
        match self {
            Self::Cell { organism, .. } => Some(*organism),
            _ => None,
        }
    }

    /// True for keys removed through the deferred removal queue
    pub fn is_world_entity(&self) -> bool {
        !matches!(self, Self::Cell { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_cell_key_reports_owner() {
        let mut organisms: SlotMap<OrganismId, ()> = SlotMap::with_key();
        let id = organisms.insert(());
        let key = EntityKey::Cell {
            organism: id,
            slot: 3,
        };
        assert_eq!(key.organism(), Some(id));
        assert!(!key.is_world_entity());
    }

    #[test]
    fn test_world_keys_have_no_owner() {
        let mut food: SlotMap<FoodId, ()> = SlotMap::with_key();
        let key = EntityKey::Food(food.insert(()));
        assert_eq!(key.organism(), None);
        assert!(key.is_world_entity());
    }

    #[test]
    fn test_stale_handle_does_not_resolve() {
        let mut food: SlotMap<FoodId, u32> = SlotMap::with_key();
        let first = food.insert(1);
        food.remove(first);
        let second = food.insert(2);
        assert_ne!(first, second);
        assert!(food.get(first).is_none());
    }
}
