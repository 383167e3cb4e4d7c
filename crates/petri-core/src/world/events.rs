//! Events emitted by the arena for out-of-tick collaborators
//!
//! Sound cues, achievements and UI read these through
//! [`Arena::drain_events`](crate::Arena::drain_events); the arena also folds
//! them into running [`ArenaTotals`].

use petri_organism::{OrganismKind, OrganismStats};
use petri_simulation::{FoodKind, OrganismId, PowerUpKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum ArenaEvent {
    Spawned {
        organism: OrganismId,
        kind: OrganismKind,
    },
    /// A pellet (`food: Some`) or ejected mass (`food: None`) was eaten
    FoodEaten {
        organism: OrganismId,
        food: Option<FoodKind>,
        mass: f32,
    },
    CellEaten {
        predator: OrganismId,
        victim: OrganismId,
        mass: f32,
    },
    OrganismDied {
        organism: OrganismId,
        name: String,
        kind: OrganismKind,
        killer: Option<OrganismId>,
        stats: OrganismStats,
    },
    VirusPopped {
        organism: OrganismId,
        pieces: usize,
    },
    PowerUpCollected {
        organism: OrganismId,
        kind: PowerUpKind,
    },
    Split {
        organism: OrganismId,
        pieces: usize,
    },
    Ejected {
        organism: OrganismId,
        count: usize,
    },
    Merged {
        organism: OrganismId,
        count: usize,
    },
}

/// Running counters over every event the arena has emitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaTotals {
    pub spawned: u64,
    pub food_eaten: u64,
    pub cells_eaten: u64,
    pub deaths: u64,
    pub viruses_popped: u64,
    pub power_ups_collected: u64,
    pub splits: u64,
    pub ejections: u64,
    pub merges: u64,
}

impl ArenaTotals {
    pub fn record(&mut self, event: &ArenaEvent) {
        match event {
            ArenaEvent::Spawned { .. } => self.spawned += 1,
            ArenaEvent::FoodEaten { .. } => self.food_eaten += 1,
            ArenaEvent::CellEaten { .. } => self.cells_eaten += 1,
            ArenaEvent::OrganismDied { .. } => self.deaths += 1,
            ArenaEvent::VirusPopped { .. } => self.viruses_popped += 1,
            ArenaEvent::PowerUpCollected { .. } => self.power_ups_collected += 1,
            ArenaEvent::Split { .. } => self.splits += 1,
            ArenaEvent::Ejected { .. } => self.ejections += 1,
            ArenaEvent::Merged { count, .. } => self.merges += *count as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_totals_default_to_zero() {
        assert_eq!(ArenaTotals::default().food_eaten, 0);
    }

    #[test]
    fn test_totals_count_events() {
        let mut ids: SlotMap<OrganismId, ()> = SlotMap::with_key();
        let a = ids.insert(());
        let b = ids.insert(());
        let mut totals = ArenaTotals::default();

        totals.record(&ArenaEvent::FoodEaten {
            organism: a,
            food: Some(FoodKind::Pellet),
            mass: 40.0,
        });
        totals.record(&ArenaEvent::CellEaten {
            predator: a,
            victim: b,
            mass: 500.0,
        });
        totals.record(&ArenaEvent::Merged {
            organism: a,
            count: 3,
        });

        assert_eq!(totals.food_eaten, 1);
        assert_eq!(totals.cells_eaten, 1);
        assert_eq!(totals.merges, 3);
        assert_eq!(totals.deaths, 0);
    }

    #[test]
    fn test_totals_serialize() {
        let totals = ArenaTotals {
            splits: 2,
            ..Default::default()
        };
        let text = ron::to_string(&totals).expect("totals serialize");
        let back: ArenaTotals = ron::from_str(&text).expect("totals deserialize");
        assert_eq!(back, totals);
    }
}
