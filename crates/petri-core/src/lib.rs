pub mod world;

pub use world::{
    Arena, ArenaError, ArenaEvent, ArenaTotals, LeaderboardEntry, MAX_STEPS_PER_FRAME,
    RemovalQueue,
};

// Re-export the lower layers so applications only need this crate
pub mod organism {
    pub use petri_organism::*;
}

pub mod simulation {
    pub use petri_simulation::*;
}
