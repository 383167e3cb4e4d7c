//! The arena: entity storage, the fixed-timestep tick and its systems

mod arena;
pub mod collision;
mod events;
mod removal;
pub mod spawner;

pub use arena::{Arena, ArenaError, LeaderboardEntry, MAX_STEPS_PER_FRAME};
pub use events::{ArenaEvent, ArenaTotals};
pub use removal::RemovalQueue;
