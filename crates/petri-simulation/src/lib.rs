//! Simulation primitives for Petri
//!
//! This crate provides the foundational data types for the cell arena:
//! - Simulation time (SimulationClock)
//! - Balance knobs and their validation (BalanceConfig, ConfigError)
//! - Stable entity handles (OrganismId, FoodId, VirusId, PowerUpId, MassId, EntityKey)
//! - Passive world entities (Food, Virus, PowerUp, MovingMass)
//! - The per-tick broad-phase grid (SpatialIndex)
//! - RNG abstraction (SimRng) and small vector helpers

mod balance;
mod clock;
mod entities;
mod keys;
pub mod math;
mod rng;
pub mod spatial;

pub use balance::{BalanceConfig, ConfigError, MAX_CELLS_PER_ORGANISM};
pub use clock::SimulationClock;
pub use entities::{Food, FoodKind, MovingMass, PowerUp, PowerUpKind, VelocityDecay, Virus};
pub use keys::{EntityKey, FoodId, MassId, OrganismId, PowerUpId, VirusId};
pub use rng::SimRng;
pub use spatial::{
    Category, CategoryMask, EntityKind, EntityRef, IndexError, QueryResult, SpatialIndex,
};
