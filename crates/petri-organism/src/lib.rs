//! Organisms for Petri
//!
//! This crate implements:
//! - Circular cell bodies with a soft-body membrane outline
//! - Multi-cell organism physics (grow, split, eject, merge, decay, repair)
//! - Immutable bot personalities produced from a difficulty level
//! - A utility-scored decision engine (wander / chase / flee) for bots

pub mod cell;
pub mod decision;
pub mod membrane;
pub mod organism;
pub mod personality;
pub mod traits;
pub mod types;

// Re-export main types for convenience
pub use cell::{ActiveEffect, CellBody};
pub use decision::{AiIntent, Behavior, DecisionEngine, Evaluation};
pub use membrane::Membrane;
pub use organism::Organism;
pub use personality::{Difficulty, MovementStyle, Personality};
pub use traits::ArenaView;
pub use types::{CellSnapshot, OrganismKind, OrganismSnapshot, OrganismStats};
