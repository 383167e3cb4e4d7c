//! Shared organism types

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Who drives an organism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrganismKind {
    /// Steered by queued external intents
    Player,
    /// Steered by a decision engine
    Bot,
}

/// Lifetime statistics of one organism
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganismStats {
    pub food_eaten: u32,
    pub cells_eaten: u32,
    pub viruses_popped: u32,
    pub power_ups_collected: u32,
    pub splits: u32,
    pub ejections: u32,
    pub merges: u32,
    pub peak_mass: f32,
    pub distance_traveled: f32,
}

/// Read-only view of one live cell for rendering and inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub position: Vec2,
    pub radius: f32,
    pub mass: f32,
    /// Below zero while passing under a virus
    pub z_layer: i8,
    /// Distorted membrane outline in world coordinates
    pub outline: Vec<Vec2>,
}

/// Read-only view of an organism
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganismSnapshot {
    pub name: String,
    pub kind: OrganismKind,
    pub color: [u8; 3],
    pub position: Vec2,
    pub radius: f32,
    pub total_mass: f32,
    pub is_dead: bool,
    pub cells: Vec<CellSnapshot>,
}
