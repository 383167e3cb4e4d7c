//! Numeric balance knobs for the arena
//!
//! Every constant the physics, collision rules and AI depend on lives here so a
//! config file can retune the game without code changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::mass_for_radius;

/// Hard ceiling on live cells per organism
pub const MAX_CELLS_PER_ORGANISM: usize = 16;

/// Errors produced by [`BalanceConfig::validate`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive and finite (got {value})")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{field} must lie within {min}..={max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("max_cells must be between 1 and {max} (got {value})")]
    CellCap { value: usize, max: usize },

    #[error("base_radius {base_radius} does not fit inside a world of size {world_size}")]
    WorldTooSmall { base_radius: f32, world_size: f32 },
}

/// Balance configuration shared by every simulation system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    // World
    /// Edge length of the square arena
    pub world_size: f32,
    /// Edge length of one broad-phase grid cell
    pub grid_cell_size: f32,
    /// Fixed simulation timestep in seconds
    pub fixed_timestep: f32,

    // Cells
    /// Radius of a freshly spawned organism
    pub base_radius: f32,
    pub max_cells: usize,
    pub max_cell_mass: f32,
    pub min_split_radius: f32,
    /// Outward speed given to both halves of a split (px/s)
    pub split_impulse: f32,
    /// Distance between split halves as a fraction of the source radius
    pub split_offset_factor: f32,
    /// Seconds after a split before the cells may merge again
    pub merge_time: f32,
    /// Seconds between organism-level splits
    pub split_cooldown: f32,
    /// Centre distance (as a fraction of the larger radius) at which unlocked cells merge
    pub merge_range_factor: f32,
    /// Exponential damping rate of impulse velocity (1/s)
    pub impulse_damping: f32,
    /// Fraction of intra-organism overlap resolved per tick
    pub repulsion_strength: f32,
    /// Pull speed between merge-ready cells of one organism (px/s)
    pub cohesion_speed: f32,

    // Eject
    pub eject_min_mass: f32,
    pub eject_fraction: f32,
    pub eject_mass_cap: f32,
    /// Spawn distance of ejected mass as a multiple of the cell radius
    pub eject_distance: f32,
    pub eject_speed: f32,
    /// Fraction of ejected-mass velocity retained after one second
    pub eject_velocity_retain: f32,
    pub eject_cooldown: f32,
    /// Seconds during which the ejecting organism cannot re-eat its own mass
    pub eject_owner_grace: f32,

    // Growth and decay
    pub growth_rate: f32,
    /// Mass fraction lost per second by large cells
    pub shrink_rate: f32,
    pub decay_min_radius: f32,

    // Movement
    pub base_speed: f32,
    pub speed_exponent: f32,
    pub min_speed: f32,

    // Eat rules
    pub eat_size_ratio: f32,
    pub eat_overlap_threshold: f32,
    /// Fraction of overlap resolved when comparable cells of different organisms touch
    pub comparable_push: f32,

    // Viruses
    pub virus_radius: f32,
    pub virus_pop_ratio: f32,
    pub virus_pass_under_ratio: f32,
    pub virus_absorb_fraction: f32,
    pub virus_push: f32,
    pub pass_under_duration: f32,

    // Power-ups
    pub power_up_radius: f32,
    pub power_up_duration: f32,
    pub speed_boost_multiplier: f32,
    pub mass_gain_multiplier: f32,

    // Food
    pub pellet_mass: f32,
    pub rich_food_mass: f32,
    pub golden_food_mass: f32,
    /// Probability that a spawned pellet is Rich / Golden
    pub rich_food_chance: f32,
    pub golden_food_chance: f32,

    // Population
    pub food_target: usize,
    pub virus_target: usize,
    pub power_up_target: usize,
    /// Maximum number of entities of one kind spawned per tick while below target
    pub spawn_per_tick: usize,
    /// Seconds before a dead bot is replaced
    pub bot_respawn_delay: f32,

    // AI
    pub ai_aggression_multiplier: f32,

    // Membrane
    pub membrane_vertices: usize,
    pub membrane_elasticity: f32,
    pub membrane_damping: f32,
    pub membrane_distortion_limit: f32,
    pub membrane_amplitude: f32,
    pub membrane_speed: f32,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            world_size: 6000.0,
            grid_cell_size: 150.0,
            fixed_timestep: 1.0 / 60.0,

            base_radius: 20.0,
            max_cells: MAX_CELLS_PER_ORGANISM,
            max_cell_mass: 250_000.0,
            min_split_radius: 25.0,
            split_impulse: 480.0,
            split_offset_factor: 0.2,
            merge_time: 15.0,
            split_cooldown: 10.0,
            merge_range_factor: 0.5,
            impulse_damping: 5.0,
            repulsion_strength: 0.5,
            cohesion_speed: 40.0,

            eject_min_mass: 1000.0,
            eject_fraction: 0.05,
            eject_mass_cap: 150.0,
            eject_distance: 1.2,
            eject_speed: 600.0,
            eject_velocity_retain: 0.005,
            eject_cooldown: 0.3,
            eject_owner_grace: 0.5,

            growth_rate: 1.0,
            shrink_rate: 0.002,
            decay_min_radius: 80.0,

            base_speed: 260.0,
            speed_exponent: 0.45,
            min_speed: 40.0,

            eat_size_ratio: 1.1,
            eat_overlap_threshold: 0.9,
            comparable_push: 0.1,

            virus_radius: 45.0,
            virus_pop_ratio: 1.15,
            virus_pass_under_ratio: 0.9,
            virus_absorb_fraction: 0.5,
            virus_push: 0.25,
            pass_under_duration: 1.0,

            power_up_radius: 18.0,
            power_up_duration: 10.0,
            speed_boost_multiplier: 1.5,
            mass_gain_multiplier: 2.0,

            pellet_mass: 40.0,
            rich_food_mass: 120.0,
            golden_food_mass: 400.0,
            rich_food_chance: 0.08,
            golden_food_chance: 0.01,

            food_target: 800,
            virus_target: 20,
            power_up_target: 6,
            spawn_per_tick: 25,
            bot_respawn_delay: 3.0,

            ai_aggression_multiplier: 1.0,

            membrane_vertices: 24,
            membrane_elasticity: 40.0,
            membrane_damping: 0.9,
            membrane_distortion_limit: 0.25,
            membrane_amplitude: 0.02,
            membrane_speed: 2.0,
        }
    }
}

impl BalanceConfig {
    /// Mass of a freshly spawned cell
    pub fn base_mass(&self) -> f32 {
        mass_for_radius(self.base_radius)
    }

    /// Mass of a default virus
    pub fn virus_mass(&self) -> f32 {
        mass_for_radius(self.virus_radius)
    }

    /// Centre of the arena
    pub fn world_center(&self) -> glam::Vec2 {
        glam::Vec2::splat(self.world_size * 0.5)
    }

    /// Check that every knob holds a usable value
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("world_size", self.world_size),
            ("grid_cell_size", self.grid_cell_size),
            ("fixed_timestep", self.fixed_timestep),
            ("base_radius", self.base_radius),
            ("max_cell_mass", self.max_cell_mass),
            ("min_split_radius", self.min_split_radius),
            ("merge_time", self.merge_time),
            ("eject_min_mass", self.eject_min_mass),
            ("eject_mass_cap", self.eject_mass_cap),
            ("eject_distance", self.eject_distance),
            ("base_speed", self.base_speed),
            ("eat_size_ratio", self.eat_size_ratio),
            ("virus_radius", self.virus_radius),
            ("virus_pop_ratio", self.virus_pop_ratio),
            ("virus_pass_under_ratio", self.virus_pass_under_ratio),
            ("power_up_radius", self.power_up_radius),
            ("pellet_mass", self.pellet_mass),
            ("rich_food_mass", self.rich_food_mass),
            ("golden_food_mass", self.golden_food_mass),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        let unit = [
            ("eject_fraction", self.eject_fraction),
            ("eject_velocity_retain", self.eject_velocity_retain),
            ("eat_overlap_threshold", self.eat_overlap_threshold),
            ("repulsion_strength", self.repulsion_strength),
            ("comparable_push", self.comparable_push),
            ("virus_push", self.virus_push),
            ("virus_absorb_fraction", self.virus_absorb_fraction),
            ("membrane_damping", self.membrane_damping),
            ("membrane_distortion_limit", self.membrane_distortion_limit),
            ("rich_food_chance", self.rich_food_chance),
            ("golden_food_chance", self.golden_food_chance),
            ("shrink_rate", self.shrink_rate),
        ];
        for (field, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }

        if self.max_cells == 0 || self.max_cells > MAX_CELLS_PER_ORGANISM {
            return Err(ConfigError::CellCap {
                value: self.max_cells,
                max: MAX_CELLS_PER_ORGANISM,
            });
        }

        if self.base_radius * 2.0 >= self.world_size {
            return Err(ConfigError::WorldTooSmall {
                base_radius: self.base_radius,
                world_size: self.world_size,
            });
        }

        if self.membrane_vertices < 3 {
            return Err(ConfigError::OutOfRange {
                field: "membrane_vertices",
                value: self.membrane_vertices as f32,
                min: 3.0,
                max: f32::MAX,
            });
        }

        Ok(())
    }
}
