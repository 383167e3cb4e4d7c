//! Passive world entities: food, viruses, power-ups and ejected mass
//!
//! These carry data only; the arena's own update loop moves and removes them.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::balance::BalanceConfig;
use crate::keys::OrganismId;
use crate::math::{clamp_to_world, radius_for_mass};

/// Food variants, ordered by value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FoodKind {
    Pellet,
    Rich,
    Golden,
}

impl FoodKind {
    /// Mass granted (before growth rate) by this kind
    pub fn mass(&self, balance: &BalanceConfig) -> f32 {
        match self {
            Self::Pellet => balance.pellet_mass,
            Self::Rich => balance.rich_food_mass,
            Self::Golden => balance.golden_food_mass,
        }
    }

    /// True for the most valuable kind
    pub fn is_highest_value(&self) -> bool {
        matches!(self, Self::Golden)
    }
}

/// A static food pellet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub position: Vec2,
    pub kind: FoodKind,
    pub mass: f32,
}

impl Food {
    pub fn new(position: Vec2, kind: FoodKind, balance: &BalanceConfig) -> Self {
        Self {
            position,
            kind,
            mass: kind.mass(balance),
        }
    }

    pub fn radius(&self) -> f32 {
        radius_for_mass(self.mass)
    }
}

/// A spiked obstacle that pops cells that are too large
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Virus {
    pub position: Vec2,
    pub mass: f32,
}

impl Virus {
    pub fn new(position: Vec2, mass: f32) -> Self {
        Self { position, mass }
    }

    pub fn radius(&self) -> f32 {
        radius_for_mass(self.mass)
    }
}

/// Time-limited buffs granted by power-ups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Faster movement
    Speed,
    /// Cells cannot be eaten
    Shield,
    /// More mass gained from eating
    MassMultiplier,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [Self::Speed, Self::Shield, Self::MassMultiplier];

    /// Relative desirability used by the AI utility score
    pub fn value(&self) -> f32 {
        match self {
            Self::Speed => 0.8,
            Self::Shield => 1.2,
            Self::MassMultiplier => 1.0,
        }
    }
}

/// A collectible power-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub position: Vec2,
    pub kind: PowerUpKind,
    pub radius: f32,
}

impl PowerUp {
    pub fn new(position: Vec2, kind: PowerUpKind, radius: f32) -> Self {
        Self {
            position,
            kind,
            radius,
        }
    }
}

/// How a moving mass loses speed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VelocityDecay {
    /// Keep this fraction of velocity per second (`v *= retain^dt`)
    Geometric { retain_per_second: f32 },
    /// Never slows down
    None,
}

impl VelocityDecay {
    /// Velocity after `dt` seconds of decay
    pub fn apply(&self, velocity: Vec2, dt: f32) -> Vec2 {
        match self {
            Self::Geometric { retain_per_second } => {
                velocity * retain_per_second.clamp(0.0, 1.0).powf(dt)
            }
            Self::None => velocity,
        }
    }
}

/// Speeds below this snap to zero
const SETTLE_SPEED: f32 = 1.0;

/// Mass ejected by an organism, drifting until it settles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingMass {
    pub position: Vec2,
    pub velocity: Vec2,
    pub mass: f32,
    pub decay: VelocityDecay,
    /// Organism that ejected this mass
    pub owner: Option<OrganismId>,
    /// Seconds since spawn
    pub age: f32,
}

impl MovingMass {
    pub fn radius(&self) -> f32 {
        radius_for_mass(self.mass)
    }

    /// Integrate position and decay velocity, keeping the mass inside the arena
    pub fn update(&mut self, dt: f32, world_size: f32) {
        self.age += dt;
        self.position += self.velocity * dt;
        self.velocity = self.decay.apply(self.velocity, dt);
        if self.velocity.length_squared() < SETTLE_SPEED * SETTLE_SPEED {
            self.velocity = Vec2::ZERO;
        }
        let clamped = clamp_to_world(self.position, self.radius(), world_size);
        if clamped != self.position {
            self.position = clamped;
            self.velocity = Vec2::ZERO;
        }
    }

    /// True while the ejecting organism may not re-absorb this mass
    pub fn is_protected_from(&self, organism: OrganismId, grace: f32) -> bool {
        self.owner == Some(organism) && self.age < grace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_food_kind_values_are_ordered() {
        let balance = BalanceConfig::default();
        assert!(FoodKind::Pellet.mass(&balance) < FoodKind::Rich.mass(&balance));
        assert!(FoodKind::Rich.mass(&balance) < FoodKind::Golden.mass(&balance));
        assert!(FoodKind::Golden.is_highest_value());
        assert!(!FoodKind::Rich.is_highest_value());
    }

    #[test]
    fn test_geometric_decay_reaches_rest_within_a_second() {
        let mut mass = MovingMass {
            position: Vec2::new(500.0, 500.0),
            velocity: Vec2::new(600.0, 0.0),
            mass: 100.0,
            decay: VelocityDecay::Geometric {
                retain_per_second: 0.005,
            },
            owner: None,
            age: 0.0,
        };
        let mut previous_speed = mass.velocity.length();
        for _ in 0..60 {
            mass.update(1.0 / 60.0, 6000.0);
            let speed = mass.velocity.length();
            assert!(speed <= previous_speed);
            previous_speed = speed;
        }
        assert!(previous_speed < 5.0, "speed after 1s: {previous_speed}");
        assert!(mass.position.x > 500.0);
    }

    #[test]
    fn test_owned_mass_survives_ron() {
        let mut organisms: SlotMap<OrganismId, ()> = SlotMap::with_key();
        let owner = organisms.insert(());
        let mass = MovingMass {
            position: Vec2::new(10.0, 20.0),
            velocity: Vec2::new(300.0, 0.0),
            mass: 160.0,
            decay: VelocityDecay::None,
            owner: Some(owner),
            age: 0.25,
        };

        let text = ron::ser::to_string(&mass).unwrap();
        let restored: MovingMass = ron::de::from_str(&text).unwrap();
        assert_eq!(restored, mass);
        assert_eq!(restored.owner, Some(owner));
    }

    #[test]
    fn test_no_decay_keeps_speed() {
        let v = VelocityDecay::None.apply(Vec2::new(3.0, 4.0), 1.0);
        assert_eq!(v, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_moving_mass_stops_at_wall() {
        let mut mass = MovingMass {
            position: Vec2::new(995.0, 500.0),
            velocity: Vec2::new(600.0, 0.0),
            mass: 100.0,
            decay: VelocityDecay::None,
            owner: None,
            age: 0.0,
        };
        mass.update(0.1, 1000.0);
        assert!(mass.position.x <= 1000.0 - mass.radius() + 1e-3);
        assert_eq!(mass.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_owner_grace() {
        let mut ids: SlotMap<OrganismId, ()> = SlotMap::with_key();
        let owner = ids.insert(());
        let other = ids.insert(());
        let mut mass = MovingMass {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            mass: 50.0,
            decay: VelocityDecay::None,
            owner: Some(owner),
            age: 0.1,
        };
        assert!(mass.is_protected_from(owner, 0.5));
        assert!(!mass.is_protected_from(other, 0.5));
        mass.age = 0.6;
        assert!(!mass.is_protected_from(owner, 0.5));
    }
}
