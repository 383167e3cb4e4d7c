//! Population management: pellet, virus and power-up replenishment, safe
//! organism spawn points and delayed bot respawns

use glam::Vec2;
use petri_organism::{Difficulty, Organism};
use petri_simulation::{
    BalanceConfig, Food, FoodKind, OrganismId, PowerUp, PowerUpKind, SimRng, Virus,
};
use slotmap::SlotMap;

use super::arena::Arena;

/// Candidate spawn points tried before giving up on finding a safe one
const SPAWN_ATTEMPTS: usize = 12;
/// Clearance kept between a fresh organism and existing ones (beyond their radius)
const SAFE_SPAWN_DISTANCE: f32 = 200.0;
/// Clearance kept between a fresh virus and organism cells
const VIRUS_CLEARANCE: f32 = 100.0;

/// Uniform point whose distance to every wall is at least `margin`
pub fn random_position(rng: &mut impl SimRng, margin: f32, world_size: f32) -> Vec2 {
    let margin = margin.clamp(0.0, world_size * 0.5);
    Vec2::new(
        rng.range_f32(margin, world_size - margin),
        rng.range_f32(margin, world_size - margin),
    )
}

/// Pick a food kind using the configured rarity rolls
pub fn roll_food_kind(rng: &mut impl SimRng, balance: &BalanceConfig) -> FoodKind {
    let roll = rng.next_f32();
    if roll < balance.golden_food_chance {
        FoodKind::Golden
    } else if roll < balance.golden_food_chance + balance.rich_food_chance {
        FoodKind::Rich
    } else {
        FoodKind::Pellet
    }
}

pub fn roll_power_up_kind(rng: &mut impl SimRng) -> PowerUpKind {
    let last = PowerUpKind::ALL.len() - 1;
    PowerUpKind::ALL[rng.range_usize(0, last)]
}

/// A spawn point away from existing organisms, or a random one if none is found
pub fn find_spawn_position(
    rng: &mut impl SimRng,
    organisms: &SlotMap<OrganismId, Organism>,
    balance: &BalanceConfig,
) -> Vec2 {
    let margin = balance.base_radius * 2.0;
    for _ in 0..SPAWN_ATTEMPTS {
        let candidate = random_position(rng, margin, balance.world_size);
        let clear = organisms.values().filter(|o| !o.is_dead()).all(|o| {
            o.aggregate_position().distance(candidate)
                > o.aggregate_radius() + SAFE_SPAWN_DISTANCE
        });
        if clear {
            return candidate;
        }
    }
    random_position(rng, margin, balance.world_size)
}

impl Arena {
    /// Fill every population straight up to its target
    pub fn populate(&mut self) {
        let budget = usize::MAX;
        let (food, viruses, power_ups) = self.replenish_with_budget(budget);
        log::info!(
            "Populated arena: {} food, {} viruses, {} power-ups",
            food,
            viruses,
            power_ups
        );
    }

    /// Top up populations (bounded per tick) and respawn bots whose delay elapsed
    pub(super) fn replenish(&mut self) {
        self.replenish_with_budget(self.balance.spawn_per_tick);

        let now = self.clock;
        let mut due = Vec::new();
        self.pending_respawns.retain(|&(at, difficulty)| {
            if now.has_elapsed(at) {
                due.push(difficulty);
                false
            } else {
                true
            }
        });
        for difficulty in due {
            self.spawn_bot(difficulty);
        }
    }

    fn replenish_with_budget(&mut self, budget: usize) -> (usize, usize, usize) {
        let balance = &self.balance;
        let world = balance.world_size;

        let missing_food = balance.food_target.saturating_sub(self.foods.len()).min(budget);
        for _ in 0..missing_food {
            let kind = roll_food_kind(&mut self.rng, balance);
            let food = Food::new(Vec2::ZERO, kind, balance);
            let position = random_position(&mut self.rng, food.radius(), world);
            self.foods.insert(Food { position, ..food });
        }

        let missing_viruses = balance
            .virus_target
            .saturating_sub(self.viruses.len())
            .min(budget);
        let mut spawned_viruses = 0;
        for _ in 0..missing_viruses {
            let position = random_position(&mut self.rng, balance.virus_radius, world);
            let clearance = balance.virus_radius + VIRUS_CLEARANCE;
            let blocked = self.organisms.values().any(|o| {
                o.live_cells()
                    .any(|(_, c)| c.position.distance(position) < c.radius() + clearance)
            });
            // Try again next tick rather than dropping a virus onto someone
            if !blocked {
                self.viruses.insert(Virus::new(position, balance.virus_mass()));
                spawned_viruses += 1;
            }
        }

        let missing_power_ups = balance
            .power_up_target
            .saturating_sub(self.power_ups.len())
            .min(budget);
        for _ in 0..missing_power_ups {
            let kind = roll_power_up_kind(&mut self.rng);
            let position = random_position(&mut self.rng, balance.power_up_radius, world);
            self.power_ups
                .insert(PowerUp::new(position, kind, balance.power_up_radius));
        }

        (missing_food, spawned_viruses, missing_power_ups)
    }

    /// Queue a replacement bot after the configured delay
    pub(super) fn schedule_respawn(&mut self, difficulty: Difficulty) {
        if self.bot_respawn {
            let at = self.clock.after(self.balance.bot_respawn_delay);
            self.pending_respawns.push((at, difficulty));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petri_organism::OrganismKind;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn test_random_position_respects_margin() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        for _ in 0..1000 {
            let p = random_position(&mut rng, 50.0, 1000.0);
            assert!((50.0..=950.0).contains(&p.x));
            assert!((50.0..=950.0).contains(&p.y));
        }
        // Oversized margin collapses to the centre
        let p = random_position(&mut rng, 5000.0, 1000.0);
        assert_eq!(p, Vec2::splat(500.0));
    }

    #[test]
    fn test_food_rarity_rolls() {
        let balance = BalanceConfig::default();
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);
        let mut counts = [0usize; 3];
        for _ in 0..20_000 {
            match roll_food_kind(&mut rng, &balance) {
                FoodKind::Pellet => counts[0] += 1,
                FoodKind::Rich => counts[1] += 1,
                FoodKind::Golden => counts[2] += 1,
            }
        }
        assert!(counts[0] > counts[1]);
        assert!(counts[1] > counts[2]);
        assert!(counts[2] > 0);
    }

    #[test]
    fn test_no_rarity_means_only_pellets() {
        let balance = BalanceConfig {
            rich_food_chance: 0.0,
            golden_food_chance: 0.0,
            ..Default::default()
        };
        let mut rng = Xoshiro256StarStar::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(roll_food_kind(&mut rng, &balance), FoodKind::Pellet);
        }
    }

    #[test]
    fn test_spawn_position_avoids_organisms() {
        let balance = BalanceConfig {
            world_size: 2000.0,
            ..Default::default()
        };
        let mut rng = Xoshiro256StarStar::seed_from_u64(4);
        let mut organisms: SlotMap<OrganismId, Organism> = SlotMap::with_key();
        organisms.insert_with_key(|id| {
            Organism::new(
                id,
                "giant",
                OrganismKind::Bot,
                Vec2::splat(1000.0),
                &balance,
                &mut Xoshiro256StarStar::seed_from_u64(5),
            )
        });

        for _ in 0..50 {
            let p = find_spawn_position(&mut rng, &organisms, &balance);
            assert!(p.distance(Vec2::splat(1000.0)) > SAFE_SPAWN_DISTANCE);
        }
    }
}
