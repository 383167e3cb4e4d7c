//! Collision and eat rules
//!
//! The pure helpers encode the thresholds; [`Arena::resolve_collisions`] runs
//! them for one organism against the broad-phase candidates of each of its
//! cells. Consumed world entities go through the removal queue so nothing is
//! eaten twice in one tick; eaten cells are killed immediately.

use glam::Vec2;
use petri_simulation::math::{EPSILON, normalize_or};
use petri_simulation::{BalanceConfig, CategoryMask, EntityKey, OrganismId, SimRng};

use super::arena::Arena;
use super::events::ArenaEvent;

/// Extra query radius covering movement since the index was rebuilt
const QUERY_SLACK: f32 = 32.0;
/// Membrane dent strength when two organisms shove each other
const SHOVE_POKE: f32 = 3.0;
/// Membrane dent strength when a cell is pushed off a virus
const VIRUS_POKE: f32 = 2.0;
/// Fragments produced by a virus pop
const POP_PIECES: (usize, usize) = (3, 4);

/// Overlap measurements of two circles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub distance: f32,
    /// `ra + rb - distance`
    pub depth: f32,
    /// Half the depth
    pub overlap: f32,
    /// `overlap / min(ra, rb)`
    pub percentage: f32,
}

pub fn overlap_metrics(pa: Vec2, ra: f32, pb: Vec2, rb: f32) -> Overlap {
    let distance = pa.distance(pb);
    let depth = ra + rb - distance;
    let overlap = depth * 0.5;
    let smaller = ra.min(rb);
    let percentage = if smaller > EPSILON {
        overlap / smaller
    } else {
        0.0
    };
    Overlap {
        distance,
        depth,
        overlap,
        percentage,
    }
}

/// Whether a predator cell of radius `predator` eats a prey cell of radius `prey`
pub fn can_eat(
    predator: f32,
    prey: f32,
    overlap_percentage: f32,
    prey_shielded: bool,
    balance: &BalanceConfig,
) -> bool {
    !prey_shielded
        && predator > prey * balance.eat_size_ratio
        && overlap_percentage > balance.eat_overlap_threshold
}

/// Radii close enough that neither cell can eat the other
pub fn is_comparable(ra: f32, rb: f32, balance: &BalanceConfig) -> bool {
    let (big, small) = if ra >= rb { (ra, rb) } else { (rb, ra) };
    big <= small * balance.eat_size_ratio
}

/// Outcome of a cell touching a virus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirusContact {
    /// Cell is big enough to burst
    Pop,
    /// Cell is small enough to slip beneath the virus
    PassUnder,
    /// In between: the cell is nudged away
    Push,
}

pub fn classify_virus_contact(
    cell_radius: f32,
    virus_radius: f32,
    balance: &BalanceConfig,
) -> VirusContact {
    if cell_radius > virus_radius * balance.virus_pop_ratio {
        VirusContact::Pop
    } else if cell_radius < virus_radius * balance.virus_pass_under_ratio {
        VirusContact::PassUnder
    } else {
        VirusContact::Push
    }
}

/// A cell swallows food once the food's centre is inside it
pub fn eats_food(distance: f32, cell_radius: f32) -> bool {
    distance < cell_radius
}

impl Arena {
    /// Resolve every contact of `id`'s cells against the broad-phase candidates
    pub(super) fn resolve_collisions(&mut self, id: OrganismId) {
        let Some(organism) = self.organisms.get(id) else {
            return;
        };
        let slots: Vec<usize> = organism.live_cells().map(|(slot, _)| slot).collect();
        let mut candidates = std::mem::take(&mut self.scratch);

        for slot in slots {
            let Some(cell) = self.organisms.get(id).and_then(|o| o.cell(slot)) else {
                continue;
            };
            let (center, radius) = (cell.position, cell.radius());

            candidates.clear();
            self.index.for_each_in_range(
                center,
                radius + QUERY_SLACK,
                CategoryMask::all(),
                |entity| candidates.push(*entity),
            );

            for candidate in &candidates {
                // Eaten, or popped into a smaller cell, earlier in this pass
                let still_alive = self
                    .organisms
                    .get(id)
                    .is_some_and(|o| o.cell(slot).is_some());
                if !still_alive {
                    break;
                }
                match candidate.key {
                    EntityKey::Food(_) | EntityKey::Mass(_) => {
                        self.eat_pellet(id, slot, candidate.key);
                    }
                    EntityKey::Virus(_) => self.touch_virus(id, slot, candidate.key),
                    EntityKey::PowerUp(_) => self.touch_power_up(id, slot, candidate.key),
                    EntityKey::Cell {
                        organism: other,
                        slot: other_slot,
                    } => {
                        // Each unordered pair once per tick, from the lower id
                        if id < other {
                            self.resolve_cells(id, slot, other, other_slot);
                        }
                    }
                }
            }
        }

        candidates.clear();
        self.scratch = candidates;
    }

    /// Food pellets and moving masses
    fn eat_pellet(&mut self, id: OrganismId, slot: usize, key: EntityKey) {
        if self.removals.contains(&key) {
            return;
        }
        let (position, mass, food_kind) = match key {
            EntityKey::Food(food_id) => match self.foods.get(food_id) {
                Some(food) => (food.position, food.mass, Some(food.kind)),
                None => return,
            },
            EntityKey::Mass(mass_id) => match self.masses.get(mass_id) {
                Some(m) if !m.is_protected_from(id, self.balance.eject_owner_grace) => {
                    (m.position, m.mass, None)
                }
                _ => return,
            },
            _ => return,
        };

        let Some(organism) = self.organisms.get_mut(id) else {
            return;
        };
        let Some(cell) = organism.cell(slot) else {
            return;
        };
        if !eats_food(cell.position.distance(position), cell.radius()) {
            return;
        }

        let multiplier = cell.gain_multiplier(&self.clock, &self.balance);
        let gain = mass * self.balance.growth_rate * multiplier;
        organism.grow_cell(slot, gain, &self.balance);
        organism.stats.food_eaten += 1;
        self.removals.enqueue(key);
        self.emit(ArenaEvent::FoodEaten {
            organism: id,
            food: food_kind,
            mass: gain,
        });
    }

    fn touch_virus(&mut self, id: OrganismId, slot: usize, key: EntityKey) {
        let EntityKey::Virus(virus_id) = key else {
            return;
        };
        if self.removals.contains(&key) {
            return;
        }
        let Some(virus) = self.viruses.get(virus_id) else {
            return;
        };
        let (virus_position, virus_mass, virus_radius) =
            (virus.position, virus.mass, virus.radius());

        let Some(organism) = self.organisms.get_mut(id) else {
            return;
        };
        let Some(cell) = organism.cell(slot) else {
            return;
        };
        let (position, radius) = (cell.position, cell.radius());
        let distance = position.distance(virus_position);
        if distance >= radius + virus_radius {
            return;
        }

        match classify_virus_contact(radius, virus_radius, &self.balance) {
            VirusContact::Pop => {
                // Bursts once the virus centre is inside the cell
                if distance >= radius {
                    return;
                }
                let (lo, hi) = POP_PIECES;
                let pieces = self.rng.range_usize(lo, hi);
                let created = organism.virus_pop(
                    slot,
                    virus_position,
                    virus_mass,
                    pieces,
                    &self.clock,
                    &self.balance,
                    &mut self.rng,
                );
                log::debug!(
                    "'{}' popped on a virus into {} extra cell(s)",
                    organism.name,
                    created
                );
                self.removals.enqueue(key);
                self.emit(ArenaEvent::VirusPopped {
                    organism: id,
                    pieces: created,
                });
            }
            VirusContact::PassUnder => {
                if let Some(cell) = organism.cell_mut(slot) {
                    cell.start_pass_under(self.balance.pass_under_duration);
                }
            }
            VirusContact::Push => {
                let depth = radius + virus_radius - distance;
                let away = normalize_or(position - virus_position, Vec2::X);
                if let Some(cell) = organism.cell_mut(slot) {
                    cell.position += away * depth * self.balance.virus_push;
                }
                organism.poke_cell(slot, -away, VIRUS_POKE);
            }
        }
    }

    fn touch_power_up(&mut self, id: OrganismId, slot: usize, key: EntityKey) {
        let EntityKey::PowerUp(power_up_id) = key else {
            return;
        };
        if self.removals.contains(&key) {
            return;
        }
        let Some(power_up) = self.power_ups.get(power_up_id) else {
            return;
        };
        let (position, kind, pickup_radius) = (power_up.position, power_up.kind, power_up.radius);

        let Some(organism) = self.organisms.get_mut(id) else {
            return;
        };
        let Some(cell) = organism.cell(slot) else {
            return;
        };
        if cell.position.distance(position) >= cell.radius() + pickup_radius {
            return;
        }

        organism.apply_power_up(kind, &self.clock, &self.balance);
        log::debug!("'{}' collected {:?}", organism.name, kind);
        self.removals.enqueue(key);
        self.emit(ArenaEvent::PowerUpCollected { organism: id, kind });
    }

    /// Eat or shove between cells of two different organisms
    fn resolve_cells(&mut self, a_id: OrganismId, a_slot: usize, b_id: OrganismId, b_slot: usize) {
        let Some([a, b]) = self.organisms.get_disjoint_mut([a_id, b_id]) else {
            return;
        };
        let (Some(cell_a), Some(cell_b)) = (a.cell(a_slot), b.cell(b_slot)) else {
            return;
        };
        let (ra, rb) = (cell_a.radius(), cell_b.radius());
        let metrics = overlap_metrics(cell_a.position, ra, cell_b.position, rb);
        if metrics.depth <= 0.0 {
            return;
        }

        // Orient as (predator candidate, prey candidate)
        let (predator, predator_slot, prey, prey_slot) = if ra >= rb {
            (a, a_slot, b, b_slot)
        } else {
            (b, b_slot, a, a_slot)
        };
        let predator_radius = ra.max(rb);
        let prey_radius = ra.min(rb);
        let prey_shielded = prey.is_shielded(prey_slot, &self.clock);

        if can_eat(
            predator_radius,
            prey_radius,
            metrics.percentage,
            prey_shielded,
            &self.balance,
        ) {
            let multiplier = predator
                .cell(predator_slot)
                .map_or(1.0, |c| c.gain_multiplier(&self.clock, &self.balance));
            let victim_mass = prey.kill_cell(prey_slot);
            predator.grow_cell(predator_slot, victim_mass * multiplier, &self.balance);
            predator.stats.cells_eaten += 1;

            let (predator_id, victim_id) = (predator.id, prey.id);
            log::debug!(
                "'{}' ate a cell of '{}' ({:.0} mass)",
                predator.name,
                prey.name,
                victim_mass
            );
            self.last_attacker.insert(victim_id, predator_id);
            self.emit(ArenaEvent::CellEaten {
                predator: predator_id,
                victim: victim_id,
                mass: victim_mass,
            });
            return;
        }

        if !is_comparable(ra, rb, &self.balance) {
            // Big enough to eat but not yet deep enough
            return;
        }

        let (Some(cell_a), Some(cell_b)) =
            (predator.cell_mut(predator_slot), prey.cell_mut(prey_slot))
        else {
            return;
        };
        let total = cell_a.mass() + cell_b.mass();
        if total <= 0.0 {
            return;
        }
        let direction = normalize_or(cell_b.position - cell_a.position, Vec2::X);
        let push = (metrics.depth * self.balance.comparable_push).min(prey_radius);
        let (mass_a, mass_b) = (cell_a.mass(), cell_b.mass());
        cell_a.position -= direction * push * (mass_b / total);
        cell_b.position += direction * push * (mass_a / total);

        let strength = SHOVE_POKE * metrics.percentage.min(1.0);
        cell_a.membrane.poke(direction, strength);
        cell_b.membrane.poke(-direction, strength);
    }
}
