//! Multi-cell organism physics
//!
//! An organism owns 1..=`max_cells` [`CellBody`] slots. Slots are stable for
//! the duration of a tick: eating or merging only marks a slot dead, and
//! [`Organism::compact`] drops dead slots once the arena has applied every
//! removal. The organism is dead when no live slot remains.

use std::f32::consts::TAU;

use glam::Vec2;
use petri_simulation::math::{clamp_to_world, is_finite_vec, normalize_or, safe_normalize};
use petri_simulation::{
    BalanceConfig, EntityRef, MovingMass, OrganismId, PowerUpKind, SimRng, SimulationClock,
    VelocityDecay,
};

use crate::cell::CellBody;
use crate::membrane::Membrane;
use crate::types::{CellSnapshot, OrganismKind, OrganismSnapshot, OrganismStats};

/// Membrane poke strength for a fresh split
const SPLIT_POKE: f32 = 2.0;
/// Membrane poke strength per unit of relative overlap
const COLLISION_POKE: f32 = 4.0;
/// Membrane poke strength when ejecting
const EJECT_POKE: f32 = 1.0;
/// Impulse speeds below this snap to zero
const IMPULSE_REST_SPEED: f32 = 0.5;
/// Angular jitter (radians) applied to virus-pop fragments
const POP_JITTER: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct Organism {
    pub id: OrganismId,
    pub name: String,
    pub kind: OrganismKind,
    pub color: [u8; 3],
    /// World point the cells steer toward
    pub aim: Vec2,
    pub stats: OrganismStats,
    cells: Vec<CellBody>,
    aggregate_position: Vec2,
    aggregate_radius: f32,
    total_mass: f32,
    split_cooldown_until: f64,
    eject_cooldown_until: f64,
}

impl Organism {
    /// Create an organism with a single base-radius cell at `position`
    pub fn new(
        id: OrganismId,
        name: impl Into<String>,
        kind: OrganismKind,
        position: Vec2,
        balance: &BalanceConfig,
        rng: &mut impl SimRng,
    ) -> Self {
        let color = [
            rng.range_usize(64, 255) as u8,
            rng.range_usize(64, 255) as u8,
            rng.range_usize(64, 255) as u8,
        ];
        let position = clamp_to_world(position, balance.base_radius, balance.world_size);
        let cell = CellBody::new(
            position,
            balance.base_mass(),
            Membrane::from_balance(balance, rng.angle()),
        );

        let mut organism = Self {
            id,
            name: name.into(),
            kind,
            color,
            aim: position,
            stats: OrganismStats::default(),
            cells: vec![cell],
            aggregate_position: position,
            aggregate_radius: 0.0,
            total_mass: 0.0,
            split_cooldown_until: 0.0,
            eject_cooldown_until: 0.0,
        };
        organism.recompute_aggregates();
        organism
    }

    // ===== Accessors =====

    /// All slots, including ones killed this tick
    pub fn cells(&self) -> &[CellBody] {
        &self.cells
    }

    /// Live cells with their slot index
    pub fn live_cells(&self) -> impl Iterator<Item = (usize, &CellBody)> {
        self.cells.iter().enumerate().filter(|(_, c)| c.is_alive())
    }

    pub fn cell(&self, slot: usize) -> Option<&CellBody> {
        self.cells.get(slot).filter(|c| c.is_alive())
    }

    pub fn cell_mut(&mut self, slot: usize) -> Option<&mut CellBody> {
        self.cells.get_mut(slot).filter(|c| c.is_alive())
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_alive()).count()
    }

    pub fn is_dead(&self) -> bool {
        self.live_count() == 0
    }

    /// Mass-weighted centroid of the live cells
    pub fn aggregate_position(&self) -> Vec2 {
        self.aggregate_position
    }

    /// Radius of the largest live cell
    pub fn aggregate_radius(&self) -> f32 {
        self.aggregate_radius
    }

    pub fn total_mass(&self) -> f32 {
        self.total_mass
    }

    /// Slot of the heaviest live cell
    pub fn largest_cell(&self) -> Option<usize> {
        self.live_cells()
            .max_by(|(_, a), (_, b)| a.mass().total_cmp(&b.mass()))
            .map(|(slot, _)| slot)
    }

    pub fn can_split(&self, clock: &SimulationClock) -> bool {
        clock.has_elapsed(self.split_cooldown_until)
    }

    pub fn split_cooldown_remaining(&self, clock: &SimulationClock) -> f32 {
        clock.remaining(self.split_cooldown_until)
    }

    pub fn can_eject(&self, clock: &SimulationClock) -> bool {
        clock.has_elapsed(self.eject_cooldown_until)
    }

    /// True when the cell in `slot` currently carries a shield
    pub fn is_shielded(&self, slot: usize, clock: &SimulationClock) -> bool {
        self.cell(slot)
            .is_some_and(|c| c.has_effect(PowerUpKind::Shield, clock))
    }

    /// Spatial index entries for every live cell
    pub fn index_entries<'a>(
        &'a self,
        clock: &'a SimulationClock,
    ) -> impl Iterator<Item = EntityRef> + 'a {
        self.live_cells().map(move |(slot, cell)| {
            EntityRef::cell(
                self.id,
                slot,
                cell.position,
                cell.radius(),
                cell.mass(),
                cell.has_effect(PowerUpKind::Shield, clock),
            )
        })
    }

    // ===== Growth =====

    /// Add mass to one cell, returning the amount actually gained
    pub fn grow_cell(&mut self, slot: usize, delta: f32, balance: &BalanceConfig) -> f32 {
        let gained = match self.cell_mut(slot) {
            Some(cell) => cell.grow(delta, balance.max_cell_mass),
            None => return 0.0,
        };
        self.recompute_aggregates();
        gained
    }

    /// Kill one cell (it was eaten), returning its mass
    pub fn kill_cell(&mut self, slot: usize) -> f32 {
        let mass = match self.cell_mut(slot) {
            Some(cell) => {
                let mass = cell.mass();
                cell.kill();
                mass
            }
            None => return 0.0,
        };
        self.recompute_aggregates();
        mass
    }

    /// Dent one cell's membrane
    pub fn poke_cell(&mut self, slot: usize, direction: Vec2, strength: f32) {
        if let Some(cell) = self.cell_mut(slot) {
            cell.membrane.poke(direction, strength);
        }
    }

    /// Grant a power-up effect to every live cell
    pub fn apply_power_up(
        &mut self,
        kind: PowerUpKind,
        clock: &SimulationClock,
        balance: &BalanceConfig,
    ) {
        let expires_at = clock.after(balance.power_up_duration);
        for cell in self.cells.iter_mut().filter(|c| c.is_alive()) {
            cell.add_effect(kind, expires_at);
        }
        self.stats.power_ups_collected += 1;
    }

    // ===== Split =====

    /// Split every eligible cell (largest first) toward `target`
    ///
    /// Returns the number of new cells. The split cooldown starts once, after
    /// all cells have split.
    pub fn split(
        &mut self,
        target: Option<Vec2>,
        clock: &SimulationClock,
        balance: &BalanceConfig,
        rng: &mut impl SimRng,
    ) -> usize {
        if !self.can_split(clock) {
            return 0;
        }

        let mut eligible: Vec<(usize, f32)> = self
            .live_cells()
            .filter(|(_, c)| c.radius() >= balance.min_split_radius)
            .map(|(slot, c)| (slot, c.mass()))
            .collect();
        eligible.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut created = 0;
        for (slot, _) in eligible {
            if self.live_count() >= balance.max_cells {
                break;
            }
            let direction = self.split_direction(slot, target, rng);
            self.split_unchecked(slot, direction, clock, balance);
            created += 1;
        }

        if created > 0 {
            self.split_cooldown_until = clock.after(balance.split_cooldown);
            self.stats.splits += 1;
            self.recompute_aggregates();
        }
        created
    }

    /// Split a single cell, returning the new cell's slot
    pub fn split_cell(
        &mut self,
        slot: usize,
        target: Option<Vec2>,
        clock: &SimulationClock,
        balance: &BalanceConfig,
        rng: &mut impl SimRng,
    ) -> Option<usize> {
        let cell = self.cell(slot)?;
        if !self.can_split(clock)
            || self.live_count() >= balance.max_cells
            || cell.radius() < balance.min_split_radius
        {
            return None;
        }

        let direction = self.split_direction(slot, target, rng);
        let child = self.split_unchecked(slot, direction, clock, balance);
        self.split_cooldown_until = clock.after(balance.split_cooldown);
        self.stats.splits += 1;
        self.recompute_aggregates();
        Some(child)
    }

    /// Explicit target, then the aim point, then a random direction
    fn split_direction(&self, slot: usize, target: Option<Vec2>, rng: &mut impl SimRng) -> Vec2 {
        let origin = self.cells[slot].position;
        target
            .and_then(|t| safe_normalize(t - origin))
            .or_else(|| safe_normalize(self.aim - origin))
            .unwrap_or_else(|| Vec2::from_angle(rng.angle()))
    }

    /// Halve `slot` and launch the other half along `direction`
    fn split_unchecked(
        &mut self,
        slot: usize,
        direction: Vec2,
        clock: &SimulationClock,
        balance: &BalanceConfig,
    ) -> usize {
        let merge_lock = clock.after(balance.merge_time);
        let source = &mut self.cells[slot];
        let origin = source.position;
        let half_offset = direction * source.radius() * balance.split_offset_factor * 0.5;
        let half_mass = source.mass() * 0.5;
        let inherited_velocity = source.velocity;

        source.set_mass(half_mass);
        source.position = origin - half_offset;
        source.velocity = inherited_velocity - direction * balance.split_impulse;
        source.merge_lock_until = merge_lock;
        source.membrane.poke(-direction, SPLIT_POKE);

        let phase = source.membrane.phase() + TAU * 0.5;
        let mut child = CellBody::new(
            origin + half_offset,
            half_mass,
            Membrane::from_balance(balance, phase),
        );
        child.velocity = inherited_velocity + direction * balance.split_impulse;
        child.merge_lock_until = merge_lock;
        child.inherit_effects(source);
        child.membrane.poke(direction, SPLIT_POKE);

        self.cells.push(child);
        self.cells.len() - 1
    }

    // ===== Eject =====

    /// Eject mass from one cell along `direction`
    pub fn eject(
        &mut self,
        slot: usize,
        direction: Vec2,
        clock: &SimulationClock,
        balance: &BalanceConfig,
    ) -> Option<MovingMass> {
        if !self.can_eject(clock) {
            return None;
        }
        let ejected = self.eject_unchecked(slot, direction, balance)?;
        self.eject_cooldown_until = clock.after(balance.eject_cooldown);
        self.stats.ejections += 1;
        self.recompute_aggregates();
        Some(ejected)
    }

    /// Eject from every eligible cell toward `target` (or the aim point)
    pub fn eject_all(
        &mut self,
        target: Option<Vec2>,
        clock: &SimulationClock,
        balance: &BalanceConfig,
    ) -> Vec<MovingMass> {
        if !self.can_eject(clock) {
            return Vec::new();
        }
        let target = target.unwrap_or(self.aim);
        let slots: Vec<usize> = self.live_cells().map(|(slot, _)| slot).collect();

        let ejected: Vec<MovingMass> = slots
            .into_iter()
            .filter_map(|slot| {
                let direction = target - self.cells[slot].position;
                self.eject_unchecked(slot, direction, balance)
            })
            .collect();

        if !ejected.is_empty() {
            self.eject_cooldown_until = clock.after(balance.eject_cooldown);
            self.stats.ejections += 1;
            self.recompute_aggregates();
        }
        ejected
    }

    fn eject_unchecked(
        &mut self,
        slot: usize,
        direction: Vec2,
        balance: &BalanceConfig,
    ) -> Option<MovingMass> {
        let owner = self.id;
        let cell = self.cell_mut(slot)?;
        if cell.mass() <= balance.eject_min_mass {
            return None;
        }

        let amount = (cell.mass() * balance.eject_fraction)
            .min(balance.eject_mass_cap)
            .min(cell.mass() - balance.eject_min_mass * 0.5);
        if amount <= 0.0 {
            return None;
        }

        let direction = normalize_or(direction, Vec2::X);
        cell.set_mass(cell.mass() - amount);
        cell.membrane.poke(direction, EJECT_POKE);

        Some(MovingMass {
            position: cell.position + direction * cell.radius() * balance.eject_distance,
            velocity: direction * balance.eject_speed,
            mass: amount,
            decay: VelocityDecay::Geometric {
                retain_per_second: balance.eject_velocity_retain,
            },
            owner: Some(owner),
            age: 0.0,
        })
    }

    // ===== Virus =====

    /// Absorb part of a virus and burst into up to `pieces` extra cells
    ///
    /// Mass (after absorption) is shared equally between the source and the
    /// fragments. Returns the number of fragments created.
    #[allow(clippy::too_many_arguments)]
    pub fn virus_pop(
        &mut self,
        slot: usize,
        virus_position: Vec2,
        virus_mass: f32,
        pieces: usize,
        clock: &SimulationClock,
        balance: &BalanceConfig,
        rng: &mut impl SimRng,
    ) -> usize {
        let free_slots = balance.max_cells.saturating_sub(self.live_count());
        let merge_lock = clock.after(balance.merge_time);

        let Some(cell) = self.cell_mut(slot) else {
            return 0;
        };
        cell.grow(virus_mass * balance.virus_absorb_fraction, balance.max_cell_mass);

        let pieces = pieces.min(free_slots);
        if pieces == 0 {
            self.recompute_aggregates();
            return 0;
        }

        let away = safe_normalize(cell.position - virus_position)
            .unwrap_or_else(|| Vec2::from_angle(rng.angle()));
        let base_angle = away.y.atan2(away.x);
        let share = cell.mass() / (pieces + 1) as f32;

        cell.set_mass(share);
        cell.merge_lock_until = merge_lock;
        cell.membrane.poke(-away, SPLIT_POKE);
        let origin = cell.position;
        let source_radius = cell.radius();
        let source = cell.clone();

        for i in 0..pieces {
            let angle = base_angle
                + (i as f32 + 0.5) * TAU / pieces as f32
                + rng.range_f32(-POP_JITTER, POP_JITTER);
            let direction = Vec2::from_angle(angle);
            let mut fragment = CellBody::new(
                origin + direction * source_radius,
                share,
                Membrane::from_balance(balance, rng.angle()),
            );
            fragment.velocity = direction * balance.split_impulse;
            fragment.merge_lock_until = merge_lock;
            fragment.inherit_effects(&source);
            self.cells.push(fragment);
        }

        self.stats.viruses_popped += 1;
        self.recompute_aggregates();
        pieces
    }

    // ===== Merge and intra-organism collisions =====

    /// Merge `b` into `a` when both are alive and unlocked
    pub fn merge(
        &mut self,
        a: usize,
        b: usize,
        clock: &SimulationClock,
        balance: &BalanceConfig,
    ) -> bool {
        if a == b {
            return false;
        }
        let (Some(first), Some(second)) = (self.cell(a), self.cell(b)) else {
            return false;
        };
        if !first.can_merge(clock) || !second.can_merge(clock) {
            return false;
        }

        let total = first.mass() + second.mass();
        let (position, velocity) = if total > 0.0 {
            (
                (first.position * first.mass() + second.position * second.mass()) / total,
                (first.velocity * first.mass() + second.velocity * second.mass()) / total,
            )
        } else {
            (first.position, Vec2::ZERO)
        };
        let absorbed = second.clone();

        let survivor = &mut self.cells[a];
        survivor.set_mass(total.min(balance.max_cell_mass));
        survivor.position = position;
        survivor.velocity = velocity;
        survivor.inherit_effects(&absorbed);
        self.cells[b].kill();

        self.stats.merges += 1;
        self.recompute_aggregates();
        true
    }

    /// Resolve overlaps between this organism's own cells
    ///
    /// Locked cells push apart (heavier cells move less); unlocked cells drift
    /// together and merge once within `merge_range_factor` of the larger
    /// radius. Returns the number of merges.
    pub fn handle_cell_collisions(
        &mut self,
        dt: f32,
        clock: &SimulationClock,
        balance: &BalanceConfig,
    ) -> usize {
        let mut merges = 0;
        let count = self.cells.len();

        for i in 0..count {
            for j in (i + 1)..count {
                if !self.cells[i].is_alive() || !self.cells[j].is_alive() {
                    continue;
                }

                let (left, right) = self.cells.split_at_mut(j);
                let (a, b) = (&mut left[i], &mut right[0]);
                let delta = b.position - a.position;
                let distance = delta.length();
                let (ra, rb) = (a.radius(), b.radius());
                let direction = normalize_or(delta, Vec2::X);

                if a.can_merge(clock) && b.can_merge(clock) {
                    if distance < balance.merge_range_factor * ra.max(rb) {
                        if self.merge(i, j, clock, balance) {
                            merges += 1;
                        }
                        continue;
                    }
                    // Drift together, lighter cell moving more
                    let total = a.mass() + b.mass();
                    if total > 0.0 {
                        let step = (balance.cohesion_speed * dt).min(distance * 0.5);
                        a.position += direction * step * (b.mass() / total);
                        b.position -= direction * step * (a.mass() / total);
                    }
                    continue;
                }

                let overlap = ra + rb - distance;
                if overlap <= 0.0 {
                    continue;
                }

                let total = a.mass() + b.mass();
                if total <= 0.0 {
                    continue;
                }
                let push = overlap * balance.repulsion_strength;
                a.position -= direction * push * (b.mass() / total);
                b.position += direction * push * (a.mass() / total);

                let strength = COLLISION_POKE * overlap / ra.min(rb).max(1.0);
                a.membrane.poke(direction, strength);
                b.membrane.poke(-direction, strength);
            }
        }

        merges
    }

    // ===== Per-tick physics =====

    /// Steer every cell toward the aim point and integrate impulses
    pub fn move_cells(&mut self, dt: f32, clock: &SimulationClock, balance: &BalanceConfig) {
        let aim = self.aim;
        let damping = (-balance.impulse_damping * dt).exp();

        for cell in self.cells.iter_mut().filter(|c| c.is_alive()) {
            let to_aim = aim - cell.position;
            if let Some(direction) = safe_normalize(to_aim) {
                // Slow down when the aim point is inside the cell
                let approach = (to_aim.length() / cell.radius().max(1.0)).min(1.0);
                cell.position += direction * cell.speed(clock, balance) * approach * dt;
            }

            cell.position += cell.velocity * dt;
            cell.velocity *= damping;
            if cell.velocity.length_squared() < IMPULSE_REST_SPEED * IMPULSE_REST_SPEED {
                cell.velocity = Vec2::ZERO;
            }
        }
    }

    /// Large cells slowly lose mass
    pub fn apply_decay(&mut self, dt: f32, balance: &BalanceConfig) {
        let factor = (1.0 - balance.shrink_rate * dt).clamp(0.0, 1.0);
        for cell in self.cells.iter_mut().filter(|c| c.is_alive()) {
            if cell.radius() > balance.decay_min_radius {
                cell.set_mass(cell.mass() * factor);
            }
        }
    }

    /// Keep every cell inside the arena
    pub fn clamp_to_world(&mut self, balance: &BalanceConfig) {
        for cell in self.cells.iter_mut().filter(|c| c.is_alive()) {
            cell.position = clamp_to_world(cell.position, cell.radius(), balance.world_size);
        }
    }

    /// Drop invalid cells; synthesize a default cell if all of them were invalid
    ///
    /// Returns true when anything was repaired.
    pub fn repair(&mut self, balance: &BalanceConfig) -> bool {
        let mut repaired = false;
        let had_cells = !self.is_dead();

        for (slot, cell) in self.cells.iter_mut().enumerate() {
            if !cell.is_alive() {
                continue;
            }
            if !cell.is_valid() {
                log::warn!(
                    "Dropping corrupted cell {} of organism '{}' (pos={:?}, r={})",
                    slot,
                    self.name,
                    cell.position,
                    cell.radius()
                );
                cell.kill();
                repaired = true;
            } else if !is_finite_vec(cell.velocity) {
                cell.velocity = Vec2::ZERO;
                repaired = true;
            }
        }

        if had_cells && self.is_dead() {
            log::warn!(
                "Every cell of organism '{}' was corrupted; respawning a default cell",
                self.name
            );
            let phase = self.cells.first().map_or(0.0, |c| c.membrane.phase());
            // Dead slots stay until compaction so this tick's slot keys remain valid
            self.cells.push(CellBody::new(
                balance.world_center(),
                balance.base_mass(),
                Membrane::from_balance(balance, phase),
            ));
            self.aim = balance.world_center();
        }

        if repaired {
            self.recompute_aggregates();
        }
        repaired
    }

    /// Drop dead slots. Slot indices change, so only call between ticks.
    pub fn compact(&mut self) {
        self.cells.retain(|c| c.is_alive());
        self.recompute_aggregates();
    }

    /// Advance this organism by one fixed step
    ///
    /// Returns the number of merges performed.
    pub fn update(&mut self, dt: f32, clock: &SimulationClock, balance: &BalanceConfig) -> usize {
        if self.is_dead() {
            return 0;
        }
        self.repair(balance);
        let before = self.aggregate_position;

        for cell in self.cells.iter_mut().filter(|c| c.is_alive()) {
            cell.tick_timers(dt, clock);
            cell.membrane.step(dt);
        }

        self.move_cells(dt, clock, balance);
        let merges = self.handle_cell_collisions(dt, clock, balance);
        self.apply_decay(dt, balance);
        self.clamp_to_world(balance);
        self.recompute_aggregates();

        let travelled = self.aggregate_position.distance(before);
        if travelled.is_finite() {
            self.stats.distance_traveled += travelled;
        }
        merges
    }

    /// Refresh centroid, largest radius and total mass
    pub fn recompute_aggregates(&mut self) {
        let mut total = 0.0;
        let mut weighted = Vec2::ZERO;
        let mut largest: f32 = 0.0;

        for (_, cell) in self.live_cells() {
            total += cell.mass();
            weighted += cell.position * cell.mass();
            largest = largest.max(cell.radius());
        }

        self.total_mass = total;
        self.aggregate_radius = largest;
        if total > 0.0 {
            self.aggregate_position = weighted / total;
        }
        self.stats.peak_mass = self.stats.peak_mass.max(total);
    }

    pub fn snapshot(&self) -> OrganismSnapshot {
        OrganismSnapshot {
            name: self.name.clone(),
            kind: self.kind,
            color: self.color,
            position: self.aggregate_position,
            radius: self.aggregate_radius,
            total_mass: self.total_mass,
            is_dead: self.is_dead(),
            cells: self
                .live_cells()
                .map(|(_, cell)| CellSnapshot {
                    position: cell.position,
                    radius: cell.radius(),
                    mass: cell.mass(),
                    z_layer: cell.z_layer(),
                    outline: cell.membrane.outline(cell.position, cell.radius()),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petri_simulation::math::mass_for_radius;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    use slotmap::SlotMap;

    const DT: f32 = 1.0 / 60.0;

    fn rng() -> Xoshiro256StarStar {
        Xoshiro256StarStar::seed_from_u64(42)
    }

    fn organism_with_mass(mass: f32, balance: &BalanceConfig) -> Organism {
        let mut ids: SlotMap<OrganismId, ()> = SlotMap::with_key();
        let mut organism = Organism::new(
            ids.insert(()),
            "test",
            OrganismKind::Player,
            Vec2::splat(1000.0),
            balance,
            &mut rng(),
        );
        organism.cells[0].set_mass(mass);
        organism.recompute_aggregates();
        organism
    }

    #[test]
    fn test_new_organism_has_one_base_cell() {
        let balance = BalanceConfig::default();
        let organism = organism_with_mass(balance.base_mass(), &balance);
        assert_eq!(organism.live_count(), 1);
        assert!(!organism.is_dead());
        assert!((organism.aggregate_radius() - balance.base_radius).abs() < 1e-3);
    }

    #[test]
    fn test_split_scenario() {
        let balance = BalanceConfig::default();
        let mut clock = SimulationClock::new();
        let mut organism = organism_with_mass(5000.0, &balance);
        let origin = organism.cells[0].position;

        let created = organism.split(None, &clock, &balance, &mut rng());
        assert_eq!(created, 1);
        assert_eq!(organism.live_count(), 2);

        for (_, cell) in organism.live_cells() {
            assert!((cell.mass() - 2500.0).abs() < 1e-2);
            assert!((cell.radius() - 28.209).abs() < 0.01);
            assert!(cell.velocity.length() > 0.0);
            assert!((cell.radius() - (cell.mass() / std::f32::consts::PI).sqrt()).abs() < 1e-4);
        }

        // Opposite offsets around the original centre
        let a = organism.cells[0].position - origin;
        let b = organism.cells[1].position - origin;
        assert!(a.dot(b) < 0.0);
        assert!(organism.cells[0].velocity.dot(organism.cells[1].velocity) < 0.0);

        // Second split blocked for ~10s
        clock.advance(9.9);
        assert_eq!(organism.split(None, &clock, &balance, &mut rng()), 0);
        assert!(organism.split_cooldown_remaining(&clock) > 0.0);
        clock.advance(0.2);
        assert!(organism.can_split(&clock));
    }

    #[test]
    fn test_split_direction_follows_target() {
        let balance = BalanceConfig::default();
        let clock = SimulationClock::new();
        let mut organism = organism_with_mass(5000.0, &balance);
        let origin = organism.cells[0].position;

        let child = organism
            .split_cell(0, Some(origin + Vec2::new(0.0, 100.0)), &clock, &balance, &mut rng())
            .expect("split should succeed");
        assert!(organism.cells[child].position.y > origin.y);
        assert!(organism.cells[child].velocity.y > 0.0);
    }

    #[test]
    fn test_split_requires_min_radius() {
        let balance = BalanceConfig::default();
        let clock = SimulationClock::new();
        let mut organism = organism_with_mass(balance.base_mass(), &balance);
        assert_eq!(organism.split(None, &clock, &balance, &mut rng()), 0);
        assert!(organism.split_cell(0, None, &clock, &balance, &mut rng()).is_none());
        assert!(organism.can_split(&clock));
    }

    #[test]
    fn test_cell_cap_is_never_exceeded() {
        let balance = BalanceConfig::default();
        let mut clock = SimulationClock::new();
        let mut organism = organism_with_mass(balance.max_cell_mass, &balance);
        let mut rng = rng();

        for _ in 0..50 {
            organism.split(None, &clock, &balance, &mut rng);
            assert!(organism.live_count() <= balance.max_cells);
            clock.advance(balance.split_cooldown + 0.1);
            // Keep cells locked so nothing merges back
            for cell in organism.cells.iter_mut() {
                cell.merge_lock_until = clock.after(1000.0);
            }
        }
        assert_eq!(organism.live_count(), balance.max_cells);

        // Virus pops respect the cap too
        clock.advance(balance.split_cooldown);
        let popped = organism.virus_pop(0, Vec2::ZERO, 1000.0, 4, &clock, &balance, &mut rng);
        assert_eq!(popped, 0);
        assert!(organism.live_count() <= balance.max_cells);
    }

    #[test]
    fn test_eject_removes_capped_mass() {
        let balance = BalanceConfig::default();
        let mut clock = SimulationClock::new();
        let mut organism = organism_with_mass(10_000.0, &balance);

        let ejected = organism
            .eject(0, Vec2::X, &clock, &balance)
            .expect("eject should succeed");
        assert!((ejected.mass - balance.eject_mass_cap).abs() < 1e-3);
        assert!((organism.cells[0].mass() - (10_000.0 - balance.eject_mass_cap)).abs() < 1e-2);
        assert!(ejected.velocity.x > 0.0);
        assert_eq!(ejected.owner, Some(organism.id));
        let distance = ejected.position.distance(organism.cells[0].position);
        assert!((distance - organism.cells[0].radius() * balance.eject_distance).abs() < 1e-2);

        // Cooldown blocks the next eject
        assert!(organism.eject(0, Vec2::X, &clock, &balance).is_none());
        clock.advance(balance.eject_cooldown + 0.01);
        assert!(organism.eject(0, Vec2::X, &clock, &balance).is_some());
    }

    #[test]
    fn test_eject_requires_min_mass() {
        let balance = BalanceConfig::default();
        let clock = SimulationClock::new();
        let mut organism = organism_with_mass(balance.eject_min_mass, &balance);
        assert!(organism.eject(0, Vec2::X, &clock, &balance).is_none());
        assert_eq!(organism.cells[0].mass(), balance.eject_min_mass);
    }

    #[test]
    fn test_eject_zero_direction_is_guarded() {
        let balance = BalanceConfig::default();
        let clock = SimulationClock::new();
        let mut organism = organism_with_mass(5000.0, &balance);
        let ejected = organism
            .eject(0, Vec2::ZERO, &clock, &balance)
            .expect("eject should succeed");
        assert!(is_finite_vec(ejected.position));
        assert!(is_finite_vec(ejected.velocity));
    }

    #[test]
    fn test_virus_pop_shares_mass() {
        let balance = BalanceConfig::default();
        let clock = SimulationClock::new();
        let mut organism = organism_with_mass(mass_for_radius(50.0), &balance);
        let before = organism.total_mass();
        let virus_mass = mass_for_radius(40.0);
        let virus_position = organism.cells[0].position - Vec2::new(60.0, 0.0);

        let popped = organism.virus_pop(
            0,
            virus_position,
            virus_mass,
            4,
            &clock,
            &balance,
            &mut rng(),
        );
        assert_eq!(popped, 4);
        assert_eq!(organism.live_count(), 5);
        assert!((organism.total_mass() - (before + virus_mass * 0.5)).abs() < 0.5);

        let share = organism.total_mass() / 5.0;
        for (_, cell) in organism.live_cells() {
            assert!((cell.mass() - share).abs() < 0.5);
            assert!(!cell.can_merge(&clock));
        }
    }

    #[test]
    fn test_merge_after_lock_expires() {
        let balance = BalanceConfig::default();
        let mut clock = SimulationClock::new();
        let mut organism = organism_with_mass(5000.0, &balance);
        organism.split(None, &clock, &balance, &mut rng());
        let total = organism.total_mass();

        // Still locked
        assert!(!organism.merge(0, 1, &clock, &balance));

        clock.advance(balance.merge_time + 0.01);
        organism.cells[1].position = organism.cells[0].position + Vec2::new(5.0, 0.0);
        assert!(organism.merge(0, 1, &clock, &balance));
        organism.compact();

        assert_eq!(organism.live_count(), 1);
        assert!((organism.total_mass() - total).abs() < 1e-2);
        assert!(!organism.merge(0, 0, &clock, &balance));
    }

    #[test]
    fn test_cells_rejoin_after_merge_time() {
        let balance = BalanceConfig::default();
        let mut clock = SimulationClock::new();
        let mut organism = organism_with_mass(5000.0, &balance);
        organism.aim = organism.aggregate_position();
        organism.split(None, &clock, &balance, &mut rng());
        let total = organism.total_mass();

        let mut merges = 0;
        for _ in 0..(60 * 30) {
            clock.advance(DT);
            merges += organism.update(DT, &clock, &balance);
        }
        organism.compact();

        assert_eq!(merges, 1);
        assert_eq!(organism.live_count(), 1);
        assert!((organism.total_mass() - total).abs() < 1.0);
    }

    #[test]
    fn test_locked_cells_repel() {
        let balance = BalanceConfig::default();
        let clock = SimulationClock::new();
        let mut organism = organism_with_mass(5000.0, &balance);
        organism.split(None, &clock, &balance, &mut rng());
        organism.cells[0].position = Vec2::splat(1000.0);
        organism.cells[1].position = Vec2::new(1010.0, 1000.0);
        organism.cells[0].velocity = Vec2::ZERO;
        organism.cells[1].velocity = Vec2::ZERO;

        let before = organism.cells[0].position.distance(organism.cells[1].position);
        assert_eq!(organism.handle_cell_collisions(DT, &clock, &balance), 0);
        let after = organism.cells[0].position.distance(organism.cells[1].position);
        assert!(after > before);
    }

    #[test]
    fn test_decay_only_affects_large_cells() {
        let balance = BalanceConfig::default();
        let mut small = organism_with_mass(mass_for_radius(30.0), &balance);
        let mut large = organism_with_mass(mass_for_radius(200.0), &balance);
        let (small_before, large_before) = (small.total_mass(), large.total_mass());

        small.apply_decay(1.0, &balance);
        large.apply_decay(1.0, &balance);

        assert_eq!(small.cells[0].mass(), small_before);
        assert!((large.cells[0].mass() - large_before * (1.0 - balance.shrink_rate)).abs() < 1.0);
    }

    #[test]
    fn test_clamp_to_world() {
        let balance = BalanceConfig::default();
        let mut organism = organism_with_mass(5000.0, &balance);
        organism.cells[0].position = Vec2::new(-500.0, balance.world_size + 500.0);
        organism.clamp_to_world(&balance);
        let r = organism.cells[0].radius();
        assert!((organism.cells[0].position.x - r).abs() < 1e-3);
        assert!((organism.cells[0].position.y - (balance.world_size - r)).abs() < 1e-2);
    }

    #[test]
    fn test_repair_drops_corrupted_cell() {
        let balance = BalanceConfig::default();
        let clock = SimulationClock::new();
        let mut organism = organism_with_mass(5000.0, &balance);
        organism.split(None, &clock, &balance, &mut rng());
        organism.cells[1].position = Vec2::new(f32::NAN, 0.0);

        assert!(organism.repair(&balance));
        assert_eq!(organism.live_count(), 1);
        assert!(is_finite_vec(organism.aggregate_position()));
    }

    #[test]
    fn test_repair_synthesizes_cell_when_all_corrupted() {
        let balance = BalanceConfig::default();
        let mut organism = organism_with_mass(5000.0, &balance);
        organism.cells[0].position = Vec2::new(f32::INFINITY, f32::NAN);

        assert!(organism.repair(&balance));
        assert_eq!(organism.live_count(), 1);
        let slot = organism.largest_cell().expect("a fresh cell");
        let cell = &organism.cells[slot];
        assert_eq!(cell.position, balance.world_center());
        assert!((cell.radius() - balance.base_radius).abs() < 1e-3);
        assert_eq!(cell.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_dead_after_last_cell_eaten() {
        let balance = BalanceConfig::default();
        let clock = SimulationClock::new();
        let mut organism = organism_with_mass(5000.0, &balance);
        assert_eq!(organism.kill_cell(0), 5000.0);
        assert!(organism.is_dead());
        // Repair never resurrects an eaten organism
        assert!(!organism.repair(&balance));
        assert!(organism.is_dead());
        assert_eq!(organism.update(DT, &clock, &balance), 0);
    }

    #[test]
    fn test_aggregates_are_mass_weighted() {
        let balance = BalanceConfig::default();
        let clock = SimulationClock::new();
        let mut organism = organism_with_mass(5000.0, &balance);
        organism.split(None, &clock, &balance, &mut rng());
        organism.cells[0].position = Vec2::new(100.0, 100.0);
        organism.cells[1].position = Vec2::new(300.0, 100.0);
        organism.cells[1].set_mass(7500.0);
        organism.recompute_aggregates();

        assert!((organism.aggregate_position().x - 250.0).abs() < 1e-2);
        assert!((organism.aggregate_radius() - organism.cells[1].radius()).abs() < 1e-4);
        assert!((organism.total_mass() - 10_000.0).abs() < 1e-2);
    }

    #[test]
    fn test_power_up_buffs_every_cell() {
        let balance = BalanceConfig::default();
        let clock = SimulationClock::new();
        let mut organism = organism_with_mass(5000.0, &balance);
        organism.split(None, &clock, &balance, &mut rng());
        organism.apply_power_up(PowerUpKind::Shield, &clock, &balance);

        assert!(organism.is_shielded(0, &clock));
        assert!(organism.is_shielded(1, &clock));
        assert_eq!(organism.stats.power_ups_collected, 1);
    }

    #[test]
    fn test_update_moves_toward_aim() {
        let balance = BalanceConfig::default();
        let mut clock = SimulationClock::new();
        let mut organism = organism_with_mass(balance.base_mass(), &balance);
        let start = organism.aggregate_position();
        organism.aim = start + Vec2::new(500.0, 0.0);

        for _ in 0..30 {
            clock.advance(DT);
            organism.update(DT, &clock, &balance);
        }
        assert!(organism.aggregate_position().x > start.x + 100.0);
        assert!(organism.stats.distance_traveled > 100.0);
    }

    #[test]
    fn test_snapshot_lists_live_cells() {
        let balance = BalanceConfig::default();
        let clock = SimulationClock::new();
        let mut organism = organism_with_mass(5000.0, &balance);
        organism.split(None, &clock, &balance, &mut rng());
        organism.kill_cell(1);

        let snapshot = organism.snapshot();
        assert_eq!(snapshot.cells.len(), 1);
        assert_eq!(snapshot.cells[0].outline.len(), balance.membrane_vertices);
        assert!(!snapshot.is_dead);
    }
}
