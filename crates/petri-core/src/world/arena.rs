//! Arena - owns every entity and runs the fixed-timestep tick

use glam::Vec2;
use petri_organism::{
    AiIntent, ArenaView, DecisionEngine, Difficulty, Organism, OrganismKind, Personality,
};
use petri_simulation::math::is_finite_vec;
use petri_simulation::{
    BalanceConfig, CategoryMask, ConfigError, EntityKey, EntityRef, Food, FoodId, FoodKind,
    IndexError, MassId, MovingMass, OrganismId, PowerUp, PowerUpId, PowerUpKind, QueryResult,
    SimulationClock, SpatialIndex, Virus, VirusId,
};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use slotmap::{SecondaryMap, SlotMap};
use thiserror::Error;

use super::events::{ArenaEvent, ArenaTotals};
use super::removal::RemovalQueue;
use super::spawner::find_spawn_position;

/// Cap on fixed steps run by one [`Arena::update`] call
pub const MAX_STEPS_PER_FRAME: u32 = 4;

#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("invalid balance configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build spatial index: {0}")]
    Index(#[from] IndexError),
}

/// One row of [`Arena::leaderboard`]
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub id: OrganismId,
    pub name: String,
    pub kind: OrganismKind,
    pub mass: f32,
    pub cells: usize,
}

/// Decision state of one bot
#[derive(Debug, Clone)]
pub(super) struct BotBrain {
    pub engine: DecisionEngine,
    pub difficulty: Difficulty,
}

/// Player input queued until the organism's next update
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct PlayerIntents {
    pub aim: Option<Vec2>,
    pub split: bool,
    pub eject: bool,
}

/// The shared cell arena
pub struct Arena {
    pub(super) balance: BalanceConfig,
    pub(super) clock: SimulationClock,
    pub(super) rng: Xoshiro256StarStar,

    /// Broad phase, rebuilt at the start of every tick
    pub(super) index: SpatialIndex,

    pub(super) organisms: SlotMap<OrganismId, Organism>,
    pub(super) brains: SecondaryMap<OrganismId, BotBrain>,
    pub(super) player_intents: SecondaryMap<OrganismId, PlayerIntents>,

    pub(super) foods: SlotMap<FoodId, Food>,
    pub(super) viruses: SlotMap<VirusId, Virus>,
    pub(super) power_ups: SlotMap<PowerUpId, PowerUp>,
    pub(super) masses: SlotMap<MassId, MovingMass>,

    pub(super) removals: RemovalQueue,
    events: Vec<ArenaEvent>,
    totals: ArenaTotals,

    /// Organism that most recently ate one of this organism's cells
    pub(super) last_attacker: SecondaryMap<OrganismId, OrganismId>,
    /// (respawn time, difficulty) of dead bots awaiting replacement
    pub(super) pending_respawns: Vec<(f64, Difficulty)>,
    pub(super) bot_respawn: bool,

    /// Reused candidate buffer for the collision pass
    pub(super) scratch: Vec<EntityRef>,

    /// Simulation time accumulator
    time_accumulator: f32,
    next_bot_number: u32,
}

impl Arena {
    /// Create an empty arena. Call [`Arena::populate`] to seed food and viruses.
    pub fn new(balance: BalanceConfig, seed: u64) -> Result<Self, ArenaError> {
        balance.validate()?;
        let index = SpatialIndex::new(balance.grid_cell_size)?;

        log::info!(
            "Creating arena {}x{} (grid {}, seed {})",
            balance.world_size,
            balance.world_size,
            balance.grid_cell_size,
            seed
        );

        Ok(Self {
            balance,
            clock: SimulationClock::new(),
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            index,
            organisms: SlotMap::with_key(),
            brains: SecondaryMap::new(),
            player_intents: SecondaryMap::new(),
            foods: SlotMap::with_key(),
            viruses: SlotMap::with_key(),
            power_ups: SlotMap::with_key(),
            masses: SlotMap::with_key(),
            removals: RemovalQueue::new(),
            events: Vec::new(),
            totals: ArenaTotals::default(),
            last_attacker: SecondaryMap::new(),
            pending_respawns: Vec::new(),
            bot_respawn: true,
            scratch: Vec::new(),
            time_accumulator: 0.0,
            next_bot_number: 1,
        })
    }

    // ===== Time =====

    /// Advance by a frame of wall time, running up to [`MAX_STEPS_PER_FRAME`] ticks
    ///
    /// Returns the number of ticks run.
    pub fn update(&mut self, frame_dt: f32) -> u32 {
        if self.clock.is_paused() || !frame_dt.is_finite() || frame_dt <= 0.0 {
            return 0;
        }
        let step = self.balance.fixed_timestep;
        self.time_accumulator += frame_dt;

        // Cap simulation steps so a slow frame degrades instead of spiralling
        let mut steps = 0;
        while self.time_accumulator >= step && steps < MAX_STEPS_PER_FRAME {
            self.tick();
            self.time_accumulator -= step;
            steps += 1;
        }

        // Clamp accumulator to prevent runaway
        if self.time_accumulator > step * 2.0 {
            self.time_accumulator = step;
        }
        steps
    }

    /// Run exactly one fixed step
    pub fn tick(&mut self) {
        let dt = self.balance.fixed_timestep;

        // 1. Advance time; nothing moves while paused
        if !self.clock.advance(dt) {
            return;
        }

        // 2. Rebuild the broad phase from every live entity
        self.rebuild_index();

        // 3. Drift ejected mass
        let world_size = self.balance.world_size;
        for mass in self.masses.values_mut() {
            mass.update(dt, world_size);
        }

        // 4. Organisms in stable key order: intents, physics, collisions
        let ids: Vec<OrganismId> = self.organisms.keys().collect();
        for &id in &ids {
            self.apply_player_intents(id);
            let Some(organism) = self.organisms.get_mut(id) else {
                continue;
            };
            let merges = organism.update(dt, &self.clock, &self.balance);
            if merges > 0 {
                log::debug!("'{}' merged {} cell(s)", organism.name, merges);
                self.emit(ArenaEvent::Merged {
                    organism: id,
                    count: merges,
                });
            }
            self.resolve_collisions(id);
        }

        // 5. Bot decisions and their split / eject intents
        self.update_bots();

        // 6. Deferred removals, compaction and deaths
        self.apply_removals();

        // 7. Replenish populations and respawn bots
        self.replenish();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn resume(&mut self) {
        self.clock.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn balance(&self) -> &BalanceConfig {
        &self.balance
    }

    // ===== Organisms =====

    /// Spawn a player-controlled organism at a safe point
    pub fn spawn_player(&mut self, name: impl Into<String>) -> OrganismId {
        let name = name.into();
        let id = self.insert_organism(name, OrganismKind::Player);
        self.player_intents.insert(id, PlayerIntents::default());
        id
    }

    /// Spawn a bot with a freshly rolled personality
    pub fn spawn_bot(&mut self, difficulty: Difficulty) -> OrganismId {
        let name = format!("Bot {}", self.next_bot_number);
        self.next_bot_number += 1;
        let id = self.insert_organism(name, OrganismKind::Bot);

        let personality = Personality::generate(difficulty, &mut self.rng);
        let personality = personality
            .with_aggression(personality.aggression() * self.balance.ai_aggression_multiplier);
        let position = self
            .organisms
            .get(id)
            .map_or(self.balance.world_center(), |o| o.aggregate_position());
        let engine = DecisionEngine::new(personality, position, &mut self.rng);
        self.brains.insert(id, BotBrain { engine, difficulty });
        id
    }

    fn insert_organism(&mut self, name: String, kind: OrganismKind) -> OrganismId {
        let position = find_spawn_position(&mut self.rng, &self.organisms, &self.balance);
        let balance = &self.balance;
        let rng = &mut self.rng;
        let id = self
            .organisms
            .insert_with_key(|id| Organism::new(id, name, kind, position, balance, rng));

        if let Some(organism) = self.organisms.get(id) {
            log::info!(
                "Spawned {:?} '{}' at ({:.0}, {:.0})",
                kind,
                organism.name,
                position.x,
                position.y
            );
        }
        self.emit(ArenaEvent::Spawned { organism: id, kind });
        id
    }

    /// Queue a new aim point for a player organism
    pub fn set_aim(&mut self, id: OrganismId, point: Vec2) -> bool {
        if !is_finite_vec(point) {
            return false;
        }
        match self.player_intents.get_mut(id) {
            Some(intents) => {
                intents.aim = Some(point);
                true
            }
            None => false,
        }
    }

    /// Queue a split for a player organism's next update
    pub fn request_split(&mut self, id: OrganismId) -> bool {
        match self.player_intents.get_mut(id) {
            Some(intents) => {
                intents.split = true;
                true
            }
            None => false,
        }
    }

    /// Queue an eject for a player organism's next update
    pub fn request_eject(&mut self, id: OrganismId) -> bool {
        match self.player_intents.get_mut(id) {
            Some(intents) => {
                intents.eject = true;
                true
            }
            None => false,
        }
    }

    /// Remove every cell of an organism; it is retired during this tick's removal stage
    pub fn remove_organism(&mut self, id: OrganismId) -> bool {
        let Some(organism) = self.organisms.get(id) else {
            return false;
        };
        let slots: Vec<usize> = organism.live_cells().map(|(slot, _)| slot).collect();
        for slot in slots {
            self.removals.enqueue(EntityKey::Cell { organism: id, slot });
        }
        true
    }

    pub fn organism(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.get(id)
    }

    pub fn organism_mut(&mut self, id: OrganismId) -> Option<&mut Organism> {
        self.organisms.get_mut(id)
    }

    pub fn organisms(&self) -> impl Iterator<Item = (OrganismId, &Organism)> {
        self.organisms.iter()
    }

    pub fn organism_count(&self) -> usize {
        self.organisms.len()
    }

    /// Decision state of a bot
    pub fn brain(&self, id: OrganismId) -> Option<&DecisionEngine> {
        self.brains.get(id).map(|b| &b.engine)
    }

    /// Enable or disable automatic bot replacement
    pub fn set_bot_respawn(&mut self, enabled: bool) {
        self.bot_respawn = enabled;
        if !enabled {
            self.pending_respawns.clear();
        }
    }

    pub fn pending_respawns(&self) -> usize {
        self.pending_respawns.len()
    }

    // ===== World entities =====

    pub fn add_food(&mut self, position: Vec2, kind: FoodKind) -> FoodId {
        self.foods.insert(Food::new(position, kind, &self.balance))
    }

    pub fn add_virus(&mut self, position: Vec2) -> VirusId {
        self.viruses
            .insert(Virus::new(position, self.balance.virus_mass()))
    }

    pub fn add_power_up(&mut self, position: Vec2, kind: PowerUpKind) -> PowerUpId {
        self.power_ups
            .insert(PowerUp::new(position, kind, self.balance.power_up_radius))
    }

    pub fn add_moving_mass(&mut self, mass: MovingMass) -> MassId {
        self.masses.insert(mass)
    }

    pub fn foods(&self) -> &SlotMap<FoodId, Food> {
        &self.foods
    }

    pub fn viruses(&self) -> &SlotMap<VirusId, Virus> {
        &self.viruses
    }

    pub fn power_ups(&self) -> &SlotMap<PowerUpId, PowerUp> {
        &self.power_ups
    }

    pub fn masses(&self) -> &SlotMap<MassId, MovingMass> {
        &self.masses
    }

    // ===== Queries and removal =====

    /// Entities touching the circle, as of the last index rebuild
    pub fn query_range(&self, center: Vec2, radius: f32, categories: CategoryMask) -> QueryResult {
        self.index.query(center, radius, categories)
    }

    /// Schedule removal at the end of the current tick
    ///
    /// Returns false when the key was already queued.
    pub fn enqueue_removal(&mut self, key: EntityKey) -> bool {
        self.removals.enqueue(key)
    }

    /// Refill the spatial index from current entity state
    pub fn rebuild_index(&mut self) {
        self.index.clear();
        for (id, food) in &self.foods {
            self.index.insert(EntityRef::food(id, food));
        }
        for (id, mass) in &self.masses {
            self.index.insert(EntityRef::moving_mass(id, mass));
        }
        for (id, virus) in &self.viruses {
            self.index.insert(EntityRef::virus(id, virus));
        }
        for (id, power_up) in &self.power_ups {
            self.index.insert(EntityRef::power_up(id, power_up));
        }
        for organism in self.organisms.values() {
            for entry in organism.index_entries(&self.clock) {
                self.index.insert(entry);
            }
        }
    }

    // ===== Events and reporting =====

    pub(super) fn emit(&mut self, event: ArenaEvent) {
        self.totals.record(&event);
        self.events.push(event);
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<ArenaEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn totals(&self) -> &ArenaTotals {
        &self.totals
    }

    /// The `n` heaviest live organisms, heaviest first
    pub fn leaderboard(&self, n: usize) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .organisms
            .iter()
            .filter(|(_, o)| !o.is_dead())
            .map(|(id, o)| LeaderboardEntry {
                id,
                name: o.name.clone(),
                kind: o.kind,
                mass: o.total_mass(),
                cells: o.live_count(),
            })
            .collect();
        entries.sort_by(|a, b| b.mass.total_cmp(&a.mass).then(a.id.cmp(&b.id)));
        entries.truncate(n);
        entries
    }

    // ===== Tick stages =====

    fn apply_player_intents(&mut self, id: OrganismId) {
        let Some(intents) = self.player_intents.get_mut(id).map(std::mem::take) else {
            return;
        };
        if let (Some(aim), Some(organism)) = (intents.aim, self.organisms.get_mut(id)) {
            organism.aim = aim;
        }
        if intents.split {
            self.split_organism(id, None);
        }
        if intents.eject {
            self.eject_organism(id, None);
        }
    }

    fn update_bots(&mut self) {
        let ids: Vec<OrganismId> = self.brains.keys().collect();
        for id in ids {
            let (Some(brain), Some(organism)) =
                (self.brains.get_mut(id), self.organisms.get_mut(id))
            else {
                continue;
            };
            let intents = brain.engine.update(
                organism,
                &self.index,
                &self.clock,
                &self.balance,
                &mut self.rng,
            );

            for intent in intents {
                match intent {
                    AiIntent::Split { toward } => {
                        self.split_organism(id, Some(toward));
                    }
                    AiIntent::Eject { toward } => {
                        self.eject_organism(id, Some(toward));
                    }
                }
            }
        }
    }

    pub(super) fn split_organism(&mut self, id: OrganismId, toward: Option<Vec2>) -> usize {
        let Some(organism) = self.organisms.get_mut(id) else {
            return 0;
        };
        let pieces = organism.split(toward, &self.clock, &self.balance, &mut self.rng);
        if pieces > 0 {
            log::debug!(
                "'{}' split into {} cells",
                organism.name,
                organism.live_count()
            );
            self.emit(ArenaEvent::Split {
                organism: id,
                pieces,
            });
        }
        pieces
    }

    pub(super) fn eject_organism(&mut self, id: OrganismId, toward: Option<Vec2>) -> usize {
        let Some(organism) = self.organisms.get_mut(id) else {
            return 0;
        };
        let ejected = organism.eject_all(toward, &self.clock, &self.balance);
        let count = ejected.len();
        for mass in ejected {
            self.masses.insert(mass);
        }
        if count > 0 {
            self.emit(ArenaEvent::Ejected {
                organism: id,
                count,
            });
        }
        count
    }

    fn apply_removals(&mut self) {
        let keys: Vec<EntityKey> = self.removals.drain().collect();
        for key in keys {
            match key {
                EntityKey::Food(id) => {
                    self.foods.remove(id);
                }
                EntityKey::Mass(id) => {
                    self.masses.remove(id);
                }
                EntityKey::Virus(id) => {
                    self.viruses.remove(id);
                }
                EntityKey::PowerUp(id) => {
                    self.power_ups.remove(id);
                }
                EntityKey::Cell { organism, slot } => {
                    if let Some(organism) = self.organisms.get_mut(organism) {
                        organism.kill_cell(slot);
                    }
                }
            }
        }

        let mut dead = Vec::new();
        for (id, organism) in self.organisms.iter_mut() {
            organism.compact();
            if organism.is_dead() {
                dead.push(id);
            }
        }
        for id in dead {
            self.retire(id);
        }
    }

    /// Drop a dead organism and report it
    fn retire(&mut self, id: OrganismId) {
        let Some(organism) = self.organisms.remove(id) else {
            return;
        };
        let brain = self.brains.remove(id);
        self.player_intents.remove(id);
        let killer = self.last_attacker.remove(id);

        let killer_name = killer
            .and_then(|k| self.organisms.get(k))
            .map_or("nobody", |k| k.name.as_str());
        log::info!(
            "{:?} '{}' died (eaten by {}, peak mass {:.0})",
            organism.kind,
            organism.name,
            killer_name,
            organism.stats.peak_mass
        );

        self.emit(ArenaEvent::OrganismDied {
            organism: id,
            name: organism.name,
            kind: organism.kind,
            killer,
            stats: organism.stats,
        });

        if let Some(brain) = brain {
            self.schedule_respawn(brain.difficulty);
        }
    }
}

impl ArenaView for Arena {
    fn query_range(&self, center: Vec2, radius: f32, categories: CategoryMask) -> QueryResult {
        self.index.query(center, radius, categories)
    }

    fn locate(&self, key: EntityKey) -> Option<EntityRef> {
        self.index.locate(key)
    }
}
