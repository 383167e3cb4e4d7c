//! Utility-scored bot decision making
//!
//! Two cadences drive a bot:
//! - Minor tick (every frame): blend the heading toward the current goal,
//!   add a little personality-scaled jitter and write the aim point.
//! - Major tick (every 0.5–1.5s, randomized): look around, score every
//!   candidate and pick one of [`Behavior::Wander`], [`Behavior::Chase`] or
//!   [`Behavior::Flee`].
//!
//! Scoring: each candidate gets `falloff(distance) × value × trait weight`.
//! The best candidate is the opportunity; everything bigger than us (plus
//! poppable viruses and nearby walls) adds up to the threat. We flee when
//! `threat > opportunity × caution`.

use std::collections::VecDeque;

use glam::Vec2;
use petri_simulation::math::{clamp_to_world, normalize_or, safe_normalize};
use petri_simulation::{
    BalanceConfig, Category, CategoryMask, EntityKey, EntityKind, EntityRef, SimRng,
    SimulationClock,
};
use smallvec::SmallVec;

use crate::organism::Organism;
use crate::personality::Personality;
use crate::traits::ArenaView;

/// Scan radius is `SCAN_BASE + radius × SCAN_PER_RADIUS`
const SCAN_BASE: f32 = 300.0;
const SCAN_PER_RADIUS: f32 = 6.0;
/// Distance at which utility has halved
const FALLOFF_DISTANCE: f32 = 200.0;

const FOOD_WEIGHT: f32 = 0.3;
const POWER_UP_WEIGHT: f32 = 1.5;
const PREY_WEIGHT: f32 = 4.0;
const THREAT_WEIGHT: f32 = 1.0;
const VIRUS_THREAT_WEIGHT: f32 = 0.8;
const EDGE_THREAT_WEIGHT: f32 = 0.6;

/// Walls closer than `EDGE_MARGIN + radius` count as threats
const EDGE_MARGIN: f32 = 150.0;
/// Stop scanning food once a golden pellet this close (plus our radius) is found
const GOLDEN_EARLY_EXIT: f32 = 150.0;
/// Split at prey within this many of our radii
const SPLIT_ATTACK_RANGE: f32 = 4.0;
const SPLIT_ATTACK_MASS_RATIO: f32 = 2.0;

const DECISION_INTERVAL: (f32, f32) = (0.5, 1.5);
const ADJUST_INTERVAL: (f32, f32) = (2.0, 5.0);
/// Half-width (radians) of the periodic heading adjustment
const WIDE_JITTER: f32 = 0.6;
/// Aim point distance ahead of the organism, on top of its radius
const LOOKAHEAD: f32 = 200.0;

const WANDER_DISTANCE: (f32, f32) = (300.0, 700.0);
const WANDER_TURN: f32 = 0.8;
const WANDER_ARRIVAL: f32 = 20.0;

const STUCK_WINDOW: f32 = 3.0;
const STUCK_SAMPLE_INTERVAL: f32 = 0.5;
const STUCK_THRESHOLD: f32 = 10.0;

/// Current goal of a bot. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    /// Drift toward a destination inside the arena
    Wander { destination: Vec2 },
    /// Pursue an entity, remembering where it was last seen
    Chase { target: EntityKey, last_seen: Vec2 },
    /// Run away from a point, tracking the threat entity if there is one
    Flee { from: Vec2, threat: Option<EntityKey> },
}

impl Behavior {
    pub fn name(&self) -> &'static str {
        match self {
            Behavior::Wander { .. } => "wander",
            Behavior::Chase { .. } => "chase",
            Behavior::Flee { .. } => "flee",
        }
    }

    pub fn is_chasing(&self) -> bool {
        matches!(self, Behavior::Chase { .. })
    }

    pub fn is_fleeing(&self) -> bool {
        matches!(self, Behavior::Flee { .. })
    }
}

/// Actions a bot asks the arena to perform this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AiIntent {
    Split { toward: Vec2 },
    Eject { toward: Vec2 },
}

/// Result of one look-around
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Evaluation {
    /// Utility of the best candidate (0 without one)
    pub opportunity: f32,
    /// Accumulated threat score
    pub threat: f32,
    pub best: Option<EntityRef>,
    pub nearest_threat: Option<EntityRef>,
    /// Closest wall point when near an edge
    pub edge_point: Option<Vec2>,
    nearest_threat_distance: Option<f32>,
}

impl Evaluation {
    fn consider(&mut self, entity: &EntityRef, utility: f32) {
        if utility.is_finite() && utility > self.opportunity {
            self.opportunity = utility;
            self.best = Some(*entity);
        }
    }

    fn add_threat(&mut self, entity: &EntityRef, distance: f32, score: f32) {
        if !score.is_finite() {
            return;
        }
        self.threat += score;
        if self.nearest_threat_distance.map_or(true, |d| distance < d) {
            self.nearest_threat_distance = Some(distance);
            self.nearest_threat = Some(*entity);
        }
    }
}

fn falloff(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0) / FALLOFF_DISTANCE)
}

/// Per-bot decision state
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    personality: Personality,
    behavior: Behavior,
    heading: Vec2,
    next_decision_at: f64,
    next_adjust_at: f64,
    last_sample_at: f64,
    samples: VecDeque<(f64, Vec2)>,
}

impl DecisionEngine {
    pub fn new(personality: Personality, position: Vec2, rng: &mut impl SimRng) -> Self {
        Self {
            personality,
            behavior: Behavior::Wander {
                destination: position,
            },
            heading: Vec2::from_angle(rng.angle()),
            next_decision_at: 0.0,
            next_adjust_at: 0.0,
            last_sample_at: f64::NEG_INFINITY,
            samples: VecDeque::new(),
        }
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn personality(&self) -> &Personality {
        &self.personality
    }

    pub fn heading(&self) -> Vec2 {
        self.heading
    }

    /// Simulation time of the next major tick
    pub fn next_decision_at(&self) -> f64 {
        self.next_decision_at
    }

    /// Run one frame of AI for `organism`, updating its aim point
    pub fn update(
        &mut self,
        organism: &mut Organism,
        view: &impl ArenaView,
        clock: &SimulationClock,
        balance: &BalanceConfig,
        rng: &mut impl SimRng,
    ) -> SmallVec<[AiIntent; 2]> {
        let mut intents = SmallVec::new();
        if organism.is_dead() {
            return intents;
        }

        if clock.has_elapsed(self.next_decision_at) {
            let evaluation = self.evaluate(organism, view, balance);
            self.decide(organism, &evaluation, clock, balance, rng, &mut intents);
            // Slower personalities lean toward the top of the window, never past it
            let (lo, hi) = DECISION_INTERVAL;
            let reaction = self.personality.reaction_scale();
            let interval = (rng.range_f32(lo, hi) * reaction).clamp(lo, hi);
            self.next_decision_at = clock.after(interval);
        }

        self.check_stuck(organism, clock, balance, rng, &mut intents);
        self.steer(organism, view, clock, rng);
        intents
    }

    /// Score everything around `organism` without changing any state
    pub fn evaluate(
        &self,
        organism: &Organism,
        view: &impl ArenaView,
        balance: &BalanceConfig,
    ) -> Evaluation {
        let mut evaluation = Evaluation::default();
        let me = organism.aggregate_position();
        let radius = organism.aggregate_radius();
        if radius <= 0.0 {
            return evaluation;
        }
        let largest_mass = organism
            .largest_cell()
            .and_then(|slot| organism.cell(slot))
            .map_or(0.0, |c| c.mass());
        let traits = &self.personality;
        let scan = SCAN_BASE + radius * SCAN_PER_RADIUS;
        let nearby = view.query_range(me, scan, CategoryMask::all());

        // Food and ejected mass
        let early_exit = GOLDEN_EARLY_EXIT + radius;
        for food in &nearby.food {
            let distance = food.position.distance(me);
            let value = food.mass / balance.pellet_mass;
            evaluation.consider(food, falloff(distance) * value * traits.greed() * FOOD_WEIGHT);

            if matches!(food.kind, EntityKind::Food(kind) if kind.is_highest_value())
                && distance < early_exit
            {
                break;
            }
        }

        for power_up in &nearby.power_ups {
            if let EntityKind::PowerUp(kind) = power_up.kind {
                let distance = power_up.position.distance(me);
                let attraction = traits.power_up_attraction() * POWER_UP_WEIGHT;
                evaluation.consider(power_up, falloff(distance) * kind.value() * attraction);
            }
        }

        // Viruses only matter when they would pop us
        if organism.live_count() < balance.max_cells {
            for virus in &nearby.viruses {
                if radius > virus.radius * balance.virus_pop_ratio {
                    let distance = virus.position.distance(me);
                    let score = falloff(distance) * traits.virus_avoidance() * VIRUS_THREAT_WEIGHT;
                    evaluation.add_threat(virus, distance, score);
                }
            }
        }

        for cell in &nearby.organism_cells {
            if cell.owner() == Some(organism.id) {
                continue;
            }
            let distance = cell.position.distance(me);

            if cell.radius > radius {
                let score = falloff(distance) * (cell.radius / radius) * THREAT_WEIGHT;
                evaluation.add_threat(cell, distance, score);
            } else if radius > cell.radius * balance.eat_size_ratio
                && !matches!(cell.kind, EntityKind::Cell { shielded: true })
                && largest_mass > 0.0
            {
                let utility = falloff(distance)
                    * (cell.mass / largest_mass)
                    * traits.aggression()
                    * balance.ai_aggression_multiplier
                    * PREY_WEIGHT;
                evaluation.consider(cell, utility);
            }
        }

        // Walls
        let margin = EDGE_MARGIN + radius;
        let world = balance.world_size;
        let walls = [
            (me.x, Vec2::new(0.0, me.y)),
            (world - me.x, Vec2::new(world, me.y)),
            (me.y, Vec2::new(me.x, 0.0)),
            (world - me.y, Vec2::new(me.x, world)),
        ];
        let mut closest_wall = f32::INFINITY;
        for (distance, point) in walls {
            if distance < margin {
                evaluation.threat += (1.0 - distance.max(0.0) / margin) * EDGE_THREAT_WEIGHT;
                if distance < closest_wall {
                    closest_wall = distance;
                    evaluation.edge_point = Some(point);
                }
            }
        }

        evaluation
    }

    fn decide(
        &mut self,
        organism: &Organism,
        evaluation: &Evaluation,
        clock: &SimulationClock,
        balance: &BalanceConfig,
        rng: &mut impl SimRng,
        intents: &mut SmallVec<[AiIntent; 2]>,
    ) {
        let me = organism.aggregate_position();
        let radius = organism.aggregate_radius();

        if evaluation.threat > 0.0
            && evaluation.threat > evaluation.opportunity * self.personality.caution()
        {
            let from = evaluation
                .nearest_threat
                .map(|t| t.position)
                .or(evaluation.edge_point);
            if let Some(from) = from {
                self.behavior = Behavior::Flee {
                    from,
                    threat: evaluation.nearest_threat.map(|t| t.key),
                };
                return;
            }
        }

        if let Some(best) = evaluation.best {
            self.behavior = Behavior::Chase {
                target: best.key,
                last_seen: best.position,
            };
            if best.category() == Category::OrganismCell
                && self.wants_split_attack(organism, &best, clock, balance, rng)
            {
                intents.push(AiIntent::Split {
                    toward: best.position,
                });
            }
            return;
        }

        // Keep heading for the current destination until it is reached
        if let Behavior::Wander { destination } = self.behavior {
            if destination.distance(me) > radius + WANDER_ARRIVAL {
                return;
            }
        }
        let turn = Vec2::from_angle(rng.range_f32(-WANDER_TURN, WANDER_TURN));
        let (lo, hi) = WANDER_DISTANCE;
        let destination = clamp_to_world(
            me + turn.rotate(self.heading) * rng.range_f32(lo, hi),
            radius + EDGE_MARGIN,
            balance.world_size,
        );
        self.behavior = Behavior::Wander { destination };
    }

    /// Our largest cell must carry at least twice the prey's mass, and be close
    fn wants_split_attack(
        &self,
        organism: &Organism,
        prey: &EntityRef,
        clock: &SimulationClock,
        balance: &BalanceConfig,
        rng: &mut impl SimRng,
    ) -> bool {
        let Some(largest) = organism.largest_cell().and_then(|slot| organism.cell(slot)) else {
            return false;
        };
        let distance = largest.position.distance(prey.position);

        largest.mass() >= prey.mass * SPLIT_ATTACK_MASS_RATIO
            && distance < largest.radius() * SPLIT_ATTACK_RANGE + prey.radius
            && largest.radius() >= balance.min_split_radius
            && organism.live_count() < balance.max_cells
            && organism.can_split(clock)
            && rng.chance(self.personality.split_happiness())
    }

    /// Minor tick: blend the heading toward the goal and write the aim point
    fn steer(
        &mut self,
        organism: &mut Organism,
        view: &impl ArenaView,
        clock: &SimulationClock,
        rng: &mut impl SimRng,
    ) {
        let me = organism.aggregate_position();
        let radius = organism.aggregate_radius();

        let desired = match self.behavior {
            Behavior::Chase { target, .. } => match view.locate(target) {
                Some(entity) => {
                    self.behavior = Behavior::Chase {
                        target,
                        last_seen: entity.position,
                    };
                    Some(entity.position - me)
                }
                None => {
                    // Target eaten or gone; re-target on the next major tick
                    self.behavior = Behavior::Wander { destination: me };
                    None
                }
            },
            Behavior::Flee { from, threat } => {
                let from = threat
                    .and_then(|key| view.locate(key))
                    .map_or(from, |entity| entity.position);
                self.behavior = Behavior::Flee { from, threat };
                Some(me - from)
            }
            Behavior::Wander { destination } => Some(destination - me),
        };

        let style = self.personality.movement_style();
        if let Some(desired) = desired.and_then(safe_normalize) {
            let inertia = style.inertia();
            let blended = self.heading * inertia + desired * (1.0 - inertia);
            self.heading = normalize_or(blended, desired);
        }

        let jitter = rng.range_f32(-1.0, 1.0) * style.jitter();
        self.heading = Vec2::from_angle(jitter).rotate(self.heading);

        if clock.has_elapsed(self.next_adjust_at) {
            let adjust = rng.range_f32(-WIDE_JITTER, WIDE_JITTER);
            self.heading = Vec2::from_angle(adjust).rotate(self.heading);
            let (lo, hi) = ADJUST_INTERVAL;
            self.next_adjust_at = clock.after(rng.range_f32(lo, hi));
        }

        self.heading = normalize_or(self.heading, Vec2::X);
        organism.aim = me + self.heading * (LOOKAHEAD + radius);
    }

    /// Detect a stalled bot and shake it loose
    fn check_stuck(
        &mut self,
        organism: &Organism,
        clock: &SimulationClock,
        balance: &BalanceConfig,
        rng: &mut impl SimRng,
        intents: &mut SmallVec<[AiIntent; 2]>,
    ) {
        let now = clock.now();
        if now - self.last_sample_at < STUCK_SAMPLE_INTERVAL as f64 {
            return;
        }
        self.last_sample_at = now;

        let me = organism.aggregate_position();
        self.samples.push_back((now, me));
        while let Some(&(t, _)) = self.samples.front() {
            if now - t > STUCK_WINDOW as f64 {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        let Some(&(oldest, _)) = self.samples.front() else {
            return;
        };
        if now - oldest < (STUCK_WINDOW - STUCK_SAMPLE_INTERVAL) as f64 {
            return;
        }
        let displacement = self
            .samples
            .iter()
            .map(|(_, p)| p.distance(me))
            .fold(0.0, f32::max);
        if displacement >= STUCK_THRESHOLD {
            return;
        }

        log::debug!(
            "Bot '{}' stuck near ({:.0}, {:.0}); picking a new heading",
            organism.name,
            me.x,
            me.y
        );
        self.samples.clear();
        self.heading = Vec2::from_angle(rng.angle());

        let radius = organism.aggregate_radius();
        let destination = clamp_to_world(
            me + self.heading * WANDER_DISTANCE.1,
            radius + EDGE_MARGIN,
            balance.world_size,
        );
        self.behavior = Behavior::Wander { destination };

        // A single big cell can shed mass or split to break free
        if organism.live_count() == 1 && radius >= balance.min_split_radius {
            let toward = me + self.heading * (radius + LOOKAHEAD);
            if rng.chance(self.personality.eject_happiness()) {
                intents.push(AiIntent::Eject { toward });
            }
            if organism.can_split(clock) && rng.chance(self.personality.split_happiness()) {
                intents.push(AiIntent::Split { toward });
            }
        }
    }
}
