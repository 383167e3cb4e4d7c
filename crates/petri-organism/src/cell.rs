//! A single circular cell of an organism

use glam::Vec2;
use petri_simulation::math::{EPSILON, is_finite_vec, radius_for_mass};
use petri_simulation::{BalanceConfig, PowerUpKind, SimulationClock};
use smallvec::SmallVec;

use crate::membrane::Membrane;

/// A power-up effect with an absolute expiry time on the simulation clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveEffect {
    pub kind: PowerUpKind,
    pub expires_at: f64,
}

/// Circular body belonging to an organism
///
/// Mass and radius are kept in lockstep (`mass = π·r²`); only mass is ever
/// written, radius is derived.
#[derive(Debug, Clone)]
pub struct CellBody {
    pub position: Vec2,
    /// Impulse velocity from splits and pops, damped every tick
    pub velocity: Vec2,
    pub membrane: Membrane,
    /// Simulation time before which this cell may not merge
    pub merge_lock_until: f64,
    mass: f32,
    radius: f32,
    pass_under_timer: f32,
    effects: SmallVec<[ActiveEffect; 2]>,
    alive: bool,
}

impl CellBody {
    pub fn new(position: Vec2, mass: f32, membrane: Membrane) -> Self {
        let mut cell = Self {
            position,
            velocity: Vec2::ZERO,
            membrane,
            merge_lock_until: 0.0,
            mass: 0.0,
            radius: 0.0,
            pass_under_timer: 0.0,
            effects: SmallVec::new(),
            alive: true,
        };
        cell.set_mass(mass);
        cell
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Set mass and derive the radius from it
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass.max(0.0);
        self.radius = radius_for_mass(self.mass);
    }

    /// Add mass up to `max_mass`, returning what was actually gained
    pub fn grow(&mut self, delta: f32, max_mass: f32) -> f32 {
        if !delta.is_finite() {
            return 0.0;
        }
        let before = self.mass;
        self.set_mass((self.mass + delta).min(max_mass));
        self.mass - before
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Mark the slot dead; it is dropped on the next compaction
    pub fn kill(&mut self) {
        self.alive = false;
        self.mass = 0.0;
        self.radius = 0.0;
        self.velocity = Vec2::ZERO;
    }

    /// Finite position, mass and radius, with a positive radius
    pub fn is_valid(&self) -> bool {
        is_finite_vec(self.position)
            && self.mass.is_finite()
            && self.radius.is_finite()
            && self.radius > EPSILON
    }

    pub fn can_merge(&self, clock: &SimulationClock) -> bool {
        clock.has_elapsed(self.merge_lock_until)
    }

    /// Layer used for rendering order; negative while under a virus
    pub fn z_layer(&self) -> i8 {
        if self.pass_under_timer > 0.0 { -1 } else { 0 }
    }

    pub fn is_passing_under(&self) -> bool {
        self.pass_under_timer > 0.0
    }

    pub fn start_pass_under(&mut self, duration: f32) {
        self.pass_under_timer = self.pass_under_timer.max(duration);
    }

    /// Count down per-cell timers
    pub fn tick_timers(&mut self, dt: f32, clock: &SimulationClock) {
        if self.pass_under_timer > 0.0 {
            self.pass_under_timer = (self.pass_under_timer - dt).max(0.0);
        }
        self.effects.retain(|e| !clock.has_elapsed(e.expires_at));
    }

    /// Grant an effect, extending it when already active
    pub fn add_effect(&mut self, kind: PowerUpKind, expires_at: f64) {
        match self.effects.iter_mut().find(|e| e.kind == kind) {
            Some(effect) => effect.expires_at = effect.expires_at.max(expires_at),
            None => self.effects.push(ActiveEffect { kind, expires_at }),
        }
    }

    pub fn has_effect(&self, kind: PowerUpKind, clock: &SimulationClock) -> bool {
        self.effects
            .iter()
            .any(|e| e.kind == kind && !clock.has_elapsed(e.expires_at))
    }

    pub fn effects(&self) -> &[ActiveEffect] {
        &self.effects
    }

    /// Multiplier applied to mass gained from eating
    pub fn gain_multiplier(&self, clock: &SimulationClock, balance: &BalanceConfig) -> f32 {
        if self.has_effect(PowerUpKind::MassMultiplier, clock) {
            balance.mass_gain_multiplier
        } else {
            1.0
        }
    }

    /// Steering speed: larger cells move slower
    ///
    /// ```text
    /// speed = max(base_speed * (base_radius / radius)^exponent, min_speed)
    /// ```
    pub fn speed(&self, clock: &SimulationClock, balance: &BalanceConfig) -> f32 {
        if self.radius <= EPSILON {
            return 0.0;
        }
        let scale = (balance.base_radius / self.radius).powf(balance.speed_exponent);
        let speed = (balance.base_speed * scale).max(balance.min_speed);
        if self.has_effect(PowerUpKind::Speed, clock) {
            speed * balance.speed_boost_multiplier
        } else {
            speed
        }
    }

    /// Copy effects from another cell (split children inherit buffs)
    pub(crate) fn inherit_effects(&mut self, other: &CellBody) {
        for effect in other.effects.iter() {
            self.add_effect(effect.kind, effect.expires_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petri_simulation::math::mass_for_radius;

    fn cell(mass: f32) -> CellBody {
        CellBody::new(
            Vec2::new(100.0, 100.0),
            mass,
            Membrane::from_balance(&BalanceConfig::default(), 0.0),
        )
    }

    #[test]
    fn test_radius_tracks_mass() {
        let mut c = cell(mass_for_radius(20.0));
        assert!((c.radius() - 20.0).abs() < 1e-3);
        c.set_mass(mass_for_radius(40.0));
        assert!((c.radius() - 40.0).abs() < 1e-3);
        assert!((c.mass() - std::f32::consts::PI * c.radius() * c.radius()).abs() < 1e-1);
    }

    #[test]
    fn test_grow_respects_cap() {
        let mut c = cell(1000.0);
        assert_eq!(c.grow(500.0, 1200.0), 200.0);
        assert_eq!(c.mass(), 1200.0);
        assert_eq!(c.grow(f32::NAN, 1200.0), 0.0);
    }

    #[test]
    fn test_negative_mass_is_clamped() {
        let mut c = cell(1000.0);
        c.set_mass(-5.0);
        assert_eq!(c.mass(), 0.0);
        assert!(!c.is_valid());
    }

    #[test]
    fn test_speed_decreases_with_size() {
        let balance = BalanceConfig::default();
        let clock = SimulationClock::new();
        let small = cell(balance.base_mass());
        let big = cell(balance.base_mass() * 50.0);
        assert!((small.speed(&clock, &balance) - balance.base_speed).abs() < 1e-2);
        assert!(big.speed(&clock, &balance) < small.speed(&clock, &balance));
        assert!(big.speed(&clock, &balance) >= balance.min_speed);
    }

    #[test]
    fn test_speed_effect_expires() {
        let balance = BalanceConfig::default();
        let mut clock = SimulationClock::new();
        let mut c = cell(balance.base_mass());
        let normal = c.speed(&clock, &balance);

        c.add_effect(PowerUpKind::Speed, clock.after(1.0));
        assert!((c.speed(&clock, &balance) - normal * 1.5).abs() < 1e-2);

        clock.advance(1.5);
        c.tick_timers(1.5, &clock);
        assert!(c.effects().is_empty());
        assert!((c.speed(&clock, &balance) - normal).abs() < 1e-2);
    }

    #[test]
    fn test_pass_under_counts_down() {
        let clock = SimulationClock::new();
        let mut c = cell(1000.0);
        c.start_pass_under(1.0);
        assert_eq!(c.z_layer(), -1);
        c.tick_timers(0.6, &clock);
        assert!(c.is_passing_under());
        c.tick_timers(0.6, &clock);
        assert_eq!(c.z_layer(), 0);
    }

    #[test]
    fn test_kill_marks_dead() {
        let mut c = cell(1000.0);
        c.kill();
        assert!(!c.is_alive());
        assert_eq!(c.mass(), 0.0);
    }
}
