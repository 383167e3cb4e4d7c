//! Soft-body membrane outline
//!
//! Each cell carries a ring of vertices at fixed angles. A vertex stores a
//! radial distortion (fraction of the cell radius) driven by a damped spring:
//!
//! ```text
//! velocity   += -elasticity * distortion * dt
//! velocity   *= damping
//! distortion += velocity * dt
//! ```
//!
//! Distortion is clamped to `±distortion_limit`, so the outline stays within
//! a bounded band around the true collision circle no matter how often it
//! is poked. The membrane is visual only; physics never reads it.

use std::f32::consts::TAU;

use glam::Vec2;
use petri_simulation::BalanceConfig;
use petri_simulation::math::safe_normalize;

/// Vertices whose outward normal is within ~60° of a poke are affected
const POKE_ALIGNMENT: f32 = 0.5;

/// Harmonic used for the idle wobble
const WOBBLE_LOBES: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct MembraneVertex {
    angle: f32,
    distortion: f32,
    velocity: f32,
}

/// Ring of spring-driven vertices around a cell
#[derive(Debug, Clone, PartialEq)]
pub struct Membrane {
    vertices: Vec<MembraneVertex>,
    elasticity: f32,
    damping: f32,
    distortion_limit: f32,
    amplitude: f32,
    speed: f32,
    phase: f32,
}

impl Membrane {
    /// Create a membrane with the vertex count and spring constants from `balance`
    pub fn from_balance(balance: &BalanceConfig, phase: f32) -> Self {
        let count = balance.membrane_vertices.max(3);
        let vertices = (0..count)
            .map(|i| MembraneVertex {
                angle: i as f32 / count as f32 * TAU,
                distortion: 0.0,
                velocity: 0.0,
            })
            .collect();

        Self {
            vertices,
            elasticity: balance.membrane_elasticity.max(0.0),
            damping: balance.membrane_damping.clamp(0.0, 1.0),
            distortion_limit: balance.membrane_distortion_limit.abs(),
            amplitude: balance.membrane_amplitude,
            speed: balance.membrane_speed,
            phase: if phase.is_finite() { phase.rem_euclid(TAU) } else { 0.0 },
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Advance springs and the idle oscillation by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let limit = self.distortion_limit;
        for vertex in &mut self.vertices {
            if !vertex.distortion.is_finite() || !vertex.velocity.is_finite() {
                vertex.distortion = 0.0;
                vertex.velocity = 0.0;
                continue;
            }

            vertex.velocity += -self.elasticity * vertex.distortion * dt;
            vertex.velocity *= self.damping;
            vertex.distortion += vertex.velocity * dt;

            if vertex.distortion.abs() > limit {
                vertex.distortion = vertex.distortion.signum() * limit;
                // Stop pushing further past the clamp
                if vertex.velocity.signum() == vertex.distortion.signum() {
                    vertex.velocity = 0.0;
                }
            }
        }

        self.phase = (self.phase + self.speed * dt).rem_euclid(TAU);
        if !self.phase.is_finite() {
            self.phase = 0.0;
        }
    }

    /// Dent the side of the membrane facing `direction`
    ///
    /// `strength` is an inward distortion speed (radius fractions per second).
    pub fn poke(&mut self, direction: Vec2, strength: f32) {
        let Some(direction) = safe_normalize(direction) else {
            return;
        };
        if !strength.is_finite() {
            return;
        }

        for vertex in &mut self.vertices {
            let normal = Vec2::from_angle(vertex.angle);
            let alignment = normal.dot(direction);
            if alignment > POKE_ALIGNMENT {
                vertex.velocity -= strength * alignment;
            }
        }
    }

    /// Radial offset of vertex `index` as a fraction of the radius
    pub fn offset(&self, index: usize) -> f32 {
        self.vertices
            .get(index)
            .map(|v| {
                let wobble = self.amplitude * (WOBBLE_LOBES * v.angle + self.phase).sin();
                (v.distortion + wobble).clamp(-self.max_offset(), self.max_offset())
            })
            .unwrap_or(0.0)
    }

    /// Largest offset any vertex can reach
    pub fn max_offset(&self) -> f32 {
        self.distortion_limit + self.amplitude.abs()
    }

    /// Outline points in world space for a cell at `center` with `radius`
    pub fn outline(&self, center: Vec2, radius: f32) -> Vec<Vec2> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| center + Vec2::from_angle(v.angle) * radius * (1.0 + self.offset(i)))
            .collect()
    }

    /// Largest absolute spring distortion (excluding the idle wobble)
    pub fn peak_distortion(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| v.distortion.abs())
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petri_simulation::SimRng;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    const DT: f32 = 1.0 / 60.0;

    fn membrane() -> Membrane {
        Membrane::from_balance(&BalanceConfig::default(), 0.0)
    }

    #[test]
    fn test_vertex_count_follows_balance() {
        let balance = BalanceConfig {
            membrane_vertices: 12,
            ..Default::default()
        };
        assert_eq!(Membrane::from_balance(&balance, 0.0).vertex_count(), 12);
    }

    #[test]
    fn test_poke_only_moves_facing_side() {
        let mut m = membrane();
        m.poke(Vec2::X, 3.0);
        m.step(DT);

        // Vertex 0 faces +X, the opposite vertex faces -X
        let opposite = m.vertex_count() / 2;
        assert!(m.vertices[0].distortion < 0.0);
        assert_eq!(m.vertices[opposite].distortion, 0.0);
    }

    #[test]
    fn test_zero_direction_poke_is_ignored() {
        let mut m = membrane();
        m.poke(Vec2::ZERO, 10.0);
        m.poke(Vec2::X, f32::NAN);
        m.step(DT);
        assert_eq!(m.peak_distortion(), 0.0);
    }

    #[test]
    fn test_returns_to_rest() {
        let mut m = membrane();
        m.poke(Vec2::Y, 5.0);
        for _ in 0..600 {
            m.step(DT);
        }
        assert!(m.peak_distortion() < 1e-3, "{}", m.peak_distortion());
    }

    #[test]
    fn test_distortion_stays_bounded_under_repeated_pokes() {
        let mut m = membrane();
        let limit = BalanceConfig::default().membrane_distortion_limit;
        let mut rng = Xoshiro256StarStar::seed_from_u64(7);

        for _ in 0..5000 {
            let dir = Vec2::from_angle(rng.angle());
            m.poke(dir, rng.range_f32(-50.0, 50.0));
            m.step(DT);
            assert!(m.peak_distortion() <= limit + 1e-6);
            for i in 0..m.vertex_count() {
                assert!(m.offset(i).abs() <= m.max_offset() + 1e-6);
            }
        }
    }

    #[test]
    fn test_corrupted_vertex_resets() {
        let mut m = membrane();
        m.vertices[3].distortion = f32::NAN;
        m.step(DT);
        assert_eq!(m.vertices[3].distortion, 0.0);
        assert_eq!(m.vertices[3].velocity, 0.0);
    }

    #[test]
    fn test_phase_wraps() {
        let mut m = membrane();
        for _ in 0..10_000 {
            m.step(DT);
        }
        assert!((0.0..TAU).contains(&m.phase()));
    }

    #[test]
    fn test_outline_hugs_radius() {
        let m = membrane();
        let center = Vec2::new(100.0, 100.0);
        let outline = m.outline(center, 50.0);
        assert_eq!(outline.len(), m.vertex_count());
        for point in outline {
            let d = point.distance(center);
            assert!((d - 50.0).abs() <= 50.0 * m.max_offset() + 1e-3);
        }
    }
}
