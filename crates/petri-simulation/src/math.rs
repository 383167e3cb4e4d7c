//! Small geometry helpers shared by every crate
//!
//! All direction normalisation in the simulation goes through [`safe_normalize`]
//! so coincident positions never produce NaN.

use glam::Vec2;
use std::f32::consts::PI;

/// Lengths below this are treated as zero when normalising
pub const EPSILON: f32 = 1e-6;

/// `mass = π·r²`
pub fn mass_for_radius(radius: f32) -> f32 {
    PI * radius * radius
}

/// `r = sqrt(mass/π)`; non-positive mass maps to a zero radius
pub fn radius_for_mass(mass: f32) -> f32 {
    if mass > 0.0 {
        (mass / PI).sqrt()
    } else {
        0.0
    }
}

/// Normalise `v`, returning `None` for zero-length or non-finite input
pub fn safe_normalize(v: Vec2) -> Option<Vec2> {
    let len = v.length();
    if len.is_finite() && len > EPSILON {
        Some(v / len)
    } else {
        None
    }
}

/// Normalise `v`, falling back to `fallback` when it has no direction
pub fn normalize_or(v: Vec2, fallback: Vec2) -> Vec2 {
    safe_normalize(v).unwrap_or(fallback)
}

/// True when both components are finite
pub fn is_finite_vec(v: Vec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}

/// Clamp a position so a circle of `radius` stays inside `[0, world_size]²`
pub fn clamp_to_world(position: Vec2, radius: f32, world_size: f32) -> Vec2 {
    let lo = radius.min(world_size * 0.5);
    let hi = (world_size - radius).max(world_size * 0.5);
    Vec2::new(position.x.clamp(lo, hi), position.y.clamp(lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mass_radius_roundtrip() {
        let r = radius_for_mass(5000.0);
        assert!((r - 39.894).abs() < 0.01);
        assert!((mass_for_radius(r) - 5000.0).abs() < 0.1);
        assert_eq!(radius_for_mass(0.0), 0.0);
        assert_eq!(radius_for_mass(-3.0), 0.0);
    }

    #[test]
    fn test_safe_normalize_zero() {
        assert_eq!(safe_normalize(Vec2::ZERO), None);
        assert_eq!(safe_normalize(Vec2::new(f32::NAN, 1.0)), None);
        let n = safe_normalize(Vec2::new(3.0, 4.0)).unwrap();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_or_fallback() {
        assert_eq!(normalize_or(Vec2::ZERO, Vec2::X), Vec2::X);
    }

    #[test]
    fn test_clamp_to_world() {
        let p = clamp_to_world(Vec2::new(-50.0, 5000.0), 20.0, 1000.0);
        assert_eq!(p, Vec2::new(20.0, 980.0));
    }

    #[test]
    fn test_clamp_oversized_radius_pins_to_center() {
        let p = clamp_to_world(Vec2::new(0.0, 1000.0), 800.0, 1000.0);
        assert_eq!(p, Vec2::new(500.0, 500.0));
    }
}
