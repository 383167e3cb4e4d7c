//! RNG trait abstraction for the simulation
//!
//! Simulation code takes `&mut impl SimRng` so the arena can run on a seeded
//! Xoshiro generator (deterministic replays and tests) or any other `rand::Rng`.

use std::f32::consts::TAU;

/// Random number generator used by physics and AI
pub trait SimRng {
    /// Generate random f32 in [0.0, 1.0)
    fn next_f32(&mut self) -> f32;

    /// Check if random value is less than probability threshold
    fn chance(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    /// Uniform value in `[lo, hi)`; returns `lo` for an empty range
    fn range_f32(&mut self, lo: f32, hi: f32) -> f32 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_f32() * (hi - lo)
    }

    /// Uniform integer in `lo..=hi`
    fn range_usize(&mut self, lo: usize, hi: usize) -> usize {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo + 1) as f32;
        (lo + (self.next_f32() * span) as usize).min(hi)
    }

    /// Uniform angle in `[0, 2π)`
    fn angle(&mut self) -> f32 {
        self.next_f32() * TAU
    }
}

// Blanket implementation for any type implementing rand::Rng
impl<T: ?Sized + rand::Rng> SimRng for T {
    fn next_f32(&mut self) -> f32 {
        rand::Rng::r#gen(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn test_next_f32_in_unit_range() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(12345);

        for _ in 0..100 {
            let val = rng.next_f32();
            assert!(val >= 0.0);
            assert!(val < 1.0);
        }
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(12345);

        for _ in 0..100 {
            assert!(rng.chance(1.0));
            assert!(!rng.chance(0.0));
        }
    }

    #[test]
    fn test_range_f32_bounds() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(7);

        for _ in 0..200 {
            let v = rng.range_f32(0.5, 1.5);
            assert!((0.5..1.5).contains(&v));
        }
        assert_eq!(rng.range_f32(2.0, 2.0), 2.0);
    }

    #[test]
    fn test_range_usize_covers_both_ends() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(99);

        let mut seen_lo = false;
        let mut seen_hi = false;
        for _ in 0..200 {
            match rng.range_usize(3, 4) {
                3 => seen_lo = true,
                4 => seen_hi = true,
                other => panic!("out of range: {other}"),
            }
        }
        assert!(seen_lo && seen_hi);
    }

    #[test]
    fn test_deterministic() {
        let mut rng1 = Xoshiro256StarStar::seed_from_u64(42);
        let mut rng2 = Xoshiro256StarStar::seed_from_u64(42);

        // Same seed should produce same sequence
        for _ in 0..100 {
            assert_eq!(rng1.next_f32(), rng2.next_f32());
        }
    }
}
