//! Monotonic simulation time
//!
//! Cooldowns and merge locks are stored as absolute timestamps on this clock,
//! never on wall-clock time, so pausing the arena freezes every timer.

use serde::{Deserialize, Serialize};

/// Simulation time source, advanced only by the tick orchestrator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationClock {
    now: f64,
    ticks: u64,
    paused: bool,
}

impl SimulationClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock at an arbitrary time (useful for tests and scenario setup)
    pub fn at(now: f64) -> Self {
        Self {
            now,
            ticks: 0,
            paused: false,
        }
    }

    /// Current simulation time in seconds
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Number of ticks advanced so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance by `dt` seconds. Returns false (and does nothing) while paused.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.paused || !dt.is_finite() || dt <= 0.0 {
            return false;
        }
        self.now += dt as f64;
        self.ticks += 1;
        true
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Timestamp `seconds` from now
    pub fn after(&self, seconds: f32) -> f64 {
        self.now + seconds as f64
    }

    /// True once `until` has been reached
    pub fn has_elapsed(&self, until: f64) -> bool {
        self.now >= until
    }

    /// Seconds remaining until `until` (0.0 when already elapsed)
    pub fn remaining(&self, until: f64) -> f32 {
        (until - self.now).max(0.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances() {
        let mut clock = SimulationClock::new();
        assert!(clock.advance(0.5));
        assert!(clock.advance(0.25));
        assert!((clock.now() - 0.75).abs() < 1e-9);
        assert_eq!(clock.ticks(), 2);
    }

    #[test]
    fn test_paused_clock_does_not_advance() {
        let mut clock = SimulationClock::new();
        let deadline = clock.after(1.0);
        clock.pause();
        for _ in 0..1000 {
            assert!(!clock.advance(1.0 / 60.0));
        }
        assert!(!clock.has_elapsed(deadline));
        assert_eq!(clock.ticks(), 0);

        clock.resume();
        clock.advance(1.0);
        assert!(clock.has_elapsed(deadline));
    }

    #[test]
    fn test_rejects_bad_dt() {
        let mut clock = SimulationClock::new();
        assert!(!clock.advance(f32::NAN));
        assert!(!clock.advance(-1.0));
        assert!(!clock.advance(0.0));
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn test_remaining() {
        let clock = SimulationClock::at(10.0);
        assert_eq!(clock.remaining(9.0), 0.0);
        assert!((clock.remaining(12.5) - 2.5).abs() < 1e-6);
    }
}
