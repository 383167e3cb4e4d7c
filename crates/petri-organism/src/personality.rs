//! Bot personalities
//!
//! A personality is rolled once when a bot spawns and never changes. The
//! difficulty level scales the rolled traits before the value is frozen.

use petri_simulation::SimRng;
use serde::{Deserialize, Serialize};

/// Bot difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Normal, Self::Hard];

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    /// (aggression, caution, split, reaction) scale factors
    fn scales(&self) -> (f32, f32, f32, f32) {
        match self {
            Difficulty::Easy => (0.6, 1.3, 0.5, 1.4),
            Difficulty::Normal => (1.0, 1.0, 1.0, 1.0),
            Difficulty::Hard => (1.35, 0.8, 1.5, 0.7),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" | "medium" | "default" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(format!(
                "Unknown difficulty: {}. Valid: easy, normal, hard",
                s
            )),
        }
    }
}

/// How a bot turns toward its desired heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementStyle {
    /// Snappy turns, little noise
    Direct,
    /// Heavy inertia, gentle curves
    Smooth,
    /// Noisy, twitchy heading
    Erratic,
}

impl MovementStyle {
    /// Weight kept from the previous heading each frame
    pub fn inertia(&self) -> f32 {
        match self {
            MovementStyle::Direct => 0.6,
            MovementStyle::Smooth => 0.88,
            MovementStyle::Erratic => 0.7,
        }
    }

    /// Per-frame heading noise in radians
    pub fn jitter(&self) -> f32 {
        match self {
            MovementStyle::Direct => 0.01,
            MovementStyle::Smooth => 0.005,
            MovementStyle::Erratic => 0.06,
        }
    }
}

/// Immutable trait vector driving a bot's decisions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    aggression: f32,
    caution: f32,
    greed: f32,
    split_happiness: f32,
    eject_happiness: f32,
    virus_avoidance: f32,
    power_up_attraction: f32,
    /// Multiplier on the major-tick interval (higher = slower reactions)
    reaction_scale: f32,
    movement_style: MovementStyle,
}

impl Default for Personality {
    fn default() -> Self {
        Self::balanced()
    }
}

impl Personality {
    /// Middle-of-the-road traits
    pub const fn balanced() -> Self {
        Self {
            aggression: 1.0,
            caution: 1.0,
            greed: 1.0,
            split_happiness: 0.3,
            eject_happiness: 0.2,
            virus_avoidance: 1.0,
            power_up_attraction: 1.0,
            reaction_scale: 1.0,
            movement_style: MovementStyle::Direct,
        }
    }

    /// Roll a personality for `difficulty`
    pub fn generate(difficulty: Difficulty, rng: &mut impl SimRng) -> Self {
        let (aggression, caution, split, reaction) = difficulty.scales();
        let movement_style = match rng.range_usize(0, 2) {
            0 => MovementStyle::Direct,
            1 => MovementStyle::Smooth,
            _ => MovementStyle::Erratic,
        };

        Self {
            aggression: rng.range_f32(0.5, 1.5) * aggression,
            caution: rng.range_f32(0.6, 1.6) * caution,
            greed: rng.range_f32(0.6, 1.4),
            split_happiness: (rng.range_f32(0.1, 0.6) * split).min(1.0),
            eject_happiness: rng.range_f32(0.05, 0.4),
            virus_avoidance: rng.range_f32(0.6, 1.4),
            power_up_attraction: rng.range_f32(0.5, 1.5),
            reaction_scale: reaction,
            movement_style,
        }
    }

    // Construction-time overrides, mostly for scripted bots and tests

    pub const fn with_aggression(mut self, value: f32) -> Self {
        self.aggression = value;
        self
    }

    pub const fn with_caution(mut self, value: f32) -> Self {
        self.caution = value;
        self
    }

    pub const fn with_split_happiness(mut self, value: f32) -> Self {
        self.split_happiness = value;
        self
    }

    pub const fn with_eject_happiness(mut self, value: f32) -> Self {
        self.eject_happiness = value;
        self
    }

    pub fn aggression(&self) -> f32 {
        self.aggression
    }

    pub fn caution(&self) -> f32 {
        self.caution
    }

    pub fn greed(&self) -> f32 {
        self.greed
    }

    pub fn split_happiness(&self) -> f32 {
        self.split_happiness
    }

    pub fn eject_happiness(&self) -> f32 {
        self.eject_happiness
    }

    pub fn virus_avoidance(&self) -> f32 {
        self.virus_avoidance
    }

    pub fn power_up_attraction(&self) -> f32 {
        self.power_up_attraction
    }

    pub fn reaction_scale(&self) -> f32 {
        self.reaction_scale
    }

    pub fn movement_style(&self) -> MovementStyle {
        self.movement_style
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn mean_aggression(difficulty: Difficulty) -> f32 {
        let mut rng = Xoshiro256StarStar::seed_from_u64(99);
        let n = 200;
        (0..n)
            .map(|_| Personality::generate(difficulty, &mut rng).aggression())
            .sum::<f32>()
            / n as f32
    }

    #[test]
    fn test_generate_is_deterministic() {
        let mut a = Xoshiro256StarStar::seed_from_u64(1);
        let mut b = Xoshiro256StarStar::seed_from_u64(1);
        assert_eq!(
            Personality::generate(Difficulty::Hard, &mut a),
            Personality::generate(Difficulty::Hard, &mut b)
        );
    }

    #[test]
    fn test_traits_stay_in_range() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(5);
        for difficulty in Difficulty::ALL {
            for _ in 0..100 {
                let p = Personality::generate(difficulty, &mut rng);
                assert!(p.aggression() > 0.0);
                assert!(p.caution() > 0.0);
                assert!((0.0..=1.0).contains(&p.split_happiness()));
                assert!((0.0..=1.0).contains(&p.eject_happiness()));
            }
        }
    }

    #[test]
    fn test_harder_bots_are_more_aggressive() {
        let easy = mean_aggression(Difficulty::Easy);
        let hard = mean_aggression(Difficulty::Hard);
        assert!(hard > easy, "easy={easy} hard={hard}");
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!("medium".parse::<Difficulty>(), Ok(Difficulty::Normal));
        assert!("nightmare".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::Easy.to_string(), "Easy");
    }

    #[test]
    fn test_overrides() {
        let p = Personality::balanced()
            .with_caution(0.5)
            .with_split_happiness(1.0);
        assert_eq!(p.caution(), 0.5);
        assert_eq!(p.split_happiness(), 1.0);
        assert_eq!(p.aggression(), Personality::balanced().aggression());
    }
}
