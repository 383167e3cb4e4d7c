//! Runner configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `petri.ron` in the working directory (if it exists), or an explicit file
//! 3. Environment variables prefixed with `PETRI_`
//!
//! Example environment variable: `PETRI_BALANCE__WORLD_SIZE=3000`

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use petri_core::organism::Difficulty;
use petri_core::simulation::BalanceConfig;
use serde::{Deserialize, Serialize};

/// Top-level runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PetriConfig {
    #[serde(default)]
    pub balance: BalanceConfig,

    #[serde(default)]
    pub bots: BotConfig,

    #[serde(default)]
    pub run: RunConfig,
}

/// Bot population settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Bots spawned at start
    pub count: usize,
    pub difficulty: Difficulty,
    /// Replace dead bots after the balance respawn delay
    pub respawn: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            count: 12,
            difficulty: Difficulty::Normal,
            respawn: true,
        }
    }
}

/// Headless run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Fixed steps to simulate
    pub ticks: u64,
    pub seed: u64,
    /// Log a progress line every this many ticks (0 disables)
    pub progress_interval: u64,
    /// Rows printed in the final leaderboard
    pub leaderboard_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 3600,
            seed: 42,
            progress_interval: 600,
            leaderboard_size: 10,
        }
    }
}

impl PetriConfig {
    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `path`, or `petri.ron` when no path is given (optional)
    /// 3. Environment variables prefixed with `PETRI_` (highest priority)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults =
            Config::try_from(&PetriConfig::default()).context("Failed to encode defaults")?;

        // Layer 2: an explicit file must exist, the implicit one is optional
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Ron).required(true),
            None => File::with_name("petri")
                .format(FileFormat::Ron)
                .required(false),
        };

        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .add_source(defaults)
            .add_source(file)
            // Layer 3: Environment variables (PETRI_BALANCE__WORLD_SIZE, etc.)
            .add_source(Environment::with_prefix("PETRI").separator("__"));

        let config = builder.build().context("Failed to build configuration")?;

        let config: PetriConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config
            .balance
            .validate()
            .context("Invalid balance configuration")?;
        Ok(config)
    }
}
