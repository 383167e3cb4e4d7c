//! Headless arena runs and their end-of-run report

use std::fmt;

use anyhow::{Context, Result};
use petri_core::organism::OrganismKind;
use petri_core::{Arena, ArenaEvent, ArenaTotals};
use serde::{Deserialize, Serialize};

use crate::config::PetriConfig;

/// One leaderboard row in a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: usize,
    pub name: String,
    pub kind: OrganismKind,
    pub mass: f32,
    pub cells: usize,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub ticks: u64,
    /// Simulated seconds
    pub sim_time: f64,
    pub organisms: usize,
    pub food: usize,
    pub leaderboard: Vec<Standing>,
    pub totals: ArenaTotals,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Ran {} ticks ({:.1}s simulated), {} organisms alive, {} food",
            self.ticks, self.sim_time, self.organisms, self.food
        )?;
        writeln!(f)?;
        writeln!(f, "{:>4}  {:<16} {:<6} {:>10} {:>5}", "#", "name", "kind", "mass", "cells")?;
        for s in &self.leaderboard {
            writeln!(
                f,
                "{:>4}  {:<16} {:<6} {:>10.0} {:>5}",
                s.rank,
                s.name,
                format!("{:?}", s.kind),
                s.mass,
                s.cells
            )?;
        }
        writeln!(f)?;
        let t = &self.totals;
        writeln!(
            f,
            "spawned {}  deaths {}  food eaten {}  cells eaten {}",
            t.spawned, t.deaths, t.food_eaten, t.cells_eaten
        )?;
        write!(
            f,
            "viruses popped {}  power-ups {}  splits {}  ejections {}  merges {}",
            t.viruses_popped, t.power_ups_collected, t.splits, t.ejections, t.merges
        )
    }
}

/// Build a populated arena from `config`
pub fn build_arena(config: &PetriConfig) -> Result<Arena> {
    let mut arena =
        Arena::new(config.balance.clone(), config.run.seed).context("Failed to create arena")?;
    arena.set_bot_respawn(config.bots.respawn);
    arena.populate();
    for _ in 0..config.bots.count {
        arena.spawn_bot(config.bots.difficulty);
    }
    Ok(arena)
}

/// Simulate `config.run.ticks` fixed steps and summarize the result
pub fn run(config: &PetriConfig) -> Result<RunReport> {
    let mut arena = build_arena(config)?;
    log::info!(
        "Running {} ticks with {} {} bot(s)",
        config.run.ticks,
        config.bots.count,
        config.bots.difficulty
    );

    for tick in 1..=config.run.ticks {
        arena.tick();

        for event in arena.drain_events() {
            if let ArenaEvent::OrganismDied {
                name, stats, kind, ..
            } = event
            {
                log::debug!(
                    "{:?} '{}' died after eating {} food and {} cells",
                    kind,
                    name,
                    stats.food_eaten,
                    stats.cells_eaten
                );
            }
        }

        let interval = config.run.progress_interval;
        if interval > 0 && tick % interval == 0 {
            let leader = arena.leaderboard(1);
            match leader.first() {
                Some(top) => log::info!(
                    "tick {}: {} organisms, leader '{}' at {:.0} mass",
                    tick,
                    arena.organism_count(),
                    top.name,
                    top.mass
                ),
                None => log::info!("tick {}: arena is empty", tick),
            }
        }
    }

    Ok(report(&arena, config.run.leaderboard_size))
}

/// Snapshot the arena's current standings
pub fn report(arena: &Arena, leaderboard_size: usize) -> RunReport {
    let leaderboard = arena
        .leaderboard(leaderboard_size)
        .into_iter()
        .enumerate()
        .map(|(i, entry)| Standing {
            rank: i + 1,
            name: entry.name,
            kind: entry.kind,
            mass: entry.mass,
            cells: entry.cells,
        })
        .collect();

    RunReport {
        ticks: arena.clock().ticks(),
        sim_time: arena.clock().now(),
        organisms: arena.organism_count(),
        food: arena.foods().len(),
        leaderboard,
        totals: arena.totals().clone(),
    }
}
