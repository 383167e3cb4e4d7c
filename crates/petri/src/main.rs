use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use petri::organism::Difficulty;
use petri::PetriConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (RON); defaults to ./petri.ron when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of fixed steps to simulate
    #[arg(long)]
    ticks: Option<u64>,

    /// Number of bots to spawn
    #[arg(long)]
    bots: Option<usize>,

    /// Bot difficulty: easy, normal, hard
    #[arg(long)]
    difficulty: Option<String>,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Disable bot respawning
    #[arg(long)]
    no_respawn: bool,

    /// Print the report as RON instead of a table
    #[arg(long)]
    ron: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = PetriConfig::load(args.config.as_deref())?;

    // CLI flags override every configuration layer
    if let Some(ticks) = args.ticks {
        config.run.ticks = ticks;
    }
    if let Some(bots) = args.bots {
        config.bots.count = bots;
    }
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    if let Some(difficulty) = &args.difficulty {
        config.bots.difficulty = difficulty
            .parse::<Difficulty>()
            .map_err(anyhow::Error::msg)
            .context("Invalid --difficulty")?;
    }
    if args.no_respawn {
        config.bots.respawn = false;
    }

    log::info!("Starting Petri (seed {})", config.run.seed);
    let report = petri::headless::run(&config)?;

    if args.ron {
        let text = ron::ser::to_string_pretty(&report, ron::ser::PrettyConfig::default())
            .context("Failed to encode report")?;
        println!("{text}");
    } else {
        println!("{report}");
    }
    Ok(())
}
