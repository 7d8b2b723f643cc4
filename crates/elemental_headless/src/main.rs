//! Headless Elemental Wars runner.
//!
//! # Usage
//!
//! ```bash
//! # Run one match and print a summary
//! cargo run -p elemental_headless -- run --seed 7 --ai-players 2 --ticks 36000
//!
//! # Override the rules and print JSON
//! cargo run -p elemental_headless -- run --rules my_rules.ron --json
//!
//! # Run a batch over consecutive seeds
//! cargo run -p elemental_headless -- batch --count 100 --seed 0 --output results/
//!
//! # Dump the built-in rules as a starting point for overrides
//! cargo run -p elemental_headless -- rules --output rules.ron
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the level.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use elemental_core::data::GameRules;
use elemental_headless::{
    batch::{run_batch, BatchConfig},
    runner::{run_match, verify_determinism, RunConfig},
    scenario::{load_match, load_rules, save_rules},
    GameMetrics, Result,
};

#[derive(Parser)]
#[command(name = "elemental_headless")]
#[command(about = "Headless Elemental Wars runner for AI testing and balance batches")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single match
    Run {
        /// World seed
        #[arg(long, default_value = "1")]
        seed: u64,

        /// Number of computer players
        #[arg(long, default_value = "1")]
        ai_players: u32,

        /// Tick budget (0 = until decided)
        #[arg(long, default_value = "36000")]
        ticks: u64,

        /// RON rules override
        #[arg(long)]
        rules: Option<PathBuf>,

        /// RON match setup; replaces seed, players and rules
        #[arg(long, conflicts_with_all = ["seed", "ai_players", "rules"])]
        setup: Option<PathBuf>,

        /// Leave out the idle human slot
        #[arg(long)]
        no_human: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Write a bincode snapshot of the final state
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Run matches for consecutive seeds in parallel
    Batch {
        /// Number of matches
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Seed of the first match
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick budget per match (0 = until decided)
        #[arg(long, default_value = "36000")]
        ticks: u64,

        /// Computer players per match
        #[arg(long, default_value = "2")]
        ai_players: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// RON rules override
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Directory for batch_results.json
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replay a match several times and compare final hashes
    Verify {
        /// World seed
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of computer players
        #[arg(long, default_value = "2")]
        ai_players: u32,

        /// Ticks per run
        #[arg(long, default_value = "3600")]
        ticks: u64,

        /// Number of runs
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },

    /// Write the built-in rules as RON
    Rules {
        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .init();

    let result = match cli.command {
        Commands::Run {
            seed,
            ai_players,
            ticks,
            rules,
            setup,
            no_human,
            json,
            snapshot,
        } => cmd_run(seed, ai_players, ticks, rules, setup, no_human, json, snapshot),
        Commands::Batch {
            count,
            seed,
            ticks,
            ai_players,
            parallel,
            rules,
            output,
        } => cmd_batch(count, seed, ticks, ai_players, parallel, rules, output),
        Commands::Verify {
            seed,
            ai_players,
            ticks,
            runs,
        } => cmd_verify(seed, ai_players, ticks, runs),
        Commands::Rules { output } => save_rules(&GameRules::default(), &output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn rules_or_default(path: Option<PathBuf>) -> Result<GameRules> {
    match path {
        Some(path) => load_rules(path),
        None => Ok(GameRules::default()),
    }
}

/// Run a single match
fn cmd_run(
    seed: u64,
    ai_players: u32,
    ticks: u64,
    rules: Option<PathBuf>,
    setup: Option<PathBuf>,
    no_human: bool,
    json: bool,
    snapshot: Option<PathBuf>,
) -> Result<()> {
    let mut config = RunConfig::new(seed, ai_players).with_ticks(ticks);
    match setup {
        Some(path) => config.setup = load_match(path)?,
        None => config.setup.rules = rules_or_default(rules)?,
    }
    if no_human {
        config.setup.human = false;
    }

    let outcome = run_match(&config)?;
    if let Some(path) = snapshot {
        std::fs::write(&path, outcome.simulation.serialize()?)?;
        tracing::info!(path = %path.display(), "Snapshot written");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.metrics)?);
    } else {
        print_summary(&outcome.metrics);
    }
    Ok(())
}

fn print_summary(metrics: &GameMetrics) {
    println!("Seed:    {}", metrics.seed);
    println!("Ticks:   {}", metrics.duration_ticks);
    println!(
        "Result:  {}",
        metrics
            .winner
            .as_deref()
            .map_or_else(|| "undecided".to_string(), |w| format!("{w} wins"))
    );
    println!("Hash:    {:016x}", metrics.final_state_hash);
    println!("Shots:   {} fired, {} hits", metrics.shots_fired, metrics.hits);
    for (name, player) in &metrics.players {
        let built: u32 = player.buildings_constructed.values().sum();
        println!(
            "  {name:<10} cities {:>2}  pop {:>3}  built {:>3}  units {:>3} (lost {:>3})  techs {}{}",
            player.cities_founded,
            player.final_population,
            built,
            player.units_spawned,
            player.units_lost,
            player.techs_researched.len(),
            if player.defeated { "  DEFEATED" } else { "" },
        );
    }
}

/// Run batch of matches
fn cmd_batch(
    count: u32,
    seed: u64,
    ticks: u64,
    ai_players: u32,
    parallel: u32,
    rules: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut config = BatchConfig::new(count).with_seed(seed).with_ticks(ticks);
    config.ai_players = ai_players;
    config.parallel_games = parallel;
    config.rules = rules_or_default(rules)?;
    if let Some(dir) = output.clone() {
        config = config.with_output(dir);
    }

    let results = run_batch(config);
    if let Some(dir) = output {
        let path = dir.join("batch_results.json");
        results.save(&path)?;
        tracing::info!(path = %path.display(), "Results saved");
    }

    let summary = &results.summary;
    println!("Games played: {}", summary.total_games);
    if !results.errors.is_empty() {
        println!("Games failed: {}", results.errors.len());
    }
    println!("Undecided:    {}", summary.undecided);
    println!(
        "Duration:     avg {:.0} ticks (min {}, max {})",
        summary.avg_duration_ticks, summary.min_duration_ticks, summary.max_duration_ticks
    );
    for (name, rate) in &summary.win_rates {
        println!("  {name:<10} wins {:>5.1}%", rate * 100.0);
    }
    if let Some(name) = summary.dominant_player(0.1) {
        println!("Dominant player: {name}");
    }
    Ok(())
}

/// Verify determinism by replaying one seed
fn cmd_verify(seed: u64, ai_players: u32, ticks: u64, runs: u32) -> Result<()> {
    let config = RunConfig::new(seed, ai_players).with_ticks(ticks);
    if verify_determinism(&config, runs)? {
        println!("Deterministic: {runs} runs of seed {seed} agree");
    } else {
        println!("NON-DETERMINISTIC: seed {seed} diverged");
    }
    Ok(())
}
