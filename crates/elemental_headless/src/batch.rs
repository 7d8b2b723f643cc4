//! Batch match runner for balance testing.
//!
//! Runs matches for consecutive seeds in parallel using rayon and
//! aggregates their metrics.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use elemental_core::data::GameRules;
use elemental_core::scenario::{MatchConfig, PolicyChoice};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::metrics::{BatchSummary, GameMetrics};
use crate::runner::{run_match, RunConfig};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of matches.
    pub game_count: u32,
    /// Maximum parallel matches (0 = rayon default).
    pub parallel_games: u32,
    /// Seed of the first match; the rest follow consecutively.
    pub seed_start: u64,
    /// Tick budget per match (0 = until decided).
    pub max_ticks: u64,
    /// Computer players per match.
    pub ai_players: u32,
    /// Whether each match has an idle human slot.
    pub human: bool,
    /// Construction choice for computer players.
    pub policy: PolicyChoice,
    /// Ruleset.
    pub rules: GameRules,
    /// Output directory for results.
    pub output_dir: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            max_ticks: 36000, // 10 minutes at 60 tps
            ai_players: 2,
            human: false,
            policy: PolicyChoice::Random,
            rules: GameRules::default(),
            output_dir: None,
        }
    }
}

impl BatchConfig {
    /// `game_count` matches with default settings.
    #[must_use]
    pub fn new(game_count: u32) -> Self {
        Self {
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the per-match tick budget.
    #[must_use]
    pub fn with_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Set output directory.
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }

    /// The run configuration for match `index`.
    #[must_use]
    pub fn run_config(&self, index: u32) -> RunConfig {
        RunConfig {
            setup: MatchConfig {
                seed: self.seed_start.wrapping_add(u64::from(index)),
                ai_players: self.ai_players,
                human: self.human,
                width: None,
                height: None,
                policy: self.policy.clone(),
                rules: self.rules.clone(),
            },
            max_ticks: self.max_ticks,
            play_to_end: false,
        }
    }
}

/// Error during a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Match index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-match metrics, in seed order.
    pub games: Vec<GameMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Wall-clock runtime.
    pub duration_seconds: f64,
    /// Matches that failed to run.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Run a batch of matches.
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(
        games = config.game_count,
        seed_start = config.seed_start,
        "Starting batch run"
    );

    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<std::result::Result<GameMetrics, BatchError>> = (0..config.game_count)
        .into_par_iter()
        .map(|index| {
            let run = config.run_config(index);
            let seed = run.setup.seed;
            match run_match(&run) {
                Ok(outcome) => {
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 10 == 0 {
                        debug!("Progress: {}/{}", done, config.game_count);
                    }
                    Ok(outcome.metrics)
                }
                Err(e) => {
                    warn!("Game {} failed: {}", index, e);
                    Err(BatchError {
                        game_index: index,
                        seed,
                        message: e.to_string(),
                    })
                }
            }
        })
        .collect();

    let mut games = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(metrics) => games.push(metrics),
            Err(e) => errors.push(e),
        }
    }

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.1}s ({:.1} games/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(500).with_seed(12345).with_ticks(60);
        assert_eq!(config.game_count, 500);
        assert_eq!(config.run_config(0).setup.seed, 12345);
        assert_eq!(config.run_config(7).setup.seed, 12352);
        assert_eq!(config.run_config(7).max_ticks, 60);
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(BatchConfig::new(4).with_seed(20).with_ticks(120));

        assert_eq!(results.games.len(), 4);
        assert!(results.errors.is_empty());
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![20, 21, 22, 23]);
        assert_eq!(results.summary.total_games, 4);
        assert_eq!(results.summary.undecided, 4);
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let config = BatchConfig::new(3).with_seed(5).with_ticks(300);
        let batch = run_batch(config.clone());
        for (index, game) in batch.games.iter().enumerate() {
            let single = run_match(&config.run_config(index as u32)).unwrap();
            assert_eq!(game.final_state_hash, single.metrics.final_state_hash);
        }
    }

    #[test]
    fn test_failed_games_are_collected() {
        let mut config = BatchConfig::new(2).with_ticks(10);
        config.ai_players = 0;
        let results = run_batch(config);
        assert!(results.games.is_empty());
        assert_eq!(results.errors.len(), 2);
        assert_eq!(results.errors[1].seed, 1);
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(BatchConfig::new(2).with_ticks(60));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games, results.games);
        assert_eq!(loaded.config.game_count, 2);
    }
}
