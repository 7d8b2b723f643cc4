//! Single-match runner.
//!
//! Builds a match from a [`MatchConfig`], ticks it until one player is
//! left or the tick budget runs out, and reports [`GameMetrics`]. The
//! human slot, if any, stays idle.

use elemental_core::scenario::{new_match, MatchConfig};
use elemental_core::simulation::Simulation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::metrics::{GameMetrics, MetricsCollector};

/// One match to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Match setup.
    pub setup: MatchConfig,
    /// Tick budget (0 = until decided).
    pub max_ticks: u64,
    /// Keep ticking after the match is decided.
    pub play_to_end: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            setup: MatchConfig::default(),
            max_ticks: 36000, // 10 minutes at 60 tps
            play_to_end: false,
        }
    }
}

impl RunConfig {
    /// Default setup with the given seed and computer players.
    #[must_use]
    pub fn new(seed: u64, ai_players: u32) -> Self {
        Self {
            setup: MatchConfig {
                seed,
                ai_players,
                ..MatchConfig::default()
            },
            ..Self::default()
        }
    }

    /// Set the tick budget.
    #[must_use]
    pub fn with_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// Outcome of [`run_match`].
#[derive(Debug)]
pub struct RunOutcome {
    /// Collected metrics.
    pub metrics: GameMetrics,
    /// Final simulation, for inspection or snapshotting.
    pub simulation: Simulation,
}

/// Run one match to completion or to its tick budget.
pub fn run_match(config: &RunConfig) -> Result<RunOutcome> {
    let mut sim = new_match(&config.setup)?;
    let mut collector = MetricsCollector::new(config.setup.seed, &sim);

    info!(
        seed = config.setup.seed,
        ai_players = config.setup.ai_players,
        max_ticks = config.max_ticks,
        "Starting match"
    );

    loop {
        if config.max_ticks > 0 && sim.get_tick() >= config.max_ticks {
            break;
        }
        let events = sim.tick();
        collector.record(sim.get_tick(), &events, sim.world());

        if !config.play_to_end && sim.is_finished() {
            debug!(tick = sim.get_tick(), "Match decided");
            break;
        }
    }

    let metrics = collector.finalize(&sim);
    info!(
        seed = metrics.seed,
        ticks = metrics.duration_ticks,
        winner = metrics.winner.as_deref().unwrap_or("none"),
        hash = metrics.final_state_hash,
        "Match finished"
    );
    Ok(RunOutcome {
        metrics,
        simulation: sim,
    })
}

/// Run the same match `runs` times and check the final hashes agree.
pub fn verify_determinism(config: &RunConfig, runs: u32) -> Result<bool> {
    let mut first = None;
    for _ in 0..runs {
        let hash = run_match(config)?.metrics.final_state_hash;
        match first {
            None => first = Some(hash),
            Some(expected) if expected != hash => return Ok(false),
            Some(_) => {}
        }
    }
    Ok(true)
}
