//! Match metrics collection for balance analysis.
//!
//! A [`MetricsCollector`] watches the per-tick events of one match and
//! folds them into per-player counters. Units and buildings are reaped in
//! the same tick they die, so the collector remembers owners as entities
//! appear instead of looking them up afterwards.

use std::collections::BTreeMap;

use elemental_core::buildings::BuildingId;
use elemental_core::player::PlayerId;
use elemental_core::simulation::Simulation;
use elemental_core::units::UnitId;
use elemental_core::world::{TickEvents, World};
use serde::{Deserialize, Serialize};

/// Complete metrics for a single match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Seed the match was built from.
    pub seed: u64,
    /// Ticks simulated.
    pub duration_ticks: u64,
    /// Surviving player, if the match was decided.
    pub winner: Option<String>,
    /// Whether at most one player was left standing.
    pub finished: bool,
    /// Per-player metrics, keyed by player name.
    pub players: BTreeMap<String, PlayerMetrics>,
    /// Bullets fired by anyone.
    pub shots_fired: u64,
    /// Bullet hits on anything.
    pub hits: u64,
    /// Final state hash, for determinism checks.
    pub final_state_hash: u64,
}

/// Metrics for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMetrics {
    /// Cities founded, capital included.
    pub cities_founded: u32,
    /// Citizens gained across all cities.
    pub population_growth: u32,
    /// Constructions completed by building name.
    pub buildings_constructed: BTreeMap<String, u32>,
    /// Units trained.
    pub units_spawned: u32,
    /// Own units killed.
    pub units_lost: u32,
    /// Own buildings destroyed.
    pub buildings_lost: u32,
    /// Technologies completed, in order.
    pub techs_researched: Vec<String>,
    /// Tick of the first completed research.
    pub first_research_tick: Option<u64>,
    /// Population summed over cities at the end.
    pub final_population: u32,
    /// Whether all city centers had fallen at the end.
    pub defeated: bool,
}

/// Summary statistics across several matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Matches played.
    pub total_games: u32,
    /// Matches won, by player name.
    pub wins_by_player: BTreeMap<String, u32>,
    /// Win rates, by player name.
    pub win_rates: BTreeMap<String, f64>,
    /// Matches that ran out of ticks undecided.
    pub undecided: u32,
    /// Average duration.
    pub avg_duration_ticks: f64,
    /// Shortest match.
    pub min_duration_ticks: u64,
    /// Longest match.
    pub max_duration_ticks: u64,
    /// Average units trained per match, by player name.
    pub avg_units_spawned: BTreeMap<String, f64>,
    /// Average technologies researched per match, by player name.
    pub avg_techs_researched: BTreeMap<String, f64>,
    /// Average final population, by player name.
    pub avg_final_population: BTreeMap<String, f64>,
}

impl BatchSummary {
    /// Aggregate a list of match metrics.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total_games: games.len() as u32,
            min_duration_ticks: u64::MAX,
            ..Default::default()
        };

        let mut duration_sum = 0u64;
        let mut units: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        let mut techs: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        let mut population: BTreeMap<String, Vec<u32>> = BTreeMap::new();

        for game in games {
            duration_sum += game.duration_ticks;
            summary.min_duration_ticks = summary.min_duration_ticks.min(game.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(game.duration_ticks);

            match &game.winner {
                Some(winner) => *summary.wins_by_player.entry(winner.clone()).or_default() += 1,
                None => summary.undecided += 1,
            }

            for (name, player) in &game.players {
                units.entry(name.clone()).or_default().push(player.units_spawned);
                techs
                    .entry(name.clone())
                    .or_default()
                    .push(player.techs_researched.len() as u32);
                population
                    .entry(name.clone())
                    .or_default()
                    .push(player.final_population);
            }
        }

        summary.avg_duration_ticks = duration_sum as f64 / games.len() as f64;
        for (name, wins) in &summary.wins_by_player {
            summary
                .win_rates
                .insert(name.clone(), f64::from(*wins) / f64::from(summary.total_games));
        }
        summary.avg_units_spawned = averages(units);
        summary.avg_techs_researched = averages(techs);
        summary.avg_final_population = averages(population);
        summary
    }

    /// The player winning more than `0.5 + threshold` of matches, if any.
    #[must_use]
    pub fn dominant_player(&self, threshold: f64) -> Option<&String> {
        self.win_rates
            .iter()
            .find(|(_, rate)| **rate > 0.5 + threshold)
            .map(|(name, _)| name)
    }
}

fn averages(samples: BTreeMap<String, Vec<u32>>) -> BTreeMap<String, f64> {
    samples
        .into_iter()
        .map(|(name, values)| {
            let avg = values.iter().map(|v| f64::from(*v)).sum::<f64>() / values.len().max(1) as f64;
            (name, avg)
        })
        .collect()
}

/// Folds tick events into [`GameMetrics`].
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: GameMetrics,
    names: BTreeMap<PlayerId, String>,
    unit_owners: BTreeMap<UnitId, PlayerId>,
    building_owners: BTreeMap<BuildingId, PlayerId>,
}

impl MetricsCollector {
    /// Start watching a match. Entities already on the map are registered.
    #[must_use]
    pub fn new(seed: u64, sim: &Simulation) -> Self {
        let world = sim.world();
        let mut collector = Self {
            metrics: GameMetrics {
                seed,
                ..GameMetrics::default()
            },
            ..Self::default()
        };
        for player in world.players() {
            collector.names.insert(player.id, player.name.clone());
            collector.metrics.players.insert(player.name.clone(), PlayerMetrics {
                cities_founded: player.cities.len() as u32,
                ..PlayerMetrics::default()
            });
        }
        for unit in world.units() {
            collector.unit_owners.insert(unit.id, unit.player);
        }
        for building in world.buildings() {
            collector.building_owners.insert(building.id, building.player);
        }
        collector
    }

    fn player_mut(&mut self, player: PlayerId) -> Option<&mut PlayerMetrics> {
        let name = self.names.get(&player)?;
        self.metrics.players.get_mut(name)
    }

    /// Record one tick's events. `world` is the state after that tick.
    pub fn record(&mut self, tick: u64, events: &TickEvents, world: &World) {
        self.metrics.shots_fired += events.shots_fired.len() as u64;
        self.metrics.hits += events.hits.len() as u64;

        for &id in &events.constructions_completed {
            let Some(building) = world.building(id) else {
                continue;
            };
            self.building_owners.insert(id, building.player);
            let name = world.rules().building(building.kind).name.clone();
            if let Some(player) = self.player_mut(building.player) {
                *player.buildings_constructed.entry(name).or_default() += 1;
            }
        }

        for &id in &events.cities_founded {
            let Some(city) = world.city(id) else {
                continue;
            };
            self.building_owners.insert(city.center, city.player);
            if let Some(player) = self.player_mut(city.player) {
                player.cities_founded += 1;
            }
        }

        for &id in &events.population_growth {
            if let Some(owner) = world.city(id).map(|c| c.player) {
                if let Some(player) = self.player_mut(owner) {
                    player.population_growth += 1;
                }
            }
        }

        for &(owner, tech) in &events.research_completed {
            let name = world
                .player(owner)
                .and_then(|p| p.tech.node(tech))
                .map(|n| n.name.clone())
                .unwrap_or_default();
            if let Some(player) = self.player_mut(owner) {
                player.first_research_tick.get_or_insert(tick);
                player.techs_researched.push(name);
            }
        }

        for &id in &events.units_spawned {
            if let Some(unit) = world.unit(id) {
                self.unit_owners.insert(id, unit.player);
                if let Some(player) = self.player_mut(unit.player) {
                    player.units_spawned += 1;
                }
            }
        }

        for id in &events.units_killed {
            if let Some(owner) = self.unit_owners.remove(id) {
                if let Some(player) = self.player_mut(owner) {
                    player.units_lost += 1;
                }
            }
        }

        for id in &events.buildings_destroyed {
            let owner = self.building_owners.get(id).copied();
            if let Some(player) = owner.and_then(|o| self.player_mut(o)) {
                player.buildings_lost += 1;
            }
        }

        self.metrics.duration_ticks = tick;
    }

    /// Close the match and return its metrics.
    #[must_use]
    pub fn finalize(mut self, sim: &Simulation) -> GameMetrics {
        let world = sim.world();
        for player in world.players() {
            let population: u32 = player
                .cities
                .iter()
                .filter_map(|id| world.city(*id))
                .map(|c| c.pool.population)
                .sum();
            let defeated = world.is_defeated(player.id);
            if let Some(metrics) = self.player_mut(player.id) {
                metrics.final_population = population;
                metrics.defeated = defeated;
            }
        }

        self.metrics.duration_ticks = sim.get_tick();
        self.metrics.finished = sim.is_finished();
        self.metrics.winner = sim
            .winner()
            .and_then(|id| self.names.get(&id).cloned());
        self.metrics.final_state_hash = sim.state_hash();
        self.metrics
    }

    /// Metrics gathered so far.
    #[must_use]
    pub fn current(&self) -> &GameMetrics {
        &self.metrics
    }
}
