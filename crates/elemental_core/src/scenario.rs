//! Match setup.
//!
//! Capitals are spread along the map diagonal: with `n` players, player
//! `i` starts at fraction `(i + 1) / (n + 2)` of the width and height.
//! Computer players also get a barracks on their first claimed neighbour
//! tile, matching that tile's element.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ai::{AiController, FixedBuildPolicy, Policy, RandomBuildPolicy};
use crate::buildings::BuildingKind;
use crate::data::GameRules;
use crate::error::{GameError, PlacementError, Result};
use crate::player::{Controller, PlayerId};
use crate::simulation::Simulation;
use crate::world::World;

/// How computer players choose constructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyChoice {
    /// Seeded random picks, derived from the match seed.
    Random,
    /// The same repeating script for every computer player.
    Scripted(Vec<BuildingKind>),
}

/// Parameters of a new match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// World seed.
    pub seed: u64,
    /// Number of computer players.
    pub ai_players: u32,
    /// Whether slot 0 is a human player.
    pub human: bool,
    /// Overrides the rules' map width.
    pub width: Option<u32>,
    /// Overrides the rules' map height.
    pub height: Option<u32>,
    /// Construction choice for computer players.
    pub policy: PolicyChoice,
    /// Ruleset.
    pub rules: GameRules,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            ai_players: 1,
            human: true,
            width: None,
            height: None,
            policy: PolicyChoice::Random,
            rules: GameRules::default(),
        }
    }
}

/// Build a ready-to-tick match.
pub fn new_match(config: &MatchConfig) -> Result<Simulation> {
    let mut rules = config.rules.clone();
    if let Some(width) = config.width {
        rules.map.width = width;
    }
    if let Some(height) = config.height {
        rules.map.height = height;
    }
    rules.validate()?;

    let total = config.ai_players + u32::from(config.human);
    if total == 0 {
        return Err(GameError::InvalidState("a match needs at least one player".to_string()));
    }

    let (width, height) = (rules.map.width, rules.map.height);
    let mut world = World::new(rules, config.seed);
    let mut controllers = Vec::new();

    for slot in 0..total {
        let human = config.human && slot == 0;
        let (name, controller) = if human {
            ("Player".to_string(), Controller::Human)
        } else {
            (format!("AI {}", slot + u32::from(!config.human)), Controller::Ai)
        };
        let player = world.add_player(name, controller)?;

        let x = width * (slot + 1) / (total + 2);
        let y = height * (slot + 1) / (total + 2);
        let tile = world
            .map()
            .tile_at(x, y)
            .ok_or_else(|| GameError::InvalidState(format!("no tile at ({x}, {y})")))?;
        if world.map().tile(tile).is_some_and(|t| t.owner_city.is_some()) {
            return Err(PlacementError::AlreadyClaimed(tile.raw()).into());
        }
        world.add_building(player, None, BuildingKind::City, tile)?;

        if !human {
            give_barracks(&mut world, player)?;
            let policy = match &config.policy {
                PolicyChoice::Random => Policy::Random(RandomBuildPolicy::new(
                    config.seed ^ u64::from(player.raw()).rotate_left(32),
                )),
                PolicyChoice::Scripted(script) => {
                    Policy::Fixed(FixedBuildPolicy::new(script.clone()).repeating())
                }
            };
            controllers.push(AiController::new(player, policy));
        }
    }

    info!(
        seed = config.seed,
        players = total,
        width,
        height,
        "Match created"
    );

    let mut sim = Simulation::new(world);
    for controller in controllers {
        sim.add_ai(controller);
    }
    Ok(sim)
}

fn give_barracks(world: &mut World, player: PlayerId) -> Result<()> {
    let Some(city) = world.player(player).and_then(|p| p.cities.first().copied()) else {
        return Ok(());
    };
    let Some(tile) = world.city(city).and_then(|c| c.territories.get(1).copied()) else {
        return Ok(());
    };
    let Some(element) = world.map().tile(tile).map(|t| t.element) else {
        return Ok(());
    };
    world.add_building(player, Some(city), BuildingKind::barracks_for(element), tile)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_match_layout() {
        let sim = new_match(&MatchConfig::default()).unwrap();
        let world = sim.world();
        let players: Vec<_> = world.players().collect();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].controller, Controller::Human);
        assert_eq!(players[1].controller, Controller::Ai);
        assert_eq!(sim.ai().len(), 1);

        // 60x30 with two players: capitals at a quarter and a half.
        let human_city = world.city(players[0].cities[0]).unwrap();
        let ai_city = world.city(players[1].cities[0]).unwrap();
        assert_eq!(world.map().tile_at(15, 7), Some(human_city.tile));
        assert_eq!(world.map().tile_at(30, 15), Some(ai_city.tile));

        // Only the computer starts with a barracks, on its first neighbour.
        let barracks_tile = ai_city.territories[1];
        let barracks = world.get_building(barracks_tile).unwrap();
        let element = world.map().tile(barracks_tile).unwrap().element;
        assert_eq!(
            world.building(barracks).unwrap().kind,
            BuildingKind::barracks_for(element)
        );
        assert_eq!(human_city.buildings.len(), 0);
    }

    #[test]
    fn test_overrides_and_errors() {
        let config = MatchConfig {
            ai_players: 3,
            human: false,
            width: Some(20),
            height: Some(20),
            ..MatchConfig::default()
        };
        let sim = new_match(&config).unwrap();
        assert_eq!(sim.world().map().width(), 20);
        assert_eq!(sim.ai().len(), 3);

        let empty = MatchConfig {
            ai_players: 0,
            human: false,
            ..MatchConfig::default()
        };
        assert!(new_match(&empty).is_err());

        let cramped = MatchConfig {
            width: Some(0),
            ..MatchConfig::default()
        };
        assert!(matches!(new_match(&cramped), Err(GameError::InvalidRules(_))));
    }
}
