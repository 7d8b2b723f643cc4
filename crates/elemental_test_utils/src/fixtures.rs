//! Test fixtures and helpers.
//!
//! Pre-built worlds and matches for consistent testing. Maps built here
//! use a column pattern instead of random elements so tests can reason
//! about which tiles accept which buildings.

use elemental_core::buildings::BuildingKind;
use elemental_core::city::CityId;
use elemental_core::data::GameRules;
use elemental_core::element::ElementType;
use elemental_core::map::HexMap;
use elemental_core::player::{Controller, PlayerId};
use elemental_core::rng::SimRng;
use elemental_core::scenario::{new_match, MatchConfig, PolicyChoice};
use elemental_core::simulation::Simulation;
use elemental_core::world::World;
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A map whose columns cycle Fire, Water, Grass.
#[must_use]
pub fn striped_map(width: u32, height: u32) -> HexMap {
    HexMap::build(width, height, fixed(32), |x, _| {
        ElementType::from_index(x as usize)
    })
}

/// An empty world on a 16x16 striped map.
#[must_use]
pub fn striped_world(rules: GameRules) -> World {
    World::with_map(rules, striped_map(16, 16), SimRng::new(42))
}

/// Join a player and found their capital at `(x, y)`.
///
/// # Panics
///
/// Panics if the tile is missing or already taken.
pub fn add_capital(world: &mut World, name: &str, controller: Controller, x: u32, y: u32) -> (PlayerId, CityId) {
    let player = world.add_player(name, controller).expect("player");
    let tile = world.map().tile_at(x, y).expect("tile on map");
    world
        .add_building(player, None, BuildingKind::City, tile)
        .expect("capital");
    let city = *world
        .player(player)
        .and_then(|p| p.cities.last())
        .expect("city founded");
    (player, city)
}

/// Two rival capitals far apart on a striped map.
#[must_use]
pub fn two_capitals() -> (World, (PlayerId, CityId), (PlayerId, CityId)) {
    let mut world = striped_world(GameRules::default());
    let human = add_capital(&mut world, "Player", Controller::Human, 3, 3);
    let rival = add_capital(&mut world, "AI 1", Controller::Ai, 12, 12);
    (world, human, rival)
}

/// A small scripted match: one human and two computer players.
///
/// # Panics
///
/// Panics if the built-in rules fail to build a match.
#[must_use]
pub fn scripted_match(seed: u64) -> Simulation {
    new_match(&MatchConfig {
        seed,
        ai_players: 2,
        width: Some(24),
        height: Some(16),
        policy: PolicyChoice::Scripted(vec![
            BuildingKind::Farm,
            BuildingKind::ElementCollector,
            BuildingKind::SteamMachine,
            BuildingKind::WaterWheel,
        ]),
        ..MatchConfig::default()
    })
    .expect("scripted match")
}

/// The default random-policy match for a seed.
///
/// # Panics
///
/// Panics if the built-in rules fail to build a match.
#[must_use]
pub fn random_match(seed: u64) -> Simulation {
    new_match(&MatchConfig {
        seed,
        ..MatchConfig::default()
    })
    .expect("random match")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_striped_map_columns() {
        let map = striped_map(6, 2);
        let elements: Vec<_> = (0..6)
            .map(|x| map.tile(map.tile_at(x, 0).unwrap()).unwrap().element)
            .collect();
        assert_eq!(
            elements,
            vec![
                ElementType::Fire,
                ElementType::Water,
                ElementType::Grass,
                ElementType::Fire,
                ElementType::Water,
                ElementType::Grass,
            ]
        );
    }

    #[test]
    fn test_two_capitals() {
        let (world, (p1, c1), (p2, c2)) = two_capitals();
        assert_ne!(p1, p2);
        assert_eq!(world.city(c1).unwrap().territories.len(), 7);
        assert_eq!(world.city(c2).unwrap().player, p2);
    }

    #[test]
    fn test_scripted_match_builds() {
        let sim = scripted_match(5);
        assert_eq!(sim.ai().len(), 2);
        assert_eq!(sim.world().map().width(), 24);
    }
}
