//! Cities: territory, resource pool and building order.

use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingId};
use crate::clock::TickContext;
use crate::data::EconomyRules;
use crate::economy::ResourcePool;
use crate::map::{HexMap, TileId};
use crate::player::PlayerId;
use crate::storage::{entity_id, Arena};

entity_id!(
    /// City handle.
    CityId
);

/// What happened to a city's pool at the start of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CityTick {
    /// A citizen was added.
    pub grew: bool,
    /// The pool rolled over.
    pub turned: bool,
}

/// A city.
///
/// Every tile in `territories` has its `owner_city` set to this city.
/// Buildings update in `buildings` order; the order changes only through
/// [`City::rotate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    /// Handle.
    pub id: CityId,
    /// Owning player.
    pub player: PlayerId,
    /// Display name.
    pub name: String,
    /// City center building.
    pub center: BuildingId,
    /// Tile of the city center.
    pub tile: TileId,
    /// Claimed tiles, center first.
    pub territories: Vec<TileId>,
    /// Resource pool.
    pub pool: ResourcePool,
    /// Buildings in update order.
    pub buildings: Vec<BuildingId>,
}

impl City {
    /// A new city with an empty territory.
    #[must_use]
    pub fn new(
        id: CityId,
        player: PlayerId,
        name: impl Into<String>,
        center: BuildingId,
        tile: TileId,
        rules: &EconomyRules,
    ) -> Self {
        Self {
            id,
            player,
            name: name.into(),
            center,
            tile,
            territories: Vec::new(),
            pool: ResourcePool::new(rules),
            buildings: Vec::new(),
        }
    }

    /// Whether `tile` is claimed by this city.
    #[must_use]
    pub fn has_territory(&self, tile: TileId) -> bool {
        self.territories.contains(&tile)
    }

    /// Claim a tile. Tiles owned by any city, and unknown tiles, are skipped.
    pub fn add_territory(&mut self, map: &mut HexMap, tile: TileId) -> bool {
        let Some(cell) = map.tile_mut(tile) else {
            return false;
        };
        if cell.owner_city.is_some() {
            return false;
        }
        cell.owner_city = Some(self.id);
        self.territories.push(tile);
        true
    }

    /// Give up a claimed tile. The center tile is never released.
    pub fn remove_territory(&mut self, map: &mut HexMap, tile: TileId) -> bool {
        if tile == self.tile {
            return false;
        }
        let Some(index) = self.territories.iter().position(|t| *t == tile) else {
            return false;
        };
        self.territories.remove(index);
        if let Some(cell) = map.tile_mut(tile) {
            cell.owner_city = None;
        }
        true
    }

    /// Lowest-id unclaimed tile adjacent to the territory. Tiles holding a
    /// building, such as a site for a new city, stay reserved.
    #[must_use]
    pub fn annex_candidate(&self, map: &HexMap) -> Option<TileId> {
        self.territories
            .iter()
            .filter_map(|id| map.tile(*id))
            .flat_map(|tile| tile.neighbors())
            .filter(|id| {
                map.tile(*id)
                    .is_some_and(|t| t.owner_city.is_none() && t.building.is_none())
            })
            .min()
    }

    /// Food growth, then the turn-over if this tick is a turn boundary.
    pub fn begin_tick(&mut self, ctx: &TickContext, rules: &EconomyRules) -> CityTick {
        let grew = self.pool.accumulate_food();
        if ctx.turn {
            self.pool.turn_over(rules);
        }
        CityTick {
            grew,
            turned: ctx.turn,
        }
    }

    /// Move low-priority buildings to the back, keeping relative order,
    /// then clear the markers.
    pub fn rotate(&mut self, buildings: &mut Arena<BuildingId, Building>) {
        let (mut front, back): (Vec<BuildingId>, Vec<BuildingId>) = self
            .buildings
            .iter()
            .copied()
            .partition(|id| buildings.get(*id).map_or(true, |b| !b.low_priority));
        front.extend(back);
        self.buildings = front;

        for id in &self.buildings {
            if let Some(building) = buildings.get_mut(*id) {
                building.low_priority = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::BuildingKind;
    use crate::data::GameRules;
    use crate::element::ElementType;
    use crate::math::{Fixed, Vec2Fixed};

    fn map() -> HexMap {
        HexMap::build(6, 6, Fixed::from_num(32), |_, _| ElementType::Grass)
    }

    fn city(map: &mut HexMap, center: TileId) -> City {
        let rules = GameRules::default();
        let mut city = City::new(CityId(1), PlayerId(1), "Capital", BuildingId(1), center, &rules.economy);
        city.add_territory(map, center);
        city
    }

    #[test]
    fn test_territory_ownership() {
        let mut map = map();
        let center = map.tile_at(2, 2).unwrap();
        let mut city = city(&mut map, center);
        assert!(city.has_territory(center));
        assert_eq!(map.tile(center).unwrap().owner_city, Some(CityId(1)));

        let mut rival = City::new(
            CityId(2),
            PlayerId(2),
            "Rival",
            BuildingId(2),
            center,
            &GameRules::default().economy,
        );
        assert!(!rival.add_territory(&mut map, center), "already claimed");
        assert!(!rival.has_territory(center));
        assert!(!city.add_territory(&mut map, TileId(999)));
    }

    #[test]
    fn test_annex_picks_lowest_adjacent() {
        let mut map = map();
        let center = map.tile_at(2, 2).unwrap();
        let mut city = city(&mut map, center);

        let expected = map.tile(center).unwrap().neighbors().min().unwrap();
        let pick = city.annex_candidate(&map).unwrap();
        assert_eq!(pick, expected);
        assert!(city.add_territory(&mut map, pick));
        assert_ne!(city.annex_candidate(&map), Some(pick));
    }

    #[test]
    fn test_annex_skips_occupied_tiles() {
        let mut map = map();
        let center = map.tile_at(2, 2).unwrap();
        let mut city = city(&mut map, center);

        let reserved = city.annex_candidate(&map).unwrap();
        map.tile_mut(reserved).unwrap().building = Some(BuildingId(9));
        let pick = city.annex_candidate(&map).unwrap();
        assert_ne!(pick, reserved);
        assert!(city.add_territory(&mut map, pick));
        assert_eq!(map.tile(reserved).unwrap().owner_city, None);
    }

    #[test]
    fn test_remove_territory_keeps_center() {
        let mut map = map();
        let center = map.tile_at(2, 2).unwrap();
        let mut city = city(&mut map, center);
        let edge = city.annex_candidate(&map).unwrap();
        city.add_territory(&mut map, edge);

        assert!(!city.remove_territory(&mut map, center));
        assert!(city.remove_territory(&mut map, edge));
        assert!(!city.remove_territory(&mut map, edge));
        assert_eq!(city.territories, vec![center]);
        assert_eq!(map.tile(edge).unwrap().owner_city, None);
    }

    #[test]
    fn test_rotation_is_stable_partition() {
        let rules = GameRules::default();
        let mut arena: Arena<BuildingId, Building> = Arena::new();
        let ids: Vec<BuildingId> = (0..4)
            .map(|i| {
                arena.insert_with(|id| {
                    let mut b = Building::new(
                        id,
                        BuildingKind::Farm,
                        PlayerId(1),
                        Some(CityId(1)),
                        TileId(i),
                        ElementType::Grass,
                        Vec2Fixed::ZERO,
                        &rules,
                    );
                    b.low_priority = i % 2 == 0;
                    b
                })
            })
            .collect();

        let mut map = map();
        let mut city = city(&mut map, TileId(0));
        city.buildings = ids.clone();
        city.rotate(&mut arena);

        assert_eq!(city.buildings, vec![ids[1], ids[3], ids[0], ids[2]]);
        assert!(arena.values().all(|b| !b.low_priority));
    }

    #[test]
    fn test_turn_boundary() {
        let rules = GameRules::default();
        let mut map = map();
        let mut city = city(&mut map, TileId(0));
        let outcome = city.begin_tick(&TickContext::at(1, &rules.tempo), &rules.economy);
        assert!(outcome.turned);
        assert!(!outcome.grew);
        assert_eq!(city.pool.free_production, 10);
    }
}
