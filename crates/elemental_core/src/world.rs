//! The match world: entity arenas, command entry points and the tick phases.
//!
//! A tick is driven from outside in three calls:
//!
//! 1. [`World::update`] runs the logic phases in a fixed order: cities and
//!    their buildings, then units, then bullets, then players.
//! 2. [`World::step_physics`] moves bodies and reports bullet contacts to
//!    [`World::handle_contact`]. A host with its own physics engine calls
//!    `handle_contact` directly instead.
//! 3. [`World::end_tick`] drains the deferred action queue, reaps dead
//!    entities, runs the fairness rotation and returns the tick's events.
//!
//! Nothing is removed or replaced while the logic phases run; every
//! structural change goes through [`PendingAction`]s or the reap step.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::buildings::{self, Building, BuildingContext, BuildingId, BuildingKind, BuildingPayload};
use crate::city::{City, CityId};
use crate::clock::TickContext;
use crate::combat::{resolve_hit, Bullet, BulletId, EntityRef, HitOutcome};
use crate::data::GameRules;
use crate::element::ElementType;
use crate::error::{GameError, PlacementError, Result};
use crate::map::{Direction, HexMap, TileId};
use crate::math::{Fixed, Vec2Fixed};
use crate::physics::{find_contacts, Collider};
use crate::player::{Controller, Player, PlayerId, SciencePool};
use crate::rng::SimRng;
use crate::spatial::{SpatialEntry, SpatialHash};
use crate::storage::Arena;
use crate::tech::TechId;
use crate::units::{Surroundings, Unit, UnitId, UnitKind};

/// Structural change deferred to the end of the tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingAction {
    /// Replace a finished construction site with its target building.
    CompleteConstruction {
        /// The site.
        site: BuildingId,
    },
    /// Spawn a unit near a point.
    SpawnUnit {
        /// Owner.
        player: PlayerId,
        /// Kind to spawn.
        kind: UnitKind,
        /// Point before jitter.
        origin: Vec2Fixed,
    },
}

/// A bullet striking something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitEvent {
    /// The bullet.
    pub bullet: BulletId,
    /// What it hit.
    pub target: EntityRef,
    /// Damage dealt.
    pub damage: i32,
    /// Whether the target died.
    pub killed: bool,
}

/// Everything notable that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Buildings that replaced finished construction sites.
    pub constructions_completed: Vec<BuildingId>,
    /// Cities founded.
    pub cities_founded: Vec<CityId>,
    /// Cities that gained a citizen.
    pub population_growth: Vec<CityId>,
    /// Technologies completed.
    pub research_completed: Vec<(PlayerId, TechId)>,
    /// Units spawned.
    pub units_spawned: Vec<UnitId>,
    /// Bullets fired.
    pub shots_fired: Vec<BulletId>,
    /// Bullet hits.
    pub hits: Vec<HitEvent>,
    /// Units killed by bullets or statuses.
    pub units_killed: Vec<UnitId>,
    /// Buildings destroyed.
    pub buildings_destroyed: Vec<BuildingId>,
}

/// Parameters for firing a bullet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulletSpawn {
    /// Firing player.
    pub player: PlayerId,
    /// Element of the shot.
    pub element: ElementType,
    /// Spawn point.
    pub position: Vec2Fixed,
    /// Unit direction of travel.
    pub direction: Vec2Fixed,
    /// Base damage.
    pub damage: i32,
}

/// Neighbour order in which a new city claims its surroundings.
const CLAIM_ORDER: [Direction; 6] = [
    Direction::RightBottom,
    Direction::Bottom,
    Direction::LeftBottom,
    Direction::LeftTop,
    Direction::Top,
    Direction::RightTop,
];

/// All match state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    rules: GameRules,
    map: HexMap,
    players: Arena<PlayerId, Player>,
    cities: Arena<CityId, City>,
    buildings: Arena<BuildingId, Building>,
    units: Arena<UnitId, Unit>,
    bullets: Arena<BulletId, Bullet>,
    rng: SimRng,
    pending: Vec<PendingAction>,
    #[serde(skip)]
    events: TickEvents,
}

impl World {
    /// A world on a randomly generated map.
    #[must_use]
    pub fn new(rules: GameRules, seed: u64) -> Self {
        let mut rng = SimRng::new(seed);
        let map = HexMap::generate(
            rules.map.width,
            rules.map.height,
            Fixed::from_num(rules.map.tile_size),
            &mut rng,
        );
        Self::with_map(rules, map, rng)
    }

    /// A world on a prepared map.
    #[must_use]
    pub fn with_map(rules: GameRules, map: HexMap, rng: SimRng) -> Self {
        Self {
            rules,
            map,
            players: Arena::new(),
            cities: Arena::new(),
            buildings: Arena::new(),
            units: Arena::new(),
            bullets: Arena::new(),
            rng,
            pending: Vec::new(),
            events: TickEvents::default(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Ruleset.
    #[must_use]
    pub const fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Tile map.
    #[must_use]
    pub const fn map(&self) -> &HexMap {
        &self.map
    }

    /// Look up a player.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    /// Players in handle order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Look up a city.
    #[must_use]
    pub fn city(&self, id: CityId) -> Option<&City> {
        self.cities.get(id)
    }

    /// Cities in handle order.
    pub fn cities(&self) -> impl Iterator<Item = &City> {
        self.cities.values()
    }

    /// Look up a building.
    #[must_use]
    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id)
    }

    /// Buildings in handle order.
    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Units in handle order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Look up a bullet.
    #[must_use]
    pub fn bullet(&self, id: BulletId) -> Option<&Bullet> {
        self.bullets.get(id)
    }

    /// Bullets in handle order.
    pub fn bullets(&self) -> impl Iterator<Item = &Bullet> {
        self.bullets.values()
    }

    /// Actions waiting for the end of the tick.
    #[must_use]
    pub fn pending(&self) -> &[PendingAction] {
        &self.pending
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Whether `tile` belongs to `city`.
    #[must_use]
    pub fn has_territory(&self, city: CityId, tile: TileId) -> bool {
        self.cities.get(city).is_some_and(|c| c.has_territory(tile))
    }

    /// Building standing on `tile`.
    #[must_use]
    pub fn get_building(&self, tile: TileId) -> Option<BuildingId> {
        self.map.tile(tile).and_then(|t| t.building)
    }

    /// Tiles within `radius` neighbour steps of `tile`, excluding it.
    #[must_use]
    pub fn nearby_tiles(&self, tile: TileId, radius: u32) -> Vec<TileId> {
        self.map.nearby_tiles(tile, radius)
    }

    /// Whether every city center of `player` is at zero hit points.
    #[must_use]
    pub fn is_defeated(&self, player: PlayerId) -> bool {
        let Some(player) = self.players.get(player) else {
            return true;
        };
        player.cities.iter().all(|city| {
            self.cities
                .get(*city)
                .and_then(|c| self.buildings.get(c.center))
                .map_or(true, |center| center.hp <= 0)
        })
    }

    /// Check a construction order without performing it.
    pub fn check_placement(
        &self,
        city: CityId,
        kind: BuildingKind,
        tile: TileId,
    ) -> Result<()> {
        let owner = self
            .cities
            .get(city)
            .ok_or(GameError::InvalidCityId(city.raw()))?;
        let cell = self
            .map
            .tile(tile)
            .ok_or(GameError::InvalidTileId(tile.raw()))?;
        let player = self
            .players
            .get(owner.player)
            .ok_or(GameError::InvalidPlayerId(owner.player.raw()))?;
        let info = self.rules.building(kind);

        if !info.constructible {
            return Err(PlacementError::NotConstructible(kind).into());
        }
        if !player.can_build(kind) {
            return Err(PlacementError::Locked(kind).into());
        }
        if cell.building.is_some() {
            return Err(PlacementError::Occupied(tile.raw()).into());
        }

        if kind == BuildingKind::City {
            if cell.owner_city.is_some() {
                return Err(PlacementError::AlreadyClaimed(tile.raw()).into());
            }
            let reach = self.rules.economy.new_city_radius;
            if !self.map.nearby_tiles(owner.tile, reach).contains(&tile) {
                return Err(PlacementError::TooFar(tile.raw()).into());
            }
            return Ok(());
        }

        if !owner.has_territory(tile) {
            return Err(PlacementError::OutsideTerritory(tile.raw()).into());
        }
        if let Some(required) = info.required_element {
            if cell.element != required {
                return Err(PlacementError::WrongElement {
                    kind,
                    required,
                    found: cell.element,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Territory tiles where `kind` could be placed right now.
    #[must_use]
    pub fn construction_candidates(&self, city: CityId, kind: BuildingKind) -> Vec<TileId> {
        let Some(owner) = self.cities.get(city) else {
            return Vec::new();
        };
        owner
            .territories
            .iter()
            .copied()
            .filter(|tile| self.check_placement(city, kind, *tile).is_ok())
            .collect()
    }

    /// Tiles where `city` could found a new city right now.
    #[must_use]
    pub fn new_city_candidates(&self, city: CityId) -> Vec<TileId> {
        let Some(owner) = self.cities.get(city) else {
            return Vec::new();
        };
        self.map
            .nearby_tiles(owner.tile, self.rules.economy.new_city_radius)
            .into_iter()
            .filter(|tile| self.check_placement(city, BuildingKind::City, *tile).is_ok())
            .collect()
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Join a player. They own nothing until a city is founded for them.
    pub fn add_player(&mut self, name: impl Into<String>, controller: Controller) -> Result<PlayerId> {
        let id = self.players.next_id();
        let player = Player::new(id, name, controller, &self.rules)?;
        self.players.insert_with(|_| player);
        Ok(id)
    }

    /// Place a finished building without validation.
    ///
    /// City centers take `city = None` and found a new city on `tile`;
    /// everything else joins `city`. Construction sites go through
    /// [`World::add_construction`].
    pub fn add_building(
        &mut self,
        player: PlayerId,
        city: Option<CityId>,
        kind: BuildingKind,
        tile: TileId,
    ) -> Result<BuildingId> {
        if kind == BuildingKind::Construction {
            return Err(PlacementError::NotConstructible(kind).into());
        }
        if !self.players.contains(player) {
            return Err(GameError::InvalidPlayerId(player.raw()));
        }
        let cell = self
            .map
            .tile(tile)
            .ok_or(GameError::InvalidTileId(tile.raw()))?;
        let (element, position) = (cell.element, cell.position);

        if kind == BuildingKind::City {
            return Ok(self.found_city(player, tile, element, position));
        }

        let city = city.ok_or_else(|| GameError::InvalidState(format!("{kind:?} needs a city")))?;
        let owner = self
            .cities
            .get_mut(city)
            .ok_or(GameError::InvalidCityId(city.raw()))?;
        let rules = &self.rules;
        let id = self.buildings.insert_with(|id| {
            Building::new(id, kind, player, Some(city), tile, element, position, rules)
        });
        owner.buildings.push(id);
        if let Some(cell) = self.map.tile_mut(tile) {
            cell.building = Some(id);
        }
        debug!(building = id.raw(), ?kind, tile = tile.raw(), "Building placed");
        Ok(id)
    }

    fn found_city(
        &mut self,
        player: PlayerId,
        tile: TileId,
        element: ElementType,
        position: Vec2Fixed,
    ) -> BuildingId {
        let city_id = self.cities.next_id();
        let rules = &self.rules;
        let center = self.buildings.insert_with(|id| {
            let mut building =
                Building::new(id, BuildingKind::City, player, None, tile, element, position, rules);
            building.payload = BuildingPayload::City(city_id);
            building
        });

        let name = match self.players.get_mut(player) {
            Some(owner) => {
                owner.cities.push(city_id);
                format!("{} {}", owner.name, owner.cities.len())
            }
            None => format!("City {}", city_id.raw()),
        };

        // The center tile always belongs to its own city.
        if let Some(previous) = self.map.tile(tile).and_then(|t| t.owner_city) {
            if let Some(holder) = self.cities.get_mut(previous) {
                if holder.remove_territory(&mut self.map, tile) {
                    debug!(tile = tile.raw(), from = previous.raw(), "Tile ceded to new city");
                }
            }
        }
        let mut city = City::new(city_id, player, name, center, tile, &self.rules.economy);
        city.add_territory(&mut self.map, tile);
        let around: Vec<TileId> = self
            .map
            .tile(tile)
            .map(|t| CLAIM_ORDER.iter().filter_map(|d| t.neighbor(*d)).collect())
            .unwrap_or_default();
        for neighbor in around {
            city.add_territory(&mut self.map, neighbor);
        }
        info!(
            city = city_id.raw(),
            player = player.raw(),
            name = %city.name,
            territory = city.territories.len(),
            "City founded"
        );
        self.cities.insert_with(|_| city);

        if let Some(cell) = self.map.tile_mut(tile) {
            cell.building = Some(center);
        }
        self.events.cities_founded.push(city_id);
        center
    }

    /// Place a construction site without validation.
    pub fn add_construction(
        &mut self,
        city: CityId,
        target: BuildingKind,
        tile: TileId,
    ) -> Result<BuildingId> {
        let cell = self
            .map
            .tile(tile)
            .ok_or(GameError::InvalidTileId(tile.raw()))?;
        let (element, position) = (cell.element, cell.position);
        let owner = self
            .cities
            .get_mut(city)
            .ok_or(GameError::InvalidCityId(city.raw()))?;
        let player = owner.player;
        let rules = &self.rules;
        let id = self.buildings.insert_with(|id| {
            Building::construction(id, target, player, city, tile, element, position, rules)
        });
        owner.buildings.push(id);
        if let Some(cell) = self.map.tile_mut(tile) {
            cell.building = Some(id);
        }
        debug!(site = id.raw(), ?target, tile = tile.raw(), "Construction started");
        Ok(id)
    }

    /// Validate and place a construction site.
    pub fn place_construction(
        &mut self,
        city: CityId,
        kind: BuildingKind,
        tile: TileId,
    ) -> Result<BuildingId> {
        self.check_placement(city, kind, tile)?;
        self.add_construction(city, kind, tile)
    }

    /// Spawn a unit.
    pub fn add_unit(&mut self, player: PlayerId, position: Vec2Fixed, kind: UnitKind) -> Result<UnitId> {
        if !self.players.contains(player) {
            return Err(GameError::InvalidPlayerId(player.raw()));
        }
        let rules = &self.rules;
        let id = self
            .units
            .insert_with(|id| Unit::new(id, kind, player, position, rules));
        self.events.units_spawned.push(id);
        debug!(unit = id.raw(), player = player.raw(), ?kind, "Unit spawned");
        Ok(id)
    }

    /// Fire a bullet carrying the player's status payloads for its element.
    pub fn spawn_bullet(&mut self, spawn: BulletSpawn) -> Result<BulletId> {
        let payloads = self
            .players
            .get(spawn.player)
            .ok_or(GameError::InvalidPlayerId(spawn.player.raw()))?
            .status_payloads(spawn.element);
        let combat = &self.rules.combat;
        let id = self.bullets.insert_with(|id| Bullet {
            id,
            player: spawn.player,
            element: spawn.element,
            position: spawn.position,
            velocity: spawn.direction.scale(Fixed::from_num(combat.bullet_speed)),
            radius: Fixed::from_num(combat.bullet_radius),
            ttl: combat.bullet_ttl_ticks,
            damage: spawn.damage,
            payloads,
            dead: false,
        });
        self.events.shots_fired.push(id);
        Ok(id)
    }

    /// Enable or disable a building. Idempotent.
    pub fn set_building_enabled(&mut self, id: BuildingId, enabled: bool) -> Result<()> {
        self.buildings
            .get_mut(id)
            .ok_or(GameError::InvalidBuildingId(id.raw()))?
            .set_enabled(enabled);
        Ok(())
    }

    /// Make `tech` the player's research target.
    ///
    /// Returns `false` if it is already completed.
    pub fn start_researching(&mut self, player: PlayerId, tech: TechId) -> Result<bool> {
        self.players
            .get_mut(player)
            .ok_or(GameError::InvalidPlayerId(player.raw()))?
            .tech
            .start_researching(tech)
    }

    /// Stop researching `tech` and everything below it.
    pub fn stop_researching(&mut self, player: PlayerId, tech: TechId) -> Result<()> {
        self.players
            .get_mut(player)
            .ok_or(GameError::InvalidPlayerId(player.raw()))?
            .tech
            .stop_researching(tech)
    }

    // ------------------------------------------------------------------
    // Tick phases
    // ------------------------------------------------------------------

    /// Run the logic phases for one tick.
    pub fn update(&mut self, ctx: &TickContext) {
        self.update_cities(ctx);
        self.update_units(ctx);
        self.update_bullets();
        self.update_players(ctx);
    }

    fn update_cities(&mut self, ctx: &TickContext) {
        let Self {
            rules,
            map,
            players,
            cities,
            buildings,
            pending,
            events,
            ..
        } = self;
        let rules: &GameRules = rules;

        for city in cities.values_mut() {
            let outcome = city.begin_tick(ctx, &rules.economy);
            if outcome.grew {
                info!(
                    city = city.id.raw(),
                    population = city.pool.population,
                    "City grew"
                );
                events.population_growth.push(city.id);
                if rules.economy.annex_on_growth {
                    if let Some(tile) = city.annex_candidate(map) {
                        city.add_territory(map, tile);
                    }
                }
            }

            let Some(player) = players.get_mut(city.player) else {
                continue;
            };
            if outcome.turned {
                player.science.next_turn +=
                    SciencePool::city_yield(city.pool.population, &rules.economy);
            }

            for id in &city.buildings {
                let Some(building) = buildings.get_mut(*id) else {
                    continue;
                };
                let mut bctx = BuildingContext {
                    tick: ctx,
                    rules,
                    pool: &mut city.pool,
                    elements: &mut player.elements,
                    pending: &mut *pending,
                };
                buildings::update(building, &mut bctx);
            }

            trace!(
                city = city.id.raw(),
                free_production = city.pool.free_production,
                free_population = city.pool.free_population,
                surplus_food = city.pool.surplus_food,
                "City pool"
            );
        }
    }

    fn update_units(&mut self, ctx: &TickContext) {
        let cell_size = self.map.tile_size() * 2;
        let spatial = SpatialHash::from_entries(
            cell_size,
            self.units.values().filter(|u| !u.dead).map(|u| SpatialEntry {
                id: u.id,
                player: u.player,
                position: u.position(),
            }),
        );
        let cities: Vec<(PlayerId, Vec2Fixed)> = self
            .cities
            .values()
            .filter_map(|c| self.buildings.get(c.center))
            .map(|center| (center.player, center.position))
            .collect();

        let mut orders = Vec::new();
        let mut killed = Vec::new();
        {
            let around = Surroundings {
                spatial: &spatial,
                cities: &cities,
                search_reach: self.map.tile_size() * Fixed::from_num(self.rules.combat.search_tiles),
                rules: &self.rules.combat,
            };
            for (id, unit) in self.units.iter_mut() {
                if unit.dead {
                    continue;
                }
                if let Some(order) = unit.think(&around, &mut self.rng) {
                    orders.push(BulletSpawn {
                        player: unit.player,
                        element: unit.element,
                        position: order.origin,
                        direction: order.direction,
                        damage: unit.damage,
                    });
                }
                if unit.tick_status(ctx, &self.rules.combat) {
                    killed.push(*id);
                }
            }
        }

        for id in killed {
            debug!(unit = id.raw(), "Unit killed by status");
            self.events.units_killed.push(id);
        }
        for order in orders {
            // Shooters are live players; a failure here means the player vanished.
            if let Err(err) = self.spawn_bullet(order) {
                debug!(%err, "Shot dropped");
            }
        }
    }

    fn update_bullets(&mut self) {
        for (_, bullet) in self.bullets.iter_mut() {
            if !bullet.dead {
                bullet.age();
            }
        }
    }

    fn update_players(&mut self, ctx: &TickContext) {
        for (id, player) in self.players.iter_mut() {
            if ctx.turn {
                player.science.turn_over();
            }
            if let Some(tech) = player.tech.advance(&mut player.science, ctx) {
                let name = player.tech.node(tech).map_or("", |n| n.name.as_str());
                info!(player = id.raw(), tech = %name, "Technology researched");
                self.events.research_completed.push((*id, tech));
            }
        }
    }

    /// Integrate bodies and resolve bullet contacts.
    pub fn step_physics(&mut self, dt: Fixed) {
        for (_, unit) in self.units.iter_mut() {
            if !unit.dead {
                unit.body.integrate(dt);
            }
        }
        for (_, bullet) in self.bullets.iter_mut() {
            if !bullet.dead {
                bullet.position += bullet.velocity.scale(dt);
            }
        }

        let projectiles: Vec<Collider> = self
            .bullets
            .values()
            .filter(|b| !b.dead)
            .map(|b| Collider {
                entity: EntityRef::Bullet(b.id),
                position: b.position,
                radius: b.radius,
            })
            .collect();
        let building_radius = Fixed::from_num(self.rules.combat.building_radius);
        let targets: Vec<Collider> = self
            .units
            .values()
            .filter(|u| !u.dead)
            .map(|u| Collider {
                entity: EntityRef::Unit(u.id),
                position: u.position(),
                radius: u.body.radius,
            })
            .chain(self.buildings.values().filter(|b| !b.dead).map(|b| Collider {
                entity: EntityRef::Building(b.id),
                position: b.position,
                radius: building_radius,
            }))
            .collect();

        for (a, b) in find_contacts(&projectiles, &targets, self.map.tile_size() * 2) {
            self.handle_contact(a, b);
        }
    }

    /// Resolve a contact between two entities.
    ///
    /// Pairs without exactly one bullet, friendly pairs, spent bullets and
    /// unknown handles are ignored.
    pub fn handle_contact(&mut self, a: EntityRef, b: EntityRef) -> Option<HitOutcome> {
        let (bullet_id, target) = match (a, b) {
            (EntityRef::Bullet(_), EntityRef::Bullet(_)) => return None,
            (EntityRef::Bullet(id), other) | (other, EntityRef::Bullet(id)) => (id, other),
            _ => return None,
        };
        let bullet = self.bullets.get_mut(bullet_id)?;
        let combat = &self.rules.combat;

        let outcome = match target {
            EntityRef::Unit(id) => resolve_hit(bullet, self.units.get_mut(id)?, combat)?,
            EntityRef::Building(id) => resolve_hit(bullet, self.buildings.get_mut(id)?, combat)?,
            EntityRef::Bullet(_) => return None,
        };

        self.events.hits.push(HitEvent {
            bullet: bullet_id,
            target,
            damage: outcome.damage,
            killed: outcome.killed,
        });
        if outcome.killed {
            match target {
                EntityRef::Unit(id) => {
                    debug!(unit = id.raw(), "Unit killed");
                    self.events.units_killed.push(id);
                }
                EntityRef::Building(id) => {
                    debug!(building = id.raw(), "Building destroyed");
                    self.events.buildings_destroyed.push(id);
                }
                EntityRef::Bullet(_) => {}
            }
        }
        Some(outcome)
    }

    /// Drain deferred actions, reap the dead, rotate building order, and
    /// return the events collected since the last call.
    pub fn end_tick(&mut self) -> TickEvents {
        for action in std::mem::take(&mut self.pending) {
            match action {
                PendingAction::CompleteConstruction { site } => self.complete_construction(site),
                PendingAction::SpawnUnit {
                    player,
                    kind,
                    origin,
                } => {
                    let jitter = self.rules.combat.spawn_jitter;
                    let dx = self.rng.next_range(-jitter, jitter);
                    let dy = self.rng.next_range(-jitter, jitter);
                    let position = origin + Vec2Fixed::from_int(dx, dy);
                    if let Err(err) = self.add_unit(player, position, kind) {
                        debug!(%err, "Spawn dropped");
                    }
                }
            }
        }

        self.reap();

        let Self {
            cities, buildings, ..
        } = self;
        for city in cities.values_mut() {
            city.rotate(buildings);
        }

        std::mem::take(&mut self.events)
    }

    fn complete_construction(&mut self, site: BuildingId) {
        let Some(building) = self.buildings.get(site) else {
            return;
        };
        let (Some(target), Some(city)) = (building.construction_target(), building.city) else {
            return;
        };
        if building.dead {
            return;
        }
        let (player, tile) = (building.player, building.tile);

        self.remove_building(site);
        let owner = (target != BuildingKind::City).then_some(city);
        match self.add_building(player, owner, target, tile) {
            Ok(id) => {
                info!(
                    building = id.raw(),
                    kind = ?target,
                    tile = tile.raw(),
                    "Construction completed"
                );
                self.events.constructions_completed.push(id);
            }
            Err(err) => debug!(%err, "Construction replacement failed"),
        }
    }

    fn remove_building(&mut self, id: BuildingId) {
        let Some(building) = self.buildings.remove(id) else {
            return;
        };
        if let Some(city) = building.city.and_then(|c| self.cities.get_mut(c)) {
            city.buildings.retain(|b| *b != id);
        }
        if let Some(cell) = self.map.tile_mut(building.tile) {
            if cell.building == Some(id) {
                cell.building = None;
            }
        }
    }

    fn reap(&mut self) {
        self.units.reap(|u| u.dead);
        self.bullets.reap(|b| b.dead);

        let dead: Vec<BuildingId> = self
            .buildings
            .values()
            .filter(|b| b.dead)
            .map(|b| b.id)
            .collect();
        for id in dead {
            self.remove_building(id);
        }
    }

    /// Feed the state that matters for determinism into `hasher`.
    pub fn hash_state<H: Hasher>(&self, hasher: &mut H) {
        self.rng.hash(hasher);

        for player in self.players.values() {
            player.id.hash(hasher);
            player.science.hash(hasher);
            player.elements.hash(hasher);
            for node in player.tech.nodes() {
                node.completed.hash(hasher);
                node.researching.hash(hasher);
                node.research.accumulated.hash(hasher);
            }
        }
        for city in self.cities.values() {
            city.id.hash(hasher);
            city.pool.hash(hasher);
            city.territories.hash(hasher);
            city.buildings.hash(hasher);
        }
        for building in self.buildings.values() {
            building.id.hash(hasher);
            building.kind.hash(hasher);
            building.hp.hash(hasher);
            building.enabled.hash(hasher);
            building.productions.hash(hasher);
            building.ready_units.hash(hasher);
        }
        for unit in self.units.values() {
            unit.id.hash(hasher);
            unit.hp.hash(hasher);
            unit.body.hash(hasher);
            unit.target.hash(hasher);
            unit.find_timer.hash(hasher);
            unit.shoot_timer.hash(hasher);
            unit.status.hash(hasher);
        }
        for bullet in self.bullets.values() {
            bullet.id.hash(hasher);
            bullet.position.hash(hasher);
            bullet.ttl.hash(hasher);
        }
        self.pending.len().hash(hasher);
    }
}
