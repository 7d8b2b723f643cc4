//! Building records and their per-kind update functions.
//!
//! Every building is one [`Building`] record with a [`BuildingKind`]
//! discriminant and a kind-specific [`BuildingPayload`]. Behavior is
//! dispatched through a table indexed by kind.
//!
//! # Flags
//!
//! - `enabled`: disabled buildings are skipped entirely.
//! - `working`: the building drew resources (or a worker) this tick.
//! - `low_priority`: the building yields its place in the city's list at
//!   end of tick; set whenever it drew resources and whenever it is disabled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::{TickContext, TICK_RATE};
use crate::city::CityId;
use crate::combat::{Damageable, StatusPayload};
use crate::data::{CombatRules, GameRules, WorkerYield};
use crate::economy::ResourcePool;
use crate::element::ElementType;
use crate::map::TileId;
use crate::math::Vec2Fixed;
use crate::player::{ElementStock, PlayerId};
use crate::production::{Advance, Production, ProductionTarget};
use crate::storage::entity_id;
use crate::units::UnitKind;
use crate::world::PendingAction;

entity_id!(
    /// Building handle.
    BuildingId
);

/// Building discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    /// Site accumulating production toward another building.
    Construction,
    /// City center.
    City,
    /// Collects the tile's element into the player's stock.
    ElementCollector,
    /// Trains Fire Elementals.
    FireBarracks,
    /// Trains Water Elementals.
    WaterBarracks,
    /// Trains Grass Elementals.
    GrassBarracks,
    /// Worker building yielding production.
    SteamMachine,
    /// Worker building yielding production.
    WaterWheel,
    /// Worker building yielding food.
    Farm,
}

impl BuildingKind {
    /// All kinds in catalog order.
    pub const ALL: [Self; 9] = [
        Self::Construction,
        Self::City,
        Self::ElementCollector,
        Self::FireBarracks,
        Self::WaterBarracks,
        Self::GrassBarracks,
        Self::SteamMachine,
        Self::WaterWheel,
        Self::Farm,
    ];

    /// Number of kinds.
    pub const COUNT: usize = Self::ALL.len();

    /// Catalog index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Barracks that trains the elemental of `element`.
    #[must_use]
    pub const fn barracks_for(element: ElementType) -> Self {
        match element {
            ElementType::Fire => Self::FireBarracks,
            ElementType::Water => Self::WaterBarracks,
            ElementType::Grass => Self::GrassBarracks,
        }
    }
}

/// Kind-specific building state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingPayload {
    /// No extra state.
    None,
    /// Construction site for `target`.
    Construction {
        /// Building that replaces the site.
        target: BuildingKind,
    },
    /// City center of this city.
    City(CityId),
    /// Element collector timer.
    Collector {
        /// Ticks since the last collection.
        elapsed_ticks: u32,
    },
}

/// A building on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Handle.
    pub id: BuildingId,
    /// Discriminant.
    pub kind: BuildingKind,
    /// Owning player.
    pub player: PlayerId,
    /// Owning city. `None` for city centers, which the player owns.
    pub city: Option<CityId>,
    /// Tile the building stands on.
    pub tile: TileId,
    /// Element of that tile; used as the defending element.
    pub element: ElementType,
    /// World position.
    pub position: Vec2Fixed,
    /// Hit points.
    pub hp: i32,
    /// Maximum hit points.
    pub hp_max: i32,
    /// Updates run only while enabled.
    pub enabled: bool,
    /// Drew resources this tick.
    pub working: bool,
    /// Yields list position at end of tick.
    pub low_priority: bool,
    /// Awaiting removal.
    pub dead: bool,
    /// Active production entries.
    pub productions: Vec<Production>,
    /// Units finished and waiting for the next round.
    pub ready_units: BTreeMap<UnitKind, u32>,
    /// Kind-specific state.
    pub payload: BuildingPayload,
}

impl Building {
    /// A new building with full hit points and catalog-driven productions.
    ///
    /// Construction sites start at 1 hp and are built up as they progress.
    #[must_use]
    pub fn new(
        id: BuildingId,
        kind: BuildingKind,
        player: PlayerId,
        city: Option<CityId>,
        tile: TileId,
        element: ElementType,
        position: Vec2Fixed,
        rules: &GameRules,
    ) -> Self {
        let info = rules.building(kind);
        let mut productions = Vec::new();
        if let Some(unit) = info.produces {
            productions.push(Production::new(
                ProductionTarget::Unit(unit),
                rules.unit(unit).cost,
                true,
                true,
            ));
        }
        let payload = match kind {
            BuildingKind::ElementCollector => BuildingPayload::Collector { elapsed_ticks: 0 },
            _ => BuildingPayload::None,
        };

        Self {
            id,
            kind,
            player,
            city,
            tile,
            element,
            position,
            hp: info.hp_max,
            hp_max: info.hp_max,
            enabled: true,
            working: false,
            low_priority: false,
            dead: false,
            productions,
            ready_units: BTreeMap::new(),
            payload,
        }
    }

    /// A construction site that becomes `target` once finished.
    #[must_use]
    pub fn construction(
        id: BuildingId,
        target: BuildingKind,
        player: PlayerId,
        city: CityId,
        tile: TileId,
        element: ElementType,
        position: Vec2Fixed,
        rules: &GameRules,
    ) -> Self {
        let info = rules.building(target);
        let mut site = Self::new(
            id,
            BuildingKind::Construction,
            player,
            Some(city),
            tile,
            element,
            position,
            rules,
        );
        site.hp = 1;
        site.hp_max = info.hp_max;
        site.productions.push(Production::new(
            ProductionTarget::Building(target),
            info.need_production,
            false,
            false,
        ));
        site.payload = BuildingPayload::Construction { target };
        site
    }

    /// Target of a construction site.
    #[must_use]
    pub const fn construction_target(&self) -> Option<BuildingKind> {
        match self.payload {
            BuildingPayload::Construction { target } => Some(target),
            _ => None,
        }
    }

    /// City this center belongs to, for city centers.
    #[must_use]
    pub const fn city_center_of(&self) -> Option<CityId> {
        match self.payload {
            BuildingPayload::City(city) => Some(city),
            _ => None,
        }
    }

    /// Enable or disable. Disabling stops work and yields priority at once.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.working = false;
            self.low_priority = true;
        }
    }
}

impl Damageable for Building {
    fn owner(&self) -> PlayerId {
        self.player
    }

    fn defender_element(&self) -> ElementType {
        self.element
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn apply_damage(&mut self, amount: i32) -> bool {
        self.hp -= amount;
        if self.hp > 0 {
            return false;
        }
        if self.kind == BuildingKind::City {
            // City centers persist at zero.
            self.hp = 0;
            return false;
        }
        self.dead = true;
        true
    }

    fn apply_status(&mut self, _payload: StatusPayload, _rules: &CombatRules) -> bool {
        false
    }
}

/// Everything a building update may touch besides the building itself.
pub struct BuildingContext<'a> {
    /// This tick's signals.
    pub tick: &'a TickContext,
    /// Ruleset.
    pub rules: &'a GameRules,
    /// The owning city's pool.
    pub pool: &'a mut ResourcePool,
    /// The owning player's element stock.
    pub elements: &'a mut ElementStock,
    /// End-of-tick action queue.
    pub pending: &'a mut Vec<PendingAction>,
}

type UpdateFn = fn(&mut Building, &mut BuildingContext<'_>);

/// Per-kind update functions, indexed by [`BuildingKind::index`].
const UPDATERS: [UpdateFn; BuildingKind::COUNT] = [
    update_construction,
    update_city_center,
    update_collector,
    update_barracks,
    update_barracks,
    update_barracks,
    update_worker,
    update_worker,
    update_worker,
];

/// Run one tick of a building's behavior.
///
/// Ready units leave on the round even while the building is disabled.
pub fn update(building: &mut Building, ctx: &mut BuildingContext<'_>) {
    if building.dead {
        return;
    }
    if building.enabled {
        UPDATERS[building.kind.index()](building, ctx);
    }
    if ctx.tick.round {
        release_ready_units(building, ctx.pending);
    }
}

fn release_ready_units(building: &mut Building, pending: &mut Vec<PendingAction>) {
    for (kind, count) in std::mem::take(&mut building.ready_units) {
        for _ in 0..count {
            pending.push(PendingAction::SpawnUnit {
                player: building.player,
                kind,
                origin: building.position,
            });
        }
    }
}

fn update_construction(building: &mut Building, ctx: &mut BuildingContext<'_>) {
    building.working = false;
    let Some(entry) = building.productions.first_mut() else {
        return;
    };
    // Already scheduled for replacement.
    if entry.is_complete() {
        return;
    }

    let outcome = entry.advance(ctx.pool, ctx.tick);
    let gained = entry.delta;
    let need = i64::from(entry.target_amount.max(1));
    if gained > 0 {
        let hp_gain = i64::from(gained) * i64::from(building.hp_max) / need;
        building.hp = (building.hp + hp_gain as i32).min(building.hp_max);
        building.working = true;
    }
    building.low_priority = building.working;

    if outcome == Advance::Completed {
        ctx.pending.push(PendingAction::CompleteConstruction {
            site: building.id,
        });
    }
}

fn update_city_center(_building: &mut Building, _ctx: &mut BuildingContext<'_>) {
    // City turn-over runs on the city itself before its buildings.
}

fn update_collector(building: &mut Building, ctx: &mut BuildingContext<'_>) {
    if let BuildingPayload::Collector { elapsed_ticks } = &mut building.payload {
        *elapsed_ticks += 1;
        if *elapsed_ticks >= TICK_RATE {
            *elapsed_ticks = 0;
            ctx.elements.add(building.element, 1);
        }
    }
    building.working = true;
}

fn update_worker(building: &mut Building, ctx: &mut BuildingContext<'_>) {
    let Some(worker_yield) = ctx.rules.building(building.kind).worker_yield else {
        building.working = false;
        return;
    };

    building.working = ctx.pool.apply_population();
    if building.working {
        match worker_yield {
            WorkerYield::Production(amount) => ctx.pool.add_production_next_turn(amount),
            WorkerYield::Food(amount) => ctx.pool.add_food_next_turn(amount),
        }
    }
    building.low_priority = building.working;
}

fn update_barracks(building: &mut Building, ctx: &mut BuildingContext<'_>) {
    let mut drew = false;
    for entry in &mut building.productions {
        match entry.advance(ctx.pool, ctx.tick) {
            Advance::Completed => {
                if let ProductionTarget::Unit(kind) = entry.target {
                    *building.ready_units.entry(kind).or_insert(0) += 1;
                }
                drew = true;
            }
            Advance::Progressed(granted) => drew |= granted > 0,
            Advance::Stalled => {}
        }
    }
    building.working = drew;
    building.low_priority = drew;
}
