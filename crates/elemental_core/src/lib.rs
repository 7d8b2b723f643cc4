//! # Elemental Core
//!
//! Deterministic simulation core for Elemental Wars, a hex-tile real-time
//! strategy game about cities, three elements and the elementals they train.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`world`] - Entity arenas, commands and the tick phases
//! - [`simulation`] - Clock, AI and world driven together
//! - [`economy`] / [`production`] - City pools and production queues
//! - [`buildings`] / [`city`] - Building behaviors and city territory
//! - [`tech`] - Technology tree and research
//! - [`units`] / [`combat`] - Unit AI, bullets, statuses and hits
//! - [`data`] - Rules and catalogs, loadable from RON
//! - [`scenario`] - Match setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod buildings;
pub mod city;
pub mod clock;
pub mod combat;
pub mod data;
pub mod economy;
pub mod element;
pub mod error;
pub mod map;
pub mod math;
pub mod physics;
pub mod player;
pub mod production;
pub mod rng;
pub mod scenario;
pub mod simulation;
pub mod spatial;
pub mod storage;
pub mod tech;
pub mod units;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiController, BuildOrder, BuildPolicy, FixedBuildPolicy, Policy, RandomBuildPolicy};
    pub use crate::buildings::{Building, BuildingId, BuildingKind};
    pub use crate::city::{City, CityId};
    pub use crate::clock::{SimClock, TickContext, TICK_RATE};
    pub use crate::combat::{BulletId, EntityRef, StatusKind, StatusPayload};
    pub use crate::data::GameRules;
    pub use crate::element::ElementType;
    pub use crate::error::{GameError, PlacementError, Result};
    pub use crate::map::{HexMap, TileId};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::player::{Controller, PlayerId};
    pub use crate::rng::SimRng;
    pub use crate::scenario::{new_match, MatchConfig, PolicyChoice};
    pub use crate::simulation::Simulation;
    pub use crate::tech::TechId;
    pub use crate::units::{UnitId, UnitKind};
    pub use crate::world::{BulletSpawn, TickEvents, World};
}
