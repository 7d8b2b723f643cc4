//! Error types for the game simulation.
//!
//! The tick itself never fails: resource shortfalls are zero grants and
//! worker shortfalls are `false`. These errors cover the edges around it:
//! bad handles passed to command entry points, rules that fail to parse
//! or validate, and snapshot encoding.

use thiserror::Error;

use crate::buildings::BuildingKind;
use crate::element::ElementType;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid player handle.
    #[error("Invalid player ID: {0}")]
    InvalidPlayerId(u32),

    /// Invalid city handle.
    #[error("Invalid city ID: {0}")]
    InvalidCityId(u32),

    /// Invalid building handle.
    #[error("Invalid building ID: {0}")]
    InvalidBuildingId(u32),

    /// Invalid unit handle.
    #[error("Invalid unit ID: {0}")]
    InvalidUnitId(u32),

    /// Invalid tile handle.
    #[error("Invalid tile ID: {0}")]
    InvalidTileId(u32),

    /// Invalid technology handle.
    #[error("Invalid technology ID: {0}")]
    InvalidTechId(u32),

    /// Rules text failed to parse.
    #[error("Failed to parse rules: {0}")]
    RulesParse(#[from] ron::error::SpannedError),

    /// Rules parsed but are inconsistent.
    #[error("Invalid rules: {0}")]
    InvalidRules(String),

    /// Rules could not be written out.
    #[error("Failed to write rules: {0}")]
    RulesWrite(#[from] ron::Error),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// A validated command was rejected.
    #[error(transparent)]
    Placement(#[from] PlacementError),
}

/// Why a [`place_construction`](crate::world::World::place_construction)
/// command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The tile already hosts a building or construction site.
    #[error("Tile {0} is already occupied")]
    Occupied(u32),

    /// The tile is not inside the city's territory.
    #[error("Tile {0} is outside the city's territory")]
    OutsideTerritory(u32),

    /// The tile belongs to a city, so no new city can be founded there.
    #[error("Tile {0} is already claimed by a city")]
    AlreadyClaimed(u32),

    /// A new city must be founded near the founding city.
    #[error("Tile {0} is too far from the founding city")]
    TooFar(u32),

    /// The building needs a tile of a specific element.
    #[error("{kind:?} requires a {required:?} tile, found {found:?}")]
    WrongElement {
        /// Building being placed.
        kind: BuildingKind,
        /// Element the building needs.
        required: ElementType,
        /// Element of the chosen tile.
        found: ElementType,
    },

    /// The building kind cannot be constructed directly.
    #[error("{0:?} cannot be constructed")]
    NotConstructible(BuildingKind),

    /// The owning player has not researched the unlocking technology.
    #[error("{0:?} is locked behind research")]
    Locked(BuildingKind),
}
