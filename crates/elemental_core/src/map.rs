//! Hex tile map.
//!
//! Tiles sit in an offset-column layout: odd columns are shifted half a
//! row down, so each tile touches up to six neighbours (left-top, top,
//! right-top, left-bottom, bottom, right-bottom). Tile handles are
//! `y * width + x`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingId;
use crate::city::CityId;
use crate::element::ElementType;
use crate::math::{fixed_sqrt, fixed_serde, Fixed, Vec2Fixed};
use crate::rng::SimRng;

/// Tile handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileId(pub u32);

impl TileId {
    /// Raw handle value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Neighbour slot around a hex tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Upper-left neighbour.
    LeftTop,
    /// Neighbour directly above.
    Top,
    /// Upper-right neighbour.
    RightTop,
    /// Lower-left neighbour.
    LeftBottom,
    /// Neighbour directly below.
    Bottom,
    /// Lower-right neighbour.
    RightBottom,
}

impl Direction {
    /// All six directions in scan order.
    pub const ALL: [Self; 6] = [
        Self::LeftTop,
        Self::Top,
        Self::RightTop,
        Self::LeftBottom,
        Self::Bottom,
        Self::RightBottom,
    ];

    const fn slot(self) -> usize {
        match self {
            Self::LeftTop => 0,
            Self::Top => 1,
            Self::RightTop => 2,
            Self::LeftBottom => 3,
            Self::Bottom => 4,
            Self::RightBottom => 5,
        }
    }
}

/// One map cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Handle.
    pub id: TileId,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Elemental affinity.
    pub element: ElementType,
    /// World-space center.
    pub position: Vec2Fixed,
    /// City whose territory contains this tile.
    pub owner_city: Option<CityId>,
    /// Building standing on this tile.
    pub building: Option<BuildingId>,
    /// Selection affordance for a host UI.
    pub highlighted: bool,
    neighbors: [Option<TileId>; 6],
}

impl Tile {
    /// Neighbour in one direction, if it exists.
    #[must_use]
    pub const fn neighbor(&self, direction: Direction) -> Option<TileId> {
        self.neighbors[direction.slot()]
    }

    /// Existing neighbours in [`Direction::ALL`] order.
    pub fn neighbors(&self) -> impl Iterator<Item = TileId> + '_ {
        self.neighbors.iter().flatten().copied()
    }
}

/// The tile grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexMap {
    width: u32,
    height: u32,
    #[serde(with = "fixed_serde")]
    tile_size: Fixed,
    tiles: Vec<Tile>,
}

impl HexMap {
    /// Generate a map with uniformly random tile elements.
    #[must_use]
    pub fn generate(width: u32, height: u32, tile_size: Fixed, rng: &mut SimRng) -> Self {
        Self::build(width, height, tile_size, |_, _| {
            ElementType::from_index(rng.next_index(3))
        })
    }

    /// Build a map whose elements come from `element_at(x, y)`.
    #[must_use]
    pub fn build(
        width: u32,
        height: u32,
        tile_size: Fixed,
        mut element_at: impl FnMut(u32, u32) -> ElementType,
    ) -> Self {
        // Row pitch of a flat-top hex: size * sqrt(3) / 2.
        let row_height = tile_size * fixed_sqrt(Fixed::from_num(3)) / 2;
        let column_width = tile_size * 3 / 4;

        let mut tiles = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let mut py = row_height * Fixed::from_num(y);
                if x % 2 == 1 {
                    py += row_height / 2;
                }
                tiles.push(Tile {
                    id: TileId(y * width + x),
                    x,
                    y,
                    element: element_at(x, y),
                    position: Vec2Fixed::new(column_width * Fixed::from_num(x), py),
                    owner_city: None,
                    building: None,
                    highlighted: false,
                    neighbors: neighbor_ids(x, y, width, height),
                });
            }
        }

        Self {
            width,
            height,
            tile_size,
            tiles,
        }
    }

    /// Columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Tile edge size in world units.
    #[must_use]
    pub const fn tile_size(&self) -> Fixed {
        self.tile_size
    }

    /// Number of tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the map has no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Look up a tile.
    #[must_use]
    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.0 as usize)
    }

    /// Look up a tile mutably.
    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(id.0 as usize)
    }

    /// Tile at grid coordinates.
    #[must_use]
    pub fn tile_at(&self, x: u32, y: u32) -> Option<TileId> {
        (x < self.width && y < self.height).then(|| TileId(y * self.width + x))
    }

    /// All tiles in handle order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Tiles within `radius` neighbour steps of `center`, excluding it.
    ///
    /// Ordered ring by ring, each ring in discovery order.
    #[must_use]
    pub fn nearby_tiles(&self, center: TileId, radius: u32) -> Vec<TileId> {
        let mut found: Vec<TileId> = Vec::new();
        let mut seen: BTreeSet<TileId> = BTreeSet::from([center]);
        let mut frontier = vec![center];

        for _ in 0..radius {
            let mut next = Vec::new();
            for id in frontier {
                let Some(tile) = self.tile(id) else {
                    continue;
                };
                for neighbor in tile.neighbors() {
                    if seen.insert(neighbor) {
                        found.push(neighbor);
                        next.push(neighbor);
                    }
                }
            }
            frontier = next;
        }

        found
    }
}

fn neighbor_ids(x: u32, y: u32, width: u32, height: u32) -> [Option<TileId>; 6] {
    let id = y * width + x;
    let at = |cond: bool, value: u32| cond.then_some(TileId(value));
    let left = x > 0;
    let right = x + 1 < width;
    let up = y > 0;
    let down = y + 1 < height;

    let (lt, rt, lb, rb) = if x % 2 == 0 {
        (
            at(left && up, id.wrapping_sub(width + 1)),
            at(right && up, id.wrapping_sub(width).wrapping_add(1)),
            at(left, id.wrapping_sub(1)),
            at(right, id + 1),
        )
    } else {
        (
            at(left, id.wrapping_sub(1)),
            at(right, id + 1),
            at(left && down, id + width - 1),
            at(right && down, id + width + 1),
        )
    };

    [
        lt,
        at(up, id.wrapping_sub(width)),
        rt,
        lb,
        at(down, id + width),
        rb,
    ]
}
