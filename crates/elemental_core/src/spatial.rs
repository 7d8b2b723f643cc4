//! Box queries over unit positions.
//!
//! Target search asks "which units lie inside this box" through the
//! [`SpatialQuery`] trait. A host with its own physics world can answer
//! that directly; headless runs use the bucket grid in [`SpatialHash`].

use std::collections::BTreeMap;

use crate::math::{Fixed, Vec2Fixed};
use crate::player::PlayerId;
use crate::units::UnitId;

/// One unit as seen by a spatial query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialEntry {
    /// Unit handle.
    pub id: UnitId,
    /// Owning player.
    pub player: PlayerId,
    /// Position when the index was built.
    pub position: Vec2Fixed,
}

/// Axis-aligned box query.
pub trait SpatialQuery {
    /// Units inside `[min, max]`, ordered by handle.
    fn query_box(&self, min: Vec2Fixed, max: Vec2Fixed) -> Vec<SpatialEntry>;
}

/// Uniform bucket grid.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: Fixed,
    buckets: BTreeMap<(i32, i32), Vec<SpatialEntry>>,
    len: usize,
}

impl SpatialHash {
    /// Empty grid. Non-positive cell sizes fall back to one world unit.
    #[must_use]
    pub fn new(cell_size: Fixed) -> Self {
        Self {
            cell_size: if cell_size > Fixed::ZERO {
                cell_size
            } else {
                Fixed::ONE
            },
            buckets: BTreeMap::new(),
            len: 0,
        }
    }

    /// Grid built from a set of entries.
    #[must_use]
    pub fn from_entries(cell_size: Fixed, entries: impl IntoIterator<Item = SpatialEntry>) -> Self {
        let mut grid = Self::new(cell_size);
        for entry in entries {
            grid.insert(entry);
        }
        grid
    }

    fn cell(&self, position: Vec2Fixed) -> (i32, i32) {
        (
            (position.x / self.cell_size).floor().to_num::<i32>(),
            (position.y / self.cell_size).floor().to_num::<i32>(),
        )
    }

    /// Add an entry.
    pub fn insert(&mut self, entry: SpatialEntry) {
        let cell = self.cell(entry.position);
        self.buckets.entry(cell).or_default().push(entry);
        self.len += 1;
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the grid is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl SpatialQuery for SpatialHash {
    fn query_box(&self, min: Vec2Fixed, max: Vec2Fixed) -> Vec<SpatialEntry> {
        let (x0, y0) = self.cell(min);
        let (x1, y1) = self.cell(max);

        let mut found: Vec<SpatialEntry> = Vec::new();
        for x in x0..=x1 {
            for (_, bucket) in self.buckets.range((x, y0)..=(x, y1)) {
                found.extend(bucket.iter().filter(|e| e.position.within(min, max)));
            }
        }
        found.sort_by_key(|e| e.id);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, player: u32, x: i32, y: i32) -> SpatialEntry {
        SpatialEntry {
            id: UnitId(id),
            player: PlayerId(player),
            position: Vec2Fixed::from_int(x, y),
        }
    }

    #[test]
    fn test_query_box() {
        let grid = SpatialHash::from_entries(
            Fixed::from_num(64),
            [
                entry(3, 1, 10, 10),
                entry(1, 2, 70, 10),
                entry(2, 2, 500, 500),
                entry(4, 1, -20, -5),
            ],
        );
        assert_eq!(grid.len(), 4);

        let hits = grid.query_box(Vec2Fixed::from_int(-30, -30), Vec2Fixed::from_int(100, 100));
        let ids: Vec<_> = hits.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn test_box_edges_inclusive() {
        let grid = SpatialHash::from_entries(Fixed::from_num(64), [entry(1, 1, 64, 64)]);
        let hits = grid.query_box(Vec2Fixed::from_int(0, 0), Vec2Fixed::from_int(64, 64));
        assert_eq!(hits.len(), 1);
        let misses = grid.query_box(Vec2Fixed::from_int(0, 0), Vec2Fixed::from_int(63, 63));
        assert!(misses.is_empty());
    }
}
