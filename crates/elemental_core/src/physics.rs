//! Minimal kinematics and circle contacts.
//!
//! Enough physics to run matches without a host engine: unit bodies
//! integrate accumulated forces, bullets fly at constant velocity, and
//! bullet-versus-target overlaps are reported as contact pairs that go
//! through the same handler a host engine would call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::EntityRef;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// A dynamic circle body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Body {
    /// Center in world units.
    pub position: Vec2Fixed,
    /// World units per second.
    pub velocity: Vec2Fixed,
    /// Force accumulated this tick.
    pub force: Vec2Fixed,
    /// Mass.
    #[serde(with = "fixed_serde")]
    pub mass: Fixed,
    /// Circle radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
}

impl Body {
    /// A body at rest.
    #[must_use]
    pub const fn new(position: Vec2Fixed, mass: Fixed, radius: Fixed) -> Self {
        Self {
            position,
            velocity: Vec2Fixed::ZERO,
            force: Vec2Fixed::ZERO,
            mass,
            radius,
        }
    }

    /// Accumulate a force for the next integration step.
    pub fn apply_force(&mut self, force: Vec2Fixed) {
        self.force += force;
    }

    /// Semi-implicit Euler step; clears the accumulated force.
    pub fn integrate(&mut self, dt: Fixed) {
        if self.mass > Fixed::ZERO {
            self.velocity += self.force.scale(dt / self.mass);
        }
        self.position += self.velocity.scale(dt);
        self.force = Vec2Fixed::ZERO;
    }
}

/// A circle taking part in contact detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collider {
    /// What the circle belongs to.
    pub entity: EntityRef,
    /// Center.
    pub position: Vec2Fixed,
    /// Radius.
    pub radius: Fixed,
}

impl Collider {
    /// Whether two circles overlap or touch.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let reach = self.radius + other.radius;
        self.position.distance_squared(other.position) <= reach.saturating_mul(reach)
    }
}

/// Every overlapping `(projectile, target)` pair.
///
/// Targets are bucketed on a grid of `cell_size`; pairs come out ordered
/// by projectile, then by target insertion order.
#[must_use]
pub fn find_contacts(
    projectiles: &[Collider],
    targets: &[Collider],
    cell_size: Fixed,
) -> Vec<(EntityRef, EntityRef)> {
    if projectiles.is_empty() || targets.is_empty() {
        return Vec::new();
    }
    let cell_size = cell_size.max(Fixed::ONE);
    let cell = |position: Vec2Fixed| {
        (
            (position.x / cell_size).floor().to_num::<i32>(),
            (position.y / cell_size).floor().to_num::<i32>(),
        )
    };

    let mut grid: BTreeMap<(i32, i32), Vec<usize>> = BTreeMap::new();
    let mut max_radius = Fixed::ZERO;
    for (index, target) in targets.iter().enumerate() {
        grid.entry(cell(target.position)).or_default().push(index);
        max_radius = max_radius.max(target.radius);
    }

    let mut contacts = Vec::new();
    let mut candidates = Vec::new();
    for projectile in projectiles {
        let reach = projectile.radius + max_radius;
        let reach = Vec2Fixed::new(reach, reach);
        let (x0, y0) = cell(projectile.position - reach);
        let (x1, y1) = cell(projectile.position + reach);

        candidates.clear();
        for x in x0..=x1 {
            for (_, bucket) in grid.range((x, y0)..=(x, y1)) {
                candidates.extend_from_slice(bucket);
            }
        }
        candidates.sort_unstable();

        for &index in &candidates {
            let target = &targets[index];
            if projectile.overlaps(target) {
                contacts.push((projectile.entity, target.entity));
            }
        }
    }
    contacts
}
