//! Elemental affinities and the effectiveness triangle.
//!
//! Fire beats Grass, Grass beats Water, Water beats Fire. A winning
//! matchup deals double damage, the reverse deals half, and an element
//! against itself deals normal damage.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Elemental affinity of tiles, units and bullets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// Fire.
    Fire,
    /// Water.
    Water,
    /// Grass.
    Grass,
}

impl ElementType {
    /// All elements in table order.
    pub const ALL: [Self; 3] = [Self::Fire, Self::Water, Self::Grass];

    /// Row/column index into [`EFFECTIVENESS`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Fire => 0,
            Self::Water => 1,
            Self::Grass => 2,
        }
    }

    /// Element for a table index, wrapping out-of-range values.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self::ALL[index % 3]
    }
}

const HALF: Fixed = Fixed::from_bits(1 << 31);
const ONE: Fixed = Fixed::from_bits(1 << 32);
const TWO: Fixed = Fixed::from_bits(2 << 32);

/// Damage multiplier table, `EFFECTIVENESS[attacker][defender]`.
pub const EFFECTIVENESS: [[Fixed; 3]; 3] = [
    // Fire vs Fire, Water, Grass
    [ONE, HALF, TWO],
    // Water vs Fire, Water, Grass
    [TWO, ONE, HALF],
    // Grass vs Fire, Water, Grass
    [HALF, TWO, ONE],
];

/// Damage multiplier for `attacker` hitting `defender`.
#[must_use]
pub const fn effectiveness(attacker: ElementType, defender: ElementType) -> Fixed {
    EFFECTIVENESS[attacker.index()][defender.index()]
}

/// Scale a base damage amount by the elemental matchup.
///
/// Rounds to the nearest whole hit point.
#[must_use]
pub fn scaled_damage(base: i32, attacker: ElementType, defender: ElementType) -> i32 {
    (Fixed::from_num(base) * effectiveness(attacker, defender))
        .round()
        .to_num::<i32>()
}
