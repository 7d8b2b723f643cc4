//! Seeded pseudo-random numbers.
//!
//! The simulation never reads system randomness. Every random choice
//! (tile elements, retarget jitter, spawn jitter, AI picks) comes from a
//! [`SimRng`] whose state is part of the snapshot.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Linear congruential generator with a xorshift output mix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Seed a new generator.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform integer in `[min, max]` (inclusive).
    pub fn next_range(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (i64::from(max) - i64::from(min) + 1) as u64;
        (i64::from(min) + (self.next_u64() % span) as i64) as i32
    }

    /// Uniform index in `[0, len)`. Returns 0 for an empty range.
    pub fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.next_u64() % len as u64) as usize
    }

    /// Uniform fixed-point value in `[min, max]`.
    pub fn next_fixed(&mut self, min: Fixed, max: Fixed) -> Fixed {
        if max <= min {
            return min;
        }
        // 32 fractional bits of randomness.
        let fraction = Fixed::from_bits((self.next_u64() >> 32) as i64);
        min + (max - min) * fraction
    }
}
