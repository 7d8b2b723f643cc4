//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Sources of non-determinism
//!
//! - **Floating-point math**: we use fixed-point arithmetic via
//!   [`elemental_core::math::Fixed`] throughout.
//! - **HashMap iteration order**: arenas are ordered maps keyed by handle.
//! - **System randomness**: every random choice draws from a seeded
//!   [`elemental_core::rng::SimRng`] stored in the snapshot.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual modules are deterministic in isolation
//! 2. **Property tests**: random inputs still produce deterministic outputs
//! 3. **Integration tests**: full matches are reproducible
//! 4. **Fork tests**: a snapshot resumed mid-match tracks the original

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use elemental_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Example
///
/// ```
/// use elemental_test_utils::determinism::verify_determinism;
/// use elemental_test_utils::fixtures::random_match;
///
/// let result = verify_determinism(
///     3,
///     120,
///     || random_match(7),
///     |sim| {
///         sim.tick();
///     },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run the same match twice and compare the final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        |sim| sim.state_hash(),
    )
    .is_deterministic
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Snapshot a match after `fork_at` ticks, resume the copy, and check it
/// stays in lockstep with the original for `then` more ticks.
pub fn verify_fork_determinism<F>(setup_fn: F, fork_at: u64, then: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut original = setup_fn();
    for _ in 0..fork_at {
        original.tick();
    }

    let Ok(bytes) = original.serialize() else {
        return false;
    };
    let Ok(mut fork) = Simulation::deserialize(&bytes) else {
        return false;
    };
    if fork.state_hash() != original.state_hash() {
        return false;
    }

    for _ in 0..then {
        let a = original.tick();
        let b = fork.tick();
        if a != b || original.state_hash() != fork.state_hash() {
            tracing::warn!(tick = original.get_tick(), "Fork diverged");
            return false;
        }
    }
    true
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use elemental_core::buildings::BuildingKind;
    use elemental_core::element::ElementType;
    use elemental_core::math::{Fixed, Vec2Fixed};
    use proptest::prelude::*;

    /// Any element.
    pub fn arb_element() -> impl Strategy<Value = ElementType> {
        (0usize..3).prop_map(ElementType::from_index)
    }

    /// A fixed-point coordinate in a typical map range.
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (-2000i32..2000i32).prop_map(Fixed::from_num)
    }

    /// A 2D position.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// A building kind players may place.
    pub fn arb_constructible_kind() -> impl Strategy<Value = BuildingKind> {
        prop::sample::select(vec![
            BuildingKind::ElementCollector,
            BuildingKind::FireBarracks,
            BuildingKind::WaterBarracks,
            BuildingKind::GrassBarracks,
            BuildingKind::SteamMachine,
            BuildingKind::WaterWheel,
            BuildingKind::Farm,
        ])
    }

    /// A short build script.
    pub fn arb_build_script() -> impl Strategy<Value = Vec<BuildingKind>> {
        prop::collection::vec(arb_constructible_kind(), 1..6)
    }

    /// A match seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{random_match, scripted_match};

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 10, || 0u64, |n| *n += 1, |n| *n);
        assert!(result.is_deterministic);
        assert_eq!(result.unique_hashes(), vec![10]);
    }

    #[test]
    fn test_random_match_determinism() {
        assert!(verify_simulation_determinism(|| random_match(3), 600));
    }

    #[test]
    fn test_find_divergence_on_deterministic_sim() {
        assert_eq!(find_first_divergence(|| scripted_match(11), 300), None);
    }

    #[test]
    fn test_fork_tracks_original() {
        assert!(verify_fork_determinism(|| scripted_match(4), 200, 400));
    }

    #[test]
    fn test_territory_layout_is_reproducible() {
        let layout = |seed: u64| {
            let mut sim = random_match(seed);
            for _ in 0..1800 {
                sim.tick();
            }
            let territories: Vec<_> = sim
                .world()
                .cities()
                .map(|city| city.territories.clone())
                .collect();
            compute_hash(&territories)
        };
        assert_eq!(layout(9), layout(9));
        assert_ne!(compute_hash(&1u64), compute_hash(&2u64));
    }

    #[test]
    fn test_seeds_differ() {
        let mut a = random_match(1);
        let mut b = random_match(2);
        a.tick();
        b.tick();
        assert_ne!(a.state_hash(), b.state_hash());
    }
}
