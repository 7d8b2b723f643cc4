//! Core simulation loop.
//!
//! [`Simulation`] bundles the clock, the world and the computer players,
//! and runs one tick at a time:
//!
//! 1. advance the clock and derive the [`TickContext`];
//! 2. let each AI controller issue its commands;
//! 3. run the world's logic phases;
//! 4. integrate bodies and resolve bullet contacts;
//! 5. drain deferred actions, reap, rotate, and collect events.
//!
//! # Determinism
//!
//! - No floating-point math (fixed-point via [`Fixed`](crate::math::Fixed))
//! - No system randomness (seeded [`SimRng`](crate::rng::SimRng) only)
//! - Arenas iterate in handle order
//! - Same seed and commands always produce the same state hash
//!
//! # Example
//!
//! ```
//! use elemental_core::scenario::{new_match, MatchConfig};
//!
//! let mut sim = new_match(&MatchConfig::default()).unwrap();
//! for _ in 0..60 {
//!     sim.tick();
//! }
//! assert_eq!(sim.get_tick(), 60);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ai::AiController;
use crate::clock::{SimClock, TickContext};
use crate::error::{GameError, Result};
use crate::player::PlayerId;
use crate::world::{TickEvents, World};

/// A running match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    clock: SimClock,
    world: World,
    ai: Vec<AiController>,
}

impl Simulation {
    /// Wrap a prepared world. The clock starts at tick 0.
    #[must_use]
    pub fn new(world: World) -> Self {
        Self {
            clock: SimClock::new(world.rules().tempo.clone()),
            world,
            ai: Vec::new(),
        }
    }

    /// Hand a player to a computer controller.
    pub fn add_ai(&mut self, controller: AiController) {
        self.ai.push(controller);
    }

    /// Last completed tick.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.clock.tick()
    }

    /// The match state.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable match state, for issuing human commands between ticks.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Computer controllers.
    #[must_use]
    pub fn ai(&self) -> &[AiController] {
        &self.ai
    }

    /// Toggle the mass-production cheat for subsequent ticks.
    pub fn set_mass_production(&mut self, enabled: bool) {
        self.clock.set_mass_production(enabled);
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickEvents {
        let ctx = self.clock.advance();
        self.run(&ctx)
    }

    fn run(&mut self, ctx: &TickContext) -> TickEvents {
        for controller in &mut self.ai {
            if let Err(err) = controller.act(&mut self.world, ctx) {
                tracing::debug!(player = controller.player().raw(), %err, "AI skipped");
            }
        }
        self.world.update(ctx);
        self.world.step_physics(ctx.delta_time);
        let events = self.world.end_tick();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = ctx.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    /// Players that still hold a city center above zero hit points.
    #[must_use]
    pub fn undefeated_players(&self) -> Vec<PlayerId> {
        self.world
            .players()
            .map(|p| p.id)
            .filter(|id| !self.world.is_defeated(*id))
            .collect()
    }

    /// Whether at most one player is left standing.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.undefeated_players().len() <= 1
    }

    /// The sole surviving player, once the match is decided.
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        match self.undefeated_players().as_slice() {
            [winner] => Some(*winner),
            _ => None,
        }
    }

    /// Hash of the simulation state for desync detection.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.clock.tick().hash(&mut hasher);
        self.world.hash_state(&mut hasher);
        hasher.finish()
    }

    /// Serialize the simulation state for replay or forking.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Deserialize simulation state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            GameError::InvalidState(format!("Failed to deserialize simulation: {e}"))
        })
    }
}
