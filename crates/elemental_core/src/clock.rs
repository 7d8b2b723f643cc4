//! Simulation time and the per-tick signal set.
//!
//! The host loop owns a [`SimClock`] and calls [`SimClock::advance`] once
//! per frame. The resulting [`TickContext`] carries every periodic edge the
//! core reacts to, so no update function reads global time state.
//!
//! All edges are derived from the integer tick counter. A signal fires on
//! the tick that completes its interval; tick 1 is the first tick.

use serde::{Deserialize, Serialize};

use crate::data::TempoRules;
use crate::math::{fixed_serde, Fixed};

/// Ticks per simulated second.
pub const TICK_RATE: u32 = 60;

/// Ticks between one-third-second edges.
pub const THIRD_SECOND_TICKS: u32 = TICK_RATE / 3;

/// Edge-triggered signals and time values for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickContext {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Seconds per tick.
    #[serde(with = "fixed_serde")]
    pub delta_time: Fixed,
    /// Seconds elapsed including this tick.
    #[serde(with = "fixed_serde")]
    pub total_time: Fixed,
    /// City pools roll over on this tick.
    pub turn: bool,
    /// Ready units spawn on this tick.
    pub round: bool,
    /// A whole second completed on this tick.
    pub one_second: bool,
    /// A third of a second completed on this tick.
    pub one_third_second: bool,
    /// Debug cheat: every production draw is granted in full for free.
    pub mass_production: bool,
}

impl TickContext {
    /// Context for a given tick number under the given tempo.
    ///
    /// Useful for driving single components in isolation.
    #[must_use]
    pub fn at(tick: u64, tempo: &TempoRules) -> Self {
        let every = |interval: u32| interval > 0 && tick % u64::from(interval) == 0;
        let rate = Fixed::from_num(TICK_RATE);
        Self {
            tick,
            delta_time: Fixed::ONE / rate,
            total_time: Fixed::from_num(tick) / rate,
            turn: every(tempo.turn_ticks),
            round: every(tempo.round_ticks),
            one_second: every(TICK_RATE),
            one_third_second: every(THIRD_SECOND_TICKS),
            mass_production: false,
        }
    }
}

/// Host-side tick counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimClock {
    tick: u64,
    tempo: TempoRules,
    mass_production: bool,
}

impl SimClock {
    /// Create a clock at tick 0.
    #[must_use]
    pub fn new(tempo: TempoRules) -> Self {
        Self {
            tick: 0,
            tempo,
            mass_production: false,
        }
    }

    /// Last completed tick.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Toggle the mass-production cheat for subsequent ticks.
    pub fn set_mass_production(&mut self, enabled: bool) {
        self.mass_production = enabled;
    }

    /// Advance one tick and return its context.
    pub fn advance(&mut self) -> TickContext {
        self.tick += 1;
        let mut ctx = TickContext::at(self.tick, &self.tempo);
        ctx.mass_production = self.mass_production;
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tempo() -> TempoRules {
        TempoRules {
            turn_ticks: 1,
            round_ticks: 30 * TICK_RATE,
        }
    }

    #[test]
    fn test_first_tick_edges() {
        let mut clock = SimClock::new(tempo());
        let ctx = clock.advance();
        assert_eq!(ctx.tick, 1);
        assert!(ctx.turn);
        assert!(!ctx.round);
        assert!(!ctx.one_second);
        assert!(!ctx.one_third_second);
    }

    #[test]
    fn test_edge_counts_over_a_round() {
        let mut clock = SimClock::new(tempo());
        let mut seconds = 0;
        let mut thirds = 0;
        let mut rounds = 0;
        for _ in 0..30 * TICK_RATE {
            let ctx = clock.advance();
            seconds += u32::from(ctx.one_second);
            thirds += u32::from(ctx.one_third_second);
            rounds += u32::from(ctx.round);
        }
        assert_eq!(seconds, 30);
        assert_eq!(thirds, 90);
        assert_eq!(rounds, 1);
        assert_eq!(clock.tick(), 1800);
    }

    #[test]
    fn test_total_time() {
        let ctx = TickContext::at(120, &tempo());
        assert_eq!(ctx.total_time, Fixed::from_num(2));
        assert!(ctx.one_second);
    }

    #[test]
    fn test_mass_production_flag() {
        let mut clock = SimClock::new(tempo());
        clock.set_mass_production(true);
        assert!(clock.advance().mass_production);
    }

    #[test]
    fn test_zero_interval_never_fires() {
        let tempo = TempoRules {
            turn_ticks: 0,
            round_ticks: 0,
        };
        let ctx = TickContext::at(60, &tempo);
        assert!(!ctx.turn);
        assert!(!ctx.round);
    }
}
