//! Generic production entries.
//!
//! A [`Production`] converts draws from a [`ResourceSource`] into progress
//! toward a fixed target. The same algorithm drives construction sites,
//! barracks training units and technology research; only the source
//! differs (a city's production pool or a player's science pool).
//!
//! All amounts are integers. Progress never overshoots the target.

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::clock::TickContext;
use crate::tech::TechId;
use crate::units::UnitKind;

/// Something a production entry can draw from.
pub trait ResourceSource {
    /// Draw up to `requested`; returns the amount granted.
    fn draw(&mut self, requested: i32) -> i32;

    /// Take one worker for this turn.
    fn take_worker(&mut self) -> bool;

    /// Give back a worker taken this turn.
    fn refund_worker(&mut self);
}

/// Category of a production entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductionKind {
    /// Builds a building.
    Building,
    /// Trains a unit.
    Unit,
    /// Researches a technology.
    Research,
}

/// What a production entry yields on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductionTarget {
    /// A building of this kind.
    Building(BuildingKind),
    /// A unit of this kind.
    Unit(UnitKind),
    /// This technology.
    Research(TechId),
}

impl ProductionTarget {
    /// Category of the target.
    #[must_use]
    pub const fn kind(self) -> ProductionKind {
        match self {
            Self::Building(_) => ProductionKind::Building,
            Self::Unit(_) => ProductionKind::Unit,
            Self::Research(_) => ProductionKind::Research,
        }
    }
}

/// Outcome of advancing an entry by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// No worker was available; the entry sat out this tick.
    Stalled,
    /// Progress was made (possibly zero).
    Progressed(i32),
    /// The target was reached on this tick.
    Completed,
}

/// One accumulate-toward-a-target unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Production {
    /// What completion yields.
    pub target: ProductionTarget,
    /// Amount needed to complete.
    pub target_amount: i32,
    /// Needs a free worker each tick to progress.
    pub requires_population: bool,
    /// Restarts from zero after completing.
    pub repeats: bool,
    /// Progress so far.
    pub accumulated: i32,
    /// Progress made on the last tick.
    pub delta: i32,
    /// Progress made over the last whole second.
    pub per_second: i32,
    window: i32,
}

impl Production {
    /// Create an entry with no progress.
    #[must_use]
    pub const fn new(
        target: ProductionTarget,
        target_amount: i32,
        requires_population: bool,
        repeats: bool,
    ) -> Self {
        Self {
            target,
            target_amount,
            requires_population,
            repeats,
            accumulated: 0,
            delta: 0,
            per_second: 0,
            window: 0,
        }
    }

    /// Category of the entry.
    #[must_use]
    pub const fn kind(&self) -> ProductionKind {
        self.target.kind()
    }

    /// Amount still needed.
    #[must_use]
    pub fn remaining(&self) -> i32 {
        (self.target_amount - self.accumulated).max(0)
    }

    /// Whether a non-repeating entry has reached its target.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.accumulated >= self.target_amount
    }

    /// Estimated seconds to completion at the last published rate.
    #[must_use]
    pub fn eta_seconds(&self) -> Option<i32> {
        (self.per_second > 0).then(|| (self.remaining() + self.per_second - 1) / self.per_second)
    }

    /// Advance by one tick against `source`.
    pub fn advance(&mut self, source: &mut impl ResourceSource, ctx: &TickContext) -> Advance {
        self.delta = 0;

        let outcome = self.draw(source, ctx);

        if ctx.one_second {
            self.per_second = self.window;
            self.window = 0;
        }

        outcome
    }

    fn draw(&mut self, source: &mut impl ResourceSource, ctx: &TickContext) -> Advance {
        if self.is_complete() && !self.repeats {
            return Advance::Completed;
        }

        let took_worker = if self.requires_population {
            if !source.take_worker() {
                return Advance::Stalled;
            }
            true
        } else {
            false
        };

        let wanted = self.remaining();
        let granted = if ctx.mass_production {
            wanted
        } else {
            source.draw(wanted)
        };
        if granted == 0 && took_worker {
            source.refund_worker();
        }

        self.accumulated += granted;
        self.delta = granted;
        self.window += granted;

        if self.is_complete() {
            if self.repeats {
                self.accumulated = 0;
            }
            return Advance::Completed;
        }
        Advance::Progressed(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TempoRules;

    /// Fixed budget per call, with a worker count.
    struct Budget {
        amount: i32,
        workers: u32,
        granted: i32,
    }

    impl ResourceSource for Budget {
        fn draw(&mut self, requested: i32) -> i32 {
            let granted = requested.min(self.amount).max(0);
            self.amount -= granted;
            self.granted += granted;
            granted
        }

        fn take_worker(&mut self) -> bool {
            if self.workers == 0 {
                return false;
            }
            self.workers -= 1;
            true
        }

        fn refund_worker(&mut self) {
            self.workers += 1;
        }
    }

    fn ctx(tick: u64) -> TickContext {
        TickContext::at(
            tick,
            &TempoRules {
                turn_ticks: 1,
                round_ticks: 1800,
            },
        )
    }

    fn budget(amount: i32, workers: u32) -> Budget {
        Budget {
            amount,
            workers,
            granted: 0,
        }
    }

    #[test]
    fn test_completes_exactly_once_without_overshoot() {
        let mut entry = Production::new(ProductionTarget::Building(BuildingKind::Farm), 25, false, false);
        let mut completions = 0;
        for tick in 1..=10 {
            let mut pool = budget(10, 0);
            if entry.advance(&mut pool, &ctx(tick)) == Advance::Completed {
                completions += 1;
                break;
            }
        }
        assert_eq!(completions, 1);
        assert_eq!(entry.accumulated, 25);
    }

    #[test]
    fn test_final_draw_requests_only_remainder() {
        let mut entry = Production::new(ProductionTarget::Building(BuildingKind::Farm), 25, false, false);
        entry.accumulated = 20;
        let mut pool = budget(10, 0);
        assert_eq!(entry.advance(&mut pool, &ctx(1)), Advance::Completed);
        assert_eq!(pool.granted, 5);
        assert_eq!(pool.amount, 5);
    }

    #[test]
    fn test_repeating_resets() {
        let mut entry = Production::new(ProductionTarget::Unit(UnitKind::FireElemental), 20, false, true);
        let mut completions = 0;
        for tick in 1..=10 {
            let mut pool = budget(10, 0);
            if entry.advance(&mut pool, &ctx(tick)) == Advance::Completed {
                completions += 1;
                assert_eq!(entry.accumulated, 0);
            }
        }
        assert_eq!(completions, 5);
    }

    #[test]
    fn test_stalls_without_worker() {
        let mut entry = Production::new(ProductionTarget::Unit(UnitKind::FireElemental), 20, true, true);
        let mut pool = budget(10, 0);
        assert_eq!(entry.advance(&mut pool, &ctx(1)), Advance::Stalled);
        assert_eq!(pool.granted, 0);
        assert_eq!(entry.delta, 0);
    }

    #[test]
    fn test_worker_refunded_on_zero_grant() {
        let mut entry = Production::new(ProductionTarget::Unit(UnitKind::FireElemental), 20, true, true);
        let mut pool = budget(0, 1);
        assert_eq!(entry.advance(&mut pool, &ctx(1)), Advance::Progressed(0));
        assert_eq!(pool.workers, 1);
    }

    #[test]
    fn test_mass_production_skips_pool() {
        let mut entry = Production::new(ProductionTarget::Building(BuildingKind::Farm), 3000, false, false);
        let mut pool = budget(0, 0);
        let mut context = ctx(1);
        context.mass_production = true;
        assert_eq!(entry.advance(&mut pool, &context), Advance::Completed);
        assert_eq!(pool.granted, 0);
    }

    #[test]
    fn test_per_second_window() {
        let mut entry = Production::new(ProductionTarget::Building(BuildingKind::Farm), 100_000, false, false);
        for tick in 1..=60 {
            let mut pool = budget(10, 0);
            entry.advance(&mut pool, &ctx(tick));
        }
        assert_eq!(entry.per_second, 600);
        assert_eq!(entry.eta_seconds(), Some((100_000 - 600) / 600 + 1));
    }

    #[test]
    fn test_target_kind() {
        assert_eq!(
            ProductionTarget::Research(TechId(1)).kind(),
            ProductionKind::Research
        );
        assert_eq!(
            ProductionTarget::Unit(UnitKind::GrassElemental).kind(),
            ProductionKind::Unit
        );
    }
}
