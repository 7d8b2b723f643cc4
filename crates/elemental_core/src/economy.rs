//! Per-city resource pool.
//!
//! A city's pool holds what its buildings may draw this turn and what
//! they have earned for the next one. Every amount is an integer in
//! hundredths, so `150` food is one and a half food.
//!
//! # Turn cycle
//!
//! 1. Food surplus accumulates; crossing the growth threshold adds a citizen.
//! 2. On a turn boundary the next-turn accumulators become this turn's
//!    budget and `free_*` counters reset to the full budget.
//! 3. Buildings draw production and workers from the `free_*` counters and
//!    deposit their yields into the next-turn accumulators.
//!
//! Grants are clamped to what is left, so the pool is never oversubscribed.

use serde::{Deserialize, Serialize};

use crate::data::EconomyRules;
use crate::production::ResourceSource;

/// Food needed to grow from `population` to `population + 1`.
///
/// `(floor((n - 1)^1.5) + 8(n - 1) + 15) * 100`, in exact integer math.
#[must_use]
pub fn growth_threshold(population: u32) -> i64 {
    let m = i64::from(population.saturating_sub(1));
    (isqrt(m * m * m) + 8 * m + 15) * 100
}

/// Integer square root, rounded down.
fn isqrt(value: i64) -> i64 {
    if value < 2 {
        return value.max(0);
    }
    let mut x = value;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + value / x) / 2;
    }
    x
}

/// A city's resource pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcePool {
    /// Citizens.
    pub population: u32,
    /// Production budget of the current turn.
    pub production: i32,
    /// Net food of the current turn.
    pub food_production: i32,
    /// Production earned for the next turn.
    pub production_next_turn: i32,
    /// Net food earned for the next turn.
    pub food_next_turn: i32,
    /// Production not yet drawn this turn.
    pub free_production: i32,
    /// Citizens not yet employed this turn.
    pub free_population: u32,
    /// Stored food toward the next citizen.
    pub surplus_food: i64,
    /// Food needed for the next citizen.
    pub food_threshold: i64,
    /// No consumer has drawn production since the last turn-over.
    pub no_production_yet: bool,
    /// No consumer has taken a worker since the last turn-over.
    pub unapplied_population: bool,
}

impl ResourcePool {
    /// A freshly founded city: one citizen, base income queued for turn one.
    #[must_use]
    pub fn new(rules: &EconomyRules) -> Self {
        let mut pool = Self {
            population: 1,
            production: 0,
            food_production: 0,
            production_next_turn: 0,
            food_next_turn: 0,
            free_production: 0,
            free_population: 0,
            surplus_food: 0,
            food_threshold: growth_threshold(1),
            no_production_yet: true,
            unapplied_population: true,
        };
        pool.reset_next_turn(rules);
        pool
    }

    fn reset_next_turn(&mut self, rules: &EconomyRules) {
        self.production_next_turn = rules.base_production;
        self.food_next_turn = rules.base_food - rules.food_upkeep * self.population as i32;
    }

    /// Bank this turn's food and grow if the threshold is reached.
    ///
    /// Returns `true` when a citizen was added.
    pub fn accumulate_food(&mut self) -> bool {
        self.surplus_food = (self.surplus_food + i64::from(self.food_production)).max(0);
        if self.surplus_food >= self.food_threshold {
            self.population += 1;
            self.surplus_food = 0;
            self.food_threshold = growth_threshold(self.population);
            return true;
        }
        false
    }

    /// Roll next-turn accumulators into the current turn.
    pub fn turn_over(&mut self, rules: &EconomyRules) {
        self.production = self.production_next_turn;
        self.food_production = self.food_next_turn;
        self.reset_next_turn(rules);
        self.free_production = self.production.max(0);
        self.free_population = self.population;
        self.no_production_yet = true;
        self.unapplied_population = true;
    }

    /// Draw up to `requested` production. Returns the amount granted.
    pub fn apply_production(&mut self, requested: i32) -> i32 {
        let granted = requested.clamp(0, self.free_production);
        self.free_production -= granted;
        if granted > 0 {
            self.no_production_yet = false;
        }
        granted
    }

    /// Employ one citizen for this turn.
    pub fn apply_population(&mut self) -> bool {
        if self.free_population == 0 {
            return false;
        }
        self.free_population -= 1;
        self.unapplied_population = false;
        true
    }

    /// Return an employed citizen to the free pool.
    ///
    /// Only `free_population` grows; `population` changes through food alone.
    pub fn refund_population(&mut self) {
        if self.free_population < self.population {
            self.free_population += 1;
        }
    }

    /// Production drawn so far this turn.
    #[must_use]
    pub fn granted_production(&self) -> i32 {
        self.production.max(0) - self.free_production
    }

    /// Add to next turn's production.
    pub fn add_production_next_turn(&mut self, amount: i32) {
        self.production_next_turn += amount;
    }

    /// Add to next turn's food.
    pub fn add_food_next_turn(&mut self, amount: i32) {
        self.food_next_turn += amount;
    }
}

impl ResourceSource for ResourcePool {
    fn draw(&mut self, requested: i32) -> i32 {
        self.apply_production(requested)
    }

    fn take_worker(&mut self) -> bool {
        self.apply_population()
    }

    fn refund_worker(&mut self) {
        self.refund_population();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GameRules;

    fn rules() -> EconomyRules {
        GameRules::default().economy
    }

    #[test]
    fn test_threshold_values() {
        assert_eq!(growth_threshold(1), 1500);
        assert_eq!(growth_threshold(2), (1 + 8 + 15) * 100);
        // (2^3)^0.5 = 2.83 -> 2
        assert_eq!(growth_threshold(3), (2 + 16 + 15) * 100);
        // 27^0.5 = 5.19 -> 5
        assert_eq!(growth_threshold(4), (5 + 24 + 15) * 100);
    }

    #[test]
    fn test_threshold_strictly_increasing() {
        for n in 1..500 {
            assert!(growth_threshold(n + 1) > growth_threshold(n), "n = {n}");
        }
    }

    #[test]
    fn test_isqrt() {
        for v in [0i64, 1, 2, 3, 4, 15, 16, 17, 1_000_000, 999_999] {
            let r = isqrt(v);
            assert!(r * r <= v && (r + 1) * (r + 1) > v, "isqrt({v}) = {r}");
        }
    }

    #[test]
    fn test_first_turn_has_base_income() {
        let rules = rules();
        let mut pool = ResourcePool::new(&rules);
        pool.turn_over(&rules);
        assert_eq!(pool.production, 10);
        assert_eq!(pool.free_production, 10);
        assert_eq!(pool.food_production, 10);
        assert_eq!(pool.free_population, 1);
        assert!(pool.no_production_yet);
        assert!(pool.unapplied_population);
    }

    #[test]
    fn test_apply_production_clamps() {
        let rules = rules();
        let mut pool = ResourcePool::new(&rules);
        pool.turn_over(&rules);

        assert_eq!(pool.apply_production(4), 4);
        assert!(!pool.no_production_yet);
        assert_eq!(pool.apply_production(100), 6);
        assert_eq!(pool.apply_production(1), 0);
        assert_eq!(pool.granted_production(), 10);
    }

    #[test]
    fn test_zero_grant_keeps_flag() {
        let rules = rules();
        let mut pool = ResourcePool::new(&rules);
        pool.turn_over(&rules);
        pool.free_production = 0;
        assert_eq!(pool.apply_production(5), 0);
        assert!(pool.no_production_yet);
    }

    #[test]
    fn test_population_apply_and_refund() {
        let rules = rules();
        let mut pool = ResourcePool::new(&rules);
        pool.turn_over(&rules);

        assert!(pool.apply_population());
        assert!(!pool.unapplied_population);
        assert!(!pool.apply_population());

        pool.refund_population();
        assert_eq!(pool.free_population, 1);
        assert_eq!(pool.population, 1, "refund never creates citizens");

        pool.refund_population();
        assert_eq!(pool.free_population, 1);
    }

    #[test]
    fn test_growth() {
        let rules = rules();
        let mut pool = ResourcePool::new(&rules);
        pool.turn_over(&rules);

        // 10 net food per turn against a 1500 threshold.
        let mut ticks = 0;
        while !pool.accumulate_food() {
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert_eq!(ticks, 149);
        assert_eq!(pool.population, 2);
        assert_eq!(pool.surplus_food, 0);
        assert_eq!(pool.food_threshold, 2400);
    }

    #[test]
    fn test_upkeep_and_starvation_floor() {
        let rules = rules();
        let mut pool = ResourcePool::new(&rules);
        pool.population = 10;
        pool.turn_over(&rules);
        pool.turn_over(&rules);
        assert_eq!(pool.food_production, 12 - 20);

        pool.accumulate_food();
        assert_eq!(pool.surplus_food, 0, "surplus never goes negative");
        assert_eq!(pool.population, 10);
    }

    #[test]
    fn test_worker_yields_roll_into_next_turn() {
        let rules = rules();
        let mut pool = ResourcePool::new(&rules);
        pool.turn_over(&rules);
        pool.add_production_next_turn(5);
        pool.add_food_next_turn(6);
        pool.turn_over(&rules);
        assert_eq!(pool.production, 15);
        assert_eq!(pool.food_production, 16);
    }
}
