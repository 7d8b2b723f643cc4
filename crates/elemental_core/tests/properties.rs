//! Property-based tests for the economy, production, combat and replay.

#![allow(missing_docs)]

use elemental_core::buildings::BuildingKind;
use elemental_core::clock::TickContext;
use elemental_core::combat::{StatusKind, StatusPayload, StatusState};
use elemental_core::data::{EconomyRules, GameRules};
use elemental_core::economy::{growth_threshold, ResourcePool};
use elemental_core::element::{effectiveness, scaled_damage};
use elemental_core::math::Fixed;
use elemental_core::production::{Advance, Production, ProductionTarget, ResourceSource};
use elemental_core::scenario::{new_match, MatchConfig, PolicyChoice};
use elemental_test_utils::determinism::strategies::{arb_build_script, arb_element};
use elemental_test_utils::determinism::{verify_determinism, verify_fork_determinism};
use elemental_test_utils::proptest::prelude::*;

fn economy() -> EconomyRules {
    GameRules::default().economy
}

fn tick(n: u64) -> TickContext {
    TickContext::at(n, &GameRules::default().tempo)
}

/// Fixed per-call budget.
struct Drip(i32);

impl ResourceSource for Drip {
    fn draw(&mut self, requested: i32) -> i32 {
        requested.clamp(0, self.0)
    }

    fn take_worker(&mut self) -> bool {
        true
    }

    fn refund_worker(&mut self) {}
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Draws within one turn never exceed the budget it started with.
    #[test]
    fn prop_pool_never_oversubscribed(
        income in 0i32..500,
        requests in prop::collection::vec(-50i32..400, 0..40),
    ) {
        let rules = economy();
        let mut pool = ResourcePool::new(&rules);
        pool.add_production_next_turn(income);
        pool.turn_over(&rules);
        let budget = pool.free_production;

        let mut granted = 0;
        for request in requests {
            let got = pool.apply_production(request);
            prop_assert!(got >= 0);
            prop_assert!(got <= request.max(0));
            granted += got;
        }
        prop_assert!(granted <= budget);
        prop_assert_eq!(pool.free_production, budget - granted);
        prop_assert_eq!(pool.granted_production(), granted);
    }

    /// Workers handed out never exceed the population.
    #[test]
    fn prop_workers_bounded_by_population(takes in 0usize..10, refunds in 0usize..10) {
        let rules = economy();
        let mut pool = ResourcePool::new(&rules);
        pool.turn_over(&rules);
        let employed = (0..takes).filter(|_| pool.apply_population()).count();
        prop_assert!(employed as u32 <= pool.population);
        for _ in 0..refunds {
            pool.refund_population();
        }
        prop_assert!(pool.free_population <= pool.population);
        prop_assert_eq!(pool.population, 1);
    }

    /// Population never shrinks, whatever the food balance.
    #[test]
    fn prop_population_monotonic(foods in prop::collection::vec(-500i32..3000, 1..200)) {
        let rules = economy();
        let mut pool = ResourcePool::new(&rules);
        let mut last = pool.population;
        for food in foods {
            pool.add_food_next_turn(food);
            pool.turn_over(&rules);
            pool.accumulate_food();
            prop_assert!(pool.population >= last);
            prop_assert!(pool.surplus_food >= 0);
            last = pool.population;
        }
    }

    #[test]
    fn prop_growth_threshold_increasing(population in 1u32..5000) {
        prop_assert!(growth_threshold(population + 1) > growth_threshold(population));
    }

    #[test]
    fn prop_effectiveness_reciprocal(a in arb_element(), b in arb_element()) {
        prop_assert_eq!(effectiveness(a, b) * effectiveness(b, a), Fixed::ONE);
        if a == b {
            prop_assert_eq!(effectiveness(a, b), Fixed::ONE);
        }
    }

    #[test]
    fn prop_scaled_damage_bounds(base in 0i32..100_000, a in arb_element(), b in arb_element()) {
        let damage = scaled_damage(base, a, b);
        prop_assert!(damage >= base / 2);
        prop_assert!(damage <= base * 2);
    }

    /// A one-shot entry completes exactly once, on the tick its budget runs out.
    #[test]
    fn prop_production_completes_exactly(target in 1i32..20_000, rate in 1i32..500) {
        let mut entry = Production::new(
            ProductionTarget::Building(BuildingKind::Farm),
            target,
            false,
            false,
        );
        let mut source = Drip(rate);
        let expected = (target + rate - 1) / rate;

        let mut completed_at = None;
        for n in 1..=i64::from(expected) + 5 {
            if entry.advance(&mut source, &tick(n as u64)) == Advance::Completed
                && completed_at.is_none()
            {
                completed_at = Some(n);
            }
            prop_assert!(entry.accumulated <= target);
        }
        prop_assert_eq!(completed_at, Some(i64::from(expected)));
        prop_assert!(entry.is_complete());
    }

    /// A repeating entry completes once per `ceil(target / rate)` ticks
    /// when the rate divides the target.
    #[test]
    fn prop_repeating_recurs(per in 1i32..50, steps in 1i32..20, cycles in 1usize..6) {
        let target = per * steps;
        let mut entry = Production::new(
            ProductionTarget::Building(BuildingKind::Farm),
            target,
            false,
            true,
        );
        let mut source = Drip(per);
        let ticks = steps as usize * cycles;
        let completions = (1..=ticks)
            .filter(|n| entry.advance(&mut source, &tick(*n as u64)) == Advance::Completed)
            .count();
        prop_assert_eq!(completions, cycles);
        prop_assert_eq!(entry.accumulated, 0);
    }

    /// Exposure procs exactly when the running total reaches the threshold,
    /// and is ignored while active.
    #[test]
    fn prop_status_procs_once(amounts in prop::collection::vec(1i32..80, 1..30)) {
        let rules = GameRules::default().combat;
        let status_rules = *rules.status(StatusKind::Poisoned);
        let mut state = StatusState::new(status_rules.resistance);

        let mut total = 0;
        let mut procs = 0;
        for amount in amounts {
            let payload = StatusPayload::new(StatusKind::Poisoned, amount);
            let procced = state.expose(payload.amount, status_rules.duration_ticks);
            if procs == 0 {
                total += amount;
                prop_assert_eq!(procced, total >= status_rules.resistance);
            } else {
                prop_assert!(!procced);
            }
            if procced {
                procs += 1;
                prop_assert_eq!(state.remaining_ticks, status_rules.duration_ticks);
            }
        }
        prop_assert!(procs <= 1);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    /// Any seed and build script replays to the same state.
    #[test]
    fn prop_matches_are_deterministic(seed in any::<u64>(), script in arb_build_script()) {
        let config = MatchConfig {
            seed,
            ai_players: 2,
            width: Some(24),
            height: Some(16),
            policy: PolicyChoice::Scripted(script),
            ..MatchConfig::default()
        };
        let result = verify_determinism(
            2,
            240,
            || new_match(&config).unwrap(),
            |sim| {
                sim.tick();
            },
            |sim| sim.state_hash(),
        );
        prop_assert!(result.is_deterministic);
    }

    /// A snapshot taken mid-match resumes in lockstep.
    #[test]
    fn prop_snapshot_forks_track(seed in any::<u64>(), fork_at in 1u64..200) {
        let config = MatchConfig {
            seed,
            ..MatchConfig::default()
        };
        prop_assert!(verify_fork_determinism(|| new_match(&config).unwrap(), fork_at, 120));
    }
}
