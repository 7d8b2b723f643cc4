//! Simulation benchmarks for elemental_core.
//!
//! Run with: `cargo bench -p elemental_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use elemental_core::scenario::{new_match, MatchConfig};
use elemental_test_utils::fixtures::{random_match, scripted_match};

/// One second of game time in a default two-player match.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("match_60_ticks", |b| {
        b.iter_batched(
            || random_match(7),
            |mut sim| {
                for _ in 0..60 {
                    black_box(sim.tick());
                }
                sim
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("scripted_match_600_ticks", |b| {
        b.iter_batched(
            || scripted_match(7),
            |mut sim| {
                for _ in 0..600 {
                    black_box(sim.tick());
                }
                sim
            },
            BatchSize::SmallInput,
        );
    });

    let config = MatchConfig {
        ai_players: 4,
        human: false,
        ..MatchConfig::default()
    };
    let mut warmed = match new_match(&config) {
        Ok(sim) => sim,
        Err(e) => panic!("bench match: {e}"),
    };
    for _ in 0..1800 {
        warmed.tick();
    }
    c.bench_function("busy_match_single_tick", |b| {
        b.iter_batched(
            || warmed.clone(),
            |mut sim| black_box(sim.tick()),
            BatchSize::SmallInput,
        );
    });

    c.bench_function("state_hash", |b| b.iter(|| black_box(warmed.state_hash())));

    c.bench_function("snapshot_round_trip", |b| {
        b.iter(|| {
            let bytes = warmed.serialize().unwrap_or_default();
            black_box(bytes.len())
        });
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
