//! Simulation benchmarks for skirmish_core.
//!
//! Run with: `cargo bench -p skirmish_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use skirmish_core::prelude::*;

fn live_match(troops_per_team: i32) -> Simulation {
    let config = GameConfig {
        starter_troop: None,
        ..GameConfig::default()
    };
    let mut sim = Simulation::new(config).expect("default config is valid");
    for client in [1, 2] {
        sim.submit(MatchInput::Connect { client });
        sim.submit(MatchInput::Request {
            client,
            request: ClientRequest::PlaceMap,
        });
        sim.submit(MatchInput::Request {
            client,
            request: ClientRequest::SetMode {
                mode: AiMode::Attack,
            },
        });
    }
    sim.tick();

    for i in 0..troops_per_team {
        let x = i % 8 - 4;
        let row = i / 8;
        sim.spawn_troop_at(Team::Red, 0, Vec2Fixed::from_ints(x, -3 - row))
            .expect("knight exists");
        sim.spawn_troop_at(Team::Blue, 0, Vec2Fixed::from_ints(x, 3 + row))
            .expect("knight exists");
    }
    sim
}

/// A full second of combat between two armies.
pub fn army_tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("army_second");
    for size in [8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || live_match(size),
                |mut sim| {
                    for _ in 0..TICK_RATE {
                        black_box(sim.tick());
                    }
                    sim
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Cost of hashing the full state, paid every tick in debug builds.
pub fn state_hash_benchmark(c: &mut Criterion) {
    let sim = live_match(32);
    c.bench_function("state_hash", |b| b.iter(|| black_box(sim.state_hash())));
}

criterion_group!(benches, army_tick_benchmark, state_hash_benchmark);
criterion_main!(benches);
