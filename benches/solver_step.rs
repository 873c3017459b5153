//! Benchmarks for the hash build and the full update step.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use verlet2d::prelude::*;

fn random_positions(count: usize, seed: u64) -> Vec<Vec2> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Vec2::new(rng.gen_range(0.0..800.0), rng.gen_range(0.0..600.0)))
        .collect()
}

fn populated_solver(count: usize) -> Solver {
    let mut solver = Solver::new(Vec2::new(800.0, 600.0), 4.0).unwrap();
    for pos in random_positions(count, 1) {
        solver.spawn_particle(pos, 4.0);
    }
    solver
}

fn bench_cell_table_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_table_build");
    let geom = GridGeometry::new(Vec2::new(800.0, 600.0), 4.0).unwrap();

    for count in [1_000, 10_000, 50_000] {
        let positions = random_positions(count, 2);
        let mut table = CellTable::new();

        group.bench_with_input(BenchmarkId::new("particles", count), &count, |b, _| {
            b.iter(|| {
                table.build(black_box(&positions), &geom);
                black_box(table.grouped().len())
            })
        });
    }

    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    group.sample_size(20);

    for count in [1_000, 5_000, 20_000] {
        let mut solver = populated_solver(count);

        group.bench_with_input(BenchmarkId::new("particles", count), &count, |b, _| {
            b.iter(|| solver.update(black_box(1.0 / 60.0)))
        });
    }

    group.finish();
}

fn bench_update_with_local_backend(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_local_backend");
    group.sample_size(20);

    for count in [1_000, 5_000] {
        let mut solver = populated_solver(count);
        solver.set_backend(LocalBackend::new());

        group.bench_with_input(BenchmarkId::new("particles", count), &count, |b, _| {
            b.iter(|| solver.update(black_box(1.0 / 60.0)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_cell_table_build,
    bench_update,
    bench_update_with_local_backend,
);
criterion_main!(benches);
