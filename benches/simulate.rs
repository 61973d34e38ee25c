//! Criterion benchmarks for the curve sweep: sequential vs Rayon-parallel.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rlwm::{simulate_curves, simulate_curves_parallel, ParameterSet};

fn bench_curve_sweep(c: &mut Criterion) {
    let params = ParameterSet {
        n_trials: 1_000,
        ..ParameterSet::default()
    };

    c.bench_function("sweep_sequential", |b| {
        b.iter(|| simulate_curves(black_box(&params), black_box(42)).expect("sweep"))
    });

    c.bench_function("sweep_parallel", |b| {
        b.iter(|| simulate_curves_parallel(black_box(&params), black_box(42)).expect("sweep"))
    });
}

criterion_group!(benches, bench_curve_sweep);
criterion_main!(benches);
