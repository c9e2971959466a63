//! Criterion benchmarks for the per-observation hot path.
//!
//! Benchmarks single and batched updates of `BinarySprt`, `TernarySprt`
//! and `Gsprt`, plus missing-parameter solving.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stmc_core::{
    AfterCompletion, BinarySprt, Design, Gsprt, ParameterSet, SequentialTest, TernarySprt,
};

fn stream(len: usize) -> Vec<bool> {
    (0..len).map(|i| i % 7 < 4).collect()
}

fn bench_single_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("update/single");

    for len in [100usize, 10_000] {
        let obs = stream(len);

        group.bench_with_input(BenchmarkId::new("sprt", len), &obs, |b, obs| {
            let template = BinarySprt::new(0.5, 0.01, 0.01, 0.001, false)
                .unwrap()
                .with_after_completion(AfterCompletion::Reevaluate);
            b.iter(|| {
                let mut t = template.clone();
                for &passed in obs {
                    t.update(black_box(passed));
                }
                black_box(t.completed());
            })
        });

        group.bench_with_input(BenchmarkId::new("tsprt", len), &obs, |b, obs| {
            let template = TernarySprt::new(0.5, 0.01, 0.01, 0.01, 0.001).unwrap();
            b.iter(|| {
                let mut t = template.clone();
                for &passed in obs {
                    t.update(black_box(passed));
                }
                black_box(t.completed());
            })
        });

        group.bench_with_input(BenchmarkId::new("gsprt", len), &obs, |b, obs| {
            let template = Gsprt::new(0.5, 0.01, 0.01, 10).unwrap();
            b.iter(|| {
                let mut t = template.clone();
                for &passed in obs {
                    t.update(black_box(passed));
                }
                black_box(t.completed());
            })
        });
    }

    group.finish();
}

fn bench_batched_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("update/batched");

    group.bench_function("sprt_counts", |b| {
        let template = BinarySprt::new(0.5, 0.01, 0.01, 0.001, false).unwrap();
        b.iter(|| {
            let mut t = template.clone();
            t.update_counts(black_box(5_000), black_box(4_900));
            black_box(t.log_ratio());
        })
    });

    group.bench_function("tsprt_counts", |b| {
        let template = TernarySprt::new(0.5, 0.01, 0.01, 0.01, 0.001).unwrap();
        b.iter(|| {
            let mut t = template.clone();
            t.update_counts(black_box(5_000), black_box(4_900));
            black_box(t.log_ratios());
        })
    });

    group.finish();
}

fn bench_solving(c: &mut Criterion) {
    let mut group = c.benchmark_group("params/solve");
    let base = ParameterSet::new()
        .with_threshold(0.3)
        .with_alpha(0.01)
        .with_beta(0.05)
        .with_delta(0.02);

    group.bench_function("sample_bound", |b| {
        b.iter(|| {
            black_box(base)
                .solve_before_sim(Design::Binary { lower_bound: false })
                .unwrap()
        })
    });

    let mut no_alpha = base.with_sample_bound(5_000);
    no_alpha.alpha = None;
    group.bench_function("alpha", |b| {
        b.iter(|| {
            black_box(no_alpha)
                .solve_before_sim(Design::Binary { lower_bound: false })
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_single_updates, bench_batched_updates, bench_solving);
criterion_main!(benches);
