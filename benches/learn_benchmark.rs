//! Benchmarks for online learning and prediction.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ema::{EmaConfig, Example, OnlineEvaluator};

/// Deterministic synthetic stream: a few informative features per class plus noise
fn synthetic_stream(n_examples: usize, n_classes: usize, n_features: usize) -> Vec<Example> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move |bound: usize| {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((state >> 33) as usize) % bound
    };

    (0..n_examples)
        .map(|_| {
            let label = next(n_classes) + 1;
            let mut features = vec![label, n_classes + 1 + next(n_features)];
            features.extend((0..4).map(|_| next(n_classes + n_features) + 1));
            Example::new(label, features)
        })
        .collect()
}

fn bench_online_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("online_evaluation");

    for size in [100, 1_000, 10_000].iter() {
        let stream = synthetic_stream(*size, 50, 500);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut evaluator = OnlineEvaluator::new(EmaConfig::default()).unwrap();
                evaluator
                    .run(black_box(stream.iter().cloned().map(Ok)), ())
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_predict_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict_rank");

    for n_classes in [10, 100, 1_000].iter() {
        let stream = synthetic_stream(5_000, *n_classes, 500);
        let mut evaluator = OnlineEvaluator::new(EmaConfig::default()).unwrap();
        evaluator.run(stream.iter().cloned().map(Ok), ()).unwrap();
        let ema = evaluator.into_classifier();
        let x = stream[0].to_features().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(n_classes), n_classes, |b, _| {
            b.iter(|| ema.predict_rank(black_box(&x)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_online_evaluation, bench_predict_rank);
criterion_main!(benches);
