//! Benchmarks for the daemon's pure, CPU-bound hot paths: context
//! classification and importance scoring, both invoked on every
//! `conversation` command.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nova_daemon::context::analyze;
use nova_daemon::memory::{compute_importance, extract_entity_candidates};

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("context_analyze");
    let samples = [
        "hi",
        "What is consciousness and awareness flowing through this bridge?",
        &"word ".repeat(30),
    ];

    for (i, text) in samples.iter().enumerate() {
        group.bench_with_input(BenchmarkId::new("analyze", i), text, |b, text| {
            b.iter(|| analyze(text));
        });
    }
    group.finish();
}

fn bench_importance(c: &mut Criterion) {
    let ctx = analyze("Do you remember our past conversation about consciousness?");
    c.bench_function("compute_importance", |b| {
        b.iter(|| compute_importance("Do you remember our past conversation about consciousness?", &ctx));
    });
}

fn bench_entity_extraction(c: &mut Criterion) {
    let text = "Tell Nova about Chazel and the Cathedral and also Phoenix and the Bridge";
    c.bench_function("extract_entity_candidates", |b| {
        b.iter(|| extract_entity_candidates(text));
    });
}

criterion_group!(benches, bench_analyze, bench_importance, bench_entity_extraction);
criterion_main!(benches);
