use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use insight_core::Field;
use insight_pipeline::{execute_pipeline, AnalysisSet, PipelineConfig};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Two correlated numeric series of `rows` values
fn generate_fields(rows: usize, seed: u64) -> Vec<Field> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let a: Vec<f64> = (0..rows).map(|i| i as f64 * 0.5 + rng.gen_range(-10.0..10.0)).collect();
    let b: Vec<f64> = a.iter().map(|v| 2.0 * v + rng.gen_range(-5.0..5.0)).collect();
    vec![Field::numeric("a", a), Field::numeric("b", b)]
}

fn bench_statistics_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics_chunking");
    let rows = 200_000;
    let fields = generate_fields(rows, 42);
    group.throughput(Throughput::Elements(rows as u64));

    for chunk_size in [10_000, 50_000, rows] {
        let config = PipelineConfig::default()
            .with_chunk_threshold(0)
            .with_chunk_size(chunk_size)
            .with_analyses(AnalysisSet::STATISTICS);
        group.bench_with_input(BenchmarkId::from_parameter(chunk_size), &config, |b, config| {
            b.iter(|| execute_pipeline(black_box(&fields), config.clone(), |_| {}).unwrap())
        });
    }
    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");
    for rows in [1_000, 10_000] {
        let fields = generate_fields(rows, 7);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &fields, |b, fields| {
            b.iter(|| execute_pipeline(black_box(fields), PipelineConfig::default(), |_| {}).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_statistics_chunking, bench_full_pipeline);
criterion_main!(benches);
