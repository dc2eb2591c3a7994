use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lock_overhead::Strategy;
use std::hint::black_box;

const ITERATIONS: u64 = 100_000;

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("counter_increment");
    group.throughput(Throughput::Elements(ITERATIONS));

    for strategy in Strategy::ALL {
        group.bench_with_input(
            BenchmarkId::new(strategy.name(), ITERATIONS),
            &ITERATIONS,
            |b, &iterations| {
                b.iter(|| strategy.run(black_box(iterations)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
