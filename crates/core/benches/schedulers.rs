//! Benchmarks comparing the write and read paths across the eviction
//! scheduler variants.
//!
//! Run with: cargo bench --bench schedulers

use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;

use kestrel_core::{
    DeadlineScheduler, EvictionScheduler, IntervalScheduler, NoopScheduler,
    PerEntryTimerScheduler, TtlMap, WorkerThreadScheduler,
};

const KEY_SPACE: u64 = 16_384;
const TTL: Duration = Duration::from_secs(30);

fn scheduler_variants() -> Vec<(&'static str, Arc<dyn EvictionScheduler<u64, u64>>)> {
    vec![
        ("noop", Arc::new(NoopScheduler)),
        ("per-entry", Arc::new(PerEntryTimerScheduler::new())),
        (
            "interval",
            Arc::new(IntervalScheduler::new(Duration::from_millis(1)).unwrap()),
        ),
        ("deadline", Arc::new(DeadlineScheduler::new())),
        ("worker", Arc::new(WorkerThreadScheduler::new())),
    ]
}

fn bench_insert_with_ttl(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_with_ttl");
    group.throughput(Throughput::Elements(1));
    for (name, scheduler) in scheduler_variants() {
        let map = TtlMap::with_scheduler(scheduler);
        group.bench_with_input(BenchmarkId::from_parameter(name), &map, |b, map| {
            let mut rng = rand::rng();
            b.iter(|| {
                let key = rng.random_range(0..KEY_SPACE);
                black_box(map.insert_with_ttl(key, key, TTL));
            });
        });
        map.clear();
    }
    group.finish();
}

fn bench_insert_remove_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_remove_churn");
    group.throughput(Throughput::Elements(2));
    for (name, scheduler) in scheduler_variants() {
        let map = TtlMap::with_scheduler(scheduler);
        group.bench_with_input(BenchmarkId::from_parameter(name), &map, |b, map| {
            let mut rng = rand::rng();
            b.iter(|| {
                let key = rng.random_range(0..KEY_SPACE);
                map.insert_with_ttl(key, key, TTL);
                black_box(map.remove(&key));
            });
        });
    }
    group.finish();
}

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_hit");
    group.throughput(Throughput::Elements(1));
    for (name, scheduler) in scheduler_variants() {
        let map = TtlMap::with_scheduler(scheduler);
        for key in 0..KEY_SPACE {
            map.insert_with_ttl(key, key, TTL);
        }
        group.bench_with_input(BenchmarkId::from_parameter(name), &map, |b, map| {
            let mut rng = rand::rng();
            b.iter(|| {
                let key = rng.random_range(0..KEY_SPACE);
                black_box(map.get(&key));
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert_with_ttl,
    bench_insert_remove_churn,
    bench_get_hit
);
criterion_main!(benches);
