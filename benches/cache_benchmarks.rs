//! Criterion benchmarks comparing the eviction variants on a Zipf
//! workload (the standard skewed-popularity shape for cache studies).
//!
//! Each iteration performs a get-then-set-on-miss cycle, the same access
//! discipline the hit-rate comparison demo uses.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Zipf};
use std::num::NonZeroUsize;

use lever_rs::config::{
    AimdCacheConfig, LeverCacheConfig, ShakeSieveCacheConfig, ShiftCacheConfig, StatusCacheConfig,
    ThresholdCacheConfig,
};
use lever_rs::{
    LeverAimdCache, LeverCache, LeverStatusCache, LeverThresholdCache, ShakeSieveCache, ShiftCache,
};

const CACHE_SIZE: usize = 10_000;
const KEY_SPACE: u64 = 100_000;
const WORKLOAD_LEN: usize = 200_000;

/// Pre-generates a Zipf-distributed key trace so the benchmark loop
/// measures cache work, not RNG work.
fn zipf_trace() -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(0x1eve2);
    let zipf = Zipf::new(KEY_SPACE, 1.01).unwrap();
    (0..WORKLOAD_LEN)
        .map(|_| zipf.sample(&mut rng) as u64)
        .collect()
}

macro_rules! bench_variant {
    ($group:expr, $trace:expr, $label:expr, $cache:expr) => {{
        let mut cache = $cache;
        $group.throughput(Throughput::Elements($trace.len() as u64));
        $group.bench_with_input(
            BenchmarkId::new($label, CACHE_SIZE),
            $trace,
            |b, trace| {
                b.iter(|| {
                    let mut hits = 0u64;
                    for key in trace {
                        if cache.get(key).is_some() {
                            hits += 1;
                        } else {
                            cache.set(*key, *key);
                        }
                    }
                    black_box(hits)
                })
            },
        );
    }};
}

fn benchmark_caches(c: &mut Criterion) {
    let trace = zipf_trace();
    let cap = NonZeroUsize::new(CACHE_SIZE).unwrap();
    let mut group = c.benchmark_group("zipf_get_set");

    bench_variant!(
        group,
        &trace,
        "lever_aimd",
        LeverAimdCache::<u64, u64>::init(AimdCacheConfig::new(cap), None)
    );
    bench_variant!(
        group,
        &trace,
        "lever_threshold",
        LeverThresholdCache::<u64, u64>::init(ThresholdCacheConfig::new(cap), None)
    );
    bench_variant!(
        group,
        &trace,
        "lever_two_hand",
        LeverCache::<u64, u64>::init(LeverCacheConfig::new(cap), None)
    );
    bench_variant!(
        group,
        &trace,
        "lever_status",
        LeverStatusCache::<u64, u64>::init(StatusCacheConfig::new(cap), None)
    );
    bench_variant!(
        group,
        &trace,
        "shift",
        ShiftCache::<u64, u64>::init(ShiftCacheConfig::new(cap), None)
    );
    bench_variant!(
        group,
        &trace,
        "shake_sieve",
        ShakeSieveCache::<u64, u64>::init(ShakeSieveCacheConfig::new(cap), None)
    );

    group.finish();
}

criterion_group!(benches, benchmark_caches);
criterion_main!(benches);
