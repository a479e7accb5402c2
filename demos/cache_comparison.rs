//! Hit-rate comparison of the eviction variants on a Zipf workload.
//!
//! Run with: `cargo run --example cache_comparison --release`

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Zipf};
use std::num::NonZeroUsize;
use std::time::Instant;

use lever_rs::config::{
    AimdCacheConfig, LeverCacheConfig, ShakeSieveCacheConfig, ShiftCacheConfig, StatusCacheConfig,
    ThresholdCacheConfig,
};
use lever_rs::{
    LeverAimdCache, LeverCache, LeverStatusCache, LeverThresholdCache, ShakeSieveCache, ShiftCache,
};

const CACHE_SIZE: usize = 50_000;
const KEY_SPACE: u64 = 1_000_000;
const REQUESTS: usize = 2_000_000;

fn generate_trace() -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(42);
    let zipf = Zipf::new(KEY_SPACE, 1.01).unwrap();
    (0..REQUESTS).map(|_| zipf.sample(&mut rng) as u64).collect()
}

/// Runs the standard get-then-set-on-miss cycle and reports hit rate and
/// wall time.
macro_rules! run_trace {
    ($name:expr, $cache:expr, $trace:expr) => {{
        let mut cache = $cache;
        let mut hits = 0usize;
        let mut misses = 0usize;
        let start = Instant::now();
        for key in $trace {
            if cache.get(key).is_some() {
                hits += 1;
            } else {
                misses += 1;
                cache.set(*key, *key);
            }
        }
        let elapsed = start.elapsed();
        println!(
            "[{:<15}] hits: {:>8}  misses: {:>8}  hit rate: {:>6.2}%  time: {:?}",
            $name,
            hits,
            misses,
            hits as f64 / (hits + misses) as f64 * 100.0,
            elapsed,
        );
        cache
    }};
}

fn main() {
    let trace = generate_trace();
    let unique: std::collections::HashSet<_> = trace.iter().collect();
    println!(
        "requests: {}; unique keys: {}; cache size: {}\n",
        trace.len(),
        unique.len(),
        CACHE_SIZE
    );

    let cap = NonZeroUsize::new(CACHE_SIZE).unwrap();

    run_trace!(
        "lever-aimd",
        LeverAimdCache::<u64, u64>::init(AimdCacheConfig::new(cap), None),
        &trace
    );
    run_trace!(
        "lever-threshold",
        LeverThresholdCache::<u64, u64>::init(ThresholdCacheConfig::new(cap), None),
        &trace
    );
    let lever = run_trace!(
        "lever",
        LeverCache::<u64, u64>::init(LeverCacheConfig::new(cap), None),
        &trace
    );
    run_trace!(
        "lever-status",
        LeverStatusCache::<u64, u64>::init(StatusCacheConfig::new(cap), None),
        &trace
    );
    run_trace!(
        "shift",
        ShiftCache::<u64, u64>::init(ShiftCacheConfig::new(cap), None),
        &trace
    );
    run_trace!(
        "shakesieve",
        ShakeSieveCache::<u64, u64>::init(ShakeSieveCacheConfig::new(cap), None),
        &trace
    );

    let (total, hot) = lever.stats();
    println!("\n[lever] live entries: {}; hot entries: {}", total, hot);
}
