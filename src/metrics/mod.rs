//! Cache Metrics System
//!
//! Provides a metrics collection and reporting system for the eviction
//! variants using BTreeMap-based reporting. Each variant tracks its own
//! controller events (promotions, demotions, transplants) on top of a
//! common core, and reports everything through the [`CacheMetrics`] trait.
//!
//! BTreeMap is used instead of HashMap so that metrics always appear in a
//! deterministic order, which keeps test assertions and benchmark reports
//! reproducible.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

pub mod aimd;
pub mod lever;
pub mod shake_sieve;
pub mod shift;
pub mod status;
pub mod threshold;

pub use aimd::AimdCacheMetrics;
pub use lever::LeverCacheMetrics;
pub use shake_sieve::ShakeSieveCacheMetrics;
pub use shift::ShiftCacheMetrics;
pub use status::StatusCacheMetrics;
pub use threshold::ThresholdCacheMetrics;

/// Counters common to all eviction variants.
///
/// Capacity is counted in entries, so unlike byte-accounting caches there
/// is no size bookkeeping here; the interesting per-variant numbers live
/// in the variant metrics structs.
#[derive(Debug, Default, Clone)]
pub struct CoreCacheMetrics {
    /// Total lookups (get/get_mut) made against the cache.
    pub requests: u64,

    /// Lookups that found their key.
    pub cache_hits: u64,

    /// New entries inserted by set-on-miss.
    pub insertions: u64,

    /// Entries removed by the eviction controller on overflow.
    pub evictions: u64,

    /// Entries removed explicitly (remove or purge).
    pub removals: u64,

    /// Entries collected by a TTL expiry sweep.
    pub expirations: u64,
}

impl CoreCacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a lookup that found its key.
    #[inline]
    pub fn record_hit(&mut self) {
        self.requests += 1;
        self.cache_hits += 1;
    }

    /// Records a lookup that missed.
    #[inline]
    pub fn record_miss(&mut self) {
        self.requests += 1;
    }

    /// Records a set-on-miss insertion.
    #[inline]
    pub fn record_insertion(&mut self) {
        self.insertions += 1;
    }

    /// Records a capacity eviction.
    #[inline]
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Records an explicit removal.
    #[inline]
    pub fn record_removal(&mut self) {
        self.removals += 1;
    }

    /// Records a TTL expiry.
    #[inline]
    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    /// Fraction of lookups that hit, 0.0 when no lookups were made.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.cache_hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Fraction of lookups that missed, 0.0 when no lookups were made.
    pub fn miss_rate(&self) -> f64 {
        if self.requests > 0 {
            (self.requests - self.cache_hits) as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Converts the core counters to a BTreeMap for reporting.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("requests".to_string(), self.requests as f64);
        metrics.insert("cache_hits".to_string(), self.cache_hits as f64);
        metrics.insert(
            "cache_misses".to_string(),
            (self.requests - self.cache_hits) as f64,
        );
        metrics.insert("insertions".to_string(), self.insertions as f64);
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("removals".to_string(), self.removals as f64);
        metrics.insert("expirations".to_string(), self.expirations as f64);

        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("miss_rate".to_string(), self.miss_rate());

        if self.requests > 0 {
            metrics.insert(
                "eviction_rate".to_string(),
                self.evictions as f64 / self.requests as f64,
            );
        }

        metrics
    }
}

/// Uniform metrics interface implemented by every cache type.
///
/// Keys are sorted (BTreeMap) so output order is deterministic across
/// runs, which the comparison demo and the benches rely on.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Short identifier of the eviction policy (e.g. "LEVER", "SHIFT").
    fn algorithm_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_counters() {
        let mut core = CoreCacheMetrics::new();
        core.record_hit();
        core.record_hit();
        core.record_miss();
        core.record_insertion();
        core.record_eviction();

        assert_eq!(core.requests, 3);
        assert_eq!(core.cache_hits, 2);
        assert_eq!(core.insertions, 1);
        assert_eq!(core.evictions, 1);
        assert!((core.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
        assert!((core.miss_rate() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rates_with_no_requests() {
        let core = CoreCacheMetrics::new();
        assert_eq!(core.hit_rate(), 0.0);
        assert_eq!(core.miss_rate(), 0.0);
    }

    #[test]
    fn test_to_btreemap_keys() {
        let mut core = CoreCacheMetrics::new();
        core.record_miss();
        let map = core.to_btreemap();
        assert_eq!(map.get("requests"), Some(&1.0));
        assert_eq!(map.get("cache_misses"), Some(&1.0));
        assert_eq!(map.get("eviction_rate"), Some(&0.0));
    }
}
