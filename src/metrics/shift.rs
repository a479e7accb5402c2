//! SHIFT Metrics
//!
//! The two-queue scheme's interesting numbers are how many entries earn a
//! second life in the retention queue, how often the queues swap roles,
//! and how often the insert mark (the protected window anchor) is placed.

extern crate alloc;

use super::{CacheMetrics, CoreCacheMetrics};
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

/// Metrics for the SHIFT variant.
#[derive(Debug, Default, Clone)]
pub struct ShiftCacheMetrics {
    /// Core counters common to all variants.
    pub core: CoreCacheMetrics,
    /// Visited entries transplanted from eviction into retention.
    pub transplants: u64,
    /// Times the two queues swapped roles.
    pub queue_swaps: u64,
    /// Times the insert mark was (re)placed.
    pub mark_sets: u64,
}

impl ShiftCacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a transplant into retention.
    #[inline]
    pub fn record_transplant(&mut self) {
        self.transplants += 1;
    }

    /// Records a queue swap.
    #[inline]
    pub fn record_queue_swap(&mut self) {
        self.queue_swaps += 1;
    }

    /// Records an insert-mark placement.
    #[inline]
    pub fn record_mark_set(&mut self) {
        self.mark_sets += 1;
    }

    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.core.to_btreemap();
        metrics.insert("transplants".to_string(), self.transplants as f64);
        metrics.insert("queue_swaps".to_string(), self.queue_swaps as f64);
        metrics.insert("mark_sets".to_string(), self.mark_sets as f64);
        metrics
    }
}

impl CacheMetrics for ShiftCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "SHIFT"
    }
}
