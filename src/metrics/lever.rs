//! Two-Hand LEVER Metrics
//!
//! The two-hand variant distinguishes three controller events: fast-hand
//! demotions (visited node moved behind the slow hand), quick demotions
//! (the slow hand's unvisited node evicted directly), and FIFO demotions
//! (slow hand saw a visited node, so the back node was evicted instead).

extern crate alloc;

use super::{CacheMetrics, CoreCacheMetrics};
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

/// Metrics for the two-hand LEVER variant.
#[derive(Debug, Default, Clone)]
pub struct LeverCacheMetrics {
    /// Core counters common to all variants.
    pub core: CoreCacheMetrics,
    /// Visited nodes the fast hand demoted behind the slow hand.
    pub fast_demotions: u64,
    /// Evictions of a never-visited node under the slow hand.
    pub quick_demotions: u64,
    /// Evictions of the back node because the slow hand saw a visited one.
    pub fifo_demotions: u64,
}

impl LeverCacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fast-hand demotion.
    #[inline]
    pub fn record_fast_demotion(&mut self) {
        self.fast_demotions += 1;
    }

    /// Records a quick demotion.
    #[inline]
    pub fn record_quick_demotion(&mut self) {
        self.quick_demotions += 1;
    }

    /// Records a FIFO demotion.
    #[inline]
    pub fn record_fifo_demotion(&mut self) {
        self.fifo_demotions += 1;
    }

    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.core.to_btreemap();
        metrics.insert("fast_demotions".to_string(), self.fast_demotions as f64);
        metrics.insert("quick_demotions".to_string(), self.quick_demotions as f64);
        metrics.insert("fifo_demotions".to_string(), self.fifo_demotions as f64);
        metrics
    }
}

impl CacheMetrics for LeverCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "LEVER"
    }
}
