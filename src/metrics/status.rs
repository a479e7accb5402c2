//! LEVER-status Metrics

extern crate alloc;

use super::{CacheMetrics, CoreCacheMetrics};
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

/// Metrics for the bit-packed status variant.
#[derive(Debug, Default, Clone)]
pub struct StatusCacheMetrics {
    /// Core counters common to all variants.
    pub core: CoreCacheMetrics,
    /// First-hit eager promotions (temp bit set, move-to-front).
    pub eager_promotions: u64,
    /// Evictions of the unvisited node under the hand.
    pub quick_demotions: u64,
    /// Evictions of the back node because the hand's node was visited.
    pub fifo_demotions: u64,
    /// Hot-share bleed steps taken after an eviction.
    pub hot_bleeds: u64,
}

impl StatusCacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an eager promotion.
    #[inline]
    pub fn record_eager_promotion(&mut self) {
        self.eager_promotions += 1;
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

    /// Records a hot-share bleed step.
    #[inline]
    pub fn record_hot_bleed(&mut self) {
        self.hot_bleeds += 1;
    }

    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.core.to_btreemap();
        metrics.insert("eager_promotions".to_string(), self.eager_promotions as f64);
        metrics.insert("quick_demotions".to_string(), self.quick_demotions as f64);
        metrics.insert("fifo_demotions".to_string(), self.fifo_demotions as f64);
        metrics.insert("hot_bleeds".to_string(), self.hot_bleeds as f64);
        metrics
    }
}

impl CacheMetrics for StatusCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "LEVER-status"
    }
}
