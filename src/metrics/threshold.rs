//! LEVER-threshold Metrics

extern crate alloc;

use super::{CacheMetrics, CoreCacheMetrics};
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

/// Metrics for the threshold variant.
#[derive(Debug, Default, Clone)]
pub struct ThresholdCacheMetrics {
    /// Core counters common to all variants.
    pub core: CoreCacheMetrics,
    /// First-hit promotions (move-to-front + visited set).
    pub promotions: u64,
    /// Visited bits cleared by the hot-share bleed loop.
    pub hot_clears: u64,
}

impl ThresholdCacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a first-hit promotion.
    #[inline]
    pub fn record_promotion(&mut self) {
        self.promotions += 1;
    }

    /// Records one step of the bleed loop.
    #[inline]
    pub fn record_hot_clear(&mut self) {
        self.hot_clears += 1;
    }

    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.core.to_btreemap();
        metrics.insert("promotions".to_string(), self.promotions as f64);
        metrics.insert("hot_clears".to_string(), self.hot_clears as f64);
        metrics
    }
}

impl CacheMetrics for ThresholdCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "LEVER-threshold"
    }
}
