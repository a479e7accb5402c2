//! LEVER-AIMD Metrics
//!
//! On top of the core counters, the AIMD variant tracks how often the
//! promote counter grew (additive evidence) and how often the demotion
//! walk halved it (multiplicative evidence), which together describe how
//! the regulator is oscillating.

extern crate alloc;

use super::{CacheMetrics, CoreCacheMetrics};
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

/// Metrics for the AIMD variant.
#[derive(Debug, Default, Clone)]
pub struct AimdCacheMetrics {
    /// Core counters common to all variants.
    pub core: CoreCacheMetrics,
    /// First-hit promotions (move-to-front + visited set).
    pub promotions: u64,
    /// Demotion walks that halved the promote counter.
    pub halvings: u64,
}

impl AimdCacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a first-hit promotion.
    #[inline]
    pub fn record_promotion(&mut self) {
        self.promotions += 1;
    }

    /// Records one n/2 demotion walk.
    #[inline]
    pub fn record_halving(&mut self) {
        self.halvings += 1;
    }

    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.core.to_btreemap();
        metrics.insert("promotions".to_string(), self.promotions as f64);
        metrics.insert("halvings".to_string(), self.halvings as f64);
        metrics
    }
}

impl CacheMetrics for AimdCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "LEVER-AIMD"
    }
}
