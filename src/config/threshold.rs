//! Configuration for the LEVER-threshold cache.

use core::fmt;
use core::num::NonZeroUsize;

/// Default cap on the hot share: the bleed loop demotes entries while more
/// than this fraction of capacity is marked visited.
pub const DEFAULT_HOT_RATIO: f64 = 0.99;

/// Configuration for a threshold (bounded-hot) LEVER cache.
///
/// # Examples
///
/// ```
/// use lever_rs::config::ThresholdCacheConfig;
/// use lever_rs::LeverThresholdCache;
/// use core::num::NonZeroUsize;
///
/// let config = ThresholdCacheConfig::new(NonZeroUsize::new(100).unwrap());
/// assert_eq!(config.hot_ratio, 0.99);
/// let cache: LeverThresholdCache<&str, i32> = LeverThresholdCache::init(config, None);
/// assert_eq!(cache.cap().get(), 100);
/// ```
#[derive(Clone, Copy)]
pub struct ThresholdCacheConfig {
    /// Maximum number of live entries.
    pub capacity: NonZeroUsize,
    /// Hot-share cap in (0, 1]. The eviction scan demotes entries while
    /// the visited count exceeds `hot_ratio * capacity`.
    pub hot_ratio: f64,
}

impl ThresholdCacheConfig {
    /// Config with the default 0.99 hot ratio.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            hot_ratio: DEFAULT_HOT_RATIO,
        }
    }
}

impl fmt::Debug for ThresholdCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdCacheConfig")
            .field("capacity", &self.capacity)
            .field("hot_ratio", &self.hot_ratio)
            .finish()
    }
}
