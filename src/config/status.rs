//! Configuration for the LEVER-status cache.

use core::fmt;
use core::num::NonZeroUsize;

/// Default lower bound on the hot share before the post-eviction bleed
/// step starts demoting promoted entries.
pub const DEFAULT_MIN_HOT_THRESHOLD: f64 = 0.5;

/// Configuration for a bit-packed status LEVER cache.
///
/// # Examples
///
/// ```
/// use lever_rs::config::StatusCacheConfig;
/// use lever_rs::LeverStatusCache;
/// use core::num::NonZeroUsize;
///
/// let config = StatusCacheConfig::new(NonZeroUsize::new(100).unwrap());
/// assert_eq!(config.min_hot_threshold, 0.5);
/// let cache: LeverStatusCache<&str, i32> = LeverStatusCache::init(config, None);
/// assert_eq!(cache.cap().get(), 100);
/// ```
#[derive(Clone, Copy)]
pub struct StatusCacheConfig {
    /// Maximum number of live entries.
    pub capacity: NonZeroUsize,
    /// Hot-share floor in [0, 1]. After each eviction, while more than
    /// `min_hot_threshold * capacity` entries are hot, one promoted entry
    /// under the hand is demoted.
    pub min_hot_threshold: f64,
}

impl StatusCacheConfig {
    /// Config with the default 0.5 hot threshold.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            min_hot_threshold: DEFAULT_MIN_HOT_THRESHOLD,
        }
    }
}

impl fmt::Debug for StatusCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusCacheConfig")
            .field("capacity", &self.capacity)
            .field("min_hot_threshold", &self.min_hot_threshold)
            .finish()
    }
}
