//! Configuration for the SHIFT cache.

use core::fmt;
use core::num::NonZeroUsize;

/// Default insert-mark window divisor: the protected window forms once the
/// eviction queue shrinks to 1/10th of capacity.
pub const DEFAULT_WINDOW_DIVISOR: usize = 10;

/// Configuration for a SHIFT (two-queue reorganization) cache.
///
/// # Examples
///
/// ```
/// use lever_rs::config::ShiftCacheConfig;
/// use lever_rs::ShiftCache;
/// use core::num::NonZeroUsize;
///
/// let config = ShiftCacheConfig::new(NonZeroUsize::new(100).unwrap());
/// assert_eq!(config.window_divisor, 10);
/// let cache: ShiftCache<&str, i32> = ShiftCache::init(config, None);
/// assert_eq!(cache.cap().get(), 100);
/// ```
#[derive(Clone, Copy)]
pub struct ShiftCacheConfig {
    /// Maximum number of live entries across both queues.
    pub capacity: NonZeroUsize,
    /// The insert mark is placed once the eviction queue has at most
    /// `capacity / window_divisor` entries left. Must be nonzero.
    pub window_divisor: usize,
}

impl ShiftCacheConfig {
    /// Config with the default capacity/10 window.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            window_divisor: DEFAULT_WINDOW_DIVISOR,
        }
    }
}

impl fmt::Debug for ShiftCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShiftCacheConfig")
            .field("capacity", &self.capacity)
            .field("window_divisor", &self.window_divisor)
            .finish()
    }
}
