//! Configuration for the ShakeSieve cache.

use core::fmt;
use core::num::NonZeroUsize;

/// Default insert-mark window divisor for ShakeSieve: the protected window
/// forms once the eviction queue shrinks to 1/50th of capacity.
pub const DEFAULT_WINDOW_DIVISOR: usize = 50;

/// Configuration for a ShakeSieve (two-queue, frequency-counting) cache.
///
/// # Examples
///
/// ```
/// use lever_rs::config::ShakeSieveCacheConfig;
/// use lever_rs::ShakeSieveCache;
/// use core::num::NonZeroUsize;
///
/// let config = ShakeSieveCacheConfig::new(NonZeroUsize::new(100).unwrap());
/// assert_eq!(config.window_divisor, 50);
/// let cache: ShakeSieveCache<&str, i32> = ShakeSieveCache::init(config, None);
/// assert_eq!(cache.cap().get(), 100);
/// ```
#[derive(Clone, Copy)]
pub struct ShakeSieveCacheConfig {
    /// Maximum number of live entries across both queues.
    pub capacity: NonZeroUsize,
    /// The insert mark is placed once the eviction queue has at most
    /// `capacity / window_divisor` entries left. Must be nonzero.
    pub window_divisor: usize,
}

impl ShakeSieveCacheConfig {
    /// Config with the default capacity/50 window.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            window_divisor: DEFAULT_WINDOW_DIVISOR,
        }
    }
}

impl fmt::Debug for ShakeSieveCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShakeSieveCacheConfig")
            .field("capacity", &self.capacity)
            .field("window_divisor", &self.window_divisor)
            .finish()
    }
}
