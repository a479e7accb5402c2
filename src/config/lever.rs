//! Configuration for the two-hand LEVER cache.

use core::fmt;
use core::num::NonZeroUsize;
use core::time::Duration;

/// Configuration for a two-hand (fast/slow pointer) LEVER cache.
///
/// # TTL
///
/// `ttl` is a per-entry lifetime in nanoseconds; zero disables expiry.
/// Expired entries are collected by [`delete_expired`] sweeps driven by an
/// external scheduler, bucketed so each sweep touches 1/100th of the TTL
/// window.
///
/// [`delete_expired`]: crate::LeverCache::delete_expired
///
/// # Examples
///
/// ```
/// use lever_rs::config::LeverCacheConfig;
/// use lever_rs::LeverCache;
/// use core::num::NonZeroUsize;
/// use core::time::Duration;
///
/// let config = LeverCacheConfig::new(NonZeroUsize::new(100).unwrap())
///     .with_ttl(Duration::from_secs(60));
/// let cache: LeverCache<String, i32> = LeverCache::init(config, None);
/// assert_eq!(cache.cap().get(), 100);
/// ```
#[derive(Clone, Copy)]
pub struct LeverCacheConfig {
    /// Maximum number of live entries.
    pub capacity: NonZeroUsize,
    /// Per-entry lifetime in nanoseconds; zero disables TTL.
    pub ttl: u64,
}

impl LeverCacheConfig {
    /// Config without TTL.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { capacity, ttl: 0 }
    }

    /// Sets the per-entry lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl.as_nanos() as u64;
        self
    }
}

impl fmt::Debug for LeverCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeverCacheConfig")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish()
    }
}
