//! Configuration for the LEVER-AIMD cache.

use core::fmt;
use core::num::NonZeroUsize;

/// Configuration for an AIMD (additive promote / multiplicative demote)
/// LEVER cache.
///
/// The AIMD variant has no tuning knobs: the promote counter grows by one
/// per first hit and is halved by every demotion walk, so the hot share
/// regulates itself.
///
/// # Examples
///
/// ```
/// use lever_rs::config::AimdCacheConfig;
/// use lever_rs::LeverAimdCache;
/// use core::num::NonZeroUsize;
///
/// let config = AimdCacheConfig {
///     capacity: NonZeroUsize::new(100).unwrap(),
/// };
/// let cache: LeverAimdCache<&str, i32> = LeverAimdCache::init(config, None);
/// assert_eq!(cache.cap().get(), 100);
/// ```
#[derive(Clone, Copy)]
pub struct AimdCacheConfig {
    /// Maximum number of live entries.
    pub capacity: NonZeroUsize,
}

impl AimdCacheConfig {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { capacity }
    }
}

impl fmt::Debug for AimdCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AimdCacheConfig")
            .field("capacity", &self.capacity)
            .finish()
    }
}
