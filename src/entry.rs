//! Unified Cache Entry Type
//!
//! This module provides the `CacheEntry<K, V, M>` structure shared by all
//! eviction variants, plus the eviction callback machinery. The generic `M`
//! parameter carries the variant's per-entry state (visited bit, packed
//! status bits, frequency counter, TTL fields) without affecting the core
//! entry structure.
//!
//! # Design Philosophy
//!
//! The policies in this crate deliberately avoid per-access list
//! reordering; what "recently used" means is encoded entirely in the
//! metadata bits, so the entry itself is nothing more than the owned
//! key/value pair and its metadata. Capacity is counted in entries, so
//! there is no size field.

extern crate alloc;

use alloc::boxed::Box;
use core::fmt;

/// Why an entry left the cache, as reported to the [`OnEvict`] callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    /// The eviction controller chose the entry as a victim on overflow.
    Evicted,
    /// The entry was removed explicitly (`remove` or `purge`).
    Removed,
    /// The entry's TTL deadline passed and an expiry sweep collected it.
    Expired,
}

/// Callback invoked with the key, value, and reason whenever an entry
/// leaves the cache.
///
/// The callback runs synchronously inside the mutating operation with the
/// victim's key and value borrowed. It must not call back into the same
/// cache instance.
pub type OnEvict<K, V> = Box<dyn FnMut(&K, &V, EvictReason) + Send>;

/// A cache entry holding the owned key/value pair and the eviction
/// variant's per-entry metadata.
///
/// # Examples
///
/// ```
/// use lever_rs::entry::CacheEntry;
/// use lever_rs::meta::AimdMeta;
///
/// let entry = CacheEntry::new("key", 42, AimdMeta::cold());
/// assert_eq!(entry.key, "key");
/// assert_eq!(entry.value, 42);
/// assert!(!entry.metadata.visited);
/// ```
pub struct CacheEntry<K, V, M> {
    /// The cached key. Also stored in the index map, which owns the lookup.
    pub key: K,

    /// The cached value.
    pub value: V,

    /// Variant-specific per-entry state (visited bit, status bits, ...).
    pub metadata: M,
}

impl<K, V, M> CacheEntry<K, V, M> {
    #[inline]
    pub fn new(key: K, value: V, metadata: M) -> Self {
        Self {
            key,
            value,
            metadata,
        }
    }
}

impl<K: Clone, V: Clone, M: Clone> Clone for CacheEntry<K, V, M> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: self.value.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, M: fmt::Debug> fmt::Debug for CacheEntry<K, V, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Returns the current wall-clock time in nanoseconds since the UNIX
/// epoch, used for TTL deadlines.
///
/// In `no_std` environments this returns 0, which makes TTL bookkeeping
/// inert (entries never appear expired).
#[cfg(feature = "std")]
#[inline]
pub(crate) fn now_nanos() -> u64 {
    extern crate std;
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(not(feature = "std"))]
#[inline]
pub(crate) fn now_nanos() -> u64 {
    0
}
