//! Concurrent Two-Hand LEVER Cache
//!
//! Thread-safe LEVER using hash-sharded segments, one mutex per segment.

extern crate alloc;
extern crate std;

use crate::config::LeverCacheConfig;
use crate::lever::LeverSegment;
use crate::metrics::CacheMetrics;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash, Hasher};
use core::num::NonZeroUsize;
use parking_lot::Mutex;

#[cfg(feature = "hashbrown")]
use hashbrown::hash_map::DefaultHashBuilder;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;

use super::default_segment_count;

/// A thread-safe two-hand LEVER cache with segmented storage.
///
/// The total capacity is split evenly across the segments; each segment
/// runs the full two-hand eviction policy independently on its shard of
/// the key space.
///
/// # Example
///
/// ```ignore
/// use lever_rs::concurrent::ConcurrentLeverCache;
/// use std::sync::Arc;
/// use std::thread;
///
/// let cache = Arc::new(ConcurrentLeverCache::new(
///     core::num::NonZeroUsize::new(1024).unwrap(),
/// ));
/// let worker = Arc::clone(&cache);
/// thread::spawn(move || {
///     worker.set("key".to_string(), 42);
/// });
/// ```
pub struct ConcurrentLeverCache<K, V, S = DefaultHashBuilder> {
    segments: Box<[Mutex<LeverSegment<K, V, S>>]>,
    hash_builder: S,
}

impl<K, V> ConcurrentLeverCache<K, V, DefaultHashBuilder>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
{
    /// Creates a concurrent cache with the default segment count.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self::with_segments(capacity, default_segment_count())
    }

    /// Creates a concurrent cache with an explicit segment count.
    ///
    /// # Panics
    ///
    /// Panics if `segment_count` is 0 or `capacity < segment_count`.
    pub fn with_segments(capacity: NonZeroUsize, segment_count: usize) -> Self {
        assert!(segment_count > 0, "segment_count must be greater than 0");
        assert!(
            capacity.get() >= segment_count,
            "capacity must be >= segment_count"
        );
        Self::with_segments_and_hasher(capacity, segment_count, DefaultHashBuilder::default())
    }
}

impl<K, V, S> ConcurrentLeverCache<K, V, S>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
    S: BuildHasher + Clone + Send,
{
    /// Creates a concurrent cache with a custom hasher.
    pub fn with_segments_and_hasher(
        capacity: NonZeroUsize,
        segment_count: usize,
        hash_builder: S,
    ) -> Self {
        let segment_capacity = (capacity.get() / segment_count).max(1);
        let segment_cap = NonZeroUsize::new(segment_capacity).unwrap();
        let config = LeverCacheConfig::new(segment_cap);

        let segments: Vec<_> = (0..segment_count)
            .map(|_| Mutex::new(LeverSegment::with_hasher(config, hash_builder.clone(), None)))
            .collect();

        Self {
            segments: segments.into_boxed_slice(),
            hash_builder,
        }
    }

    fn segment_for<Q>(&self, key: &Q) -> &Mutex<LeverSegment<K, V, S>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        let mut hasher = self.hash_builder.build_hasher();
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.segments.len();
        &self.segments[index]
    }

    /// Looks up a key, marking the entry visited. Returns a clone of the
    /// value.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment_for(key).lock().get(key).cloned()
    }

    /// Reads a value without touching the visited bit.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment_for(key).lock().peek(key).cloned()
    }

    /// Non-mutating presence test.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment_for(key).lock().contains(key)
    }

    /// Inserts or updates a key in its segment, evicting within that
    /// segment on overflow.
    pub fn set(&self, key: K, value: V) {
        self.segment_for(&key).lock().set(key, value)
    }

    /// Removes a key, returning whether an entry was removed.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment_for(key).lock().remove(key)
    }

    /// Drops all entries in all segments.
    pub fn purge(&self) {
        for segment in self.segments.iter() {
            segment.lock().purge();
        }
    }

    /// Total entry count across segments.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.lock().len()).sum()
    }

    /// Returns `true` if no segment holds any entry.
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.lock().is_empty())
    }

    /// Total capacity across segments.
    pub fn cap(&self) -> usize {
        self.segments.iter().map(|s| s.lock().cap().get()).sum()
    }

    /// Aggregated `(total, hot)` across segments.
    pub fn stats(&self) -> (usize, usize) {
        let mut total = 0;
        let mut hot = 0;
        for segment in self.segments.iter() {
            let (t, h) = segment.lock().stats();
            total += t;
            hot += h;
        }
        (total, hot)
    }

    /// Sweeps one expiry bucket in every segment.
    pub fn delete_expired(&self) {
        for segment in self.segments.iter() {
            segment.lock().delete_expired();
        }
    }
}

impl<K, V, S> CacheMetrics for ConcurrentLeverCache<K, V, S>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
    S: BuildHasher + Clone + Send,
{
    /// Sums each counter across segments; rate metrics are recomputed
    /// from the summed counters by the consumer if needed.
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut merged: BTreeMap<String, f64> = BTreeMap::new();
        for segment in self.segments.iter() {
            for (key, value) in segment.lock().metrics().metrics() {
                *merged.entry(key).or_insert(0.0) += value;
            }
        }
        merged
    }

    fn algorithm_name(&self) -> &'static str {
        "LEVER"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::String;
    use alloc::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_set_get() {
        let cache: ConcurrentLeverCache<String, u32> =
            ConcurrentLeverCache::new(NonZeroUsize::new(64).unwrap());
        cache.set(String::from("a"), 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_concurrent_threads() {
        let cache = Arc::new(ConcurrentLeverCache::new(NonZeroUsize::new(256).unwrap()));
        let mut handles = Vec::new();

        for t in 0..4 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("t{}_{}", t, i);
                    cache.set(key.clone(), i);
                    let _ = cache.get(&key);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= cache.cap());
    }

    #[test]
    fn test_segment_capacity_bound() {
        let cache: ConcurrentLeverCache<u32, u32> =
            ConcurrentLeverCache::with_segments(NonZeroUsize::new(16).unwrap(), 4);
        for i in 0..1000 {
            cache.set(i, i);
        }
        assert!(cache.len() <= 16);
    }

    #[test]
    fn test_purge_and_stats() {
        let cache: ConcurrentLeverCache<u32, u32> =
            ConcurrentLeverCache::new(NonZeroUsize::new(64).unwrap());
        for i in 0..32 {
            cache.set(i, i);
        }
        let (total, _) = cache.stats();
        assert_eq!(total, cache.len());
        cache.purge();
        assert!(cache.is_empty());
    }
}
