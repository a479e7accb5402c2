//! LEVER-threshold Cache Implementation
//!
//! The bounded-hot variant of LEVER. Hits behave exactly as in the AIMD
//! variant (first hit promotes to the front and sets the visited bit), but
//! instead of a reactive promote counter the cache keeps an approximate
//! `hot` count and caps it: on overflow the hand clears visited bits until
//! the hot share drops back under `hot_ratio * capacity` (0.99 by
//! default), then evicts the back node. The end state matches AIMD with a
//! hard bound instead of a reactive one, and the bound guarantees the scan
//! terminates with a demoted victim available.
//!
//! `hot` is a regulator, not an exact census: removals and bleed steps
//! adjust it saturatingly and the cache never relies on it being precise.

extern crate alloc;

use crate::config::ThresholdCacheConfig;
use crate::entry::{CacheEntry, EvictReason, OnEvict};
use crate::list::{List, ListNode};
use crate::meta::ThresholdMeta;
use crate::metrics::{CacheMetrics, ThresholdCacheMetrics};
use alloc::collections::BTreeMap;
use alloc::string::String;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::num::NonZeroUsize;
use core::ptr;

#[cfg(feature = "hashbrown")]
use hashbrown::hash_map::DefaultHashBuilder;
#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

type Node<K, V> = ListNode<CacheEntry<K, V, ThresholdMeta>>;

/// Internal threshold segment containing the actual cache algorithm.
pub(crate) struct ThresholdSegment<K, V, S = DefaultHashBuilder> {
    config: ThresholdCacheConfig,
    list: List<CacheEntry<K, V, ThresholdMeta>>,
    map: HashMap<K, *mut Node<K, V>, S>,
    /// Eviction hand: insertion point and bleed-loop cursor.
    ptr: *mut Node<K, V>,
    /// Approximate count of entries with the visited bit set.
    hot: usize,
    metrics: ThresholdCacheMetrics,
    on_evict: Option<OnEvict<K, V>>,
}

// SAFETY: the segment owns all nodes the raw pointers reference, and all
// mutation requires &mut self.
unsafe impl<K: Send, V: Send, S: Send> Send for ThresholdSegment<K, V, S> {}
unsafe impl<K: Send, V: Send, S: Sync> Sync for ThresholdSegment<K, V, S> {}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> ThresholdSegment<K, V, S> {
    pub(crate) fn with_hasher(
        config: ThresholdCacheConfig,
        hash_builder: S,
        on_evict: Option<OnEvict<K, V>>,
    ) -> Self {
        assert!(
            config.hot_ratio > 0.0 && config.hot_ratio <= 1.0,
            "hot_ratio must be in (0, 1]"
        );
        let map_capacity = config.capacity.get().next_power_of_two();
        ThresholdSegment {
            config,
            list: List::new(),
            map: HashMap::with_capacity_and_hasher(map_capacity, hash_builder),
            ptr: ptr::null_mut(),
            hot: 0,
            metrics: ThresholdCacheMetrics::new(),
            on_evict,
        }
    }

    #[inline]
    pub(crate) fn cap(&self) -> NonZeroUsize {
        self.config.capacity
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub(crate) fn metrics(&self) -> &ThresholdCacheMetrics {
        &self.metrics
    }

    pub(crate) fn set_on_evict(&mut self, on_evict: Option<OnEvict<K, V>>) {
        self.on_evict = on_evict;
    }

    fn notify(&mut self, entry: &CacheEntry<K, V, ThresholdMeta>, reason: EvictReason) {
        if let Some(cb) = self.on_evict.as_mut() {
            cb(&entry.key, &entry.value, reason);
        }
    }

    unsafe fn mark_hit(&mut self, node: *mut Node<K, V>) {
        if !(*node).value().metadata.visited {
            self.list.move_to_front(node);
            (*node).value_mut().metadata.visited = true;
            self.hot += 1;
            self.metrics.record_promotion();
        }
    }

    pub(crate) fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if let Some(&node) = self.map.get(key) {
            unsafe {
                // SAFETY: node comes from our map
                self.mark_hit(node);
                self.metrics.core.record_hit();
                Some(&(*node).value().value)
            }
        } else {
            self.metrics.core.record_miss();
            None
        }
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let node = self.map.get(key).copied()?;
        unsafe {
            // SAFETY: node comes from our map
            self.mark_hit(node);
            self.metrics.core.record_hit();
            Some(&mut (*node).value_mut().value)
        }
    }

    pub(crate) fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let node = self.map.get(key).copied()?;
        // SAFETY: node comes from our map; no metadata is touched
        unsafe { Some(&(*node).value().value) }
    }

    pub(crate) fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.map.contains_key(key)
    }

    pub(crate) fn set(&mut self, key: K, value: V) {
        if let Some(&node) = self.map.get(&key) {
            unsafe {
                // SAFETY: node comes from our map
                self.mark_hit(node);
                (*node).value_mut().value = value;
            }
            return;
        }

        // Bootstrap: the first insertion is treated as hot and anchors the
        // hand.
        if self.map.is_empty() {
            let node = self
                .list
                .push_front(CacheEntry::new(key.clone(), value, ThresholdMeta::hot()));
            self.map.insert(key, node);
            self.ptr = node;
            self.hot = 1;
            self.metrics.core.record_insertion();
            return;
        }

        if self.ptr.is_null() {
            self.ptr = self.list.front();
        }

        let entry = CacheEntry::new(key.clone(), value, ThresholdMeta::cold());
        let node = if self.ptr.is_null() {
            self.list.push_front(entry)
        } else {
            // SAFETY: ptr is a linked node of our list
            unsafe { self.list.insert_after(self.ptr, entry) }
        };
        self.map.insert(key, node);
        self.metrics.core.record_insertion();

        if self.map.len() > self.cap().get() {
            self.evict();
        }
    }

    /// Bleeds the hot share down under the cap, then evicts the back node.
    fn evict(&mut self) {
        let threshold = self.config.hot_ratio * self.cap().get() as f64;
        while (self.hot as f64) > threshold {
            if self.ptr.is_null() {
                break;
            }
            unsafe {
                // SAFETY: the hand only ever references linked nodes
                (*self.ptr).value_mut().metadata.visited = false;
                self.hot = self.hot.saturating_sub(1);
                self.metrics.record_hot_clear();
                let prev = self.list.prev(self.ptr);
                if prev.is_null() {
                    // clamped at the front; the hot share is bounded below
                    // by zero so the loop cannot make further progress
                    break;
                }
                self.ptr = prev;
            }
        }

        let victim = self.list.back();
        if victim.is_null() {
            return;
        }
        debug_assert_eq!(self.map.len(), self.list.len());
        unsafe {
            // SAFETY: victim is a linked node; hands are repaired first
            self.remove_node(victim, EvictReason::Evicted);
        }
        self.metrics.core.record_eviction();
    }

    unsafe fn remove_node(&mut self, node: *mut Node<K, V>, reason: EvictReason) {
        if self.ptr == node {
            self.ptr = self.list.prev(node);
        }
        if (*node).value().metadata.visited {
            self.hot = self.hot.saturating_sub(1);
        }
        let entry = self.list.remove(node);
        self.map.remove(&entry.key);
        self.notify(&entry, reason);
    }

    pub(crate) fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if let Some(&node) = self.map.get(key) {
            unsafe {
                // SAFETY: node comes from our map
                self.remove_node(node, EvictReason::Removed);
            }
            self.metrics.core.record_removal();
            true
        } else {
            false
        }
    }

    pub(crate) fn purge(&mut self) {
        while let Some(entry) = self.list.pop_back() {
            self.map.remove(&entry.key);
            self.metrics.core.record_removal();
            self.notify(&entry, EvictReason::Removed);
        }
        self.ptr = ptr::null_mut();
        self.hot = 0;
    }

    /// Returns `(total, hot)` with hot derived by scan, independent of the
    /// approximate regulator counter.
    pub(crate) fn stats(&self) -> (usize, usize) {
        let mut hot = 0;
        let mut node = self.list.back();
        while !node.is_null() {
            unsafe {
                if (*node).value().metadata.visited {
                    hot += 1;
                }
                node = self.list.prev(node);
            }
        }
        (self.map.len(), hot)
    }
}

impl<K, V, S> fmt::Debug for ThresholdSegment<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdSegment")
            .field("capacity", &self.config.capacity)
            .field("len", &self.map.len())
            .field("hot", &self.hot)
            .finish()
    }
}

/// A LEVER cache with a hard cap on the hot share.
///
/// # Example
///
/// ```
/// use lever_rs::LeverThresholdCache;
/// use lever_rs::config::ThresholdCacheConfig;
/// use core::num::NonZeroUsize;
///
/// let config = ThresholdCacheConfig::new(NonZeroUsize::new(2).unwrap());
/// let mut cache = LeverThresholdCache::init(config, None);
///
/// cache.set("apple", 1);
/// cache.set("banana", 2);
/// cache.set("cherry", 3);
/// assert_eq!(cache.len(), 2);
/// ```
#[derive(Debug)]
pub struct LeverThresholdCache<K, V, S = DefaultHashBuilder> {
    segment: ThresholdSegment<K, V, S>,
}

impl<K: Hash + Eq + Clone, V> LeverThresholdCache<K, V> {
    /// Creates a cache from a config and an optional eviction callback.
    ///
    /// # Panics
    ///
    /// Panics if `config.hot_ratio` is outside (0, 1].
    pub fn init(config: ThresholdCacheConfig, on_evict: Option<OnEvict<K, V>>) -> Self {
        Self::with_hasher(config, DefaultHashBuilder::default(), on_evict)
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> LeverThresholdCache<K, V, S> {
    /// Creates a cache with a custom hash builder.
    pub fn with_hasher(
        config: ThresholdCacheConfig,
        hash_builder: S,
        on_evict: Option<OnEvict<K, V>>,
    ) -> Self {
        Self {
            segment: ThresholdSegment::with_hasher(config, hash_builder, on_evict),
        }
    }

    /// Returns the maximum number of entries the cache can hold.
    #[inline]
    pub fn cap(&self) -> NonZeroUsize {
        self.segment.cap()
    }

    /// Returns the current number of entries in the cache.
    #[inline]
    pub fn len(&self) -> usize {
        self.segment.len()
    }

    /// Returns `true` if the cache contains no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segment.is_empty()
    }

    /// Looks up a key, marking the entry visited on a hit.
    #[inline]
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.get(key)
    }

    /// Looks up a key mutably, marking the entry visited on a hit.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.get_mut(key)
    }

    /// Reads a value without touching the visited bit.
    #[inline]
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.peek(key)
    }

    /// Non-mutating presence test.
    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.contains(key)
    }

    /// Inserts or updates a key. On overflow, evicts exactly one entry.
    #[inline]
    pub fn set(&mut self, key: K, value: V) {
        self.segment.set(key, value)
    }

    /// Removes a key, returning whether an entry was removed.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.remove(key)
    }

    /// Drops all entries and resets the hand and hot counter.
    #[inline]
    pub fn purge(&mut self) {
        self.segment.purge()
    }

    /// Returns `(total, hot)` entry counts.
    #[inline]
    pub fn stats(&self) -> (usize, usize) {
        self.segment.stats()
    }

    /// Replaces the eviction callback.
    #[inline]
    pub fn set_on_evict(&mut self, on_evict: Option<OnEvict<K, V>>) {
        self.segment.set_on_evict(on_evict)
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> CacheMetrics for LeverThresholdCache<K, V, S> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.segment.metrics().metrics()
    }

    fn algorithm_name(&self) -> &'static str {
        self.segment.metrics().algorithm_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cache<K: Hash + Eq + Clone, V>(cap: usize) -> LeverThresholdCache<K, V> {
        let config = ThresholdCacheConfig::new(NonZeroUsize::new(cap).unwrap());
        LeverThresholdCache::init(config, None)
    }

    #[test]
    fn test_set_get() {
        let mut cache = make_cache(3);
        cache.set("apple", 1);
        cache.set("banana", 2);
        assert_eq!(cache.get(&"apple"), Some(&1));
        assert_eq!(cache.get(&"banana"), Some(&2));
        assert_eq!(cache.get(&"cherry"), None);
    }

    #[test]
    fn test_capacity_bound_holds() {
        let mut cache = make_cache(4);
        for i in 0..50 {
            cache.set(i, i);
            assert!(cache.len() <= 4);
        }
    }

    #[test]
    fn test_fully_hot_cache_still_evicts() {
        // With every entry visited the bleed loop must demote enough
        // entries for the eviction to terminate.
        let mut cache = make_cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        cache.get(&"a");
        cache.get(&"b");
        cache.get(&"c");
        cache.set("d", 4);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_small_hot_ratio_demotes_aggressively() {
        let config = ThresholdCacheConfig {
            capacity: NonZeroUsize::new(4).unwrap(),
            hot_ratio: 0.25,
        };
        let mut cache: LeverThresholdCache<u32, u32> = LeverThresholdCache::init(config, None);
        for i in 0..4 {
            cache.set(i, i);
            cache.get(&i);
        }
        cache.set(4, 4);
        assert_eq!(cache.len(), 4);
        let (_, hot) = cache.stats();
        // at most one hot entry survives the bleed (ratio 0.25 of 4)
        assert!(hot <= 2);
    }

    #[test]
    #[should_panic(expected = "hot_ratio")]
    fn test_invalid_hot_ratio_panics() {
        let config = ThresholdCacheConfig {
            capacity: NonZeroUsize::new(4).unwrap(),
            hot_ratio: 1.5,
        };
        let _cache: LeverThresholdCache<u32, u32> = LeverThresholdCache::init(config, None);
    }

    #[test]
    fn test_remove_and_purge() {
        let mut cache = make_cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        assert!(cache.remove(&"a"));
        assert_eq!(cache.len(), 1);
        cache.purge();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats(), (0, 0));
        cache.set("c", 3);
        assert_eq!(cache.get(&"c"), Some(&3));
    }

    #[test]
    fn test_metrics() {
        let mut cache = make_cache(2);
        cache.set("a", 1);
        cache.get(&"a");
        cache.set("b", 2);
        cache.set("c", 3);
        let metrics = cache.metrics();
        assert_eq!(metrics.get("evictions"), Some(&1.0));
        assert_eq!(cache.algorithm_name(), "LEVER-threshold");
    }
}
