//! LEVER-status Cache Implementation
//!
//! A single-hand LEVER variant that packs two flags per entry: `temp`
//! (the entry was eagerly promoted to the front this scan cycle) and
//! `visit` (the entry was touched since the hand last passed). The first
//! hit after insertion or a scan moves the entry to the front exactly once
//! per cycle; later hits only record the `visit` bit.
//!
//! Eviction examines the hand's node: an unvisited node is removed on the
//! spot (quick demotion), a visited one has its flags cleared and the back
//! node is removed instead (FIFO demotion). Afterwards, while the hot
//! count exceeds `min_hot_threshold * capacity`, one more promoted entry
//! under the hand is demoted, bleeding the hot share down.
//!
//! The `hot` counter is an approximate regulator: clearing a scanned
//! node's flags does not adjust it, but removals of promoted entries do.

extern crate alloc;

use crate::config::StatusCacheConfig;
use crate::entry::{CacheEntry, EvictReason, OnEvict};
use crate::list::{List, ListNode};
use crate::meta::StatusMeta;
use crate::metrics::{CacheMetrics, StatusCacheMetrics};
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

type Node<K, V> = ListNode<CacheEntry<K, V, StatusMeta>>;

/// Internal status segment containing the actual cache algorithm.
pub(crate) struct StatusSegment<K, V, S = DefaultHashBuilder> {
    config: StatusCacheConfig,
    list: List<CacheEntry<K, V, StatusMeta>>,
    map: HashMap<K, *mut Node<K, V>, S>,
    /// Eviction hand.
    ptr: *mut Node<K, V>,
    /// Approximate count of promoted (temp-flagged) entries.
    hot: usize,
    metrics: StatusCacheMetrics,
    on_evict: Option<OnEvict<K, V>>,
}

// SAFETY: the segment owns all nodes the raw pointers reference, and all
// mutation requires &mut self.
unsafe impl<K: Send, V: Send, S: Send> Send for StatusSegment<K, V, S> {}
unsafe impl<K: Send, V: Send, S: Sync> Sync for StatusSegment<K, V, S> {}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> StatusSegment<K, V, S> {
    pub(crate) fn with_hasher(
        config: StatusCacheConfig,
        hash_builder: S,
        on_evict: Option<OnEvict<K, V>>,
    ) -> Self {
        assert!(
            (0.0..=1.0).contains(&config.min_hot_threshold),
            "min_hot_threshold must be in [0, 1]"
        );
        let map_capacity = config.capacity.get().next_power_of_two();
        StatusSegment {
            config,
            list: List::new(),
            map: HashMap::with_capacity_and_hasher(map_capacity, hash_builder),
            ptr: ptr::null_mut(),
            hot: 0,
            metrics: StatusCacheMetrics::new(),
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
    pub(crate) fn metrics(&self) -> &StatusCacheMetrics {
        &self.metrics
    }

    pub(crate) fn set_on_evict(&mut self, on_evict: Option<OnEvict<K, V>>) {
        self.on_evict = on_evict;
    }

    fn notify(&mut self, entry: &CacheEntry<K, V, StatusMeta>, reason: EvictReason) {
        if let Some(cb) = self.on_evict.as_mut() {
            cb(&entry.key, &entry.value, reason);
        }
    }

    /// Eager promotion on the first hit per scan cycle; every hit records
    /// the visit bit.
    unsafe fn mark_hit(&mut self, node: *mut Node<K, V>) {
        if !(*node).value().metadata.is_temp() {
            self.list.move_to_front(node);
            (*node).value_mut().metadata.set_temp();
            self.hot += 1;
            self.metrics.record_eager_promotion();
        }
        (*node).value_mut().metadata.set_visit();
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

        if self.map.len() >= self.cap().get() {
            self.evict();
        }

        // New insertions go to the front with the temp bit set: they enter
        // the promoted region and count as hot.
        let node = self
            .list
            .push_front(CacheEntry::new(key.clone(), value, StatusMeta::promoted()));
        self.map.insert(key, node);
        self.hot += 1;
        self.metrics.core.record_insertion();
    }

    /// Quick or FIFO demotion under the hand, then at most one bleed step.
    fn evict(&mut self) {
        if self.ptr.is_null() {
            self.ptr = self.list.back();
        }
        if self.ptr.is_null() {
            return;
        }
        debug_assert_eq!(self.map.len(), self.list.len());

        unsafe {
            let victim = if !(*self.ptr).value().metadata.is_visit() {
                // quick demotion
                let v = self.ptr;
                self.ptr = self.list.prev(v);
                self.metrics.record_quick_demotion();
                v
            } else {
                // FIFO demotion: the scanned node survives with cleared
                // flags, the oldest entry goes instead
                (*self.ptr).value_mut().metadata.clear();
                self.ptr = self.list.prev(self.ptr);
                self.metrics.record_fifo_demotion();
                self.list.back()
            };

            // SAFETY: victim is linked; remove_node repairs the hand
            self.remove_node(victim, EvictReason::Evicted);
            self.metrics.core.record_eviction();

            // Bleed the hot share down toward the configured floor.
            let floor = self.config.min_hot_threshold * self.cap().get() as f64;
            if (self.hot as f64) > floor
                && !self.ptr.is_null()
                && (*self.ptr).value().metadata.is_visit()
            {
                (*self.ptr).value_mut().metadata.clear();
                self.ptr = self.list.prev(self.ptr);
                self.hot = self.hot.saturating_sub(1);
                self.metrics.record_hot_bleed();
            }
        }
    }

    unsafe fn remove_node(&mut self, node: *mut Node<K, V>, reason: EvictReason) {
        if self.ptr == node {
            self.ptr = self.list.prev(node);
        }
        if (*node).value().metadata.is_temp() {
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

    /// Returns `(total, hot)` using the promoted-entry counter, matching
    /// the regulator the eviction path consults.
    pub(crate) fn stats(&self) -> (usize, usize) {
        (self.map.len(), self.hot)
    }
}

impl<K, V, S> fmt::Debug for StatusSegment<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusSegment")
            .field("capacity", &self.config.capacity)
            .field("len", &self.map.len())
            .field("hot", &self.hot)
            .finish()
    }
}

/// A LEVER cache with bit-packed per-entry status and eager promotion.
///
/// # Example
///
/// ```
/// use lever_rs::LeverStatusCache;
/// use lever_rs::config::StatusCacheConfig;
/// use core::num::NonZeroUsize;
///
/// let config = StatusCacheConfig::new(NonZeroUsize::new(2).unwrap());
/// let mut cache = LeverStatusCache::init(config, None);
///
/// cache.set("apple", 1);
/// cache.set("banana", 2);
/// cache.set("cherry", 3);
/// assert_eq!(cache.len(), 2);
/// ```
#[derive(Debug)]
pub struct LeverStatusCache<K, V, S = DefaultHashBuilder> {
    segment: StatusSegment<K, V, S>,
}

impl<K: Hash + Eq + Clone, V> LeverStatusCache<K, V> {
    /// Creates a cache from a config and an optional eviction callback.
    ///
    /// # Panics
    ///
    /// Panics if `config.min_hot_threshold` is outside [0, 1].
    pub fn init(config: StatusCacheConfig, on_evict: Option<OnEvict<K, V>>) -> Self {
        Self::with_hasher(config, DefaultHashBuilder::default(), on_evict)
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> LeverStatusCache<K, V, S> {
    /// Creates a cache with a custom hash builder.
    pub fn with_hasher(
        config: StatusCacheConfig,
        hash_builder: S,
        on_evict: Option<OnEvict<K, V>>,
    ) -> Self {
        Self {
            segment: StatusSegment::with_hasher(config, hash_builder, on_evict),
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

    /// Looks up a key. The first hit per scan cycle promotes the entry to
    /// the front; every hit records the visit bit.
    #[inline]
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.get(key)
    }

    /// Looks up a key mutably with the same promotion rules as `get`.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.get_mut(key)
    }

    /// Reads a value without touching the status bits.
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

    /// Inserts or updates a key. A miss that would exceed capacity first
    /// evicts one entry.
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

impl<K: Hash + Eq + Clone, V, S: BuildHasher> CacheMetrics for LeverStatusCache<K, V, S> {
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

    fn make_cache<K: Hash + Eq + Clone, V>(cap: usize) -> LeverStatusCache<K, V> {
        let config = StatusCacheConfig::new(NonZeroUsize::new(cap).unwrap());
        LeverStatusCache::init(config, None)
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
    fn test_new_insertions_count_as_hot() {
        let mut cache = make_cache(4);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.stats(), (2, 2));
    }

    #[test]
    fn test_eager_promotion_once_per_cycle() {
        let mut cache = make_cache(4);
        cache.set("a", 1);
        let (_, hot_after_insert) = cache.stats();
        cache.get(&"a");
        cache.get(&"a");
        cache.get(&"a");
        let (_, hot_after_hits) = cache.stats();
        // repeated hits do not inflate the hot counter
        assert_eq!(hot_after_insert, hot_after_hits);
    }

    #[test]
    fn test_capacity_bound_holds() {
        let mut cache = make_cache(4);
        for i in 0..100 {
            cache.set(i, i);
            assert!(cache.len() <= 4);
        }
    }

    #[test]
    fn test_quick_demotion_of_unvisited_back() {
        // Fresh insertions carry temp but not visit, so the hand's first
        // pass removes the oldest entry on the spot.
        let mut cache = make_cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        cache.set("d", 4);
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&"a"));
        for k in ["b", "c", "d"] {
            assert!(cache.contains(&k));
        }
    }

    #[test]
    fn test_remove_of_hand_node() {
        let mut cache = make_cache(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3); // anchors the hand at the back
        assert!(cache.remove(&"b") || cache.remove(&"c"));
        cache.set("d", 4);
        cache.set("e", 5);
        assert!(cache.len() <= 2);
    }

    #[test]
    fn test_purge() {
        let mut cache = make_cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.purge();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats(), (0, 0));
        cache.set("c", 3);
        assert_eq!(cache.get(&"c"), Some(&3));
    }

    #[test]
    fn test_hot_share_bleeds_down() {
        // With the floor at zero every eviction also demotes one promoted
        // entry, so the hot count cannot track capacity.
        let config = StatusCacheConfig {
            capacity: NonZeroUsize::new(4).unwrap(),
            min_hot_threshold: 0.0,
        };
        let mut cache: LeverStatusCache<u32, u32> = LeverStatusCache::init(config, None);
        for i in 0..20 {
            cache.set(i, i);
            let (total, _) = cache.stats();
            assert!(total <= 4);
        }
    }

    #[test]
    #[should_panic(expected = "min_hot_threshold")]
    fn test_invalid_threshold_panics() {
        let config = StatusCacheConfig {
            capacity: NonZeroUsize::new(4).unwrap(),
            min_hot_threshold: -0.1,
        };
        let _cache: LeverStatusCache<u32, u32> = LeverStatusCache::init(config, None);
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
        assert!(metrics.get("eager_promotions").is_some());
        assert_eq!(cache.algorithm_name(), "LEVER-status");
    }
}
