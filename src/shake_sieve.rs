//! ShakeSieve Cache Implementation
//!
//! The frequency-counting member of the SHIFT family. The two-queue
//! mechanics (eviction/retention, queue swap, insert-mark window) match
//! [`shift`](crate::shift); the difference is the per-entry state: instead
//! of a visited bit each entry carries an access frequency, and surviving
//! an eviction pass halves it on the way into retention. An entry thus
//! needs sustained hits, not a single touch, to keep earning second lives.

extern crate alloc;

use crate::config::ShakeSieveCacheConfig;
use crate::entry::{CacheEntry, EvictReason, OnEvict};
use crate::list::{List, ListNode};
use crate::meta::ShakeMeta;
use crate::metrics::{CacheMetrics, ShakeSieveCacheMetrics};
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

type Node<K, V> = ListNode<CacheEntry<K, V, ShakeMeta>>;

/// Which physical queue an entry lives in; the roles rotate on swap.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum QueueId {
    A,
    B,
}

impl QueueId {
    fn other(self) -> QueueId {
        match self {
            QueueId::A => QueueId::B,
            QueueId::B => QueueId::A,
        }
    }
}

/// Internal ShakeSieve segment containing the actual cache algorithm.
pub(crate) struct ShakeSieveSegment<K, V, S = DefaultHashBuilder> {
    config: ShakeSieveCacheConfig,
    queue_a: List<CacheEntry<K, V, ShakeMeta>>,
    queue_b: List<CacheEntry<K, V, ShakeMeta>>,
    eviction_id: QueueId,
    insert_mark: *mut Node<K, V>,
    map: HashMap<K, (*mut Node<K, V>, QueueId), S>,
    metrics: ShakeSieveCacheMetrics,
    on_evict: Option<OnEvict<K, V>>,
}

// SAFETY: the segment owns all nodes the raw pointers reference, and all
// mutation requires &mut self.
unsafe impl<K: Send, V: Send, S: Send> Send for ShakeSieveSegment<K, V, S> {}
unsafe impl<K: Send, V: Send, S: Sync> Sync for ShakeSieveSegment<K, V, S> {}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> ShakeSieveSegment<K, V, S> {
    pub(crate) fn with_hasher(
        config: ShakeSieveCacheConfig,
        hash_builder: S,
        on_evict: Option<OnEvict<K, V>>,
    ) -> Self {
        assert!(config.window_divisor > 0, "window_divisor must be nonzero");
        let map_capacity = config.capacity.get().next_power_of_two();
        ShakeSieveSegment {
            config,
            queue_a: List::new(),
            queue_b: List::new(),
            eviction_id: QueueId::A,
            insert_mark: ptr::null_mut(),
            map: HashMap::with_capacity_and_hasher(map_capacity, hash_builder),
            metrics: ShakeSieveCacheMetrics::new(),
            on_evict,
        }
    }

    fn queue(&self, id: QueueId) -> &List<CacheEntry<K, V, ShakeMeta>> {
        match id {
            QueueId::A => &self.queue_a,
            QueueId::B => &self.queue_b,
        }
    }

    fn queue_mut(&mut self, id: QueueId) -> &mut List<CacheEntry<K, V, ShakeMeta>> {
        match id {
            QueueId::A => &mut self.queue_a,
            QueueId::B => &mut self.queue_b,
        }
    }

    fn queue_pair(
        &mut self,
    ) -> (
        &mut List<CacheEntry<K, V, ShakeMeta>>,
        &mut List<CacheEntry<K, V, ShakeMeta>>,
    ) {
        match self.eviction_id {
            QueueId::A => (&mut self.queue_a, &mut self.queue_b),
            QueueId::B => (&mut self.queue_b, &mut self.queue_a),
        }
    }

    #[inline]
    fn retention_id(&self) -> QueueId {
        self.eviction_id.other()
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
    pub(crate) fn metrics(&self) -> &ShakeSieveCacheMetrics {
        &self.metrics
    }

    pub(crate) fn set_on_evict(&mut self, on_evict: Option<OnEvict<K, V>>) {
        self.on_evict = on_evict;
    }

    fn notify(&mut self, entry: &CacheEntry<K, V, ShakeMeta>, reason: EvictReason) {
        if let Some(cb) = self.on_evict.as_mut() {
            cb(&entry.key, &entry.value, reason);
        }
    }

    /// First hit since the last survival pulls a retention entry to the
    /// front (while no window is active); every hit bumps the frequency.
    unsafe fn mark_hit(&mut self, node: *mut Node<K, V>, qid: QueueId) {
        let freq = (*node).value().metadata.freq;
        if qid == self.retention_id() && freq == 0 && self.insert_mark.is_null() {
            self.queue_mut(qid).move_to_front(node);
        }
        (*node).value_mut().metadata.touch();
    }

    pub(crate) fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if let Some(&(node, qid)) = self.map.get(key) {
            unsafe {
                // SAFETY: node comes from our map
                self.mark_hit(node, qid);
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
        let (node, qid) = self.map.get(key).copied()?;
        unsafe {
            // SAFETY: node comes from our map
            self.mark_hit(node, qid);
            self.metrics.core.record_hit();
            Some(&mut (*node).value_mut().value)
        }
    }

    pub(crate) fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let (node, _) = self.map.get(key).copied()?;
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
        if let Some(&(node, qid)) = self.map.get(&key) {
            unsafe {
                // SAFETY: node comes from our map
                self.mark_hit(node, qid);
                (*node).value_mut().value = value;
            }
            return;
        }

        if self.map.len() >= self.cap().get() {
            self.evict();
        }

        let entry = CacheEntry::new(key.clone(), value, ShakeMeta::cold());
        let (node, qid) = if self.insert_mark.is_null() {
            let id = self.eviction_id;
            (self.queue_mut(id).push_front(entry), id)
        } else {
            let id = self.retention_id();
            let mark = self.insert_mark;
            // SAFETY: the mark is a linked retention node
            (unsafe { self.queue_mut(id).insert_after(mark, entry) }, id)
        };
        self.map.insert(key, (node, qid));
        self.metrics.core.record_insertion();
    }

    /// Pops candidates until one with zero frequency is dropped; survivors
    /// move into retention with their frequency halved.
    fn evict(&mut self) {
        if self.queue(self.eviction_id).is_empty() && !self.queue(self.retention_id()).is_empty() {
            self.swap_queues();
        }

        let mut evicted = false;
        while !evicted {
            let back = self.queue(self.eviction_id).back();
            if back.is_null() {
                break;
            }
            unsafe {
                if (*back).value().metadata.freq > 0 {
                    (*back).value_mut().metadata.halve();
                    let ret_id = self.retention_id();
                    {
                        let (ev, ret) = self.queue_pair();
                        ev.unlink(back);
                        ret.link_front(back);
                    }
                    let key = &(*back).value().key;
                    if let Some(slot) = self.map.get_mut(key) {
                        slot.1 = ret_id;
                    }
                    self.metrics.record_transplant();
                } else {
                    // SAFETY: back is linked in the eviction queue
                    self.remove_node(back, self.eviction_id, EvictReason::Evicted);
                    self.metrics.core.record_eviction();
                    evicted = true;
                }
            }
            if self.queue(self.eviction_id).is_empty() {
                self.swap_queues();
            }
        }

        let window = self.cap().get() / self.config.window_divisor;
        if self.queue(self.eviction_id).len() <= window && self.insert_mark.is_null() {
            self.place_insert_mark();
        }
    }

    fn swap_queues(&mut self) {
        self.eviction_id = self.eviction_id.other();
        self.insert_mark = ptr::null_mut();
        self.metrics.record_queue_swap();
    }

    /// Same placement rule as SHIFT, with zero frequency playing the role
    /// of the unvisited bit.
    fn place_insert_mark(&mut self) {
        let ev_len = self.queue(self.eviction_id).len();
        let ret = self.queue(self.retention_id());
        let mut mark = ret.back();
        if mark.is_null() {
            return;
        }
        unsafe {
            loop {
                let p = ret.prev(mark);
                if p.is_null() || (*p).value().metadata.freq > 0 {
                    break;
                }
                mark = p;
            }
            for _ in 0..ev_len {
                let p = ret.prev(mark);
                if p.is_null() {
                    break;
                }
                mark = p;
            }
        }
        self.insert_mark = mark;
        self.metrics.record_mark_set();
    }

    unsafe fn remove_node(&mut self, node: *mut Node<K, V>, qid: QueueId, reason: EvictReason) {
        if self.insert_mark == node {
            self.insert_mark = self.queue(qid).prev(node);
        }
        let entry = self.queue_mut(qid).remove(node);
        self.map.remove(&entry.key);
        self.notify(&entry, reason);
    }

    pub(crate) fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if let Some(&(node, qid)) = self.map.get(key) {
            unsafe {
                // SAFETY: node comes from our map
                self.remove_node(node, qid, EvictReason::Removed);
            }
            self.metrics.core.record_removal();
            true
        } else {
            false
        }
    }

    pub(crate) fn purge(&mut self) {
        loop {
            let entry = match self.queue_a.pop_back() {
                Some(entry) => entry,
                None => match self.queue_b.pop_back() {
                    Some(entry) => entry,
                    None => break,
                },
            };
            self.map.remove(&entry.key);
            self.metrics.core.record_removal();
            self.notify(&entry, EvictReason::Removed);
        }
        self.insert_mark = ptr::null_mut();
        self.eviction_id = QueueId::A;
    }

    /// Returns `(total, hot)` with hot counting entries with nonzero
    /// frequency in both queues.
    pub(crate) fn stats(&self) -> (usize, usize) {
        let mut hot = 0;
        for list in [&self.queue_a, &self.queue_b] {
            let mut node = list.back();
            while !node.is_null() {
                unsafe {
                    if (*node).value().metadata.freq > 0 {
                        hot += 1;
                    }
                    node = list.prev(node);
                }
            }
        }
        (self.map.len(), hot)
    }
}

impl<K, V, S> fmt::Debug for ShakeSieveSegment<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShakeSieveSegment")
            .field("capacity", &self.config.capacity)
            .field("len", &self.map.len())
            .finish()
    }
}

/// A ShakeSieve (two-queue, frequency-halving) cache.
///
/// # Example
///
/// ```
/// use lever_rs::ShakeSieveCache;
/// use lever_rs::config::ShakeSieveCacheConfig;
/// use core::num::NonZeroUsize;
///
/// let config = ShakeSieveCacheConfig::new(NonZeroUsize::new(3).unwrap());
/// let mut cache = ShakeSieveCache::init(config, None);
///
/// cache.set("a", 1);
/// cache.set("b", 2);
/// cache.set("c", 3);
/// cache.get(&"a");
/// cache.set("d", 4);
/// assert!(cache.contains(&"a"));
/// assert_eq!(cache.len(), 3);
/// ```
#[derive(Debug)]
pub struct ShakeSieveCache<K, V, S = DefaultHashBuilder> {
    segment: ShakeSieveSegment<K, V, S>,
}

impl<K: Hash + Eq + Clone, V> ShakeSieveCache<K, V> {
    /// Creates a cache from a config and an optional eviction callback.
    ///
    /// # Panics
    ///
    /// Panics if `config.window_divisor` is zero.
    pub fn init(config: ShakeSieveCacheConfig, on_evict: Option<OnEvict<K, V>>) -> Self {
        Self::with_hasher(config, DefaultHashBuilder::default(), on_evict)
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> ShakeSieveCache<K, V, S> {
    /// Creates a cache with a custom hash builder.
    pub fn with_hasher(
        config: ShakeSieveCacheConfig,
        hash_builder: S,
        on_evict: Option<OnEvict<K, V>>,
    ) -> Self {
        Self {
            segment: ShakeSieveSegment::with_hasher(config, hash_builder, on_evict),
        }
    }

    /// Returns the maximum number of entries the cache can hold.
    #[inline]
    pub fn cap(&self) -> NonZeroUsize {
        self.segment.cap()
    }

    /// Returns the current number of entries across both queues.
    #[inline]
    pub fn len(&self) -> usize {
        self.segment.len()
    }

    /// Returns `true` if the cache contains no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segment.is_empty()
    }

    /// Looks up a key, bumping the entry's frequency on a hit.
    #[inline]
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.get(key)
    }

    /// Looks up a key mutably, bumping the entry's frequency on a hit.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.get_mut(key)
    }

    /// Reads a value without touching the frequency.
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
    /// runs one eviction pass.
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

    /// Drops all entries, resets the queues and the insert mark.
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

impl<K: Hash + Eq + Clone, V, S: BuildHasher> CacheMetrics for ShakeSieveCache<K, V, S> {
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

    fn make_cache<K: Hash + Eq + Clone, V>(cap: usize) -> ShakeSieveCache<K, V> {
        let config = ShakeSieveCacheConfig::new(NonZeroUsize::new(cap).unwrap());
        ShakeSieveCache::init(config, None)
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
    fn test_zero_freq_entry_is_dropped() {
        let mut cache = make_cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        cache.set("d", 4);
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&"a"));
    }

    #[test]
    fn test_frequency_halving_on_transplant() {
        let mut cache = make_cache(2);
        cache.set("a", 1);
        cache.set("b", 2);
        // freq("a") = 3; the first survival halves it to 1, the second to
        // 0, so the third pass drops it
        cache.get(&"a");
        cache.get(&"a");
        cache.get(&"a");
        cache.set("c", 3); // survives: freq 3 -> 1
        assert!(cache.contains(&"a"));
        cache.set("d", 4); // survives: freq 1 -> 0
        assert!(cache.contains(&"a"));
        cache.set("e", 5);
        cache.set("f", 6);
        assert!(!cache.contains(&"a"));
    }

    #[test]
    fn test_capacity_bound_holds() {
        let mut cache = make_cache(5);
        for i in 0..300 {
            cache.set(i, i);
            assert!(cache.len() <= 5);
            if i % 2 == 0 {
                let _ = cache.get(&(i - 1));
            }
        }
    }

    #[test]
    fn test_remove_and_purge() {
        let mut cache = make_cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        assert!(cache.remove(&"a"));
        assert!(!cache.remove(&"a"));
        cache.purge();
        assert_eq!(cache.len(), 0);
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
        assert!(metrics.get("transplants").is_some());
        assert_eq!(cache.algorithm_name(), "ShakeSieve");
    }
}
