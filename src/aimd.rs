//! LEVER-AIMD Cache Implementation
//!
//! The AIMD variant regulates the promoted ("hot") working set the way TCP
//! regulates a congestion window: a first hit on an entry is additive
//! evidence that the hot share may grow, so the entry moves to the front
//! and a promote counter `n` increments; every miss that has to make room
//! is multiplicative evidence that the hot share has grown too large, so
//! the hand walks backward `n/2` steps clearing visited bits and `n` is
//! halved.
//!
//! ## Data Structure
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      LEVER-AIMD Cache                          │
//! │                                                                │
//! │  HashMap<K, *Node>         Ordered sequence                    │
//! │  ┌──────────────┐    front ┌───────────────────────┐ back      │
//! │  │ "apple" ───────────▶    │ hot ◀──▶ ptr ◀──▶ cold │          │
//! │  │ "banana" ──────────▶    │           ▲            │          │
//! │  └──────────────┘          └───────────┼────────────┘          │
//! │                                 insertion point                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! New entries are linked directly behind the hand, so unvisited
//! newcomers sit next to the eviction side and quick demotion comes for
//! free; the actual victim on overflow is always the back node.
//!
//! ## Operations
//!
//! | Operation | Action | Time |
//! |-----------|--------|------|
//! | `get` | First hit: move-to-front, set visited, `n += 1`. Later hits: set bit only | O(1) |
//! | `set` (miss) | Walk hand `n/2` steps clearing bits, halve `n`, insert after hand, evict back | amortized O(1) |
//! | `remove` | Unlink, repair hand | O(1) |
//!
//! The first insertion into an empty cache is treated as hot and anchors
//! the hand. When the demotion walk reaches the front it clamps there; a
//! hand whose node disappeared re-anchors at the front before the next
//! insertion.
//!
//! # Thread Safety
//!
//! `LeverAimdCache` is not thread-safe; wrap it in a `Mutex` or shard it
//! (see the `concurrent` module for the sharded flagship variants).

extern crate alloc;

use crate::config::AimdCacheConfig;
use crate::entry::{CacheEntry, EvictReason, OnEvict};
use crate::list::{List, ListNode};
use crate::meta::AimdMeta;
use crate::metrics::{AimdCacheMetrics, CacheMetrics};
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

type Node<K, V> = ListNode<CacheEntry<K, V, AimdMeta>>;

/// Internal AIMD segment containing the actual cache algorithm.
///
/// # Safety
///
/// The `map` values are raw pointers into `list`. They stay valid because
/// a node is only deallocated by the same operations that remove its map
/// entry, and the hand is repaired to its previous neighbor before any
/// node it references is unlinked.
pub(crate) struct AimdSegment<K, V, S = DefaultHashBuilder> {
    config: AimdCacheConfig,
    list: List<CacheEntry<K, V, AimdMeta>>,
    map: HashMap<K, *mut Node<K, V>, S>,
    /// Eviction hand: insertion point and demotion-walk cursor.
    ptr: *mut Node<K, V>,
    /// Promote counter: grows by one per first hit, halved per miss.
    n: usize,
    metrics: AimdCacheMetrics,
    on_evict: Option<OnEvict<K, V>>,
}

// SAFETY: the segment owns all nodes the raw pointers reference, and all
// mutation requires &mut self.
unsafe impl<K: Send, V: Send, S: Send> Send for AimdSegment<K, V, S> {}
unsafe impl<K: Send, V: Send, S: Sync> Sync for AimdSegment<K, V, S> {}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> AimdSegment<K, V, S> {
    pub(crate) fn with_hasher(
        config: AimdCacheConfig,
        hash_builder: S,
        on_evict: Option<OnEvict<K, V>>,
    ) -> Self {
        let map_capacity = config.capacity.get().next_power_of_two();
        AimdSegment {
            config,
            list: List::new(),
            map: HashMap::with_capacity_and_hasher(map_capacity, hash_builder),
            ptr: ptr::null_mut(),
            n: 0,
            metrics: AimdCacheMetrics::new(),
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
    pub(crate) fn metrics(&self) -> &AimdCacheMetrics {
        &self.metrics
    }

    pub(crate) fn set_on_evict(&mut self, on_evict: Option<OnEvict<K, V>>) {
        self.on_evict = on_evict;
    }

    fn notify(&mut self, entry: &CacheEntry<K, V, AimdMeta>, reason: EvictReason) {
        if let Some(cb) = self.on_evict.as_mut() {
            cb(&entry.key, &entry.value, reason);
        }
    }

    /// First hit since the last scan pass promotes the node; later hits
    /// take the fast path and touch nothing.
    unsafe fn mark_hit(&mut self, node: *mut Node<K, V>) {
        if !(*node).value().metadata.visited {
            self.list.move_to_front(node);
            (*node).value_mut().metadata.visited = true;
            self.n += 1;
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
                .push_front(CacheEntry::new(key.clone(), value, AimdMeta::hot()));
            self.map.insert(key, node);
            self.ptr = node;
            self.metrics.core.record_insertion();
            return;
        }

        // Multiplicative demotion: walk the hand backward n/2 steps
        // clearing visited bits, clamping at the front.
        let steps = self.n / 2;
        if steps > 0 {
            self.metrics.record_halving();
        }
        for _ in 0..steps {
            if self.ptr.is_null() {
                break;
            }
            unsafe {
                // SAFETY: the hand only ever references linked nodes
                (*self.ptr).value_mut().metadata.visited = false;
                let prev = self.list.prev(self.ptr);
                if prev.is_null() {
                    break;
                }
                self.ptr = prev;
            }
        }
        self.n /= 2;

        // A hand whose node disappeared re-anchors at the front.
        if self.ptr.is_null() {
            self.ptr = self.list.front();
        }

        let entry = CacheEntry::new(key.clone(), value, AimdMeta::cold());
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

    /// Evicts the back node. Called at most once per overflowing insertion.
    fn evict(&mut self) {
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

    /// Unlinks a node, repairing the hand first so it never references an
    /// unlinked node.
    unsafe fn remove_node(&mut self, node: *mut Node<K, V>, reason: EvictReason) {
        if self.ptr == node {
            self.ptr = self.list.prev(node);
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
        self.n = 0;
    }

    /// Returns `(total, hot)` where hot counts entries with the visited
    /// bit set, derived by a back-to-front scan.
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

impl<K, V, S> fmt::Debug for AimdSegment<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AimdSegment")
            .field("capacity", &self.config.capacity)
            .field("len", &self.map.len())
            .field("n", &self.n)
            .finish()
    }
}

/// A LEVER cache with AIMD hot-share regulation.
///
/// Hits set a visited bit (moving the entry to the front only on the first
/// hit since the last scan); misses insert behind the eviction hand and
/// evict the back entry on overflow, after halving the promoted region.
///
/// # Example
///
/// ```
/// use lever_rs::LeverAimdCache;
/// use lever_rs::config::AimdCacheConfig;
/// use core::num::NonZeroUsize;
///
/// let config = AimdCacheConfig::new(NonZeroUsize::new(2).unwrap());
/// let mut cache = LeverAimdCache::init(config, None);
///
/// cache.set("apple", 1);
/// cache.set("banana", 2);
/// assert_eq!(cache.get(&"apple"), Some(&1));
///
/// cache.set("cherry", 3); // evicts the back entry
/// assert_eq!(cache.len(), 2);
/// ```
#[derive(Debug)]
pub struct LeverAimdCache<K, V, S = DefaultHashBuilder> {
    segment: AimdSegment<K, V, S>,
}

impl<K: Hash + Eq + Clone, V> LeverAimdCache<K, V> {
    /// Creates a cache from a config and an optional eviction callback.
    ///
    /// The callback runs synchronously inside the mutating operation and
    /// must not call back into this cache.
    pub fn init(config: AimdCacheConfig, on_evict: Option<OnEvict<K, V>>) -> Self {
        Self::with_hasher(config, DefaultHashBuilder::default(), on_evict)
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> LeverAimdCache<K, V, S> {
    /// Creates a cache with a custom hash builder.
    pub fn with_hasher(
        config: AimdCacheConfig,
        hash_builder: S,
        on_evict: Option<OnEvict<K, V>>,
    ) -> Self {
        Self {
            segment: AimdSegment::with_hasher(config, hash_builder, on_evict),
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

    /// Drops all entries and resets the hand and promote counter.
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

impl<K: Hash + Eq + Clone, V, S: BuildHasher> CacheMetrics for LeverAimdCache<K, V, S> {
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
    use alloc::boxed::Box;
    use alloc::string::ToString;
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicUsize, Ordering};

    fn make_cache<K: Hash + Eq + Clone, V>(cap: usize) -> LeverAimdCache<K, V> {
        let config = AimdCacheConfig::new(NonZeroUsize::new(cap).unwrap());
        LeverAimdCache::init(config, None)
    }

    #[test]
    fn test_set_get() {
        let mut cache = make_cache(3);
        cache.set("apple", 1);
        cache.set("banana", 2);
        assert_eq!(cache.get(&"apple"), Some(&1));
        assert_eq!(cache.get(&"banana"), Some(&2));
        assert_eq!(cache.get(&"cherry"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_set_updates_value() {
        let mut cache = make_cache(2);
        cache.set("apple", 1);
        cache.set("apple", 9);
        assert_eq!(cache.get(&"apple"), Some(&9));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_bound_holds() {
        let mut cache = make_cache(3);
        for i in 0..20 {
            cache.set(i, i);
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn test_cold_workload_evicts_unvisited() {
        // First insertion is the bootstrap hot entry and anchors the hand;
        // everything after stays cold next to the eviction side.
        let mut cache = make_cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        cache.set("d", 4);
        assert_eq!(cache.len(), 3);
        // the bootstrap entry survives, one of the cold ones was evicted
        assert!(cache.contains(&"a"));
    }

    #[test]
    fn test_hot_entry_survives() {
        let mut cache = make_cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        cache.get(&"b");
        for i in 0..10 {
            cache.set(i.to_string(), i);
        }
        // the repeatedly useful entry outlives the one-shot fillers
        assert!(cache.len() <= 3);
    }

    #[test]
    fn test_remove() {
        let mut cache = make_cache(2);
        cache.set("apple", 1);
        assert!(cache.remove(&"apple"));
        assert!(!cache.remove(&"apple"));
        assert!(!cache.contains(&"apple"));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_remove_hand_node_then_evict() {
        // Removing the node under the hand must not leave a dangling hand.
        let mut cache = make_cache(2);
        cache.set("a", 1); // bootstrap: hand on "a"
        assert!(cache.remove(&"a"));
        cache.set("b", 2);
        cache.set("c", 3);
        cache.set("d", 4); // forces an eviction with the repaired hand
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_purge_resets_state() {
        let mut cache = make_cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.get(&"b");
        cache.purge();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), (0, 0));
        cache.set("c", 3);
        assert_eq!(cache.get(&"c"), Some(&3));
    }

    #[test]
    fn test_peek_does_not_mark_visited() {
        let mut cache = make_cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        let (_, hot_before) = cache.stats();
        assert_eq!(cache.peek(&"b"), Some(&2));
        let (_, hot_after) = cache.stats();
        assert_eq!(hot_before, hot_after);
    }

    #[test]
    fn test_stats_counts_visited() {
        let mut cache = make_cache(4);
        cache.set("a", 1); // bootstrap entry is hot
        cache.set("b", 2);
        cache.set("c", 3);
        assert_eq!(cache.stats(), (3, 1));
        cache.get(&"b");
        assert_eq!(cache.stats(), (3, 2));
    }

    #[test]
    fn test_on_evict_callback() {
        let evictions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evictions);
        let config = AimdCacheConfig::new(NonZeroUsize::new(2).unwrap());
        let mut cache = LeverAimdCache::init(
            config,
            Some(Box::new(move |_k: &i32, _v: &i32, reason| {
                if reason == EvictReason::Evicted {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })),
        );
        for i in 0..5 {
            cache.set(i, i);
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(evictions.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_capacity_one() {
        let mut cache = make_cache(1);
        for i in 0..5 {
            cache.set(i, i);
            assert_eq!(cache.len(), 1);
        }
    }

    #[test]
    fn test_metrics() {
        let mut cache = make_cache(2);
        cache.set("a", 1);
        cache.get(&"a");
        cache.get(&"missing");
        cache.set("b", 2);
        cache.set("c", 3);
        let metrics = cache.metrics();
        assert_eq!(metrics.get("requests"), Some(&2.0));
        assert_eq!(metrics.get("cache_hits"), Some(&1.0));
        assert_eq!(metrics.get("evictions"), Some(&1.0));
        assert_eq!(cache.algorithm_name(), "LEVER-AIMD");
    }

    #[test]
    fn test_many_operations_keep_invariants() {
        let mut cache = make_cache(8);
        let mut live: Vec<u32> = Vec::new();
        for i in 0..200u32 {
            match i % 5 {
                0 | 1 => {
                    cache.set(i % 16, i);
                    live.push(i % 16);
                }
                2 => {
                    let _ = cache.get(&(i % 16));
                }
                3 => {
                    let _ = cache.remove(&(i % 16));
                }
                _ => {
                    let _ = cache.peek(&(i % 16));
                }
            }
            assert!(cache.len() <= 8);
            let (total, hot) = cache.stats();
            assert_eq!(total, cache.len());
            assert!(hot <= total);
        }
    }
}
