//! Two-Hand LEVER Cache Implementation
//!
//! The flagship variant of the family. A hit only sets the entry's visited
//! bit; the sequence is never reordered on access. All reorganization
//! happens during eviction, where two hands sweep the chain from the back:
//!
//! - the **fast** hand advances two steps per eviction, clearing visited
//!   bits and demoting each visited node it passes to just behind the
//!   **slow** hand;
//! - the slow hand advances one step and selects the victim: its own node
//!   when unvisited (*quick demotion*), otherwise the back node (*FIFO
//!   demotion*).
//!
//! ```text
//!  front                                                   back
//!   ┌────┬────┬────┬────┬────┬────┬────┬────┬────┬────┬────┐
//!   │    │    │    │ fast ──▶ 2 steps │ slow ──▶ 1 step    │
//!   └────┴────┴────┴──▲─┴────┴────┴───┴──▲─┴────┴────┴──▲──┘
//!                     │    visited nodes │               │
//!                     └── demoted behind slow            └ FIFO victim
//! ```
//!
//! The two-pointer sweep bounds the amortized scan cost per eviction at
//! O(1) expected steps, and relative to a single-hand SIEVE it biases
//! toward retaining entries hit at least once since the slow hand last
//! passed.
//!
//! ## Hand repair
//!
//! Hands never own nodes, they name positions. Before any node is
//! unlinked (eviction, explicit removal, expiry), each hand equal to that
//! node is rewound to its previous neighbor; a null hand lazily re-anchors
//! at the back on the next eviction.
//!
//! ## TTL
//!
//! With a nonzero `ttl`, entries carry a deadline and are filed into one
//! of 100 expiry buckets; [`LeverCache::delete_expired`] sweeps one bucket
//! per call, advancing a cursor, and `bucket_id` assignment places new
//! entries in the bucket that will next be swept after one full cycle.
//! The timer that drives the sweeps lives outside the cache; it should
//! wait until [`LeverCache::next_expiry`] before sweeping so a sweep never
//! collects a live entry.

extern crate alloc;

use crate::config::LeverCacheConfig;
use crate::entry::{now_nanos, CacheEntry, EvictReason, OnEvict};
use crate::list::{List, ListNode};
use crate::meta::LeverMeta;
use crate::metrics::{CacheMetrics, LeverCacheMetrics};
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::num::NonZeroUsize;
use core::ptr;

#[cfg(feature = "hashbrown")]
use hashbrown::hash_map::DefaultHashBuilder;
#[cfg(feature = "hashbrown")]
use hashbrown::{HashMap, HashSet};

#[cfg(not(feature = "hashbrown"))]
use std::collections::hash_map::RandomState as DefaultHashBuilder;
#[cfg(not(feature = "hashbrown"))]
use std::collections::{HashMap, HashSet};

/// Number of expiry buckets the TTL window is divided into.
pub(crate) const NUM_BUCKETS: usize = 100;

type Node<K, V> = ListNode<CacheEntry<K, V, LeverMeta>>;

/// One expiry bucket: the keys filed under it and the latest deadline
/// among them.
struct Bucket<K> {
    keys: HashSet<K>,
    newest_entry: u64,
}

impl<K> Bucket<K> {
    fn new() -> Self {
        Bucket {
            keys: HashSet::new(),
            newest_entry: 0,
        }
    }
}

/// Internal two-hand segment containing the actual cache algorithm.
///
/// Shared between `LeverCache` (single-threaded) and
/// `ConcurrentLeverCache` (sharded).
pub(crate) struct LeverSegment<K, V, S = DefaultHashBuilder> {
    config: LeverCacheConfig,
    list: List<CacheEntry<K, V, LeverMeta>>,
    map: HashMap<K, *mut Node<K, V>, S>,
    /// Fast hand: two steps per eviction, demotes visited nodes.
    fast: *mut Node<K, V>,
    /// Slow hand: one step per eviction, selects the victim.
    slow: *mut Node<K, V>,
    /// Expiry buckets; unused (empty) when ttl is zero.
    buckets: Vec<Bucket<K>>,
    /// Index of the next bucket the expiry cursor will sweep.
    next_cleanup_bucket: u8,
    metrics: LeverCacheMetrics,
    on_evict: Option<OnEvict<K, V>>,
}

// SAFETY: the segment owns all nodes the raw pointers reference, and all
// mutation requires &mut self.
unsafe impl<K: Send, V: Send, S: Send> Send for LeverSegment<K, V, S> {}
unsafe impl<K: Send, V: Send, S: Sync> Sync for LeverSegment<K, V, S> {}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> LeverSegment<K, V, S> {
    pub(crate) fn with_hasher(
        config: LeverCacheConfig,
        hash_builder: S,
        on_evict: Option<OnEvict<K, V>>,
    ) -> Self {
        let map_capacity = config.capacity.get().next_power_of_two();
        let mut buckets = Vec::with_capacity(NUM_BUCKETS);
        for _ in 0..NUM_BUCKETS {
            buckets.push(Bucket::new());
        }
        LeverSegment {
            config,
            list: List::new(),
            map: HashMap::with_capacity_and_hasher(map_capacity, hash_builder),
            fast: ptr::null_mut(),
            slow: ptr::null_mut(),
            buckets,
            next_cleanup_bucket: 0,
            metrics: LeverCacheMetrics::new(),
            on_evict,
        }
    }

    #[inline]
    pub(crate) fn cap(&self) -> NonZeroUsize {
        self.config.capacity
    }

    #[inline]
    pub(crate) fn ttl(&self) -> u64 {
        self.config.ttl
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
    pub(crate) fn metrics(&self) -> &LeverCacheMetrics {
        &self.metrics
    }

    pub(crate) fn set_on_evict(&mut self, on_evict: Option<OnEvict<K, V>>) {
        self.on_evict = on_evict;
    }

    fn notify(&mut self, entry: &CacheEntry<K, V, LeverMeta>, reason: EvictReason) {
        if let Some(cb) = self.on_evict.as_mut() {
            cb(&entry.key, &entry.value, reason);
        }
    }

    pub(crate) fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if let Some(&node) = self.map.get(key) {
            unsafe {
                // SAFETY: node comes from our map. No reordering on hit,
                // only the visited bit.
                (*node).value_mut().metadata.visited = true;
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
            (*node).value_mut().metadata.visited = true;
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
                // SAFETY: node comes from our map. The entry is re-filed
                // under a fresh deadline since the update renews its life.
                self.remove_entry_from_bucket(node);
                let entry = (*node).value_mut();
                entry.value = value;
                entry.metadata.visited = true;
                entry.metadata.expired_at = now_nanos().wrapping_add(self.config.ttl);
                self.add_entry_to_bucket(node);
            }
            return;
        }

        if self.map.len() >= self.cap().get() {
            self.evict();
        }

        let mut meta = LeverMeta::cold();
        if self.config.ttl != 0 {
            meta.expired_at = now_nanos().wrapping_add(self.config.ttl);
        }
        let node = self.list.push_front(CacheEntry::new(key.clone(), value, meta));
        self.map.insert(key, node);
        unsafe {
            // SAFETY: node was just linked
            self.add_entry_to_bucket(node);
        }
        self.metrics.core.record_insertion();
    }

    /// The two-hand sweep. Consumes exactly one victim; all hands are
    /// valid (or null) on return.
    fn evict(&mut self) {
        // First eviction, or a hand ran past the front: re-anchor at the
        // back.
        if self.slow.is_null() {
            self.slow = self.list.back();
        }
        if self.fast.is_null() {
            self.fast = self.list.back();
        }
        if self.slow.is_null() {
            return;
        }
        debug_assert_eq!(self.map.len(), self.list.len());

        unsafe {
            // Fast hand: two steps, demoting visited nodes behind slow.
            // Advance first, then reorder, so the step is taken from the
            // node's original position.
            for _ in 0..2 {
                let o = self.fast;
                self.fast = self.list.prev(o);
                if (*o).value().metadata.visited {
                    (*o).value_mut().metadata.visited = false;
                    self.list.move_after(o, self.slow);
                    self.metrics.record_fast_demotion();
                }
                if self.fast.is_null() {
                    break;
                }
            }

            // Slow hand: one step, then select the victim.
            let o = self.slow;
            self.slow = self.list.prev(o);
            let victim = if (*o).value().metadata.visited {
                (*o).value_mut().metadata.visited = false;
                self.metrics.record_fifo_demotion();
                self.list.back()
            } else {
                self.metrics.record_quick_demotion();
                o
            };

            // SAFETY: victim is linked; remove_node repairs any hand that
            // still references it (the back node can coincide with fast).
            self.remove_node(victim, EvictReason::Evicted);
        }
        self.metrics.core.record_eviction();
    }

    /// Unlinks a node. Every hand equal to the node is rewound to its
    /// previous neighbor first, upholding the repair invariant.
    unsafe fn remove_node(&mut self, node: *mut Node<K, V>, reason: EvictReason) {
        if self.fast == node {
            self.fast = self.list.prev(node);
        }
        if self.slow == node {
            self.slow = self.list.prev(node);
        }
        self.remove_entry_from_bucket(node);
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
        for bucket in &mut self.buckets {
            bucket.keys.clear();
            bucket.newest_entry = 0;
        }
        self.fast = ptr::null_mut();
        self.slow = ptr::null_mut();
        self.next_cleanup_bucket = 0;
    }

    /// Returns `(total, hot)` with hot derived by a back-to-front scan.
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

    /// Files a node's entry into the bucket the cleanup cursor will reach
    /// last, giving it one full cycle of lifetime.
    unsafe fn add_entry_to_bucket(&mut self, node: *mut Node<K, V>) {
        if self.config.ttl == 0 {
            return;
        }
        let bucket_id = (NUM_BUCKETS + self.next_cleanup_bucket as usize - 1) % NUM_BUCKETS;
        let entry = (*node).value_mut();
        entry.metadata.bucket_id = bucket_id as u8;
        let expired_at = entry.metadata.expired_at;
        let bucket = &mut self.buckets[bucket_id];
        bucket.keys.insert(entry.key.clone());
        if bucket.newest_entry < expired_at {
            bucket.newest_entry = expired_at;
        }
    }

    unsafe fn remove_entry_from_bucket(&mut self, node: *mut Node<K, V>) {
        if self.config.ttl == 0 {
            return;
        }
        let entry = (*node).value();
        self.buckets[entry.metadata.bucket_id as usize]
            .keys
            .remove(&entry.key);
    }

    /// Deadline of the newest entry in the bucket the next
    /// [`delete_expired`](Self::delete_expired) call will sweep, or None
    /// when TTL is disabled or the bucket is empty.
    pub(crate) fn next_expiry(&self) -> Option<u64> {
        if self.config.ttl == 0 {
            return None;
        }
        let bucket = &self.buckets[self.next_cleanup_bucket as usize];
        if bucket.keys.is_empty() {
            None
        } else {
            Some(bucket.newest_entry)
        }
    }

    /// Sweeps the cursor's bucket, collecting every entry still filed in
    /// it, and advances the cursor. The external scheduler is expected to
    /// wait out [`next_expiry`](Self::next_expiry) first.
    pub(crate) fn delete_expired(&mut self) {
        if self.config.ttl == 0 {
            return;
        }
        let bucket_id = self.next_cleanup_bucket as usize;
        self.next_cleanup_bucket = ((bucket_id + 1) % NUM_BUCKETS) as u8;

        let keys: Vec<K> = self.buckets[bucket_id].keys.drain().collect();
        self.buckets[bucket_id].newest_entry = 0;

        for key in keys {
            if let Some(&node) = self.map.get(&key) {
                unsafe {
                    // A set-on-hit re-files entries, so anything still in
                    // this bucket has lived a full cursor cycle.
                    debug_assert_eq!((*node).value().metadata.bucket_id as usize, bucket_id);
                    self.remove_node(node, EvictReason::Expired);
                }
                self.metrics.core.record_expiration();
            }
        }
    }
}

impl<K, V, S> fmt::Debug for LeverSegment<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeverSegment")
            .field("capacity", &self.config.capacity)
            .field("len", &self.map.len())
            .field("ttl", &self.config.ttl)
            .finish()
    }
}

/// A two-hand (fast/slow pointer) LEVER cache.
///
/// Hits set a visited bit without reordering; eviction sweeps two hands
/// from the back, demoting recently visited entries and evicting either
/// the slow hand's unvisited node or the back node.
///
/// # Example
///
/// ```
/// use lever_rs::LeverCache;
/// use lever_rs::config::LeverCacheConfig;
/// use core::num::NonZeroUsize;
///
/// let config = LeverCacheConfig::new(NonZeroUsize::new(4).unwrap());
/// let mut cache = LeverCache::init(config, None);
///
/// cache.set("a", 1);
/// cache.set("b", 2);
/// cache.get(&"b");
/// cache.set("c", 3);
/// cache.set("d", 4);
/// cache.set("e", 5); // overflow: one entry is evicted
/// assert_eq!(cache.len(), 4);
/// assert!(cache.contains(&"b"));
/// ```
#[derive(Debug)]
pub struct LeverCache<K, V, S = DefaultHashBuilder> {
    segment: LeverSegment<K, V, S>,
}

impl<K: Hash + Eq + Clone, V> LeverCache<K, V> {
    /// Creates a cache from a config and an optional eviction callback.
    ///
    /// The callback runs synchronously inside the mutating operation and
    /// must not call back into this cache.
    pub fn init(config: LeverCacheConfig, on_evict: Option<OnEvict<K, V>>) -> Self {
        Self::with_hasher(config, DefaultHashBuilder::default(), on_evict)
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> LeverCache<K, V, S> {
    /// Creates a cache with a custom hash builder.
    pub fn with_hasher(
        config: LeverCacheConfig,
        hash_builder: S,
        on_evict: Option<OnEvict<K, V>>,
    ) -> Self {
        Self {
            segment: LeverSegment::with_hasher(config, hash_builder, on_evict),
        }
    }

    /// Returns the maximum number of entries the cache can hold.
    #[inline]
    pub fn cap(&self) -> NonZeroUsize {
        self.segment.cap()
    }

    /// Returns the per-entry TTL in nanoseconds (0 = disabled).
    #[inline]
    pub fn ttl(&self) -> u64 {
        self.segment.ttl()
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

    /// Looks up a key, marking the entry visited on a hit. The sequence is
    /// not reordered.
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

    /// Inserts or updates a key. A miss that would exceed capacity first
    /// runs one eviction sweep.
    #[inline]
    pub fn set(&mut self, key: K, value: V) {
        self.segment.set(key, value)
    }

    /// Removes a key, returning whether an entry was removed. Hands
    /// referencing the removed node are repaired.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.remove(key)
    }

    /// Drops all entries and resets both hands and the expiry cursor.
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

    /// Deadline of the newest entry in the next bucket to be swept.
    ///
    /// An external cleanup driver should sleep until this instant (outside
    /// any lock) before calling [`delete_expired`](Self::delete_expired).
    #[inline]
    pub fn next_expiry(&self) -> Option<u64> {
        self.segment.next_expiry()
    }

    /// Sweeps one expiry bucket and advances the cleanup cursor. Expired
    /// entries are reported to the callback with [`EvictReason::Expired`].
    #[inline]
    pub fn delete_expired(&mut self) {
        self.segment.delete_expired()
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> CacheMetrics for LeverCache<K, V, S> {
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
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicUsize, Ordering};
    #[cfg(feature = "std")]
    use core::time::Duration;

    fn make_cache<K: Hash + Eq + Clone, V>(cap: usize) -> LeverCache<K, V> {
        let config = LeverCacheConfig::new(NonZeroUsize::new(cap).unwrap());
        LeverCache::init(config, None)
    }

    #[test]
    fn test_set_get() {
        let mut cache = make_cache(4);
        cache.set("apple", 1);
        cache.set("banana", 2);
        assert_eq!(cache.get(&"apple"), Some(&1));
        assert_eq!(cache.get(&"banana"), Some(&2));
        assert_eq!(cache.get(&"cherry"), None);
    }

    #[test]
    fn test_get_does_not_reorder() {
        let mut cache = make_cache(4);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        cache.get(&"a");
        // visited is set but the chain order is untouched
        let (total, hot) = cache.stats();
        assert_eq!(total, 3);
        assert_eq!(hot, 1);
    }

    #[test]
    fn test_cold_workload_evicts_oldest() {
        // All entries unvisited: first eviction is the FIFO degenerate
        // case and removes the first-inserted entry.
        let mut cache = make_cache(4);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        cache.set("d", 4);
        cache.set("e", 5);
        assert_eq!(cache.len(), 4);
        assert!(!cache.contains(&"a"));
        assert!(cache.contains(&"e"));
    }

    #[test]
    fn test_sweep_walkthrough_capacity_four() {
        // Set A,B,C,D; Get B; Set E: slow lands on unvisited A and evicts
        // it while B survives.
        let mut cache = make_cache(4);
        cache.set("A", 1);
        cache.set("B", 2);
        cache.set("C", 3);
        cache.set("D", 4);
        assert_eq!(cache.len(), 4);

        cache.get(&"B");
        cache.set("E", 5);
        assert_eq!(cache.len(), 4);
        assert!(!cache.contains(&"A"));
        for k in ["B", "C", "D", "E"] {
            assert!(cache.contains(&k), "{k} should be live");
        }

        // Get C and D, then overflow again: the fast hand demotes them
        // (clearing visited) and the slow hand's visited node forces a
        // FIFO demotion of the back node.
        cache.get(&"C");
        cache.get(&"D");
        cache.set("F", 6);
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_hot_workload_still_evicts() {
        let mut cache = make_cache(4);
        for k in 0..4 {
            cache.set(k, k);
        }
        for k in 0..4 {
            cache.get(&k);
        }
        cache.set(99, 99);
        assert_eq!(cache.len(), 4);
        assert!(cache.contains(&99));
    }

    #[test]
    fn test_remove_repairs_hands() {
        // Force the hands to anchor, then remove the node under them.
        let mut cache = make_cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        cache.set("d", 4); // eviction anchors fast/slow
        assert_eq!(cache.len(), 3);

        // Remove entries including whichever the hands reference, then
        // keep evicting; no dangling hand may be dereferenced.
        assert!(cache.remove(&"b") || true);
        cache.set("e", 5);
        cache.set("f", 6);
        cache.set("g", 7);
        assert!(cache.len() <= 3);
    }

    #[test]
    fn test_capacity_one() {
        let mut cache = make_cache(1);
        for i in 0..5 {
            cache.set(i, i);
            assert_eq!(cache.len(), 1);
            assert!(cache.contains(&i));
        }
    }

    #[test]
    fn test_purge_resets_hands() {
        let mut cache = make_cache(3);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        cache.set("d", 4);
        cache.purge();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats(), (0, 0));
        // a fresh set lands at the front and the cache keeps working
        cache.set("k", 42);
        assert_eq!(cache.get(&"k"), Some(&42));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_peek_does_not_disturb_eviction() {
        let mut cache1 = make_cache(4);
        let mut cache2 = make_cache(4);
        for k in 0..4 {
            cache1.set(k, k);
            cache2.set(k, k);
        }
        // peeking must not change which entry the next eviction selects
        cache2.peek(&0);
        cache2.peek(&3);
        cache1.set(10, 10);
        cache2.set(10, 10);
        let live1: Vec<bool> = (0..4).map(|k| cache1.contains(&k)).collect();
        let live2: Vec<bool> = (0..4).map(|k| cache2.contains(&k)).collect();
        assert_eq!(live1, live2);
    }

    #[test]
    fn test_on_evict_reasons() {
        let reasons = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&reasons);
        let config = LeverCacheConfig::new(NonZeroUsize::new(2).unwrap());
        let mut cache = LeverCache::init(
            config,
            Some(Box::new(move |_k: &i32, _v: &i32, reason| {
                match reason {
                    EvictReason::Evicted => seen.fetch_add(1, Ordering::SeqCst),
                    EvictReason::Removed => seen.fetch_add(100, Ordering::SeqCst),
                    EvictReason::Expired => seen.fetch_add(10_000, Ordering::SeqCst),
                };
            })),
        );
        cache.set(1, 1);
        cache.set(2, 2);
        cache.set(3, 3); // Evicted
        cache.remove(&3); // Removed
        cache.purge(); // Removed for the remaining entry
        assert_eq!(reasons.load(Ordering::SeqCst), 201);
    }

    #[test]
    fn test_callback_without_cache_reference() {
        // The callback must be usable while holding no reference to the
        // cache itself.
        let log: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
        let log2 = Arc::clone(&log);
        let config = LeverCacheConfig::new(NonZeroUsize::new(1).unwrap());
        let mut cache = LeverCache::init(
            config,
            Some(Box::new(move |_k: &u32, v: &u32, _| {
                log2.fetch_add(*v as usize, Ordering::SeqCst);
            })),
        );
        cache.set(1, 5);
        cache.set(2, 7);
        assert_eq!(log.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_set_on_hit_updates_value_in_place() {
        let mut cache = make_cache(2);
        cache.set("a", 1);
        cache.set("a", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"a"), Some(&2));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_ttl_bucket_sweep() {
        let config = LeverCacheConfig::new(NonZeroUsize::new(8).unwrap())
            .with_ttl(Duration::from_nanos(1));
        let mut cache: LeverCache<u32, u32> = LeverCache::init(config, None);
        cache.set(1, 1);
        cache.set(2, 2);
        assert_eq!(cache.len(), 2);

        // one full cursor cycle reaches the bucket the entries were filed
        // in; the deadlines (1ns) are long past
        for _ in 0..NUM_BUCKETS {
            cache.delete_expired();
        }
        assert_eq!(cache.len(), 0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_ttl_update_refiles_entry() {
        let config = LeverCacheConfig::new(NonZeroUsize::new(8).unwrap())
            .with_ttl(Duration::from_secs(3600));
        let mut cache: LeverCache<u32, u32> = LeverCache::init(config, None);
        cache.set(1, 1);
        cache.delete_expired(); // advances the cursor
        cache.set(1, 2); // re-files under a new bucket
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&1), Some(&2));
    }

    #[test]
    fn test_ttl_disabled_sweep_is_noop() {
        let mut cache = make_cache(4);
        cache.set(1, 1);
        assert_eq!(cache.next_expiry(), None);
        cache.delete_expired();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_metrics() {
        let mut cache = make_cache(2);
        cache.set("a", 1);
        cache.get(&"a");
        cache.get(&"nope");
        cache.set("b", 2);
        cache.set("c", 3);
        let metrics = cache.metrics();
        assert_eq!(metrics.get("cache_hits"), Some(&1.0));
        assert_eq!(metrics.get("cache_misses"), Some(&1.0));
        assert_eq!(metrics.get("evictions"), Some(&1.0));
        assert_eq!(cache.algorithm_name(), "LEVER");
    }

    #[test]
    fn test_long_mixed_workload_keeps_invariants() {
        let mut cache = make_cache(8);
        for i in 0..500u32 {
            match i % 6 {
                0 | 1 | 2 => cache.set(i % 24, i),
                3 => {
                    let _ = cache.get(&(i % 24));
                }
                4 => {
                    let _ = cache.remove(&(i % 24));
                }
                _ => {
                    let _ = cache.peek(&(i % 24));
                }
            }
            assert!(cache.len() <= 8);
            let (total, hot) = cache.stats();
            assert_eq!(total, cache.len());
            assert!(hot <= total);
        }
    }
}
