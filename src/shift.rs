//! SHIFT Cache Implementation
//!
//! SHIFT amortizes recency tracking across two FIFO queues instead of a
//! single chain with a hand. Entries are inserted into the **eviction**
//! queue; the eviction pass pops its back and either drops the entry
//! (unvisited) or transplants it to the front of the **retention** queue
//! (visited, bit cleared). When the eviction queue drains, the two queues
//! swap roles.
//!
//! ```text
//!        eviction queue                    retention queue
//!  front ┌──┬──┬──┬──┬──┐ back      front ┌──┬──┬──┬──┬──┬──┐ back
//!   ──▶  │  │  │  │  │▒▒│──┬─drop──▶      │  │  │mark│░░│░░│░░│
//!        └──┴──┴──┴──┴──┘  └─visited──▶───┴▲─┴──┴────┴──────┘
//!  inserts (no mark)                 transplant   inserts (mark set)
//! ```
//!
//! Once the eviction queue shrinks to `capacity / window_divisor`
//! entries, an **insert mark** is placed inside retention: fresh
//! insertions then land just behind it, ahead of the oldest candidates,
//! so a brand-new entry cannot be claimed by the ongoing candidate
//! window. While the mark is set, retention hits are recorded without
//! reordering, preserving that window; the mark is refreshed only after
//! it was cleared by a queue swap.

extern crate alloc;

use crate::config::ShiftCacheConfig;
use crate::entry::{CacheEntry, EvictReason, OnEvict};
use crate::list::{List, ListNode};
use crate::meta::ShiftMeta;
use crate::metrics::{CacheMetrics, ShiftCacheMetrics};
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

type Node<K, V> = ListNode<CacheEntry<K, V, ShiftMeta>>;

/// Which physical queue an entry lives in. The eviction/retention roles
/// rotate between the two, tracked by `ShiftSegment::eviction_id`, so a
/// queue swap is O(1) and never rewrites the index.
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

/// Internal SHIFT segment containing the actual cache algorithm.
///
/// Shared between `ShiftCache` (single-threaded) and
/// `ConcurrentShiftCache` (sharded).
pub(crate) struct ShiftSegment<K, V, S = DefaultHashBuilder> {
    config: ShiftCacheConfig,
    queue_a: List<CacheEntry<K, V, ShiftMeta>>,
    queue_b: List<CacheEntry<K, V, ShiftMeta>>,
    /// Which physical queue currently plays the eviction role.
    eviction_id: QueueId,
    /// Retention-queue anchor for fresh insertions; null when no window
    /// is active.
    insert_mark: *mut Node<K, V>,
    map: HashMap<K, (*mut Node<K, V>, QueueId), S>,
    metrics: ShiftCacheMetrics,
    on_evict: Option<OnEvict<K, V>>,
}

// SAFETY: the segment owns all nodes the raw pointers reference, and all
// mutation requires &mut self.
unsafe impl<K: Send, V: Send, S: Send> Send for ShiftSegment<K, V, S> {}
unsafe impl<K: Send, V: Send, S: Sync> Sync for ShiftSegment<K, V, S> {}

impl<K, V, S> ShiftSegment<K, V, S> {
    fn queue(&self, id: QueueId) -> &List<CacheEntry<K, V, ShiftMeta>> {
        match id {
            QueueId::A => &self.queue_a,
            QueueId::B => &self.queue_b,
        }
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> ShiftSegment<K, V, S> {
    pub(crate) fn with_hasher(
        config: ShiftCacheConfig,
        hash_builder: S,
        on_evict: Option<OnEvict<K, V>>,
    ) -> Self {
        assert!(config.window_divisor > 0, "window_divisor must be nonzero");
        let map_capacity = config.capacity.get().next_power_of_two();
        ShiftSegment {
            config,
            queue_a: List::new(),
            queue_b: List::new(),
            eviction_id: QueueId::A,
            insert_mark: ptr::null_mut(),
            map: HashMap::with_capacity_and_hasher(map_capacity, hash_builder),
            metrics: ShiftCacheMetrics::new(),
            on_evict,
        }
    }

    fn queue_mut(&mut self, id: QueueId) -> &mut List<CacheEntry<K, V, ShiftMeta>> {
        match id {
            QueueId::A => &mut self.queue_a,
            QueueId::B => &mut self.queue_b,
        }
    }

    /// Both queues in (eviction, retention) order.
    fn queue_pair(
        &mut self,
    ) -> (
        &mut List<CacheEntry<K, V, ShiftMeta>>,
        &mut List<CacheEntry<K, V, ShiftMeta>>,
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
    pub(crate) fn metrics(&self) -> &ShiftCacheMetrics {
        &self.metrics
    }

    pub(crate) fn set_on_evict(&mut self, on_evict: Option<OnEvict<K, V>>) {
        self.on_evict = on_evict;
    }

    fn notify(&mut self, entry: &CacheEntry<K, V, ShiftMeta>, reason: EvictReason) {
        if let Some(cb) = self.on_evict.as_mut() {
            cb(&entry.key, &entry.value, reason);
        }
    }

    /// Records a hit. Retention entries are pulled to the front only while
    /// no candidate window is active.
    unsafe fn mark_hit(&mut self, node: *mut Node<K, V>, qid: QueueId) {
        let visited = (*node).value().metadata.visited;
        if qid == self.retention_id() && !visited && self.insert_mark.is_null() {
            self.queue_mut(qid).move_to_front(node);
        }
        (*node).value_mut().metadata.visited = true;
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

        let entry = CacheEntry::new(key.clone(), value, ShiftMeta::cold());
        let (node, qid) = if self.insert_mark.is_null() {
            let id = self.eviction_id;
            (self.queue_mut(id).push_front(entry), id)
        } else {
            let id = self.retention_id();
            let mark = self.insert_mark;
            // SAFETY: the mark is a linked retention node (repaired on
            // removal, cleared on swap)
            (unsafe { self.queue_mut(id).insert_after(mark, entry) }, id)
        };
        self.map.insert(key, (node, qid));
        self.metrics.core.record_insertion();
    }

    /// Pops eviction-queue candidates until one is dropped, transplanting
    /// survivors and swapping the queues whenever eviction drains.
    fn evict(&mut self) {
        // An explicit remove can drain the eviction queue between
        // evictions; swap so a victim is always available.
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
                if (*back).value().metadata.visited {
                    // Survivor: second life at the retention front.
                    (*back).value_mut().metadata.visited = false;
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

        // Once the candidate pool is small, pin the insert mark so fresh
        // entries survive the remainder of the window.
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

    /// Anchors the insert mark on the most recent node of the contiguous
    /// unvisited tail run of retention, then walks it a further
    /// eviction-queue-length steps toward the front.
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
                if p.is_null() || (*p).value().metadata.visited {
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

    /// Unlinks a node from its queue, repairing the insert mark first.
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

    /// Returns `(total, hot)` with hot counting visited entries in both
    /// queues.
    pub(crate) fn stats(&self) -> (usize, usize) {
        let mut hot = 0;
        for list in [&self.queue_a, &self.queue_b] {
            let mut node = list.back();
            while !node.is_null() {
                unsafe {
                    if (*node).value().metadata.visited {
                        hot += 1;
                    }
                    node = list.prev(node);
                }
            }
        }
        (self.map.len(), hot)
    }
}

impl<K, V, S> fmt::Debug for ShiftSegment<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShiftSegment")
            .field("capacity", &self.config.capacity)
            .field("len", &self.map.len())
            .field("eviction_len", &self.queue(self.eviction_id).len())
            .finish()
    }
}

/// A SHIFT (two-queue reorganization) cache.
///
/// # Example
///
/// ```
/// use lever_rs::ShiftCache;
/// use lever_rs::config::ShiftCacheConfig;
/// use core::num::NonZeroUsize;
///
/// let config = ShiftCacheConfig::new(NonZeroUsize::new(3).unwrap());
/// let mut cache = ShiftCache::init(config, None);
///
/// cache.set("a", 1);
/// cache.set("b", 2);
/// cache.set("c", 3);
/// cache.get(&"a");
/// cache.set("d", 4); // "a" survives into retention, an unvisited entry goes
/// assert_eq!(cache.len(), 3);
/// assert!(cache.contains(&"a"));
/// ```
#[derive(Debug)]
pub struct ShiftCache<K, V, S = DefaultHashBuilder> {
    segment: ShiftSegment<K, V, S>,
}

impl<K: Hash + Eq + Clone, V> ShiftCache<K, V> {
    /// Creates a cache from a config and an optional eviction callback.
    ///
    /// # Panics
    ///
    /// Panics if `config.window_divisor` is zero.
    pub fn init(config: ShiftCacheConfig, on_evict: Option<OnEvict<K, V>>) -> Self {
        Self::with_hasher(config, DefaultHashBuilder::default(), on_evict)
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> ShiftCache<K, V, S> {
    /// Creates a cache with a custom hash builder.
    pub fn with_hasher(
        config: ShiftCacheConfig,
        hash_builder: S,
        on_evict: Option<OnEvict<K, V>>,
    ) -> Self {
        Self {
            segment: ShiftSegment::with_hasher(config, hash_builder, on_evict),
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

impl<K: Hash + Eq + Clone, V, S: BuildHasher> CacheMetrics for ShiftCache<K, V, S> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.segment.metrics().metrics()
    }

    fn algorithm_name(&self) -> &'static str {
        self.segment.metrics().algorithm_name()
    }
}
