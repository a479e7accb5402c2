#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Variant Selection Guide
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Which LEVER Variant Should I Use?                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Do you want hit handling to never reorder the chain?                   │
//! │       │                                                                 │
//! │      Yes ──▶ Need TTL expiry too?                                       │
//! │       │          Yes ─▶ LeverCache (two-hand, buckets)                  │
//! │       │          No ──▶ LeverCache / ShiftCache                         │
//! │      No                                                                 │
//! │       │                                                                 │
//! │  Is your working set bursty (needs reactive regulation)?                │
//! │       │  Yes ─▶ LeverAimdCache                                          │
//! │       │  No ──▶ Prefer a hard bound?    Yes ─▶ LeverThresholdCache      │
//! │       │                                 No ──▶ LeverStatusCache         │
//! │       ▼                                                                 │
//! │  Frequency matters more than recency? ──▶ ShakeSieveCache               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Reference
//!
//! | Type | Scheme | Distinctive state |
//! |-----------|-------------|---------------|
//! | [`LeverAimdCache`] | single hand | promote counter, halved per miss |
//! | [`LeverThresholdCache`] | single hand | bounded hot count (0.99 cap) |
//! | [`LeverCache`] | fast/slow hands | no reordering on hit; TTL buckets |
//! | [`LeverStatusCache`] | single hand | packed temp/visit bits |
//! | [`ShiftCache`] | two queues | insert mark, queue swap |
//! | [`ShakeSieveCache`] | two queues | frequency halving |
//!
//! All variants share the public contract: `set`, `get`/`get_mut`,
//! `peek`, `contains`, `remove`, `purge`, `len`, `stats`, and an optional
//! eviction callback reporting `Evicted`/`Removed`/`Expired`.
//!
//! ## Modules
//!
//! - [`aimd`], [`threshold`], [`lever`], [`status`], [`shift`],
//!   [`shake_sieve`]: the eviction variants
//! - [`entry`]: the shared entry type and callback machinery
//! - [`meta`]: per-variant entry metadata
//! - [`config`]: configuration structs
//! - [`metrics`]: metrics collection and the [`CacheMetrics`] trait
//! - [`concurrent`]: sharded thread-safe wrappers (`concurrent` feature)

#![no_std]

#[cfg(any(test, feature = "std", not(feature = "hashbrown")))]
extern crate std;

/// Shared cache entry type, eviction reasons, and the callback alias.
pub mod entry;

/// Per-variant entry metadata (visited bits, packed status, frequency).
pub mod meta;

/// Doubly linked chain with stable node identity.
///
/// Internal infrastructure: the eviction hands and the key index hold raw
/// node pointers into it, under the repair-on-removal invariant enforced
/// by the cache modules.
pub(crate) mod list;

/// Configuration structures for all variants.
pub mod config;

/// LEVER-AIMD: single hand, additive promote / multiplicative demote.
pub mod aimd;

/// LEVER-threshold: single hand, hot share capped near capacity.
pub mod threshold;

/// Two-hand LEVER: fast/slow sweep, no reordering on hit, TTL buckets.
pub mod lever;

/// LEVER-status: bit-packed temp/visit flags with eager promotion.
pub mod status;

/// SHIFT: two-queue reorganization with an insert-mark window.
pub mod shift;

/// ShakeSieve: SHIFT with frequency counters halved on survival.
pub mod shake_sieve;

/// Cache metrics system.
pub mod metrics;

/// Sharded thread-safe wrappers for the flagship variants.
///
/// Available with the `concurrent` feature.
#[cfg(feature = "concurrent")]
pub mod concurrent;

// Re-export cache types
pub use aimd::LeverAimdCache;
pub use lever::LeverCache;
pub use shake_sieve::ShakeSieveCache;
pub use shift::ShiftCache;
pub use status::LeverStatusCache;
pub use threshold::LeverThresholdCache;

// Re-export entry and callback types
pub use entry::{CacheEntry, EvictReason, OnEvict};

// Re-export metadata types
pub use meta::{AimdMeta, LeverMeta, ShakeMeta, ShiftMeta, StatusMeta, ThresholdMeta};

// Re-export the metrics trait
pub use metrics::CacheMetrics;

#[cfg(feature = "concurrent")]
pub use concurrent::{ConcurrentLeverCache, ConcurrentShiftCache};
