//! Concurrent Cache Implementations
//!
//! Thread-safe wrappers for the two flagship variants (two-hand LEVER and
//! SHIFT) using segmented storage: the key space is hash-sharded over
//! independent segments, each protected by its own `parking_lot::Mutex`.
//! Operations lock only the segment owning the key, so disjoint keys
//! proceed in parallel, and every eviction decision stays local to one
//! segment (sharding is the scaling path; the per-segment policy is
//! unchanged).
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │              ConcurrentLeverCache (16 segments)                    │
//! │                                                                    │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐     ┌─────────┐              │
//! │  │Segment 0│ │Segment 1│ │Segment 2│ ... │Segment15│              │
//! │  │ [Mutex] │ │ [Mutex] │ │ [Mutex] │     │ [Mutex] │              │
//! │  └─────────┘ └─────────┘ └─────────┘     └─────────┘              │
//! │       ▲           ▲           ▲               ▲                   │
//! │  hash(k1)%16  hash(k2)%16  hash(k3)%16   hash(kN)%16              │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `get` must mutate the visited state, so it takes the segment lock
//! exclusively and returns the value by clone (a borrow cannot outlive
//! the lock guard). Available with the `concurrent` feature.

mod lever;
mod shift;

pub use self::lever::ConcurrentLeverCache;
pub use self::shift::ConcurrentShiftCache;

/// Returns the default number of segments.
///
/// A fixed small power of two balances parallelism against per-segment
/// capacity fragmentation.
#[inline]
pub fn default_segment_count() -> usize {
    16
}
