//! Property-Based Tests for the Eviction Variants
//!
//! Uses proptest to generate random operation sequences and checks the
//! universal invariants after every single operation:
//!
//! - `len() <= capacity` at every externally observable point
//! - `contains(k)` agrees with `peek(k)`
//! - a set without overflow is immediately readable with the value set
//! - `remove(k)` leaves `contains(k) == false` and shrinks `len` by one
//! - `purge()` leaves the cache empty
//! - `stats().0 == len()` and the hot count never exceeds the total

use proptest::prelude::*;

use lever_rs::config::{
    AimdCacheConfig, LeverCacheConfig, ShakeSieveCacheConfig, ShiftCacheConfig, StatusCacheConfig,
    ThresholdCacheConfig,
};
use lever_rs::{
    LeverAimdCache, LeverCache, LeverStatusCache, LeverThresholdCache, ShakeSieveCache, ShiftCache,
};
use std::num::NonZeroUsize;

/// One step of a workload. Keys are drawn from a small space so that
/// hits, misses, evictions, and re-insertions all occur.
#[derive(Debug, Clone)]
enum Op {
    Set(u8, u16),
    Get(u8),
    Peek(u8),
    Contains(u8),
    Remove(u8),
    Purge,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        8 => (0u8..24, any::<u16>()).prop_map(|(k, v)| Op::Set(k, v)),
        6 => (0u8..24).prop_map(Op::Get),
        2 => (0u8..24).prop_map(Op::Peek),
        2 => (0u8..24).prop_map(Op::Contains),
        3 => (0u8..24).prop_map(Op::Remove),
        1 => Just(Op::Purge),
    ]
}

/// Drives one cache through an op sequence, checking every invariant
/// after every op. Written as a macro since the variants share their
/// method surface but no trait.
macro_rules! check_ops {
    ($cache:expr, $ops:expr, $cap:expr) => {{
        let mut cache = $cache;
        let cap = $cap;
        for op in $ops {
            match op {
                Op::Set(k, v) => {
                    let had_room = cache.len() < cap;
                    let was_present = cache.contains(&k);
                    cache.set(k, v);
                    if had_room || was_present {
                        // no eviction round could have intervened
                        prop_assert_eq!(cache.peek(&k), Some(&v));
                    }
                }
                Op::Get(k) => {
                    let expected = cache.peek(&k).copied();
                    let got = cache.get(&k).copied();
                    prop_assert_eq!(got, expected);
                }
                Op::Peek(k) => {
                    prop_assert_eq!(cache.peek(&k).is_some(), cache.contains(&k));
                }
                Op::Contains(k) => {
                    prop_assert_eq!(cache.contains(&k), cache.peek(&k).is_some());
                }
                Op::Remove(k) => {
                    let was_present = cache.contains(&k);
                    let len_before = cache.len();
                    let removed = cache.remove(&k);
                    prop_assert_eq!(removed, was_present);
                    prop_assert!(!cache.contains(&k));
                    if removed {
                        prop_assert_eq!(cache.len(), len_before - 1);
                    } else {
                        prop_assert_eq!(cache.len(), len_before);
                    }
                }
                Op::Purge => {
                    cache.purge();
                    prop_assert_eq!(cache.len(), 0);
                    prop_assert!(cache.is_empty());
                }
            }

            prop_assert!(cache.len() <= cap, "len {} over capacity {}", cache.len(), cap);
            let (total, hot) = cache.stats();
            prop_assert_eq!(total, cache.len());
            prop_assert!(hot <= total);
        }
    }};
}

proptest! {
    #[test]
    fn aimd_invariants_hold(
        ops in proptest::collection::vec(op_strategy(), 1..300),
        cap in 1usize..10,
    ) {
        let config = AimdCacheConfig::new(NonZeroUsize::new(cap).unwrap());
        check_ops!(LeverAimdCache::init(config, None), ops, cap);
    }

    #[test]
    fn threshold_invariants_hold(
        ops in proptest::collection::vec(op_strategy(), 1..300),
        cap in 1usize..10,
    ) {
        let config = ThresholdCacheConfig::new(NonZeroUsize::new(cap).unwrap());
        check_ops!(LeverThresholdCache::init(config, None), ops, cap);
    }

    #[test]
    fn lever_invariants_hold(
        ops in proptest::collection::vec(op_strategy(), 1..300),
        cap in 1usize..10,
    ) {
        let config = LeverCacheConfig::new(NonZeroUsize::new(cap).unwrap());
        check_ops!(LeverCache::init(config, None), ops, cap);
    }

    #[test]
    fn status_invariants_hold(
        ops in proptest::collection::vec(op_strategy(), 1..300),
        cap in 1usize..10,
    ) {
        let config = StatusCacheConfig::new(NonZeroUsize::new(cap).unwrap());
        check_ops!(LeverStatusCache::init(config, None), ops, cap);
    }

    #[test]
    fn shift_invariants_hold(
        ops in proptest::collection::vec(op_strategy(), 1..300),
        cap in 1usize..10,
    ) {
        let config = ShiftCacheConfig::new(NonZeroUsize::new(cap).unwrap());
        check_ops!(ShiftCache::init(config, None), ops, cap);
    }

    #[test]
    fn shake_sieve_invariants_hold(
        ops in proptest::collection::vec(op_strategy(), 1..300),
        cap in 1usize..10,
    ) {
        let config = ShakeSieveCacheConfig::new(NonZeroUsize::new(cap).unwrap());
        check_ops!(ShakeSieveCache::init(config, None), ops, cap);
    }

    /// Values written are the values read back, across random update
    /// sequences on a single key.
    #[test]
    fn single_key_updates_are_last_writer_wins(values in proptest::collection::vec(any::<u16>(), 1..50)) {
        let config = LeverCacheConfig::new(NonZeroUsize::new(4).unwrap());
        let mut cache: LeverCache<u8, u16> = LeverCache::init(config, None);
        for v in &values {
            cache.set(7, *v);
            prop_assert_eq!(cache.peek(&7), Some(v));
        }
        prop_assert_eq!(cache.len(), 1);
    }
}
