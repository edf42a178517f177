//! Hash-table sizing and the staging-time bucket-hint hash.

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Bucket count for a map of logical size `size`.
///
/// Smallest power of two strictly above `size * 10/7` (the framework-wide
/// 70% load-factor policy). Strictly above means `size < bucket count`
/// always holds, so every table keeps at least one empty slot and linear
/// probing terminates. `hash_table_size(0) == 1`.
#[inline]
pub fn hash_table_size(size: u32) -> u32 {
    (((size as u64 * 10) / 7) + 1).next_power_of_two() as u32
}

/// Deterministic integer mix used for staged bucket hints.
///
/// Stagers store `hash_int(key_ordinal) & (buckets - 1)` with each map
/// entry; encoders reuse the hint verbatim unless a primary-key hasher is
/// bound for the cycle.
#[inline]
pub fn hash_int(value: u32) -> u32 {
    let mut h = FxHasher::default();
    h.write_u32(value);
    let h64 = h.finish();
    (h64 ^ (h64 >> 32)) as u32
}
