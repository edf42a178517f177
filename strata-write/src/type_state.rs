//! The write-state seam between the cycle engine and per-type encoders.
//!
//! Every encoder embeds [`TypeStateShared`] for the state all types carry
//! (shard counts, per-shard max ordinals) and implements [`TypeWriteState`]
//! for the hooks the engine drives each cycle. This crate ships the map
//! encoder; list, set, and object encoders plug into the same seam.

use roaring::RoaringBitmap;
use std::io::Write;

use strata_result::Result;

use crate::state_engine::{EngineConfig, WriteContext};
use crate::store::RecordStore;

/// Shard and ordinal-space state common to all type encoders.
///
/// The ordinal space is dealt round-robin across a power-of-two shard
/// count: ordinal `o` lives in shard `o & (num_shards - 1)` at shard-local
/// index `o / num_shards`.
#[derive(Debug)]
pub struct TypeStateShared {
    pub max_ordinal: i64,
    /// 0 until the first prepare decides a count.
    pub num_shards: u32,
    /// Shard count the previous cycle published under; 1 on the first cycle.
    pub rev_num_shards: u32,
    /// Per shard, the highest shard-local ordinal (-1 for an empty shard).
    pub max_shard_ordinal: Vec<i64>,
    num_shards_pinned: bool,
}

impl TypeStateShared {
    pub fn new(pinned_num_shards: Option<u32>) -> Self {
        debug_assert!(pinned_num_shards.map_or(true, |n| n.is_power_of_two()));
        Self {
            max_ordinal: -1,
            num_shards: pinned_num_shards.unwrap_or(0),
            rev_num_shards: 0,
            max_shard_ordinal: Vec::new(),
            num_shards_pinned: pinned_num_shards.is_some(),
        }
    }

    /// Per-cycle shard decision. `sizer` is consulted only when resharding
    /// is allowed and the count is not pinned (or no count exists yet).
    pub fn prepare(&mut self, max_ordinal: i64, can_reshard: bool, sizer: impl FnOnce() -> u32) {
        self.max_ordinal = max_ordinal;
        self.rev_num_shards = if self.num_shards == 0 {
            1
        } else {
            self.num_shards
        };
        if !self.num_shards_pinned && (can_reshard || self.num_shards == 0) {
            self.num_shards = sizer();
        }
        debug_assert!(self.num_shards.is_power_of_two());
        self.max_shard_ordinal = max_shard_ordinals(self.num_shards, self.max_ordinal);
    }

    /// Effective shard count for a delta direction: reverse deltas written
    /// across a reshard boundary target the previous cycle's count.
    pub fn delta_num_shards(&self, is_reverse: bool) -> u32 {
        if is_reverse && self.num_shards != self.rev_num_shards {
            self.rev_num_shards
        } else {
            self.num_shards
        }
    }
}

/// Shard-local max ordinals for an ordinal space of `0..=max_ordinal` dealt
/// across `num_shards` shards.
pub fn max_shard_ordinals(num_shards: u32, max_ordinal: i64) -> Vec<i64> {
    let n = num_shards as i64;
    (0..n)
        .map(|shard| {
            if max_ordinal >= shard {
                (max_ordinal - shard) / n
            } else {
                -1
            }
        })
        .collect()
}

/// Hooks the cycle engine drives on each registered type encoder.
///
/// Call order within a cycle: `prepare_for_write`, then any combination of
/// `calculate_snapshot` + `write_snapshot` and `calculate_delta` +
/// `write_calculated_delta` (calculate always before its write). Encoders
/// treat the store as read-only throughout.
pub trait TypeWriteState {
    fn type_name(&self) -> &str;

    fn num_shards(&self) -> u32;

    fn rev_num_shards(&self) -> u32;

    /// Effective shard count a delta in the given direction is laid out
    /// under; the engine uses it to size `max_shard_ordinal` arrays.
    fn delta_num_shards(&self, is_reverse: bool) -> u32;

    /// Shard count this type would choose for a byte budget, derived from a
    /// single statistics pass. Pure; does not commit the choice.
    fn type_state_num_shards(
        &self,
        store: &RecordStore,
        max_ordinal: i64,
        target_max_shard_bytes: u64,
    ) -> u32;

    /// Once per cycle before any encoding: decide shard counts and gather
    /// the statistics both snapshot and delta encoding share.
    fn prepare_for_write(
        &mut self,
        store: &RecordStore,
        config: &EngineConfig,
        can_reshard: bool,
    ) -> Result<()>;

    fn calculate_snapshot(&mut self, store: &RecordStore, ctx: &WriteContext<'_>) -> Result<()>;

    fn write_snapshot(&mut self, store: &RecordStore, out: &mut dyn Write) -> Result<()>;

    fn calculate_delta(
        &mut self,
        store: &RecordStore,
        from_populated: &RoaringBitmap,
        to_populated: &RoaringBitmap,
        is_reverse: bool,
        ctx: &WriteContext<'_>,
    ) -> Result<()>;

    fn write_calculated_delta(
        &mut self,
        out: &mut dyn Write,
        is_reverse: bool,
        max_shard_ordinal: &[i64],
    ) -> Result<()>;
}
