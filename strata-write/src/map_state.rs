//! The map type encoder.
//!
//! Encodes staged map records into the per-shard bit-packed layout readers
//! probe in O(1): a pointers-and-sizes array (end-bucket offset + logical
//! size per shard-local ordinal) and an entries array (key/value ordinal
//! pairs placed into power-of-two hash tables with linear probing).
//!
//! One statistics pass per cycle fixes every bit width; snapshot and delta
//! encoding then replay the staged records in ordinal order, so identical
//! staged state always produces identical bytes. Across a reshard boundary
//! the same records are simultaneously accounted under the current and the
//! previous shard count, letting a reverse delta address the layout the
//! prior cycle published.

use std::io::Write;

use roaring::RoaringBitmap;
use tracing::warn;

use strata_memory::bitset::serialize_bits_to;
use strata_memory::hashing::hash_table_size;
use strata_memory::varint::{next_vlong_size, read_vint, write_vint, write_vlong};
use strata_memory::FixedWidthArray;
use strata_result::{Error, FieldPathErrorKind, Result};

use crate::key_hasher::PrimaryKeyHasher;
use crate::schema::MapSchema;
use crate::state_engine::{EngineConfig, WriteContext};
use crate::store::RecordStore;
use crate::type_state::{TypeStateShared, TypeWriteState};

pub struct MapTypeWriteState {
    schema: MapSchema,
    shared: TypeStateShared,

    // statistics required for writing fixed-length map data
    bits_per_map_pointer: u32,
    rev_bits_per_map_pointer: u32,
    bits_per_map_size_value: u32,
    bits_per_key_element: u32,
    bits_per_value_element: u32,
    total_of_map_buckets: Vec<u64>,
    rev_total_of_map_buckets: Vec<u64>,

    // scratch held between calculate and write, snapshot or delta
    map_pointers_and_sizes: Vec<FixedWidthArray>,
    entry_data: Vec<FixedWidthArray>,

    // additional scratch for writing a delta
    num_maps_in_delta: Vec<u32>,
    num_buckets_in_delta: Vec<u64>,
    delta_added_ordinals: Vec<Vec<u8>>,
    delta_removed_ordinals: Vec<Vec<u8>>,

    hasher_warned_this_cycle: bool,
}

impl MapTypeWriteState {
    pub fn new(schema: MapSchema) -> Self {
        Self::with_shards(schema, None)
    }

    /// Pin the shard count at construction; the sizer is never consulted.
    pub fn with_num_shards(schema: MapSchema, num_shards: u32) -> Self {
        Self::with_shards(schema, Some(num_shards))
    }

    fn with_shards(schema: MapSchema, num_shards: Option<u32>) -> Self {
        Self {
            schema,
            shared: TypeStateShared::new(num_shards),
            bits_per_map_pointer: 0,
            rev_bits_per_map_pointer: 0,
            bits_per_map_size_value: 0,
            bits_per_key_element: 0,
            bits_per_value_element: 0,
            total_of_map_buckets: Vec::new(),
            rev_total_of_map_buckets: Vec::new(),
            map_pointers_and_sizes: Vec::new(),
            entry_data: Vec::new(),
            num_maps_in_delta: Vec::new(),
            num_buckets_in_delta: Vec::new(),
            delta_added_ordinals: Vec::new(),
            delta_removed_ordinals: Vec::new(),
            hasher_warned_this_cycle: false,
        }
    }

    pub fn schema(&self) -> &MapSchema {
        &self.schema
    }

    /// Per-shard bucket totals and the global maxima, in one pass over every
    /// ordinal populated in the previous or current cycle. Bit widths for
    /// keys, values, and sizes are global; pointer widths are per direction
    /// when the shard count changed this cycle.
    fn gather_statistics(&mut self, store: &RecordStore) {
        let num_shards = self.shared.num_shards;
        let rev_num_shards = self.shared.rev_num_shards;
        let num_shards_changed = num_shards != rev_num_shards;

        let mut totals = vec![0u64; num_shards as usize];
        let mut rev_totals = vec![0u64; if num_shards_changed { rev_num_shards as usize } else { 0 }];

        let maxima = scan_populated(store, |ordinal, num_buckets| {
            totals[(ordinal & (num_shards - 1)) as usize] += num_buckets as u64;
            if num_shards_changed {
                rev_totals[(ordinal & (rev_num_shards - 1)) as usize] += num_buckets as u64;
            }
        });

        // Key width reserves the all-ones empty sentinel above the largest
        // ordinal; the maxima start at 0 so the width is never less than 1.
        self.bits_per_key_element = bit_len(maxima.max_key_ordinal as u64 + 1);
        self.bits_per_value_element = bit_len(maxima.max_value_ordinal as u64).max(1);
        self.bits_per_map_size_value = bit_len(maxima.max_map_size as u64);
        self.bits_per_map_pointer = bit_len(totals.iter().copied().max().unwrap_or(0));
        if num_shards_changed {
            self.rev_bits_per_map_pointer = bit_len(rev_totals.iter().copied().max().unwrap_or(0));
        }
        self.total_of_map_buckets = totals;
        self.rev_total_of_map_buckets = rev_totals;
    }

    fn bind_primary_key_hasher<'a>(
        &mut self,
        ctx: &WriteContext<'a>,
    ) -> Result<Option<PrimaryKeyHasher<'a>>> {
        let Some(hash_key) = &self.schema.hash_key else {
            return Ok(None);
        };
        match PrimaryKeyHasher::bind(hash_key, &self.schema.key_type, ctx) {
            Ok(hasher) => Ok(Some(hasher)),
            Err(Error::FieldPath {
                kind: FieldPathErrorKind::NotBindable,
                path,
                detail,
            }) => {
                if !self.hasher_warned_this_cycle {
                    warn!(
                        map_type = %self.schema.name,
                        path = %path,
                        detail = %detail,
                        "failed to build a key hasher; encoding with staged bucket hints"
                    );
                    self.hasher_warned_this_cycle = true;
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn write_snapshot_shard(
        &self,
        out: &mut dyn Write,
        shard: usize,
        pointers: &FixedWidthArray,
        entries: &FixedWidthArray,
    ) -> Result<()> {
        let bits_per_fixed = (self.bits_per_map_size_value + self.bits_per_map_pointer) as u64;
        let bits_per_entry = (self.bits_per_key_element + self.bits_per_value_element) as u64;
        let max_shard_ordinal = self.shared.max_shard_ordinal[shard];
        let total_buckets = self.total_of_map_buckets[shard];

        // 1) max shard-local ordinal (-1 rides as the 32-bit all-ones pattern)
        write_vint(out, max_shard_ordinal as u32)?;

        // 2) statistics
        write_vint(out, self.bits_per_map_pointer)?;
        write_vint(out, self.bits_per_map_size_value)?;
        write_vint(out, self.bits_per_key_element)?;
        write_vint(out, self.bits_per_value_element)?;
        write_vlong(out, total_buckets)?;

        // 3) pointers-and-sizes array
        let num_pointer_words = if max_shard_ordinal == -1 {
            0
        } else {
            ((max_shard_ordinal as u64 + 1) * bits_per_fixed).div_ceil(64).max(1)
        };
        write_vint(out, num_pointer_words as u32)?;
        for i in 0..num_pointer_words as usize {
            out.write_all(&pointers.word(i).to_be_bytes())?;
        }

        // 4) entries array
        let num_entry_words = if total_buckets == 0 {
            0
        } else {
            (total_buckets * bits_per_entry).div_ceil(64)
        };
        write_vint(out, num_entry_words as u32)?;
        for i in 0..num_entry_words as usize {
            out.write_all(&entries.word(i).to_be_bytes())?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_delta_shard(
        &self,
        out: &mut dyn Write,
        shard: usize,
        max_shard_ordinal: i64,
        bits_per_map_pointer: u32,
        total_buckets: u64,
        scratch: &DeltaScratch,
    ) -> Result<()> {
        let bits_per_fixed = (self.bits_per_map_size_value + bits_per_map_pointer) as u64;
        let bits_per_entry = (self.bits_per_key_element + self.bits_per_value_element) as u64;

        // 1) max shard-local ordinal of the target state
        write_vint(out, max_shard_ordinal as u32)?;

        // 2) removal / addition ordinal gap streams
        write_vlong(out, scratch.removed_ordinals[shard].len() as u64)?;
        out.write_all(&scratch.removed_ordinals[shard])?;
        write_vlong(out, scratch.added_ordinals[shard].len() as u64)?;
        out.write_all(&scratch.added_ordinals[shard])?;

        // 3) statistics
        write_vint(out, bits_per_map_pointer)?;
        write_vint(out, self.bits_per_map_size_value)?;
        write_vint(out, self.bits_per_key_element)?;
        write_vint(out, self.bits_per_value_element)?;
        write_vlong(out, total_buckets)?;

        // 4) pointers-and-sizes for the added maps only
        let num_maps = scratch.num_maps[shard] as u64;
        let num_pointer_words = if num_maps == 0 {
            0
        } else {
            (num_maps * bits_per_fixed).div_ceil(64).max(1)
        };
        write_vint(out, num_pointer_words as u32)?;
        for i in 0..num_pointer_words as usize {
            out.write_all(&scratch.pointers_and_sizes[shard].word(i).to_be_bytes())?;
        }

        // 5) entries for the added maps only
        let num_buckets = scratch.num_buckets[shard];
        let num_entry_words = if num_buckets == 0 {
            0
        } else {
            (num_buckets * bits_per_entry).div_ceil(64)
        };
        write_vint(out, num_entry_words as u32)?;
        for i in 0..num_entry_words as usize {
            out.write_all(&scratch.entry_data[shard].word(i).to_be_bytes())?;
        }
        Ok(())
    }
}

impl TypeWriteState for MapTypeWriteState {
    fn type_name(&self) -> &str {
        &self.schema.name
    }

    fn num_shards(&self) -> u32 {
        self.shared.num_shards
    }

    fn rev_num_shards(&self) -> u32 {
        self.shared.rev_num_shards
    }

    fn delta_num_shards(&self, is_reverse: bool) -> u32 {
        self.shared.delta_num_shards(is_reverse)
    }

    fn type_state_num_shards(
        &self,
        store: &RecordStore,
        max_ordinal: i64,
        target_max_shard_bytes: u64,
    ) -> u32 {
        choose_num_shards(store, max_ordinal, target_max_shard_bytes)
    }

    fn prepare_for_write(
        &mut self,
        store: &RecordStore,
        config: &EngineConfig,
        can_reshard: bool,
    ) -> Result<()> {
        let max_ordinal = store.ordinal_map().max_ordinal();
        let target = config.target_max_type_shard_bytes;
        self.shared.prepare(max_ordinal, can_reshard, || {
            choose_num_shards(store, max_ordinal, target)
        });
        self.gather_statistics(store);
        self.hasher_warned_this_cycle = false;
        Ok(())
    }

    fn calculate_snapshot(&mut self, store: &RecordStore, ctx: &WriteContext<'_>) -> Result<()> {
        let num_shards = self.shared.num_shards;
        let bits_per_fixed = (self.bits_per_map_size_value + self.bits_per_map_pointer) as u64;
        let bits_per_entry = (self.bits_per_key_element + self.bits_per_value_element) as u64;

        let mut pointers: Vec<FixedWidthArray> = (0..num_shards as usize)
            .map(|shard| {
                let elements = (self.shared.max_shard_ordinal[shard] + 1) as u64;
                FixedWidthArray::with_bit_capacity(bits_per_fixed * elements)
            })
            .collect();
        let mut entries: Vec<FixedWidthArray> = (0..num_shards as usize)
            .map(|shard| {
                FixedWidthArray::with_bit_capacity(bits_per_entry * self.total_of_map_buckets[shard])
            })
            .collect();

        let hasher = self.bind_primary_key_hasher(ctx)?;
        let data = store.ordinal_map().byte_data();
        let current = store.current_cycle_populated();
        let shard_mask = num_shards - 1;
        let mut bucket_cursor = vec![0u64; num_shards as usize];

        for ordinal in 0..(self.shared.max_ordinal + 1) {
            let ordinal = ordinal as u32;
            let shard = (ordinal & shard_mask) as usize;
            let shard_ordinal = (ordinal / num_shards) as u64;

            if current.contains(ordinal) {
                let mut pos = store.ordinal_map().pointer_for_data(ordinal) as usize;
                let size = read_vint(data, &mut pos);
                let num_buckets = hash_table_size(size);

                pointers[shard].set_element(
                    bits_per_fixed * shard_ordinal + self.bits_per_map_pointer as u64,
                    self.bits_per_map_size_value,
                    size as u64,
                );
                place_entries(
                    data,
                    &mut pos,
                    size,
                    num_buckets,
                    &mut entries[shard],
                    bucket_cursor[shard],
                    self.bits_per_key_element,
                    self.bits_per_value_element,
                    hasher.as_ref(),
                );
                bucket_cursor[shard] += num_buckets as u64;
            }

            // Exclusive end-bucket pointer; absent ordinals repeat the cursor
            // so readers see a zero-length bucket range.
            pointers[shard].set_element(
                bits_per_fixed * shard_ordinal,
                self.bits_per_map_pointer,
                bucket_cursor[shard],
            );
        }

        self.map_pointers_and_sizes = pointers;
        self.entry_data = entries;
        Ok(())
    }

    fn write_snapshot(&mut self, store: &RecordStore, out: &mut dyn Write) -> Result<()> {
        // Scratch is taken out of the state up front so it is released even
        // when the underlying stream fails mid-write.
        let pointers = std::mem::take(&mut self.map_pointers_and_sizes);
        let entries = std::mem::take(&mut self.entry_data);
        let num_shards = self.shared.num_shards;
        if pointers.len() != num_shards as usize {
            return Err(Error::Internal(
                "write_snapshot invoked without a calculated snapshot".into(),
            ));
        }

        if num_shards == 1 {
            // Unsharded blobs keep the headerless layout older readers expect.
            self.write_snapshot_shard(out, 0, &pointers[0], &entries[0])?;
        } else {
            write_vint(out, self.shared.max_ordinal as u32)?;
            for shard in 0..num_shards as usize {
                self.write_snapshot_shard(out, shard, &pointers[shard], &entries[shard])?;
            }
        }

        serialize_bits_to(store.current_cycle_populated(), out)?;
        Ok(())
    }

    fn calculate_delta(
        &mut self,
        store: &RecordStore,
        from_populated: &RoaringBitmap,
        to_populated: &RoaringBitmap,
        is_reverse: bool,
        ctx: &WriteContext<'_>,
    ) -> Result<()> {
        let num_shards = self.shared.delta_num_shards(is_reverse);
        let bits_per_map_pointer = if num_shards == self.shared.num_shards {
            self.bits_per_map_pointer
        } else {
            self.rev_bits_per_map_pointer
        };
        let bits_per_fixed = (self.bits_per_map_size_value + bits_per_map_pointer) as u64;
        let bits_per_entry = (self.bits_per_key_element + self.bits_per_value_element) as u64;
        let shard_mask = num_shards - 1;
        let n = num_shards as usize;

        let added = to_populated - from_populated;
        let data = store.ordinal_map().byte_data();

        let mut num_maps = vec![0u32; n];
        let mut num_buckets_total = vec![0u64; n];
        for ordinal in &added {
            let mut pos = store.ordinal_map().pointer_for_data(ordinal) as usize;
            let size = read_vint(data, &mut pos);
            let shard = (ordinal & shard_mask) as usize;
            num_maps[shard] += 1;
            num_buckets_total[shard] += hash_table_size(size) as u64;
        }
        if cfg!(debug_assertions) {
            // Every added ordinal was visited by the statistics pass under
            // this direction's shard count.
            let totals = if num_shards == self.shared.num_shards {
                &self.total_of_map_buckets
            } else {
                &self.rev_total_of_map_buckets
            };
            for shard in 0..n {
                debug_assert!(num_buckets_total[shard] <= totals[shard]);
            }
        }

        let mut pointers: Vec<FixedWidthArray> = (0..n)
            .map(|shard| FixedWidthArray::with_bit_capacity(num_maps[shard] as u64 * bits_per_fixed))
            .collect();
        let mut entries: Vec<FixedWidthArray> = (0..n)
            .map(|shard| FixedWidthArray::with_bit_capacity(num_buckets_total[shard] * bits_per_entry))
            .collect();
        let mut added_streams: Vec<Vec<u8>> = vec![Vec::new(); n];
        let mut removed_streams: Vec<Vec<u8>> = vec![Vec::new(); n];

        let hasher = self.bind_primary_key_hasher(ctx)?;

        let mut map_counter = vec![0u32; n];
        let mut bucket_cursor = vec![0u64; n];
        let mut previous_added_ordinal = vec![0u32; n];
        let mut previous_removed_ordinal = vec![0u32; n];

        for ordinal in 0..(self.shared.max_ordinal + 1) {
            let ordinal = ordinal as u32;
            let shard = (ordinal & shard_mask) as usize;

            if added.contains(ordinal) {
                let mut pos = store.ordinal_map().pointer_for_data(ordinal) as usize;
                let size = read_vint(data, &mut pos);
                let num_buckets = hash_table_size(size);
                let end_bucket_position = bucket_cursor[shard] + num_buckets as u64;

                let fixed_offset = bits_per_fixed * map_counter[shard] as u64;
                pointers[shard].set_element(fixed_offset, bits_per_map_pointer, end_bucket_position);
                pointers[shard].set_element(
                    fixed_offset + bits_per_map_pointer as u64,
                    self.bits_per_map_size_value,
                    size as u64,
                );
                place_entries(
                    data,
                    &mut pos,
                    size,
                    num_buckets,
                    &mut entries[shard],
                    bucket_cursor[shard],
                    self.bits_per_key_element,
                    self.bits_per_value_element,
                    hasher.as_ref(),
                );
                bucket_cursor[shard] += num_buckets as u64;
                map_counter[shard] += 1;

                // Gap from the previously emitted shard-ordinal (0 initially,
                // so the first emitted value is the shard-ordinal itself).
                let shard_ordinal = ordinal / num_shards;
                write_vint(
                    &mut added_streams[shard],
                    shard_ordinal - previous_added_ordinal[shard],
                )?;
                previous_added_ordinal[shard] = shard_ordinal;
            } else if from_populated.contains(ordinal) && !to_populated.contains(ordinal) {
                let shard_ordinal = ordinal / num_shards;
                write_vint(
                    &mut removed_streams[shard],
                    shard_ordinal - previous_removed_ordinal[shard],
                )?;
                previous_removed_ordinal[shard] = shard_ordinal;
            }
        }

        self.num_maps_in_delta = num_maps;
        self.num_buckets_in_delta = num_buckets_total;
        self.map_pointers_and_sizes = pointers;
        self.entry_data = entries;
        self.delta_added_ordinals = added_streams;
        self.delta_removed_ordinals = removed_streams;
        Ok(())
    }

    fn write_calculated_delta(
        &mut self,
        out: &mut dyn Write,
        is_reverse: bool,
        max_shard_ordinal: &[i64],
    ) -> Result<()> {
        let num_shards = self.shared.delta_num_shards(is_reverse);
        let (bits_per_map_pointer, totals) = if num_shards == self.shared.num_shards {
            (self.bits_per_map_pointer, &self.total_of_map_buckets)
        } else {
            (self.rev_bits_per_map_pointer, &self.rev_total_of_map_buckets)
        };
        let totals = totals.clone();

        let scratch = DeltaScratch {
            pointers_and_sizes: std::mem::take(&mut self.map_pointers_and_sizes),
            entry_data: std::mem::take(&mut self.entry_data),
            added_ordinals: std::mem::take(&mut self.delta_added_ordinals),
            removed_ordinals: std::mem::take(&mut self.delta_removed_ordinals),
            num_maps: std::mem::take(&mut self.num_maps_in_delta),
            num_buckets: std::mem::take(&mut self.num_buckets_in_delta),
        };
        if scratch.num_maps.len() != num_shards as usize
            || max_shard_ordinal.len() != num_shards as usize
        {
            return Err(Error::Internal(
                "write_calculated_delta invoked without a matching calculated delta".into(),
            ));
        }

        if num_shards == 1 {
            self.write_delta_shard(out, 0, max_shard_ordinal[0], bits_per_map_pointer, totals[0], &scratch)?;
        } else {
            write_vint(out, self.shared.max_ordinal as u32)?;
            for shard in 0..num_shards as usize {
                self.write_delta_shard(
                    out,
                    shard,
                    max_shard_ordinal[shard],
                    bits_per_map_pointer,
                    totals[shard],
                    &scratch,
                )?;
            }
        }
        Ok(())
    }
}

/// Scratch arrays handed from `calculate_delta` to the delta writer; taking
/// them out of the state keeps release unconditional.
struct DeltaScratch {
    pointers_and_sizes: Vec<FixedWidthArray>,
    entry_data: Vec<FixedWidthArray>,
    added_ordinals: Vec<Vec<u8>>,
    removed_ordinals: Vec<Vec<u8>>,
    num_maps: Vec<u32>,
    num_buckets: Vec<u64>,
}

#[derive(Default)]
struct ScanMaxima {
    max_key_ordinal: u32,
    max_value_ordinal: u32,
    max_map_size: u32,
}

/// Walk every ordinal populated in either cycle, decoding each staged map
/// record once. `per_record` receives the ordinal and its bucket count.
fn scan_populated<F: FnMut(u32, u32)>(store: &RecordStore, mut per_record: F) -> ScanMaxima {
    let mut maxima = ScanMaxima::default();
    let data = store.ordinal_map().byte_data();
    let populated = store.previous_cycle_populated() | store.current_cycle_populated();

    for ordinal in &populated {
        let mut pos = store.ordinal_map().pointer_for_data(ordinal) as usize;
        let size = read_vint(data, &mut pos);
        maxima.max_map_size = maxima.max_map_size.max(size);

        let mut key_ordinal = 0u32;
        for _ in 0..size {
            key_ordinal += read_vint(data, &mut pos);
            let value_ordinal = read_vint(data, &mut pos);
            maxima.max_key_ordinal = maxima.max_key_ordinal.max(key_ordinal);
            maxima.max_value_ordinal = maxima.max_value_ordinal.max(value_ordinal);
            pos += next_vlong_size(data, pos); // skip the staged bucket hint
        }
        per_record(ordinal, hash_table_size(size));
    }
    maxima
}

/// Shard count that keeps every projected shard under the byte budget,
/// assuming the one-shard bit widths of the current staged state.
fn choose_num_shards(store: &RecordStore, max_ordinal: i64, target_max_shard_bytes: u64) -> u32 {
    let mut total_buckets = 0u64;
    let maxima = scan_populated(store, |_, num_buckets| total_buckets += num_buckets as u64);

    let bits_per_key = bit_len(maxima.max_key_ordinal as u64 + 1) as u64;
    let bits_per_value = (bit_len(maxima.max_value_ordinal as u64) as u64).max(1);
    let bits_per_size = bit_len(maxima.max_map_size as u64) as u64;
    let bits_per_pointer = bit_len(total_buckets) as u64;

    let mut projected_bytes = (bits_per_size + bits_per_pointer) * (max_ordinal + 1) as u64 / 8;
    projected_bytes += (bits_per_key + bits_per_value) * total_buckets / 8;

    let mut target_num_shards = 1u32;
    while target_max_shard_bytes * (target_num_shards as u64) < projected_bytes {
        target_num_shards *= 2;
    }
    target_num_shards
}

/// Sentinel-fill a record's bucket range, then place its staged entries in
/// staging order with forward linear probing. Placement is deterministic:
/// probing only ever advances on collision, so identical staged entries land
/// in identical slots on every encode.
#[allow(clippy::too_many_arguments)]
fn place_entries(
    data: &[u8],
    pos: &mut usize,
    size: u32,
    num_buckets: u32,
    entries: &mut FixedWidthArray,
    first_bucket: u64,
    bits_per_key: u32,
    bits_per_value: u32,
    hasher: Option<&PrimaryKeyHasher<'_>>,
) {
    let bits_per_entry = (bits_per_key + bits_per_value) as u64;
    let empty_sentinel = (1u64 << bits_per_key) - 1;
    let bucket_mask = num_buckets - 1;

    for bucket in 0..num_buckets as u64 {
        entries.set_element(
            bits_per_entry * (first_bucket + bucket),
            bits_per_key,
            empty_sentinel,
        );
    }

    let mut key_ordinal = 0u32;
    for _ in 0..size {
        let key_ordinal_delta = read_vint(data, pos);
        let value_ordinal = read_vint(data, pos);
        let staged_bucket = read_vint(data, pos);
        key_ordinal += key_ordinal_delta;

        let mut bucket = match hasher {
            Some(h) => h.record_hash(key_ordinal) & bucket_mask,
            None => staged_bucket & bucket_mask,
        };
        while entries.get_element(bits_per_entry * (first_bucket + bucket as u64), bits_per_key)
            != empty_sentinel
        {
            bucket = (bucket + 1) & bucket_mask;
        }

        let offset = bits_per_entry * (first_bucket + bucket as u64);
        entries.set_element(offset, bits_per_key, key_ordinal as u64);
        entries.set_element(offset + bits_per_key as u64, bits_per_value, value_ordinal as u64);
    }
}

#[inline]
fn bit_len(value: u64) -> u32 {
    64 - value.leading_zeros()
}
