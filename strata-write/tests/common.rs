//! Shared test support: a minimal blob reader that decodes written
//! snapshots and deltas back into logical map sets so tests can verify
//! round-trip and composition laws. Test-only; the shipped API is
//! write-side.

#![allow(dead_code)]

use std::collections::BTreeMap;

use roaring::RoaringBitmap;
use strata_memory::varint::{read_vint, read_vlong};
use strata_memory::FixedWidthArray;

pub fn init() {
    strata_test_utils::init_tracing_for_tests();
}

/// Logical content of one map type: ordinal -> entries sorted by key.
pub type LogicalMaps = BTreeMap<u32, Vec<(u32, u32)>>;

pub struct SnapshotShard {
    pub max_shard_ordinal: i64,
    pub bits_per_map_pointer: u32,
    pub bits_per_map_size_value: u32,
    pub bits_per_key_element: u32,
    pub bits_per_value_element: u32,
    pub total_of_map_buckets: u64,
    pub pointers_and_sizes: FixedWidthArray,
    pub entries: FixedWidthArray,
}

impl SnapshotShard {
    fn bits_per_fixed(&self) -> u64 {
        (self.bits_per_map_pointer + self.bits_per_map_size_value) as u64
    }

    fn bits_per_entry(&self) -> u64 {
        (self.bits_per_key_element + self.bits_per_value_element) as u64
    }

    pub fn empty_sentinel(&self) -> u64 {
        (1u64 << self.bits_per_key_element) - 1
    }

    /// Exclusive end-bucket offset stored for a shard-local ordinal.
    pub fn pointer(&self, shard_ordinal: u64) -> u64 {
        self.pointers_and_sizes
            .get_element(self.bits_per_fixed() * shard_ordinal, self.bits_per_map_pointer)
    }

    pub fn size(&self, shard_ordinal: u64) -> u32 {
        self.pointers_and_sizes.get_element(
            self.bits_per_fixed() * shard_ordinal + self.bits_per_map_pointer as u64,
            self.bits_per_map_size_value,
        ) as u32
    }

    pub fn bucket_key(&self, bucket: u64) -> u64 {
        self.entries
            .get_element(self.bits_per_entry() * bucket, self.bits_per_key_element)
    }

    pub fn bucket_value(&self, bucket: u64) -> u64 {
        self.entries.get_element(
            self.bits_per_entry() * bucket + self.bits_per_key_element as u64,
            self.bits_per_value_element,
        )
    }

    pub fn bucket_range(&self, shard_ordinal: u64) -> (u64, u64) {
        let start = if shard_ordinal == 0 {
            0
        } else {
            self.pointer(shard_ordinal - 1)
        };
        (start, self.pointer(shard_ordinal))
    }

    /// Non-sentinel entries of the record at `shard_ordinal`, key-sorted.
    pub fn record_entries(&self, shard_ordinal: u64) -> Vec<(u32, u32)> {
        let (start, end) = self.bucket_range(shard_ordinal);
        let mut out = Vec::new();
        for bucket in start..end {
            let key = self.bucket_key(bucket);
            if key != self.empty_sentinel() {
                out.push((key as u32, self.bucket_value(bucket) as u32));
            }
        }
        out.sort_unstable();
        out
    }
}

pub struct SnapshotType {
    pub name: String,
    pub num_shards: u32,
    pub max_ordinal: i64,
    pub shards: Vec<SnapshotShard>,
    pub populated: RoaringBitmap,
}

impl SnapshotType {
    pub fn logical(&self) -> LogicalMaps {
        let mut maps = LogicalMaps::new();
        for ordinal in &self.populated {
            let shard = (ordinal & (self.num_shards - 1)) as usize;
            let shard_ordinal = (ordinal / self.num_shards) as u64;
            maps.insert(ordinal, self.shards[shard].record_entries(shard_ordinal));
        }
        maps
    }
}

pub struct DeltaShard {
    pub max_shard_ordinal: i64,
    pub removed_shard_ordinals: Vec<u32>,
    pub added_shard_ordinals: Vec<u32>,
    pub bits_per_map_pointer: u32,
    pub bits_per_map_size_value: u32,
    pub bits_per_key_element: u32,
    pub bits_per_value_element: u32,
    pub total_of_map_buckets: u64,
    pub pointers_and_sizes: FixedWidthArray,
    pub entries: FixedWidthArray,
}

impl DeltaShard {
    pub fn empty_sentinel(&self) -> u64 {
        (1u64 << self.bits_per_key_element) - 1
    }

    pub fn bucket_key(&self, bucket: u64) -> u64 {
        let bits_per_entry = (self.bits_per_key_element + self.bits_per_value_element) as u64;
        self.entries
            .get_element(bits_per_entry * bucket, self.bits_per_key_element)
    }

    /// Entries of the `index`-th added map in this shard, key-sorted.
    pub fn added_record_entries(&self, index: u64) -> Vec<(u32, u32)> {
        let view = SnapshotShard {
            max_shard_ordinal: self.max_shard_ordinal,
            bits_per_map_pointer: self.bits_per_map_pointer,
            bits_per_map_size_value: self.bits_per_map_size_value,
            bits_per_key_element: self.bits_per_key_element,
            bits_per_value_element: self.bits_per_value_element,
            total_of_map_buckets: self.total_of_map_buckets,
            pointers_and_sizes: self.pointers_and_sizes.clone(),
            entries: self.entries.clone(),
        };
        view.record_entries(index)
    }
}

pub struct DeltaType {
    pub name: String,
    pub num_shards: u32,
    pub max_ordinal: i64,
    pub shards: Vec<DeltaShard>,
}

impl DeltaType {
    /// Replay this delta on top of a base logical state.
    pub fn apply(&self, base: &LogicalMaps) -> LogicalMaps {
        let mut result = base.clone();
        for (shard_index, shard) in self.shards.iter().enumerate() {
            for shard_ordinal in &shard.removed_shard_ordinals {
                let ordinal = shard_ordinal * self.num_shards + shard_index as u32;
                result.remove(&ordinal);
            }
            for (i, shard_ordinal) in shard.added_shard_ordinals.iter().enumerate() {
                let ordinal = shard_ordinal * self.num_shards + shard_index as u32;
                result.insert(ordinal, shard.added_record_entries(i as u64));
            }
        }
        result
    }
}

fn read_ordinal(data: &[u8], pos: &mut usize) -> i64 {
    read_vint(data, pos) as i32 as i64
}

fn read_words(data: &[u8], pos: &mut usize) -> FixedWidthArray {
    let num_words = read_vint(data, pos) as usize;
    let mut words = Vec::with_capacity(num_words);
    for _ in 0..num_words {
        words.push(u64::from_be_bytes(data[*pos..*pos + 8].try_into().unwrap()));
        *pos += 8;
    }
    FixedWidthArray::from_words(words)
}

fn read_populated_bits(data: &[u8], pos: &mut usize) -> RoaringBitmap {
    let num_words = read_vlong(data, pos);
    let mut bits = RoaringBitmap::new();
    for w in 0..num_words {
        let word = u64::from_be_bytes(data[*pos..*pos + 8].try_into().unwrap());
        *pos += 8;
        for i in 0..64 {
            if word & (1u64 << i) != 0 {
                bits.insert((w * 64 + i) as u32);
            }
        }
    }
    bits
}

fn read_snapshot_shard(data: &[u8], pos: &mut usize) -> SnapshotShard {
    let max_shard_ordinal = read_ordinal(data, pos);
    let bits_per_map_pointer = read_vint(data, pos);
    let bits_per_map_size_value = read_vint(data, pos);
    let bits_per_key_element = read_vint(data, pos);
    let bits_per_value_element = read_vint(data, pos);
    let total_of_map_buckets = read_vlong(data, pos);
    let pointers_and_sizes = read_words(data, pos);
    let entries = read_words(data, pos);
    SnapshotShard {
        max_shard_ordinal,
        bits_per_map_pointer,
        bits_per_map_size_value,
        bits_per_key_element,
        bits_per_value_element,
        total_of_map_buckets,
        pointers_and_sizes,
        entries,
    }
}

fn read_gap_stream(data: &[u8], pos: &mut usize) -> Vec<u32> {
    let len = read_vlong(data, pos) as usize;
    let stream = &data[*pos..*pos + len];
    *pos += len;
    let mut out = Vec::new();
    let mut cursor = 0usize;
    let mut previous = 0u32;
    while cursor < stream.len() {
        previous += read_vint(stream, &mut cursor);
        out.push(previous);
    }
    out
}

fn read_delta_shard(data: &[u8], pos: &mut usize) -> DeltaShard {
    let max_shard_ordinal = read_ordinal(data, pos);
    let removed_shard_ordinals = read_gap_stream(data, pos);
    let added_shard_ordinals = read_gap_stream(data, pos);
    let bits_per_map_pointer = read_vint(data, pos);
    let bits_per_map_size_value = read_vint(data, pos);
    let bits_per_key_element = read_vint(data, pos);
    let bits_per_value_element = read_vint(data, pos);
    let total_of_map_buckets = read_vlong(data, pos);
    let pointers_and_sizes = read_words(data, pos);
    let entries = read_words(data, pos);
    DeltaShard {
        max_shard_ordinal,
        removed_shard_ordinals,
        added_shard_ordinals,
        bits_per_map_pointer,
        bits_per_map_size_value,
        bits_per_key_element,
        bits_per_value_element,
        total_of_map_buckets,
        pointers_and_sizes,
        entries,
    }
}

pub fn decode_snapshot(blob: &[u8]) -> Vec<SnapshotType> {
    let mut pos = 0usize;
    let num_types = read_vint(blob, &mut pos);
    let mut types = Vec::with_capacity(num_types as usize);
    for _ in 0..num_types {
        let name_len = read_vint(blob, &mut pos) as usize;
        let name = String::from_utf8(blob[pos..pos + name_len].to_vec()).unwrap();
        pos += name_len;
        let num_shards = read_vint(blob, &mut pos);

        let (max_ordinal, shards) = if num_shards == 1 {
            let shard = read_snapshot_shard(blob, &mut pos);
            (shard.max_shard_ordinal, vec![shard])
        } else {
            let max_ordinal = read_ordinal(blob, &mut pos);
            let shards = (0..num_shards)
                .map(|_| read_snapshot_shard(blob, &mut pos))
                .collect();
            (max_ordinal, shards)
        };
        let populated = read_populated_bits(blob, &mut pos);
        types.push(SnapshotType {
            name,
            num_shards,
            max_ordinal,
            shards,
            populated,
        });
    }
    assert_eq!(pos, blob.len(), "snapshot blob fully consumed");
    types
}

pub fn decode_delta(blob: &[u8]) -> Vec<DeltaType> {
    let mut pos = 0usize;
    let num_types = read_vint(blob, &mut pos);
    let mut types = Vec::with_capacity(num_types as usize);
    for _ in 0..num_types {
        let name_len = read_vint(blob, &mut pos) as usize;
        let name = String::from_utf8(blob[pos..pos + name_len].to_vec()).unwrap();
        pos += name_len;
        let num_shards = read_vint(blob, &mut pos);

        let (max_ordinal, shards) = if num_shards == 1 {
            let shard = read_delta_shard(blob, &mut pos);
            (shard.max_shard_ordinal, vec![shard])
        } else {
            let max_ordinal = read_ordinal(blob, &mut pos);
            let shards = (0..num_shards)
                .map(|_| read_delta_shard(blob, &mut pos))
                .collect();
            (max_ordinal, shards)
        };
        types.push(DeltaType {
            name,
            num_shards,
            max_ordinal,
            shards,
        });
    }
    assert_eq!(pos, blob.len(), "delta blob fully consumed");
    types
}
