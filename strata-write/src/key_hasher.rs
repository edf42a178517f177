//! Content-derived primary-key hashing.
//!
//! When a map schema declares a hash key, the encoder tries to bind a
//! hasher at the start of every encode call. A bound hasher replaces the
//! staged bucket hint with a hash of the key record's content, which keeps
//! the encoded table probing-compatible with readers that hash key content
//! rather than ordinals.

use rustc_hash::FxHasher;
use std::hash::Hasher;

use strata_memory::varint::{next_vlong_size, read_vint, read_vlong};
use strata_result::{Error, Result};

use crate::field_path::BoundFieldPath;
use crate::schema::{FieldType, HashKey, ObjectField};
use crate::state_engine::WriteContext;
use crate::store::RecordStore;

struct ResolvedSegment<'a> {
    store: &'a RecordStore,
    fields: &'a [ObjectField],
    position: usize,
}

/// A hasher bound to the live state for one encode call.
///
/// Binding resolves every field path down to the store and field position
/// it reads, so [`PrimaryKeyHasher::record_hash`] is pure traversal: no
/// lookups, no allocation.
pub struct PrimaryKeyHasher<'a> {
    paths: Vec<Vec<ResolvedSegment<'a>>>,
}

impl<'a> PrimaryKeyHasher<'a> {
    pub fn bind(hash_key: &HashKey, key_type: &str, ctx: &WriteContext<'a>) -> Result<Self> {
        let mut paths = Vec::with_capacity(hash_key.field_paths.len());
        for path in &hash_key.field_paths {
            let bound = BoundFieldPath::bind(ctx, key_type, path)?;
            let mut resolved = Vec::with_capacity(bound.segments.len());
            for segment in &bound.segments {
                let store = ctx.store(&segment.type_name).ok_or_else(|| {
                    Error::Internal(format!(
                        "bound path references unregistered type \"{}\"",
                        segment.type_name
                    ))
                })?;
                let fields = match store.schema().as_object() {
                    Some(schema) => schema.fields.as_slice(),
                    None => {
                        return Err(Error::Internal(format!(
                            "bound path segment type \"{}\" is not an object type",
                            segment.type_name
                        )));
                    }
                };
                resolved.push(ResolvedSegment {
                    store,
                    fields,
                    position: segment.field_position,
                });
            }
            paths.push(resolved);
        }
        Ok(Self { paths })
    }

    /// Hash of the key record staged at `key_ordinal`.
    ///
    /// Walks every bound path, following reference ordinals into sibling
    /// stores, and mixes the primitive leaves. Deterministic for identical
    /// staged state.
    pub fn record_hash(&self, key_ordinal: u32) -> u32 {
        let mut h = FxHasher::default();
        for path in &self.paths {
            let mut ordinal = key_ordinal;
            for segment in path {
                let map = segment.store.ordinal_map();
                debug_assert!((ordinal as i64) <= map.max_ordinal());
                let data = map.record_bytes(ordinal);
                match field_at(data, segment.fields, segment.position) {
                    RawField::Number(v) => h.write_u64(v),
                    RawField::Bytes(b) => h.write(b),
                    RawField::Reference(next) => ordinal = next,
                }
            }
        }
        let h64 = h.finish();
        (h64 ^ (h64 >> 32)) as u32
    }
}

enum RawField<'a> {
    Number(u64),
    Bytes(&'a [u8]),
    Reference(u32),
}

/// Decode the field at `position` from a staged object record, skipping the
/// fields before it.
fn field_at<'a>(data: &'a [u8], fields: &[ObjectField], position: usize) -> RawField<'a> {
    let mut pos = 0usize;
    for (i, field) in fields.iter().enumerate() {
        match field.field_type {
            FieldType::Str => {
                let len = read_vint(data, &mut pos) as usize;
                if i == position {
                    return RawField::Bytes(&data[pos..pos + len]);
                }
                pos += len;
            }
            FieldType::Reference(_) => {
                if i == position {
                    return RawField::Reference(read_vint(data, &mut pos));
                }
                pos += next_vlong_size(data, pos);
            }
            FieldType::Int | FieldType::Long => {
                if i == position {
                    return RawField::Number(read_vlong(data, &mut pos));
                }
                pos += next_vlong_size(data, pos);
            }
        }
    }
    // Binding checked the position against the schema; a miss here means the
    // staged record and schema disagree.
    unreachable!("field position {position} out of range for staged record")
}
