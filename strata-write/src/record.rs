//! Staged write records.
//!
//! Producers build records against a schema; the engine serializes them and
//! hands the bytes to the type's ordinal map, which dedupes by content.
//!
//! Staged map record layout:
//!   var-int size,
//!   then per entry in ascending key-ordinal order:
//!     var-int key-ordinal forward delta,
//!     var-int value ordinal,
//!     var-int bucket hint (`hash_int(key_ordinal) & (buckets - 1)`).
//!
//! Staged object record layout: fields in schema order; Int/Long as
//! var-long, Str as var-int length + UTF-8 bytes, Reference as var-int
//! ordinal.

use strata_memory::hashing::{hash_int, hash_table_size};
use strata_memory::varint::{write_vint, write_vlong};
use strata_result::{Error, Result};

use crate::schema::{FieldType, ObjectSchema};

/// A staged value for one object field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(u32),
    Long(u64),
    Str(String),
    Ref(u32),
}

/// Builder for one object record; values must match the schema positionally.
#[derive(Debug, Clone, Default)]
pub struct ObjectWriteRecord {
    values: Vec<FieldValue>,
}

impl ObjectWriteRecord {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self { values }
    }

    pub fn write_data_to(&self, schema: &ObjectSchema, out: &mut Vec<u8>) -> Result<()> {
        if self.values.len() != schema.fields.len() {
            return Err(Error::InvalidArgument(format!(
                "record for \"{}\" has {} values, schema has {} fields",
                schema.name,
                self.values.len(),
                schema.fields.len()
            )));
        }
        for (field, value) in schema.fields.iter().zip(&self.values) {
            match (&field.field_type, value) {
                (FieldType::Int, FieldValue::Int(v)) => write_vint(out, *v)?,
                (FieldType::Long, FieldValue::Long(v)) => write_vlong(out, *v)?,
                (FieldType::Str, FieldValue::Str(s)) => {
                    write_vint(out, s.len() as u32)?;
                    out.extend_from_slice(s.as_bytes());
                }
                (FieldType::Reference(_), FieldValue::Ref(ordinal)) => write_vint(out, *ordinal)?,
                (expected, got) => {
                    return Err(Error::InvalidArgument(format!(
                        "field \"{}\" of \"{}\" expects {:?}, record staged {:?}",
                        field.name, schema.name, expected, got
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Builder for one map record: a multiset of (key ordinal, value ordinal)
/// pairs referencing records staged in the sibling key and value types.
#[derive(Debug, Clone, Default)]
pub struct MapWriteRecord {
    entries: Vec<(u32, u32)>,
}

impl MapWriteRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, key_ordinal: u32, value_ordinal: u32) {
        self.entries.push((key_ordinal, value_ordinal));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write_data_to(&self, out: &mut Vec<u8>) -> Result<()> {
        let mut entries = self.entries.clone();
        entries.sort_unstable();

        let size = entries.len() as u32;
        let num_buckets = hash_table_size(size);
        write_vint(out, size)?;

        let mut previous_key = 0u32;
        for (key_ordinal, value_ordinal) in entries {
            write_vint(out, key_ordinal - previous_key)?;
            write_vint(out, value_ordinal)?;
            write_vint(out, hash_int(key_ordinal) & (num_buckets - 1))?;
            previous_key = key_ordinal;
        }
        Ok(())
    }
}
