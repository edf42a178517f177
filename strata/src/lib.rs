//! Strata: a versioned, in-memory, columnar dataset framework (write side).
//!
//! This crate is the single entrypoint for producers. It re-exports the
//! staging and publication surface from the underlying `strata-*` crates so
//! applications see one API for registering types, staging records, and
//! emitting blobs.
//!
//! # Model
//!
//! A producer stages immutable records cycle by cycle. Records are deduped
//! by content into dense per-type ordinals, and two bitmaps track which
//! ordinals each cycle populated. From that state the engine can publish
//! either a self-contained *snapshot* of the current cycle or a compact
//! *delta* between consecutive cycles (forward or reverse), every section
//! bit-packed so a consumer can memory-map it and probe records in O(1).
//!
//! Map types additionally shard their ordinal space across a power-of-two
//! shard count chosen per cycle against a byte budget; across a reshard
//! boundary the encoder keeps both layouts addressable so reverse deltas
//! still apply to the previously published shard count.
//!
//! # Example
//!
//! ```
//! use strata::{
//!     EngineConfig, FieldType, FieldValue, MapSchema, MapWriteRecord, ObjectSchema,
//!     ObjectWriteRecord, WriteStateEngine,
//! };
//!
//! let mut engine = WriteStateEngine::new(EngineConfig::default());
//! engine.register_object_type(ObjectSchema::new("City", vec![("id", FieldType::Long)]))?;
//! engine.register_object_type(ObjectSchema::new("Stat", vec![("v", FieldType::Int)]))?;
//! engine.register_map_type(MapSchema::new("CityStats", "City", "Stat"))?;
//!
//! let city = engine.add_object("City", &ObjectWriteRecord::new(vec![FieldValue::Long(7)]))?;
//! let stat = engine.add_object("Stat", &ObjectWriteRecord::new(vec![FieldValue::Int(42)]))?;
//! let mut map = MapWriteRecord::new();
//! map.add_entry(city, stat);
//! engine.add_map("CityStats", &map)?;
//!
//! engine.prepare_for_write(true)?;
//! engine.calculate_snapshot()?;
//! let mut blob = Vec::new();
//! engine.write_snapshot(&mut blob)?;
//! engine.prepare_for_next_cycle();
//! assert!(!blob.is_empty());
//! # Ok::<(), strata::Error>(())
//! ```

pub use strata_memory as memory;
pub use strata_result::{Error, FieldPathErrorKind, Result};
pub use strata_write::{
    EngineConfig, FieldType, FieldValue, HashKey, MapSchema, MapTypeWriteState, MapWriteRecord,
    ObjectSchema, ObjectWriteRecord, RecordStore, Schema, TypeWriteState, WriteContext,
    WriteStateEngine,
};
