//! Write-side of the strata dataset framework.
//!
//! Producers stage immutable records into per-type [`store::RecordStore`]s
//! and publish versioned snapshots and deltas through the
//! [`state_engine::WriteStateEngine`] cycle loop. Each registered type has
//! an encoder behind the [`type_state::TypeWriteState`] seam that turns the
//! staged bytes into bit-packed, memory-mappable blob sections; this crate
//! ships the map encoder ([`map_state::MapTypeWriteState`]).

pub mod field_path;
pub mod key_hasher;
pub mod map_state;
pub mod record;
pub mod schema;
pub mod state_engine;
pub mod store;
pub mod type_state;

pub use map_state::MapTypeWriteState;
pub use record::{FieldValue, MapWriteRecord, ObjectWriteRecord};
pub use schema::{FieldType, HashKey, MapSchema, ObjectSchema, Schema};
pub use state_engine::{EngineConfig, WriteContext, WriteStateEngine};
pub use store::RecordStore;
pub use type_state::TypeWriteState;
