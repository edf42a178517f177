//! The write-state engine: staging registry plus the per-cycle drive loop.
//!
//! Producers register types, stage records, and then run the cycle hooks in
//! order: `prepare_for_write`, `calculate_snapshot` / `calculate_delta`,
//! the matching writers, and finally `prepare_for_next_cycle`. Everything is
//! sequential; encoders see quiescent staging state for the whole cycle.

use std::collections::BTreeMap;
use std::io::Write;

use strata_result::{Error, Result};

use crate::map_state::MapTypeWriteState;
use crate::record::{MapWriteRecord, ObjectWriteRecord};
use crate::schema::{MapSchema, ObjectSchema, Schema};
use crate::store::RecordStore;
use crate::type_state::{max_shard_ordinals, TypeWriteState};
use strata_memory::varint::write_vint;

/// Process-wide write configuration, passed in at construction (no global
/// singletons).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Byte budget the shard sizer keeps any single shard under.
    pub target_max_type_shard_bytes: u64,
}

impl EngineConfig {
    pub const DEFAULT_TARGET_MAX_TYPE_SHARD_BYTES: u64 = 16 * 1024 * 1024;
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_max_type_shard_bytes: Self::DEFAULT_TARGET_MAX_TYPE_SHARD_BYTES,
        }
    }
}

/// Read-only view of the staging registry, handed to encoders so late-bound
/// collaborators (the primary-key hasher) can resolve sibling types.
pub struct WriteContext<'a> {
    stores: &'a BTreeMap<String, RecordStore>,
}

impl<'a> WriteContext<'a> {
    pub fn store(&self, type_name: &str) -> Option<&'a RecordStore> {
        self.stores.get(type_name)
    }

    pub fn object_schema(&self, type_name: &str) -> Option<&'a ObjectSchema> {
        self.store(type_name)?.schema().as_object()
    }
}

/// Owns the staging stores and the registered type encoders, and drives them
/// through the publish cycle.
pub struct WriteStateEngine {
    config: EngineConfig,
    stores: BTreeMap<String, RecordStore>,
    states: Vec<Box<dyn TypeWriteState>>,
}

impl WriteStateEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            stores: BTreeMap::new(),
            states: Vec::new(),
        }
    }

    /// Register an object type. Object types stage records that map types
    /// reference by ordinal; their own encoder is outside this crate.
    pub fn register_object_type(&mut self, schema: ObjectSchema) -> Result<()> {
        self.insert_store(Schema::Object(schema))
    }

    /// Register a map type with its encoder; the shard sizer picks a count
    /// on the first prepare.
    pub fn register_map_type(&mut self, schema: MapSchema) -> Result<()> {
        self.insert_store(Schema::Map(schema.clone()))?;
        self.states.push(Box::new(MapTypeWriteState::new(schema)));
        Ok(())
    }

    /// Register a map type with a pinned power-of-two shard count.
    pub fn register_map_type_with_num_shards(
        &mut self,
        schema: MapSchema,
        num_shards: u32,
    ) -> Result<()> {
        if num_shards == 0 || !num_shards.is_power_of_two() {
            return Err(Error::InvalidArgument(format!(
                "shard count must be a power of two, got {num_shards}"
            )));
        }
        self.insert_store(Schema::Map(schema.clone()))?;
        self.states
            .push(Box::new(MapTypeWriteState::with_num_shards(schema, num_shards)));
        Ok(())
    }

    fn insert_store(&mut self, schema: Schema) -> Result<()> {
        let name = schema.name().to_string();
        if self.stores.contains_key(&name) {
            return Err(Error::InvalidArgument(format!(
                "type \"{name}\" is already registered"
            )));
        }
        self.stores.insert(name, RecordStore::new(schema));
        Ok(())
    }

    /// Stage an object record; returns its content-stable ordinal.
    pub fn add_object(&mut self, type_name: &str, record: &ObjectWriteRecord) -> Result<u32> {
        let store = self
            .stores
            .get_mut(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?;
        let mut bytes = Vec::new();
        match store.schema() {
            Schema::Object(schema) => record.write_data_to(schema, &mut bytes)?,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "type \"{type_name}\" is not an object type"
                )));
            }
        }
        Ok(store.stage(&bytes))
    }

    /// Stage a map record; returns its content-stable ordinal.
    pub fn add_map(&mut self, type_name: &str, record: &MapWriteRecord) -> Result<u32> {
        let store = self
            .stores
            .get_mut(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?;
        if !matches!(store.schema(), Schema::Map(_)) {
            return Err(Error::InvalidArgument(format!(
                "type \"{type_name}\" is not a map type"
            )));
        }
        let mut bytes = Vec::new();
        record.write_data_to(&mut bytes)?;
        Ok(store.stage(&bytes))
    }

    /// Once per cycle before any encoding.
    pub fn prepare_for_write(&mut self, can_reshard: bool) -> Result<()> {
        let stores = &self.stores;
        let config = &self.config;
        for state in &mut self.states {
            let store = required_store(stores, state.type_name())?;
            state.prepare_for_write(store, config, can_reshard)?;
        }
        Ok(())
    }

    pub fn calculate_snapshot(&mut self) -> Result<()> {
        let ctx = WriteContext { stores: &self.stores };
        for state in &mut self.states {
            let store = required_store(ctx.stores, state.type_name())?;
            state.calculate_snapshot(store, &ctx)?;
        }
        Ok(())
    }

    /// Stream the calculated snapshot: a var-int type count, then per type a
    /// name frame, its shard count, and the type body.
    pub fn write_snapshot<W: Write>(&mut self, out: &mut W) -> Result<()> {
        write_vint(out, self.states.len() as u32)?;
        let stores = &self.stores;
        for state in &mut self.states {
            let store = required_store(stores, state.type_name())?;
            write_type_header(out, state.type_name(), state.num_shards())?;
            state.write_snapshot(store, out)?;
        }
        Ok(())
    }

    /// Diff the previous cycle against the current one.
    pub fn calculate_delta(&mut self) -> Result<()> {
        self.calculate_delta_direction(false)
    }

    /// Diff the current cycle against the previous one.
    pub fn calculate_reverse_delta(&mut self) -> Result<()> {
        self.calculate_delta_direction(true)
    }

    fn calculate_delta_direction(&mut self, is_reverse: bool) -> Result<()> {
        let ctx = WriteContext { stores: &self.stores };
        for state in &mut self.states {
            let store = required_store(ctx.stores, state.type_name())?;
            let (from, to) = if is_reverse {
                (store.current_cycle_populated(), store.previous_cycle_populated())
            } else {
                (store.previous_cycle_populated(), store.current_cycle_populated())
            };
            state.calculate_delta(store, from, to, is_reverse, &ctx)?;
        }
        Ok(())
    }

    pub fn write_delta<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.write_delta_direction(out, false)
    }

    pub fn write_reverse_delta<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.write_delta_direction(out, true)
    }

    fn write_delta_direction<W: Write>(&mut self, out: &mut W, is_reverse: bool) -> Result<()> {
        write_vint(out, self.states.len() as u32)?;
        let stores = &self.stores;
        for state in &mut self.states {
            let store = required_store(stores, state.type_name())?;
            let num_shards = state.delta_num_shards(is_reverse);
            // The delta targets the to-state's ordinal space: the current
            // cycle going forward, the previously published one in reverse.
            let target_max_ordinal = if is_reverse {
                store.previous_cycle_max_ordinal()
            } else {
                store.ordinal_map().max_ordinal()
            };
            let shard_ordinals = max_shard_ordinals(num_shards, target_max_ordinal);
            write_type_header(out, state.type_name(), num_shards)?;
            state.write_calculated_delta(out, is_reverse, &shard_ordinals)?;
        }
        Ok(())
    }

    /// Roll every store's population forward; staging for the next cycle
    /// starts empty.
    pub fn prepare_for_next_cycle(&mut self) {
        for store in self.stores.values_mut() {
            store.cycle();
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The read-only view encoders receive during `calculate_*` calls.
    pub fn write_context(&self) -> WriteContext<'_> {
        WriteContext { stores: &self.stores }
    }

    pub fn store(&self, type_name: &str) -> Option<&RecordStore> {
        self.stores.get(type_name)
    }

    pub fn type_state(&self, type_name: &str) -> Option<&dyn TypeWriteState> {
        self.states
            .iter()
            .find(|s| s.type_name() == type_name)
            .map(|s| s.as_ref())
    }
}

fn required_store<'a>(
    stores: &'a BTreeMap<String, RecordStore>,
    type_name: &str,
) -> Result<&'a RecordStore> {
    stores
        .get(type_name)
        .ok_or_else(|| Error::UnknownType(type_name.to_string()))
}

fn write_type_header(out: &mut dyn Write, type_name: &str, num_shards: u32) -> Result<()> {
    write_vint(out, type_name.len() as u32)?;
    out.write_all(type_name.as_bytes())?;
    write_vint(out, num_shards)?;
    Ok(())
}
