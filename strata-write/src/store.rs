//! Per-type staging store.

use roaring::RoaringBitmap;
use strata_memory::OrdinalMap;

use crate::schema::Schema;

/// Staging state for one type: the content-addressed record arena plus the
/// populated-ordinal sets for the previous and current cycle.
///
/// Encoders only ever read a store; all mutation happens between cycles
/// through [`RecordStore::stage`] and [`RecordStore::cycle`].
pub struct RecordStore {
    schema: Schema,
    ordinal_map: OrdinalMap,
    previous_cycle_populated: RoaringBitmap,
    current_cycle_populated: RoaringBitmap,
    previous_cycle_max_ordinal: i64,
}

impl RecordStore {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            ordinal_map: OrdinalMap::new(),
            previous_cycle_populated: RoaringBitmap::new(),
            current_cycle_populated: RoaringBitmap::new(),
            previous_cycle_max_ordinal: -1,
        }
    }

    /// Stage serialized record bytes for the current cycle; returns the
    /// (content-stable) ordinal.
    pub fn stage(&mut self, record: &[u8]) -> u32 {
        let ordinal = self.ordinal_map.get_or_assign(record);
        self.current_cycle_populated.insert(ordinal);
        ordinal
    }

    /// Roll the cycle: the current population becomes the previous one.
    pub fn cycle(&mut self) {
        self.previous_cycle_max_ordinal = self.ordinal_map.max_ordinal();
        self.previous_cycle_populated = std::mem::take(&mut self.current_cycle_populated);
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn ordinal_map(&self) -> &OrdinalMap {
        &self.ordinal_map
    }

    pub fn previous_cycle_populated(&self) -> &RoaringBitmap {
        &self.previous_cycle_populated
    }

    pub fn current_cycle_populated(&self) -> &RoaringBitmap {
        &self.current_cycle_populated
    }

    /// Max ordinal as of the end of the previous cycle; frames the ordinal
    /// space a reverse delta targets.
    pub fn previous_cycle_max_ordinal(&self) -> i64 {
        self.previous_cycle_max_ordinal
    }
}
