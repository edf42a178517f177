mod common;

use common::{decode_delta, decode_snapshot};
use strata_memory::hashing::{hash_int, hash_table_size};
use strata_result::{Error, FieldPathErrorKind};
use strata_write::key_hasher::PrimaryKeyHasher;
use strata_write::{
    EngineConfig, FieldType, FieldValue, HashKey, MapSchema, MapWriteRecord, ObjectSchema,
    ObjectWriteRecord, WriteStateEngine,
};

fn engine() -> WriteStateEngine {
    common::init();
    WriteStateEngine::new(EngineConfig::default())
}

fn register_key_value_types(engine: &mut WriteStateEngine) {
    engine
        .register_object_type(ObjectSchema::new("K", vec![("id", FieldType::Long)]))
        .unwrap();
    engine
        .register_object_type(ObjectSchema::new("V", vec![("v", FieldType::Int)]))
        .unwrap();
}

fn stage_keys(engine: &mut WriteStateEngine, count: u32) {
    for i in 0..count {
        engine
            .add_object("K", &ObjectWriteRecord::new(vec![FieldValue::Long(1000 + i as u64)]))
            .unwrap();
    }
}

fn single_entry_map(key_ordinal: u32) -> MapWriteRecord {
    let mut rec = MapWriteRecord::new();
    rec.add_entry(key_ordinal, 0);
    rec
}

#[test]
fn bound_hasher_overrides_the_staged_bucket_hint() {
    let mut engine = engine();
    register_key_value_types(&mut engine);
    engine
        .register_map_type(MapSchema::new("M", "K", "V").with_hash_key(HashKey::new(&["id"])))
        .unwrap();
    stage_keys(&mut engine, 16);

    let buckets = hash_table_size(1);
    // Pick a key whose content hash lands in a different bucket than the
    // staged ordinal-hash hint, so the override is observable.
    let (key_ordinal, expected_bucket) = {
        let ctx = engine.write_context();
        let hasher = PrimaryKeyHasher::bind(&HashKey::new(&["id"]), "K", &ctx).unwrap();
        (0..16u32)
            .map(|ord| (ord, hasher.record_hash(ord) & (buckets - 1)))
            .find(|(ord, bucket)| hash_int(*ord) & (buckets - 1) != *bucket)
            .expect("some key must hash away from its staged hint")
    };

    engine.add_map("M", &single_entry_map(key_ordinal)).unwrap();
    engine.prepare_for_write(true).unwrap();
    engine.calculate_snapshot().unwrap();
    let mut blob = Vec::new();
    engine.write_snapshot(&mut blob).unwrap();

    let types = decode_snapshot(&blob);
    let m = types.iter().find(|t| t.name == "M").unwrap();
    let shard = &m.shards[0];
    assert_eq!(shard.bucket_key(expected_bucket as u64), key_ordinal as u64);
    let other = (expected_bucket + 1) & (buckets - 1);
    assert_eq!(shard.bucket_key(other as u64), shard.empty_sentinel());
}

#[test]
fn nested_paths_hash_through_reference_fields() {
    let mut engine = engine();
    engine
        .register_object_type(ObjectSchema::new("R", vec![("code", FieldType::Str)]))
        .unwrap();
    engine
        .register_object_type(ObjectSchema::new(
            "K",
            vec![("region", FieldType::Reference("R".into())), ("id", FieldType::Long)],
        ))
        .unwrap();
    engine
        .register_object_type(ObjectSchema::new("V", vec![("v", FieldType::Int)]))
        .unwrap();
    engine
        .register_map_type(
            MapSchema::new("M", "K", "V").with_hash_key(HashKey::new(&["region.code"])),
        )
        .unwrap();

    for (i, code) in ["east", "west", "north", "south"].iter().enumerate() {
        let region = engine
            .add_object("R", &ObjectWriteRecord::new(vec![FieldValue::Str(code.to_string())]))
            .unwrap();
        engine
            .add_object(
                "K",
                &ObjectWriteRecord::new(vec![FieldValue::Ref(region), FieldValue::Long(i as u64)]),
            )
            .unwrap();
    }

    let buckets = hash_table_size(1);
    let expected: Vec<u32> = {
        let ctx = engine.write_context();
        let hasher = PrimaryKeyHasher::bind(&HashKey::new(&["region.code"]), "K", &ctx).unwrap();
        (0..4u32).map(|ord| hasher.record_hash(ord) & (buckets - 1)).collect()
    };

    for ord in 0..4u32 {
        engine.add_map("M", &single_entry_map(ord)).unwrap();
    }
    engine.prepare_for_write(true).unwrap();

    // The hasher applies on the delta path too: the first cycle's delta adds
    // every map, densely encoded with hashed placement.
    engine.calculate_delta().unwrap();
    let mut blob = Vec::new();
    engine.write_delta(&mut blob).unwrap();
    let deltas = decode_delta(&blob);
    let m = deltas.iter().find(|t| t.name == "M").unwrap();
    let shard = &m.shards[0];
    assert_eq!(shard.added_shard_ordinals, vec![0, 1, 2, 3]);
    for (i, bucket) in expected.iter().enumerate() {
        // The i-th added map owns buckets [i*B, (i+1)*B).
        let base = i as u64 * buckets as u64;
        assert_eq!(shard.bucket_key(base + *bucket as u64), i as u64);
    }
}

#[test]
fn unbindable_hash_key_falls_back_to_staged_hints() {
    let staged: Vec<u32> = (0..6u32).collect();

    let mut blobs = Vec::new();
    for hash_key in [None, Some(HashKey::new(&["no_such_field"]))] {
        let mut engine = engine();
        register_key_value_types(&mut engine);
        let mut schema = MapSchema::new("M", "K", "V");
        if let Some(hk) = hash_key {
            schema = schema.with_hash_key(hk);
        }
        engine.register_map_type(schema).unwrap();
        stage_keys(&mut engine, 6);
        for ord in &staged {
            engine.add_map("M", &single_entry_map(*ord)).unwrap();
        }
        engine.prepare_for_write(true).unwrap();
        engine.calculate_snapshot().unwrap();
        let mut blob = Vec::new();
        engine.write_snapshot(&mut blob).unwrap();
        blobs.push(blob);
    }
    // Byte-identical: the unbindable hasher leaves staged hints in force.
    assert_eq!(blobs[0], blobs[1]);
}

#[test]
fn missing_key_type_is_recoverable() {
    let mut engine = engine();
    // "Ghost" is never registered; binding must fail softly.
    engine
        .register_map_type(MapSchema::new("M", "Ghost", "V").with_hash_key(HashKey::new(&["id"])))
        .unwrap();
    engine.add_map("M", &single_entry_map(0)).unwrap();
    engine.prepare_for_write(true).unwrap();
    engine.calculate_snapshot().unwrap();
    let mut blob = Vec::new();
    engine.write_snapshot(&mut blob).unwrap();
    assert!(!decode_snapshot(&blob)[0].logical().is_empty());
}

#[test]
fn path_through_a_primitive_field_is_fatal() {
    let mut engine = engine();
    register_key_value_types(&mut engine);
    engine
        .register_map_type(MapSchema::new("M", "K", "V").with_hash_key(HashKey::new(&["id.x"])))
        .unwrap();
    stage_keys(&mut engine, 1);
    engine.add_map("M", &single_entry_map(0)).unwrap();
    engine.prepare_for_write(true).unwrap();

    match engine.calculate_snapshot() {
        Err(Error::FieldPath { kind, .. }) => assert_eq!(kind, FieldPathErrorKind::Malformed),
        other => panic!("expected a fatal malformed-path error, got {other:?}"),
    }
}

#[test]
fn reference_leaf_is_fatal() {
    let mut engine = engine();
    engine
        .register_object_type(ObjectSchema::new(
            "K",
            vec![("friend", FieldType::Reference("K".into()))],
        ))
        .unwrap();
    engine
        .register_map_type(MapSchema::new("M", "K", "V").with_hash_key(HashKey::new(&["friend"])))
        .unwrap();
    engine.add_map("M", &single_entry_map(0)).unwrap();
    engine.prepare_for_write(true).unwrap();

    match engine.calculate_snapshot() {
        Err(Error::FieldPath { kind, .. }) => assert_eq!(kind, FieldPathErrorKind::TypeMismatch),
        other => panic!("expected a fatal type-mismatch error, got {other:?}"),
    }
}
