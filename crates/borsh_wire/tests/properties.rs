//! Property-based tests for the wire contract: round-trips, determinism,
//! canonical ordering and truncation.

#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap, HashSet};

use borsh_wire::{
    Decode, Describe, Encode, Shape, Value, decode_value, encode_value,
    from_slice, to_vec,
};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq, Encode, Decode, Describe)]
struct Record {
    id: u32,
    delta: i64,
    name: String,
    scores: Vec<u16>,
    parent: Option<u64>,
    flags: [bool; 3],
}

fn record() -> impl Strategy<Value = Record> {
    (
        any::<u32>(),
        any::<i64>(),
        ".{0,16}",
        prop::collection::vec(any::<u16>(), 0..16),
        any::<Option<u64>>(),
        any::<[bool; 3]>(),
    )
        .prop_map(|(id, delta, name, scores, parent, flags)| Record {
            id,
            delta,
            name,
            scores,
            parent,
            flags,
        })
}

fn to_value(record: &Record) -> Value {
    Value::Record(vec![
        Value::U32(record.id),
        Value::I64(record.delta),
        Value::from(record.name.as_str()),
        Value::Sequence(
            record.scores.iter().copied().map(Value::U16).collect(),
        ),
        Value::from(record.parent),
        Value::Array(record.flags.iter().copied().map(Value::Bool).collect()),
    ])
}

proptest! {
    #[test]
    fn record_roundtrip(record in record()) {
        let bytes = to_vec(&record).unwrap();
        prop_assert_eq!(from_slice::<Record>(&bytes).unwrap(), record);
    }

    #[test]
    fn static_and_dynamic_agree(record in record()) {
        let shape = Record::describe();
        let value = to_value(&record);

        let bytes = encode_value(&shape, &value).unwrap();
        prop_assert_eq!(&bytes, &to_vec(&record).unwrap());
        prop_assert_eq!(decode_value(&bytes, &shape).unwrap(), value);
    }

    #[test]
    fn encoding_is_deterministic(record in record()) {
        prop_assert_eq!(to_vec(&record).unwrap(), to_vec(&record.clone()).unwrap());
    }

    #[test]
    fn every_proper_prefix_is_eof(record in record()) {
        let bytes = to_vec(&record).unwrap();

        for len in 0..bytes.len() {
            let error = from_slice::<Record>(&bytes[..len]).unwrap_err();
            prop_assert!(error.is_eof(), "prefix {} gave {:?}", len, error);
        }
    }

    #[test]
    fn map_order_ignores_insertion_order(
        entries in prop::collection::btree_map(any::<i32>(), ".{0,8}", 0..24)
    ) {
        let forward: HashMap<i32, String> = entries.clone().into_iter().collect();
        let mut backward = HashMap::new();
        for (key, value) in entries.iter().rev() {
            backward.insert(*key, value.clone());
        }

        let bytes = to_vec(&forward).unwrap();
        prop_assert_eq!(&bytes, &to_vec(&backward).unwrap());
        prop_assert_eq!(&bytes, &to_vec(&entries).unwrap());

        let decoded = from_slice::<BTreeMap<i32, String>>(&bytes).unwrap();
        prop_assert_eq!(decoded, entries);
    }

    #[test]
    fn set_keys_are_sorted_by_encoding(
        keys in prop::collection::hash_set(any::<i16>(), 0..32)
    ) {
        let bytes = to_vec(&keys).unwrap();

        let encoded = keys
            .iter()
            .map(|key| to_vec(key).unwrap())
            .collect::<Vec<_>>();
        let mut sorted = encoded.clone();
        sorted.sort();

        let mut expected = to_vec(&u32::try_from(keys.len()).unwrap()).unwrap();
        expected.extend(sorted.into_iter().flatten());
        prop_assert_eq!(&bytes, &expected);

        prop_assert_eq!(from_slice::<HashSet<i16>>(&bytes).unwrap(), keys);
    }

    #[test]
    fn dynamic_map_matches_static_map(
        entries in prop::collection::hash_map(".{0,8}", any::<u8>(), 0..16)
    ) {
        let shape = HashMap::<String, u8>::describe();
        let value = Value::Map(
            entries
                .iter()
                .map(|(key, value)| (Value::from(key.as_str()), Value::U8(*value)))
                .collect(),
        );

        prop_assert_eq!(encode_value(&shape, &value).unwrap(), to_vec(&entries).unwrap());
    }

    #[test]
    fn arbitrary_input_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let shape = Shape::map(Shape::String, Shape::sequence(Shape::UInt(32)));

        let _ = decode_value(&bytes, &shape);
        let _ = from_slice::<Record>(&bytes);
    }
}
