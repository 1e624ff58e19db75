//! Property-based tests covering the core round-trip guarantees across
//! generated value graphs and arbitrary input bytes.

use freezedry::{from_bytes, from_slice, to_bytes, to_vec, ErrorKind, Record, Value};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

fn roundtrip<T: Serialize + for<'de> Deserialize<'de> + PartialEq + std::fmt::Debug>(
    value: &T,
) -> bool {
    match to_vec(value) {
        Ok(bytes) => match from_slice::<T>(&bytes) {
            Ok(back) => *value == back,
            Err(e) => {
                eprintln!("Deserialize failed: {}", e);
                eprintln!("Encoded was: {:02X?}", bytes);
                false
            }
        },
        Err(e) => {
            eprintln!("Serialize failed: {}", e);
            false
        }
    }
}

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(Value::Undefined),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        any::<f64>().prop_map(Value::from),
        "[a-z0-9 ]{0,12}".prop_map(Value::from),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::array_buffer),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..6).prop_map(|fields| {
                let record: Record = fields.into_iter().collect();
                Value::object(record)
            }),
        ]
    })
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Item {
    id: u32,
    label: String,
    weight: Option<f32>,
    parts: Vec<u16>,
}

proptest! {
    #[test]
    fn prop_value_round_trip(value in arb_value()) {
        let bytes = to_bytes(&value).unwrap();
        let back = from_bytes(&bytes).unwrap();
        prop_assert_eq!(back, value);
    }

    #[test]
    fn prop_encoding_is_deterministic(value in arb_value()) {
        prop_assert_eq!(to_bytes(&value).unwrap(), to_bytes(&value).unwrap());
    }

    #[test]
    fn prop_truncation_is_rejected(value in arb_value()) {
        let bytes = to_bytes(&value).unwrap();
        let err = from_bytes(&bytes[..bytes.len() - 1]).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::CorruptStream);
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        if let Err(e) = from_bytes(&bytes) {
            prop_assert!(matches!(
                e.kind(),
                ErrorKind::CorruptStream | ErrorKind::Resource | ErrorKind::PlatformUnavailable
            ));
        }
    }

    #[test]
    fn prop_i64_in_safe_range(n in -(1i64 << 53)..(1i64 << 53)) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_u32(n in any::<u32>()) {
        prop_assert!(roundtrip(&n));
    }

    #[test]
    fn prop_string(s in ".{0,40}") {
        prop_assert!(roundtrip(&s));
    }

    #[test]
    fn prop_vec_of_options(v in prop::collection::vec(proptest::option::of(any::<i16>()), 0..20)) {
        prop_assert!(roundtrip(&v));
    }

    #[test]
    fn prop_struct(
        id in any::<u32>(),
        label in "[a-zA-Z ]{0,20}",
        weight in proptest::option::of(-1000.0f32..1000.0),
        parts in prop::collection::vec(any::<u16>(), 0..8),
    ) {
        let item = Item { id, label, weight, parts };
        prop_assert!(roundtrip(&item));
    }
}
