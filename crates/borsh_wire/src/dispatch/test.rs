#![allow(clippy::float_cmp)]

use super::*;

fn point() -> Shape {
    Shape::record("Point", [("x", Shape::Int(32)), ("y", Shape::Int(32))])
}

#[derive(Debug, Clone, Copy, Default)]
struct Uncached;

impl Config for Uncached {
    fn memoize_routines() -> bool { false }
}

// =============================================================================
// Wire layout
// =============================================================================

#[test]
fn scalar_layouts() {
    let dispatcher = Dispatcher::new();

    let cases = [
        (Shape::Bool, Value::Bool(true), vec![0x01_u8]),
        (Shape::UInt(16), Value::U16(257), vec![0x01, 0x01]),
        (Shape::Int(32), Value::I32(-1), vec![0xFF; 4]),
        (Shape::String, Value::from("hi"), vec![2, 0, 0, 0, 0x68, 0x69]),
        (Shape::optional(Shape::UInt(8)), Value::absent(), vec![0]),
        (Shape::tuple([]), Value::Record(Vec::new()), Vec::new()),
    ];

    for (shape, value, expected) in cases {
        let bytes = dispatcher.encode(&shape, &value).unwrap();
        assert_eq!(bytes, expected, "encoding {value:?} as {shape}");

        let decoded = dispatcher.decode_exact(&bytes, &shape).unwrap();
        assert_eq!(decoded, value, "decoding {shape}");
    }
}

#[test]
fn record_roundtrip() {
    let dispatcher = Dispatcher::new();
    let value = Value::Record(vec![Value::I32(3), Value::I32(-4)]);

    let bytes = dispatcher.encode(&point(), &value).unwrap();
    assert_eq!(bytes, [3, 0, 0, 0, 0xFC, 0xFF, 0xFF, 0xFF]);
    assert_eq!(dispatcher.decode(&bytes, &point()).unwrap(), value);
}

#[test]
fn nested_composites_roundtrip() {
    let dispatcher = Dispatcher::new();
    let shape = Shape::sequence(Shape::optional(Shape::fixed_array(
        Shape::Float(64),
        2,
    )));
    let value = Value::Sequence(vec![
        Value::present(Value::Array(vec![Value::F64(1.5), Value::F64(-0.0)])),
        Value::absent(),
    ]);

    let bytes = dispatcher.encode(&shape, &value).unwrap();
    assert_eq!(bytes.len(), 4 + (1 + 16) + 1);
    assert_eq!(dispatcher.decode_exact(&bytes, &shape).unwrap(), value);
}

#[test]
fn map_is_written_in_canonical_order() {
    let dispatcher = Dispatcher::new();
    let shape = Shape::map(Shape::UInt(8), Shape::String);
    let forward = Value::Map(vec![
        (Value::U8(1), Value::from("a")),
        (Value::U8(2), Value::from("b")),
    ]);
    let backward = Value::Map(vec![
        (Value::U8(2), Value::from("b")),
        (Value::U8(1), Value::from("a")),
    ]);

    let bytes = dispatcher.encode(&shape, &backward).unwrap();
    assert_eq!(bytes, dispatcher.encode(&shape, &forward).unwrap());
    assert_eq!(bytes, [2, 0, 0, 0, 1, 1, 0, 0, 0, b'a', 2, 1, 0, 0, 0, b'b']);

    // decoding keeps wire order
    assert_eq!(dispatcher.decode(&bytes, &shape).unwrap(), forward);
}

#[test]
fn set_is_written_in_canonical_order() {
    let dispatcher = Dispatcher::new();
    let shape = Shape::set(Shape::String);
    let value = Value::Set(vec![Value::from("aaa"), Value::from("zz")]);

    let bytes = dispatcher.encode(&shape, &value).unwrap();

    // the shorter length prefix sorts first
    assert_eq!(
        bytes,
        [
            2, 0, 0, 0, //
            2, 0, 0, 0, b'z', b'z', //
            3, 0, 0, 0, b'a', b'a', b'a',
        ]
    );
}

#[test]
fn trailing_bytes_only_fail_exact_decode() {
    let dispatcher = Dispatcher::new();
    let bytes = [7, 0xAA];

    assert_eq!(
        dispatcher.decode(&bytes, &Shape::UInt(8)).unwrap(),
        Value::U8(7)
    );
    assert_eq!(
        dispatcher.decode_exact(&bytes, &Shape::UInt(8)).unwrap_err(),
        Error::TrailingBytes { remaining: 1 }
    );
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn unsupported_shapes_fail_before_reading() {
    let dispatcher = Dispatcher::new();
    let shapes = [
        Shape::UInt(128),
        Shape::Int(128),
        Shape::UInt(24),
        Shape::Float(16),
        Shape::variant("Message", ["Quit", "Move"]),
        Shape::sequence(Shape::map(Shape::String, Shape::Int(128))),
        Shape::record("Wrapper", [("inner", Shape::UInt(128))]),
    ];

    for shape in shapes {
        // empty input: a read would have produced `UnexpectedEof`
        let error = dispatcher.decode(&[], &shape).unwrap_err();
        assert!(
            matches!(error, Error::UnsupportedType(_)),
            "{shape} gave {error:?}"
        );

        let error = dispatcher.encode(&shape, &Value::U8(0)).unwrap_err();
        assert!(matches!(error, Error::UnsupportedType(_)));
    }

    assert_eq!(dispatcher.cached_shapes(), 0);
}

#[test]
fn unsupported_message_names_the_construct() {
    let error = Dispatcher::new().resolve(&Shape::UInt(128)).unwrap_err();
    let Error::UnsupportedType(message) = error else {
        panic!("expected an unsupported type error");
    };
    assert!(message.contains("u128"), "{message}");

    let error = Dispatcher::new()
        .resolve(&Shape::variant("Message", ["Quit"]))
        .unwrap_err();
    assert!(error.to_string().contains("Message"));
}

#[test]
fn value_kind_mismatch() {
    let dispatcher = Dispatcher::new();

    assert_eq!(
        dispatcher.encode(&Shape::UInt(8), &Value::from("x")).unwrap_err(),
        Error::ShapeMismatch {
            expected: "u8".to_owned(),
            found: "string".to_owned(),
        }
    );
    assert!(matches!(
        dispatcher.encode(&Shape::UInt(8), &Value::U16(1)),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn structural_mismatch() {
    let dispatcher = Dispatcher::new();

    let short = Value::Record(vec![Value::I32(1)]);
    assert!(matches!(
        dispatcher.encode(&point(), &short),
        Err(Error::ShapeMismatch { .. })
    ));

    let shape = Shape::fixed_array(Shape::Bool, 2);
    let value = Value::Array(vec![Value::Bool(true)]);
    assert!(matches!(
        dispatcher.encode(&shape, &value),
        Err(Error::ShapeMismatch { .. })
    ));

    // a sequence value does not satisfy a fixed array shape
    let value = Value::Sequence(vec![Value::Bool(true), Value::Bool(false)]);
    assert!(matches!(
        dispatcher.encode(&shape, &value),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn implausible_count_is_eof() {
    let dispatcher = Dispatcher::new();
    let mut bytes = vec![3, 0, 0, 0];
    bytes.extend_from_slice(&[0; 8]);

    assert_eq!(
        dispatcher
            .decode(&bytes, &Shape::sequence(Shape::UInt(64)))
            .unwrap_err(),
        Error::UnexpectedEof { needed: 24, remaining: 8 }
    );

    // u32::MAX pairs over an empty remainder
    let bytes = [0xFF; 4];
    let shape = Shape::map(Shape::UInt(32), Shape::UInt(32));
    assert!(dispatcher.decode(&bytes, &shape).unwrap_err().is_eof());
}

#[test]
fn zero_sized_elements_are_rejected() {
    let dispatcher = Dispatcher::new();
    let empty = Shape::record("Empty", Vec::<(&str, Shape)>::new());
    let shapes = [
        Shape::sequence(empty.clone()),
        Shape::set(Shape::fixed_array(Shape::UInt(8), 0)),
        Shape::map(empty.clone(), Shape::tuple([empty.clone()])),
        Shape::optional(Shape::sequence(empty.clone())),
    ];

    // u32::MAX elements that would each consume nothing
    for shape in shapes {
        let error = dispatcher.decode(&[0xFF; 4], &shape).unwrap_err();
        assert!(
            matches!(error, Error::UnsupportedType(_)),
            "{shape} gave {error:?}"
        );
    }
    assert_eq!(dispatcher.cached_shapes(), 0);

    let error =
        dispatcher.resolve(&Shape::sequence(empty.clone())).unwrap_err();
    assert!(error.to_string().contains("zero-sized"), "{error}");

    // a zero-width key or value alone still consumes input per entry
    let shape = Shape::map(empty, Shape::UInt(8));
    let bytes = [1, 0, 0, 0, 7];
    assert_eq!(
        dispatcher.decode_exact(&bytes, &shape).unwrap(),
        Value::Map(vec![(Value::Record(Vec::new()), Value::U8(7))])
    );
}

#[test]
fn truncated_input_is_eof() {
    let dispatcher = Dispatcher::new();
    let value = Value::Record(vec![Value::I32(3), Value::I32(-4)]);
    let bytes = dispatcher.encode(&point(), &value).unwrap();

    for len in 0..bytes.len() {
        let error = dispatcher.decode(&bytes[..len], &point()).unwrap_err();
        assert!(error.is_eof(), "prefix of length {len} gave {error:?}");
    }
}

#[test]
fn nonzero_bytes_decode_as_true_and_present() {
    let dispatcher = Dispatcher::new();

    assert_eq!(
        dispatcher.decode(&[0x05], &Shape::Bool).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        dispatcher
            .decode(&[0x02, 0x09], &Shape::optional(Shape::UInt(8)))
            .unwrap(),
        Value::present(Value::U8(9))
    );
}

// =============================================================================
// Memoization
// =============================================================================

#[test]
fn routines_are_memoized_per_shape() {
    let dispatcher = Dispatcher::new();
    let shape = Shape::sequence(Shape::UInt(16));

    let first = dispatcher.resolve(&shape).unwrap();
    // the sequence and its element
    assert_eq!(dispatcher.cached_shapes(), 2);

    let second = dispatcher.resolve(&shape).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(dispatcher.cached_shapes(), 2);

    dispatcher.resolve(&Shape::UInt(16)).unwrap();
    assert_eq!(dispatcher.cached_shapes(), 2);

    dispatcher.clear();
    assert_eq!(dispatcher.cached_shapes(), 0);

    let third = dispatcher.resolve(&shape).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.shape(), &shape);
}

#[test]
fn memoization_can_be_disabled() {
    let dispatcher = Dispatcher::<Uncached>::with_config();
    let shape = point();

    let first = dispatcher.resolve(&shape).unwrap();
    let second = dispatcher.resolve(&shape).unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(dispatcher.cached_shapes(), 0);
}

#[test]
fn routines_are_shared_across_threads() {
    let dispatcher = Dispatcher::new();
    let shape = Shape::map(Shape::String, Shape::sequence(Shape::Bool));

    let routines = std::thread::scope(|scope| {
        let handles = (0..8)
            .map(|_| scope.spawn(|| dispatcher.resolve(&shape).unwrap()))
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    for routine in &routines[1..] {
        assert!(Arc::ptr_eq(&routines[0], routine));
    }
    assert_eq!(dispatcher.cached_shapes(), 4);
}
