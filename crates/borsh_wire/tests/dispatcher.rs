#![allow(missing_docs)]

use std::{sync::Arc, thread};

use borsh_wire::{Dispatcher, Error, Shape, Value};
use tracing_test::traced_test;

fn ledger_shape() -> Shape {
    Shape::record(
        "Ledger",
        [
            ("entries", Shape::map(Shape::String, Shape::Int(64))),
            ("closed", Shape::Bool),
        ],
    )
}

fn ledger(entries: &[(&str, i64)]) -> Value {
    Value::Record(vec![
        Value::Map(
            entries
                .iter()
                .map(|(key, value)| (Value::from(*key), Value::I64(*value)))
                .collect(),
        ),
        Value::Bool(false),
    ])
}

#[test]
#[traced_test]
fn logs_resolution_and_cache_hits() {
    let dispatcher = Dispatcher::new();
    let shape = ledger_shape();

    dispatcher.resolve(&shape).unwrap();
    assert!(logs_contain("resolved and memoized routine"));

    dispatcher.resolve(&shape).unwrap();
    assert!(logs_contain("routine cache hit"));
}

#[test]
#[traced_test]
fn logs_rejected_shapes() {
    let dispatcher = Dispatcher::new();
    let shape = Shape::sequence(Shape::UInt(128));

    let error = dispatcher.resolve(&shape).unwrap_err();

    assert!(matches!(error, Error::UnsupportedType(_)));
    assert!(logs_contain("rejected shape"));
}

#[test]
fn concurrent_encoders_share_routines() {
    let dispatcher = Arc::new(Dispatcher::new());
    let shape = Arc::new(ledger_shape());

    let handles = (0..8i64)
        .map(|worker| {
            let dispatcher = Arc::clone(&dispatcher);
            let shape = Arc::clone(&shape);

            thread::spawn(move || {
                let value = ledger(&[("b", worker), ("a", -worker)]);
                let bytes = dispatcher.encode(&shape, &value).unwrap();
                let decoded = dispatcher.decode_exact(&bytes, &shape).unwrap();

                (bytes, decoded)
            })
        })
        .collect::<Vec<_>>();

    for (worker, handle) in (0..8i64).zip(handles) {
        let (bytes, decoded) = handle.join().unwrap();

        // canonical order puts "a" first regardless of input order
        assert_eq!(decoded, ledger(&[("a", -worker), ("b", worker)]));
        assert_eq!(bytes.len(), 4 + 2 * (4 + 1 + 8) + 1);
    }

    // record, map, string, i64 and bool
    assert_eq!(dispatcher.cached_shapes(), 5);
}

#[test]
fn global_dispatcher_is_shared() {
    let first = Dispatcher::global();
    let second = Dispatcher::global();
    assert!(std::ptr::eq(first, second));

    let shape = Shape::fixed_array(Shape::UInt(8), 2);
    let value = Value::Array(vec![Value::U8(1), Value::U8(2)]);
    assert_eq!(first.encode(&shape, &value).unwrap(), [1, 2]);
}
