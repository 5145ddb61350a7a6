#![allow(missing_docs)]

use std::{collections::HashMap, hint::black_box};

use borsh_wire::{
    Decode, Describe, Dispatcher, Encode, Value, from_slice, to_vec,
};

#[derive(Debug, Clone, PartialEq, Encode, Decode, Describe)]
pub struct Order {
    pub id: u64,
    pub customer: String,
    pub quantities: Vec<u32>,
    pub prices: HashMap<String, i64>,
    pub note: Option<String>,
}

fn order() -> Order {
    Order {
        id: 42,
        customer: "customer-0042".to_owned(),
        quantities: (0..64).collect(),
        prices: (0..32i64)
            .map(|index| (format!("sku-{index:03}"), index * 100))
            .collect(),
        note: Some("leave at the door".to_owned()),
    }
}

fn order_value(order: &Order) -> Value {
    Value::Record(vec![
        Value::U64(order.id),
        Value::from(order.customer.as_str()),
        Value::Sequence(
            order.quantities.iter().copied().map(Value::U32).collect(),
        ),
        Value::Map(
            order
                .prices
                .iter()
                .map(|(sku, price)| {
                    (Value::from(sku.as_str()), Value::I64(*price))
                })
                .collect(),
        ),
        Value::from(order.note.clone()),
    ])
}

fn bench_static_vs_dynamic(c: &mut criterion::Criterion) {
    let order = order();
    let value = order_value(&order);
    let shape = Order::describe();
    let bytes = to_vec(&order).unwrap();

    let dispatcher = Dispatcher::new();
    dispatcher.resolve(&shape).unwrap();

    let mut group = c.benchmark_group("static_vs_dynamic");

    group.bench_function("static_encode", |b| {
        b.iter(|| to_vec(black_box(&order)).unwrap());
    });
    group.bench_function("dynamic_encode", |b| {
        b.iter(|| dispatcher.encode(&shape, black_box(&value)).unwrap());
    });
    group.bench_function("static_decode", |b| {
        b.iter(|| from_slice::<Order>(black_box(&bytes)).unwrap());
    });
    group.bench_function("dynamic_decode", |b| {
        b.iter(|| {
            dispatcher.decode_exact(black_box(&bytes), &shape).unwrap()
        });
    });

    group.finish();
}

criterion::criterion_group!(benches, bench_static_vs_dynamic);
criterion::criterion_main!(benches);
