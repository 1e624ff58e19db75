//! Teaching the codec about your own types.
//!
//! Run with: cargo run --example host_types

use freezedry::{value, Codec, TypeRegistry, Value};
use std::error::Error;
use std::sync::Arc;

struct Point {
    x: f64,
    y: f64,
}

struct Celsius(f64);

fn main() -> Result<(), Box<dyn Error>> {
    let mut registry = TypeRegistry::new();
    registry
        .register::<Point>("Point", |p| Ok(value!({ "x": (p.x), "y": (p.y) })))
        .register_capability(
            "temperature",
            |any| any.is::<Celsius>(),
            |any| {
                let celsius = any.downcast_ref::<Celsius>().map_or(0.0, |c| c.0);
                Ok(value!({ "celsius": celsius }))
            },
        );
    let codec = Codec::new().with_registry(Arc::new(registry));

    let origin = Value::host(Point { x: 0.0, y: 0.0 });
    let reading = Value::host(Celsius(21.5));
    let graph = Value::array(vec![origin.clone(), origin, reading]);

    let bytes = codec.encode(&graph)?;
    println!("Encoded {} bytes: {:02X?}", bytes.len(), bytes);

    let back = codec.decode(&bytes)?;
    println!("Decoded: {:?}", back);

    let first = back.get_index(0).ok_or("missing point")?;
    let second = back.get_index(1).ok_or("missing point")?;
    assert!(Value::ptr_eq(&first, &second));
    println!("✓ The same host object decodes to one shared record");

    Ok(())
}
