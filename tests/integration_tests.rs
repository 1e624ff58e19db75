use chrono::DateTime;
use freezedry::{
    from_bytes, from_bytes_with_options, from_slice, from_value, to_bytes, to_bytes_async,
    to_bytes_with_options, to_value, to_vec, value, Bitmap, Blob, BlobError, BlobSource, Codec,
    CodecOptions, ErrorKind, Pattern, PixelArray, RawPixels, Record, TypeRegistry, TypedView,
    Value, ValueMap, ValueSet, ViewKind,
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::sync::Arc;

fn round_trip(value: &Value) -> Value {
    let bytes = to_bytes(value).unwrap();
    from_bytes(&bytes).unwrap()
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct User {
    id: u32,
    name: String,
    active: bool,
    tags: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Product {
    sku: String,
    price: f64,
    quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Order {
    order_id: u32,
    customer: User,
    items: Vec<Product>,
    note: Option<String>,
}

#[test]
fn test_primitives_round_trip() {
    for value in [
        Value::Undefined,
        Value::Null,
        Value::from(true),
        Value::from(false),
        Value::from(0),
        Value::from(1),
        Value::from(-1),
        Value::from(4_294_967_295u32),
        Value::from(-4_294_967_295i64),
        Value::from(4_294_967_296u64),
        Value::from(0.1),
        Value::from(-1e300),
        Value::from(f64::INFINITY),
        Value::from(f64::NEG_INFINITY),
        Value::from(""),
        Value::from("héllo wörld"),
    ] {
        assert_eq!(round_trip(&value), value, "{value:?}");
    }
}

#[test]
fn test_nan_round_trips() {
    let back = round_trip(&Value::from(f64::NAN));
    assert!(back.as_f64().unwrap().is_nan());
}

#[test]
fn test_integer_and_float_boundaries() {
    assert_eq!(
        to_bytes(&Value::from(4_294_967_295u32)).unwrap(),
        [0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F]
    );
    assert_eq!(to_bytes(&Value::from(4_294_967_296u64)).unwrap()[0], 0x02);
    assert_eq!(to_bytes(&Value::from(1.5)).unwrap()[0], 0x02);
    assert_eq!(to_bytes(&Value::from(-0.0)).unwrap(), [0x03, 0x00]);
}

#[test]
fn test_nested_containers() {
    let value = value!({
        "list": [1, "two", [3.5, null], {}],
        "flag": false,
        "nothing": undefined,
        "nested": { "deeper": { "deepest": [] } },
    });
    assert_eq!(round_trip(&value), value);
}

#[test]
fn test_object_key_order_is_kept() {
    let value = value!({ "z": 1, "a": 2, "m": 3 });
    let back = round_trip(&value);
    let keys: Vec<String> = back.as_object().unwrap().borrow().keys().cloned().collect();
    assert_eq!(keys, ["z", "a", "m"]);
}

#[test]
fn test_maps_and_sets() {
    let mut map = ValueMap::new();
    map.insert(Value::from(1), Value::from("one"));
    map.insert(Value::from("1"), Value::from("string one"));
    map.insert(value!([1]), Value::Null);
    let map = Value::map(map);

    let mut set = ValueSet::new();
    set.insert(Value::from("a"));
    set.insert(Value::from(2));
    let set = Value::set(set);

    let value = Value::array(vec![map.clone(), set.clone()]);
    let back = round_trip(&value);
    assert_eq!(back, value);

    let back_map = back.get_index(0).unwrap();
    let back_map = back_map.as_map().unwrap().borrow();
    assert_eq!(back_map.len(), 3);
    assert_eq!(back_map.get(&Value::from(1)), Some(&Value::from("one")));
    assert_eq!(
        back_map.get(&Value::from("1")),
        Some(&Value::from("string one"))
    );
}

#[test]
fn test_shared_references_are_preserved() {
    let shared = value!({ "name": "Alice" });
    let graph = value!({ "first": (shared.clone()), "second": (shared.clone()) });
    let back = round_trip(&graph);

    let first = back.get("first").unwrap();
    let second = back.get("second").unwrap();
    assert!(Value::ptr_eq(&first, &second));
    assert_eq!(first, shared);
}

#[test]
fn test_shared_reference_layout() {
    let shared = value!({ "name": "Alice" });
    let graph = Value::array(vec![shared.clone(), shared]);
    assert_eq!(
        to_bytes(&graph).unwrap(),
        [
            0x19, 0x10, 0x1A, 0x0C, 0x04, b'n', b'a', b'm', b'e', 0x09, 0x05, b'A', b'l', b'i',
            b'c', b'e', 0x07, 0x01
        ]
    );
}

#[test]
fn test_repeated_strings_are_written_once() {
    let text = "a fairly long repeated string";
    let single = to_bytes(&value!([text])).unwrap();
    let repeated = to_bytes(&value!([text, text, text])).unwrap();
    assert_eq!(repeated.len(), single.len() + 4);
}

#[test]
fn test_cycles_round_trip() {
    let record = Value::object(Record::new());
    if let Value::Object(inner) = &record {
        inner.borrow_mut().insert("self", record.clone());
        inner.borrow_mut().insert("id", Value::from(7));
    }

    let back = round_trip(&record);
    let inner = back.get("self").unwrap();
    assert!(Value::ptr_eq(&back, &inner));
    assert_eq!(back.get("id"), Some(Value::from(7)));
}

#[test]
fn test_cyclic_array_through_map() {
    let list = Value::array(vec![]);
    let mut map = ValueMap::new();
    map.insert(Value::from("list"), list.clone());
    let map = Value::map(map);
    if let Value::Array(items) = &list {
        items.borrow_mut().push(map.clone());
    }

    let back = round_trip(&list);
    let back_map = back.get_index(0).unwrap();
    let again = back_map
        .as_map()
        .unwrap()
        .borrow()
        .get(&Value::from("list"))
        .cloned()
        .unwrap();
    assert!(Value::ptr_eq(&back, &again));
}

#[test]
fn test_dates_and_patterns() {
    let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
    let pattern = Pattern::new("^a+b?$", "gi").unwrap();
    let value = value!([(Value::date(at)), (Value::pattern(pattern))]);

    let back = round_trip(&value);
    assert_eq!(back.get_index(0).unwrap().as_date(), Some(&at));
    let back_pattern = back.get_index(1).unwrap();
    let back_pattern = back_pattern.as_pattern().unwrap();
    assert_eq!(back_pattern.source(), "^a+b?$");
    assert_eq!(back_pattern.flags(), "gi");
}

#[test]
fn test_dates_keep_whole_milliseconds() {
    let at = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
    let value = Value::date(at);
    assert_eq!(value.as_date().unwrap().timestamp_subsec_nanos(), 123_000_000);

    let back = round_trip(&value);
    assert_eq!(back, value);
    assert_eq!(back.as_date().unwrap().timestamp_millis(), 1_700_000_000_123);
    assert_eq!(Value::from(at), value);
}

#[test]
fn test_view_past_shrunk_buffer_is_rejected() {
    let storage = Value::array_buffer(vec![0; 8]);
    let storage = storage.as_array_buffer().unwrap().clone();
    let view = TypedView::over(ViewKind::Uint8, storage.clone()).unwrap();
    let value = Value::view(view.clone());
    storage.borrow_mut().truncate(2);

    assert_eq!(view.to_bytes(), None);
    assert_eq!(to_bytes(&value).unwrap_err().kind(), ErrorKind::UnsupportedValue);
    assert!(to_value(&value).is_err());
}

#[test]
fn test_buffers_and_views_share_storage() {
    let buffer = Value::array_buffer(vec![1, 0, 2, 0, 3, 0, 4, 0]);
    let storage = buffer.as_array_buffer().unwrap().clone();
    let words = TypedView::new(ViewKind::Uint16, storage.clone(), 2, 3).unwrap();
    let bytes = TypedView::over(ViewKind::Uint8, storage).unwrap();
    let value = value!([(buffer.clone()), words, bytes]);

    let back = round_trip(&value);
    assert_eq!(back, value);

    let back_buffer = back.get_index(0).unwrap();
    let back_words = back.get_index(1).unwrap();
    let back_words = back_words.as_view().unwrap();
    assert_eq!(back_words.kind(), ViewKind::Uint16);
    assert_eq!(back_words.byte_offset(), 2);
    assert_eq!(back_words.len(), 3);
    assert_eq!(back_words.get(2), Some(4.0));
    assert!(Rc::ptr_eq(
        back_buffer.as_array_buffer().unwrap(),
        back_words.buffer()
    ));
}

#[test]
fn test_blobs_and_files() {
    let blob = Blob::from_bytes("text/plain", b"hello".to_vec());
    let file = Blob::from_bytes("application/json", b"{}".to_vec()).with_file("a.json", 1_234);
    let value = value!([blob, file]);

    let back = round_trip(&value);
    let back_blob = back.get_index(0).unwrap();
    let back_blob = back_blob.as_blob().unwrap();
    assert_eq!(back_blob.mime_type(), "text/plain");
    assert_eq!(back_blob.bytes(), Some(&b"hello"[..]));
    assert!(back_blob.file().is_none());

    let back_file = back.get_index(1).unwrap();
    let back_file = back_file.as_blob().unwrap();
    let info = back_file.file().unwrap();
    assert_eq!(info.name, "a.json");
    assert_eq!(info.last_modified, 1_234);
    assert_eq!(back_file.size(), 2);
}

struct SlowSource(Vec<u8>);

#[async_trait::async_trait(?Send)]
impl BlobSource for SlowSource {
    fn size(&self) -> u64 {
        self.0.len() as u64
    }

    async fn read_all_bytes(&self) -> Result<Vec<u8>, BlobError> {
        tokio::task::yield_now().await;
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn test_async_blob_contents() {
    let blob = Value::blob(Blob::new("image/png", Rc::new(SlowSource(vec![9, 8, 7]))));
    assert_eq!(
        to_bytes(&blob).unwrap_err().kind(),
        ErrorKind::UnsupportedValue
    );

    let bytes = to_bytes_async(&blob).await.unwrap();
    let back = from_bytes(&bytes).unwrap();
    assert_eq!(back.as_blob().unwrap().bytes(), Some(&[9u8, 8, 7][..]));
}

#[test]
fn test_image_data_and_bitmaps() {
    let pixels = PixelArray::new(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    let image = Value::image_data(pixels.clone());
    assert_eq!(round_trip(&image), image);

    let bitmap = Value::bitmap(Bitmap::new(pixels.clone()));
    assert_eq!(
        to_bytes(&bitmap).unwrap_err().kind(),
        ErrorKind::PlatformUnavailable
    );

    let options = CodecOptions::new().with_pixel_codec(RawPixels);
    let bytes = to_bytes_with_options(&bitmap, &options).unwrap();
    assert_eq!(
        from_bytes(&bytes).unwrap_err().kind(),
        ErrorKind::PlatformUnavailable
    );
    let back = from_bytes_with_options(&bytes, &options).unwrap();
    assert_eq!(
        back.as_bitmap().unwrap().downcast_ref::<PixelArray>(),
        Some(&pixels)
    );
}

#[test]
fn test_functions_are_rejected() {
    let value = value!({ "callback": (Value::function("on_click", |_| Value::Null)) });
    let err = to_bytes(&value).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
    assert!(err.to_string().contains("on_click"));
}

#[test]
fn test_truncated_streams_fail() {
    let value = value!({ "a": [1, 2, "three"], "b": 4.5 });
    let bytes = to_bytes(&value).unwrap();
    for end in 0..bytes.len() {
        let err = from_bytes(&bytes[..end]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptStream, "prefix of {end} bytes");
    }
}

#[test]
fn test_trailing_bytes_fail() {
    let err = from_bytes(&[0x00, 0x00]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptStream);
}

#[test]
fn test_unknown_tag_fails() {
    let err = from_bytes(&[0x1E]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptStream);
}

#[test]
fn test_invalid_reference_fails() {
    // An array holding a reference to index 5, which was never registered.
    let err = from_bytes(&[0x19, 0x02, 0x07, 0x05]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptStream);
}

#[test]
fn test_invalid_pattern_fails() {
    let err = from_bytes(&[0x0A, 0x03, b'a', b'b', b'c']).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptStream);
}

#[test]
fn test_depth_limits() {
    let mut value = value!([]);
    for _ in 0..10 {
        value = Value::array(vec![value]);
    }
    let shallow = CodecOptions::new().with_max_depth(5);
    assert_eq!(
        to_bytes_with_options(&value, &shallow).unwrap_err().kind(),
        ErrorKind::Resource
    );

    let bytes = to_bytes(&value).unwrap();
    assert_eq!(
        from_bytes_with_options(&bytes, &shallow).unwrap_err().kind(),
        ErrorKind::Resource
    );
    assert_eq!(from_bytes(&bytes).unwrap(), value);
}

struct Point {
    x: f64,
    y: f64,
}

struct Celsius(f64);

#[test]
fn test_host_types_by_exact_type() {
    let mut registry = TypeRegistry::new();
    registry.register::<Point>("Point", |p| Ok(value!({ "x": (p.x), "y": (p.y) })));
    let codec = Codec::new().with_registry(Arc::new(registry));

    let point = Value::host(Point { x: 1.5, y: -2.0 });
    let graph = Value::array(vec![point.clone(), point]);
    let back = codec.decode(&codec.encode(&graph).unwrap()).unwrap();

    let first = back.get_index(0).unwrap();
    let second = back.get_index(1).unwrap();
    assert_eq!(first, value!({ "x": 1.5, "y": -2 }));
    assert!(Value::ptr_eq(&first, &second));
}

#[test]
fn test_host_types_by_capability() {
    let mut registry = TypeRegistry::new();
    registry.register_capability(
        "temperature",
        |any| any.is::<Celsius>(),
        |any| {
            let celsius = any.downcast_ref::<Celsius>().map_or(0.0, |c| c.0);
            Ok(value!({ "celsius": celsius }))
        },
    );
    let codec = Codec::new().with_registry(Arc::new(registry));

    let bytes = codec.encode(&Value::host(Celsius(21.5))).unwrap();
    assert_eq!(codec.decode(&bytes).unwrap(), value!({ "celsius": 21.5 }));
}

struct Handle(Value);

#[test]
fn test_host_lowering_to_seen_value_keeps_identity() {
    let mut registry = TypeRegistry::new();
    registry.register::<Handle>("Handle", |h| Ok(h.0.clone()));
    let codec = Codec::new().with_registry(Arc::new(registry));

    let shared = value!({ "id": 1 });
    let other = value!([1, 2]);
    let host = Value::host(Handle(shared.clone()));
    let graph = Value::array(vec![shared, host.clone(), other.clone(), other, host]);
    let back = codec.decode(&codec.encode(&graph).unwrap()).unwrap();

    let first = back.get_index(0).unwrap();
    assert!(Value::ptr_eq(&first, &back.get_index(1).unwrap()));
    assert!(Value::ptr_eq(&first, &back.get_index(4).unwrap()));
    assert!(Value::ptr_eq(
        &back.get_index(2).unwrap(),
        &back.get_index(3).unwrap()
    ));
    assert_eq!(back.get_index(2).unwrap(), value!([1, 2]));
}

#[test]
fn test_host_lowering_to_primitive_fails() {
    let mut registry = TypeRegistry::new();
    registry.register::<Celsius>("Celsius", |c| Ok(Value::from(c.0)));
    let codec = Codec::new().with_registry(Arc::new(registry));

    let err = codec.encode(&Value::host(Celsius(1.0))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
}

#[test]
fn test_unregistered_host_type_fails() {
    let err = to_bytes(&Value::host(Point { x: 0.0, y: 0.0 })).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
}

#[test]
fn test_serde_nested_struct() {
    let order = Order {
        order_id: 12345,
        customer: User {
            id: 123,
            name: "Alice".to_string(),
            active: true,
            tags: vec!["vip".to_string()],
        },
        items: vec![
            Product {
                sku: "A-1".to_string(),
                price: 9.99,
                quantity: 2,
            },
            Product {
                sku: "B-2".to_string(),
                price: 14.5,
                quantity: 1,
            },
        ],
        note: None,
    };

    let bytes = to_vec(&order).unwrap();
    let back: Order = from_slice(&bytes).unwrap();
    assert_eq!(order, back);
}

#[test]
fn test_serde_value_bridge() {
    let user = User {
        id: 1,
        name: "Bob".to_string(),
        active: false,
        tags: vec![],
    };
    let value = to_value(&user).unwrap();
    assert_eq!(
        value,
        value!({ "id": 1, "name": "Bob", "active": false, "tags": [] })
    );
    let back: User = from_value(&value).unwrap();
    assert_eq!(user, back);
}

#[test]
fn test_debug_output_marks_cycles() {
    let list = Value::array(vec![]);
    if let Value::Array(items) = &list {
        items.borrow_mut().push(list.clone());
    }
    assert!(format!("{list:?}").contains("[Circular]"));
}
