use freezedry::{to_bytes, value, Record, Value};

#[test]
fn test_value_macro_null_and_undefined() {
    assert_eq!(value!(null), Value::Null);
    assert!(value!(undefined).is_undefined());
}

#[test]
fn test_value_macro_booleans() {
    assert_eq!(value!(true), Value::Bool(true));
    assert_eq!(value!(false), Value::Bool(false));
}

#[test]
fn test_value_macro_numbers() {
    assert_eq!(value!(42), Value::Number(42.0));
    assert_eq!(value!(3.5), Value::Number(3.5));
    assert_eq!(value!(-123), Value::Number(-123.0));
    assert_eq!(value!(u32::MAX), Value::Number(4_294_967_295.0));
}

#[test]
fn test_value_macro_strings() {
    assert_eq!(value!("hello world"), Value::from("hello world"));
    assert_eq!(value!(""), Value::from(""));
    assert_eq!(value!(String::from("owned")).as_str(), Some("owned"));
}

#[test]
fn test_value_macro_arrays() {
    assert_eq!(value!([]), Value::array(vec![]));

    assert_eq!(
        value!([1, 2, 3]),
        Value::array(vec![Value::from(1), Value::from(2), Value::from(3)])
    );

    assert_eq!(
        value!([1, "hello", true, null, -2]),
        Value::array(vec![
            Value::from(1),
            Value::from("hello"),
            Value::Bool(true),
            Value::Null,
            Value::from(-2),
        ])
    );
}

#[test]
fn test_value_macro_objects() {
    assert_eq!(value!({}), Value::object(Record::new()));

    let simple = value!({
        "name": "Alice",
        "age": 30
    });

    let record = simple.as_object().unwrap().borrow();
    assert_eq!(record.len(), 2);
    assert_eq!(record.get("name"), Some(&Value::from("Alice")));
    assert_eq!(record.get("age"), Some(&Value::from(30)));
}

#[test]
fn test_value_macro_nested() {
    let nested = value!({
        "user": {
            "id": 123,
            "name": "Bob",
            "active": true
        },
        "tags": ["admin", "developer"],
        "count": 42
    });

    let user = nested.get("user").unwrap();
    assert!(user.is_object());
    assert_eq!(user.get("id"), Some(Value::from(123)));
    assert_eq!(user.get("name"), Some(Value::from("Bob")));
    assert_eq!(user.get("active"), Some(Value::Bool(true)));

    let tags = nested.get("tags").unwrap();
    assert!(tags.is_array());
    assert_eq!(tags.get_index(0), Some(Value::from("admin")));
    assert_eq!(tags.get_index(1), Some(Value::from("developer")));
    assert_eq!(tags.get_index(2), None);

    assert_eq!(nested.get("count"), Some(Value::from(42)));
}

#[test]
fn test_value_macro_embeds_existing_values() {
    let shared = value!({ "id": 1 });
    let graph = value!([(shared.clone()), (shared.clone())]);

    let first = graph.get_index(0).unwrap();
    let second = graph.get_index(1).unwrap();
    assert!(Value::ptr_eq(&first, &second));
    assert!(Value::ptr_eq(&first, &shared));
}

#[test]
fn test_value_methods() {
    let null_val = value!(null);
    assert!(null_val.is_null());
    assert!(!null_val.is_bool());
    assert!(!null_val.is_number());
    assert!(!null_val.is_string());
    assert!(!null_val.is_array());
    assert!(!null_val.is_object());

    let bool_val = value!(true);
    assert!(bool_val.is_bool());
    assert_eq!(bool_val.as_bool(), Some(true));

    let str_val = value!("hello");
    assert!(str_val.is_string());
    assert_eq!(str_val.as_str(), Some("hello"));

    let array_val = value!([1, 2, 3]);
    assert_eq!(array_val.as_array().unwrap().borrow().len(), 3);

    let obj_val = value!({ "key": "value" });
    assert_eq!(obj_val.as_object().unwrap().borrow().len(), 1);
}

#[test]
fn test_macro_output_encodes() {
    let value = value!({ "a": 1, "b": [1, 2, 3], "c": null });
    assert_eq!(
        to_bytes(&value).unwrap(),
        [
            0x1A, 0x11, 0x01, 0x61, 0x03, 0x01, 0x01, 0x62, 0x19, 0x06, 0x03, 0x01, 0x03, 0x02,
            0x03, 0x03, 0x01, 0x63, 0x00
        ]
    );
}
