//! # freezedry
//!
//! A compact binary codec for dynamic value graphs, in the spirit of the
//! structured-clone algorithm.
//!
//! ## What does it encode?
//!
//! A [`Value`] is a dynamically typed graph: primitives, strings, dates,
//! regular-expression patterns, arrays, objects, maps, sets, binary
//! buffers and typed views over them, blobs and files, pixel arrays and
//! bitmaps. Containers are reference counted, so a graph may share nodes or
//! contain cycles. Encoding preserves both: a node reachable along several
//! paths is written once and referenced afterwards, and decoding rebuilds
//! the same topology.
//!
//! ## Key Features
//!
//! - **Compact**: one tag byte per node, LEB128 varints for lengths and
//!   small integers, repeated strings written once
//! - **Identity preserving**: shared and cyclic references survive a round trip
//! - **Strict decoding**: truncated, trailing or inconsistent input is rejected
//!   with a categorized [`Error`]
//! - **Extensible**: host types lower themselves to built-in values through a
//!   [`TypeRegistry`]
//! - **Serde bridge**: any `T: Serialize` can be turned into a [`Value`] and back
//!
//! ## Quick Start
//!
//! ```rust
//! use freezedry::{from_bytes, to_bytes, value, Value};
//!
//! let shared = value!({ "name": "Alice" });
//! let graph = Value::array(vec![shared.clone(), shared]);
//!
//! let bytes = to_bytes(&graph).unwrap();
//! let back = from_bytes(&bytes).unwrap();
//!
//! assert_eq!(back, graph);
//! let (a, b) = (back.get_index(0).unwrap(), back.get_index(1).unwrap());
//! assert!(Value::ptr_eq(&a, &b));
//! ```
//!
//! ### Rust types through serde
//!
//! ```rust
//! use freezedry::{from_slice, to_vec};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     id: u32,
//!     name: String,
//! }
//!
//! let user = User { id: 7, name: "Alice".into() };
//! let bytes = to_vec(&user).unwrap();
//! let back: User = from_slice(&bytes).unwrap();
//! assert_eq!(user, back);
//! ```
//!
//! ## Wire Format
//!
//! Every node is `[tag][length][payload]`. The tag byte selects one of three
//! layouts:
//!
//! - **fixed**: no payload (`null`, `undefined`, booleans)
//! - **inline**: payload with no length prefix (numbers, references, dates)
//! - **prefixed**: a varint byte length, then the payload (strings,
//!   containers, buffers, blobs)
//!
//! Integral numbers below 2<sup>32</sup> in magnitude are written as varints,
//! every other number as a big-endian IEEE-754 double. See [`tag::Tag`] for
//! the full tag table. An optional eight byte [`HEADER`] can precede the
//! root node; enable it with [`CodecOptions::with_header`].
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - Nesting depth is bounded in both directions ([`DEFAULT_MAX_DEPTH`])
//! - Decoding never returns a partially built value

pub mod codec;
pub mod de;
pub mod error;
pub mod macros;
pub mod map;
pub mod options;
pub mod platform;
pub mod reader;
pub mod refs;
pub mod registry;
pub mod ser;
pub mod tag;
pub mod token;
pub mod tokenizer;
pub mod value;
pub mod varint;
pub mod writer;

mod decode;
mod encode;

pub use codec::Codec;
pub use de::ValueDeserializer;
pub use encode::HEADER;
pub use error::{Error, ErrorKind, Result};
pub use map::{Record, ValueMap, ValueSet};
pub use options::{CodecOptions, DEFAULT_MAX_DEPTH};
pub use platform::{BlobError, BlobSource, MemoryBlob, PixelCodec, RawPixels};
pub use registry::TypeRegistry;
pub use ser::ValueSerializer;
pub use value::{
    Bitmap, Blob, FileInfo, Function, HostObject, Pattern, PixelArray, TypedView, Value,
    ValueKind, ViewKind,
};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;

/// Encode a value graph with the default options and registry.
///
/// # Examples
///
/// ```rust
/// use freezedry::{to_bytes, value};
///
/// assert_eq!(to_bytes(&value!(42)).unwrap(), [0x03, 0x2A]);
/// assert_eq!(to_bytes(&value!("hi")).unwrap(), [0x09, 0x02, b'h', b'i']);
/// ```
///
/// # Errors
///
/// Returns an error for functions, unregistered host objects, values past
/// the format's 32-bit limits, graphs nested deeper than the default limit,
/// blobs whose contents are not in memory, and bitmaps.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bytes(value: &Value) -> Result<Vec<u8>> {
    Codec::new().encode(value)
}

/// Encode a value graph with custom options.
///
/// # Errors
///
/// Same as [`to_bytes`], with limits taken from `options`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bytes_with_options(value: &Value, options: &CodecOptions) -> Result<Vec<u8>> {
    Codec::new().with_options(options.clone()).encode(value)
}

/// Encode a value graph, awaiting blob contents that are not yet in memory.
///
/// # Errors
///
/// Same as [`to_bytes`], plus any failure reported by a blob source.
pub async fn to_bytes_async(value: &Value) -> Result<Vec<u8>> {
    Codec::new().encode_async(value).await
}

/// Decode one complete byte stream into a value graph.
///
/// # Examples
///
/// ```rust
/// use freezedry::{from_bytes, ErrorKind};
///
/// assert_eq!(from_bytes(&[0x05]).unwrap().as_bool(), Some(true));
/// assert_eq!(from_bytes(&[0xFF]).unwrap_err().kind(), ErrorKind::CorruptStream);
/// ```
///
/// # Errors
///
/// Returns an error if the stream is truncated, has trailing bytes, uses an
/// unknown tag, references an unregistered index or nests too deeply.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_bytes(bytes: &[u8]) -> Result<Value> {
    Codec::new().decode(bytes)
}

/// Decode with custom options.
///
/// # Errors
///
/// Same as [`from_bytes`]; a header is required when `options.header` is set.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_bytes_with_options(bytes: &[u8], options: &CodecOptions) -> Result<Value> {
    Codec::new().with_options(options.clone()).decode(bytes)
}

/// Encode a value graph into a writer.
///
/// # Examples
///
/// ```rust
/// use freezedry::{to_writer, value};
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &value!(null)).unwrap();
/// assert_eq!(buffer, [0x00]);
/// ```
///
/// # Errors
///
/// Returns an error if encoding fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W>(mut writer: W, value: &Value) -> Result<()>
where
    W: io::Write,
{
    let bytes = to_bytes(value)?;
    writer
        .write_all(&bytes)
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(())
}

/// Decode a value graph from a reader, consuming it to the end.
///
/// # Errors
///
/// Returns an error if reading fails or the bytes do not form one complete
/// encoded value.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R>(mut reader: R) -> Result<Value>
where
    R: io::Read,
{
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_bytes(&bytes)
}

/// Convert any `T: Serialize` into a [`Value`].
///
/// # Examples
///
/// ```rust
/// use freezedry::{to_value, value};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let value = to_value(&Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(value, value!({ "x": 1, "y": 2 }));
/// ```
///
/// # Errors
///
/// Returns an error if a map key is not a string, number or boolean.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    value.serialize(ValueSerializer)
}

/// Convert a [`Value`] into any `T: Deserialize`.
///
/// # Errors
///
/// Returns an error if the shape of the value does not match `T`, or if it
/// contains blobs, bitmaps, functions or host objects.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_value<T>(value: &Value) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(value))
}

/// Serialize any `T: Serialize` straight to encoded bytes.
///
/// # Errors
///
/// Returns an error if conversion to a [`Value`] or encoding fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    to_bytes(&to_value(value)?)
}

/// Deserialize an instance of type `T` from encoded bytes.
///
/// # Errors
///
/// Returns an error if the bytes do not decode or the decoded value does not
/// match `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    from_value(&from_bytes(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct User {
        id: u32,
        name: String,
        active: bool,
        tags: Vec<String>,
        score: Option<f64>,
    }

    #[test]
    fn test_point_round_trip() {
        let point = Point { x: 1, y: -2 };
        let bytes = to_vec(&point).unwrap();
        let point_back: Point = from_slice(&bytes).unwrap();
        assert_eq!(point, point_back);
    }

    #[test]
    fn test_user_round_trip() {
        let user = User {
            id: 123,
            name: "Alice".to_string(),
            active: true,
            tags: vec!["admin".to_string(), "user".to_string()],
            score: Some(0.75),
        };

        let bytes = to_vec(&user).unwrap();
        let user_back: User = from_slice(&bytes).unwrap();
        assert_eq!(user, user_back);
    }

    #[test]
    fn test_to_value() {
        let value = to_value(&Point { x: 1, y: 2 }).unwrap();
        let record = value.as_object().unwrap().borrow();
        assert_eq!(record.get("x"), Some(&Value::Number(1.0)));
        assert_eq!(record.get("y"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_map_round_trip() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), vec![1u8, 2]);
        map.insert("b".to_string(), vec![]);
        let back: BTreeMap<String, Vec<u8>> = from_slice(&to_vec(&map).unwrap()).unwrap();
        assert_eq!(map, back);
    }

    #[test]
    fn test_writer_and_reader() {
        let value = value!({ "k": [1, 2.5, "s"] });
        let mut buffer = Vec::new();
        to_writer(&mut buffer, &value).unwrap();
        assert_eq!(buffer, to_bytes(&value).unwrap());

        let back = from_reader(buffer.as_slice()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_failing_writer_maps_to_io() {
        struct Broken;

        impl io::Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = to_writer(Broken, &Value::Null).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_custom_options() {
        let options = CodecOptions::new().with_header(true);
        let bytes = to_bytes_with_options(&value!([true]), &options).unwrap();
        assert_eq!(&bytes[..HEADER.len()], &HEADER);

        let back = from_bytes_with_options(&bytes, &options).unwrap();
        assert_eq!(back, value!([true]));
        assert!(from_bytes(&bytes).is_err());
    }

    #[tokio::test]
    async fn test_async_encoding() {
        let bytes = to_bytes_async(&value!({ "a": null })).await.unwrap();
        assert_eq!(bytes, to_bytes(&value!({ "a": null })).unwrap());
    }
}
