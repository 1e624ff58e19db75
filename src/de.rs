//! Deserializing Rust data out of a [`Value`].
//!
//! [`ValueDeserializer`] drives `serde::Deserialize` implementations from a
//! value graph. It is the inverse of [`ValueSerializer`](crate::ValueSerializer)
//! for everything serde can express:
//!
//! ```rust
//! use freezedry::{from_value, value};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct User {
//!     id: u32,
//!     tags: Vec<String>,
//! }
//!
//! let user: User = from_value(&value!({ "id": 3, "tags": ["a", "b"] })).unwrap();
//! assert_eq!(user, User { id: 3, tags: vec!["a".into(), "b".into()] });
//! ```
//!
//! Dates and patterns are presented as strings, buffers and views as bytes.
//! Blobs, bitmaps, functions and host objects have no serde representation.
//! Cyclic graphs are cut off by the same depth limit the codec uses.

use crate::options::DEFAULT_MAX_DEPTH;
use crate::{Error, Result, Value};
use serde::de::{self, IntoDeserializer};
use serde::forward_to_deserialize_any;
use std::vec;

/// Deserializer reading from a value graph.
///
/// Containers are walked by cloning their children, which only bumps
/// reference counts.
#[derive(Debug, Clone)]
pub struct ValueDeserializer {
    value: Value,
    depth: usize,
    max_depth: usize,
}

impl ValueDeserializer {
    pub fn new(value: &Value) -> Self {
        ValueDeserializer {
            value: value.clone(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets how many containers may nest before deserialization fails.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn child(&self, value: Value) -> Self {
        ValueDeserializer {
            value,
            depth: self.depth + 1,
            max_depth: self.max_depth,
        }
    }

    fn descend(&self) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(Error::depth_limit(self.max_depth));
        }
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(Value, Value)>> {
        match &self.value {
            Value::Object(record) => Ok(record
                .borrow()
                .iter()
                .map(|(k, v)| (Value::from(k.as_str()), v.clone()))
                .collect()),
            Value::Map(map) => Ok(map
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            other => Err(unexpected(other, "a map")),
        }
    }
}

fn unexpected(value: &Value, expected: &str) -> Error {
    Error::custom(format!(
        "invalid type: {}, expected {expected}",
        value.kind().name()
    ))
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match &self.value {
            Value::Undefined | Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Number(n) => match self.value.as_i64() {
                Some(i) if i < 0 => visitor.visit_i64(i),
                Some(i) => visitor.visit_u64(i as u64),
                None => visitor.visit_f64(*n),
            },
            Value::String(s) => visitor.visit_str(s),
            Value::Date(at) => visitor.visit_string(at.to_rfc3339()),
            Value::Pattern(pattern) => visitor.visit_string(pattern.to_string()),
            Value::ArrayBuffer(bytes) => visitor.visit_byte_buf(bytes.borrow().clone()),
            Value::View(view) => match view.to_bytes() {
                Some(bytes) => visitor.visit_byte_buf(bytes),
                None => Err(Error::custom("view extends past the end of its buffer")),
            },
            Value::Array(items) => {
                self.descend()?;
                let items = items.borrow().clone();
                visitor.visit_seq(SeqDeserializer::new(&self, items))
            }
            Value::Set(set) => {
                self.descend()?;
                let items = set.borrow().iter().cloned().collect();
                visitor.visit_seq(SeqDeserializer::new(&self, items))
            }
            Value::Object(_) | Value::Map(_) => {
                self.descend()?;
                let entries = self.entries()?;
                visitor.visit_map(MapDeserializer::new(&self, entries))
            }
            Value::ImageData(pixels) => {
                let entries = vec![
                    (Value::from("width"), Value::from(pixels.width())),
                    (Value::from("height"), Value::from(pixels.height())),
                    (
                        Value::from("data"),
                        Value::array_buffer(pixels.data().to_vec()),
                    ),
                ];
                visitor.visit_map(MapDeserializer::new(&self, entries))
            }
            Value::Blob(_) | Value::Bitmap(_) | Value::Function(_) | Value::Host(_) => {
                Err(Error::unsupported(&format!(
                    "{} values cannot be deserialized",
                    self.value.kind().name()
                )))
            }
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Undefined | Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match &self.value {
            Value::String(s) => visitor.visit_enum(s.to_string().into_deserializer()),
            Value::Object(record) => {
                let (variant, value) = {
                    let record = record.borrow();
                    let mut fields = record.iter();
                    match (fields.next(), fields.next()) {
                        (Some((k, v)), None) => (k.clone(), v.clone()),
                        _ => {
                            return Err(Error::custom(
                                "expected an object with a single key for an enum variant",
                            ))
                        }
                    }
                };
                self.descend()?;
                visitor.visit_enum(EnumDeserializer {
                    variant,
                    value: self.child(value),
                })
            }
            other => Err(unexpected(other, "a string or single-key object")),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

struct SeqDeserializer {
    parent: ValueDeserializer,
    iter: vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(parent: &ValueDeserializer, items: Vec<Value>) -> Self {
        SeqDeserializer {
            parent: parent.child(Value::Undefined),
            iter: items.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => {
                let mut element = self.parent.clone();
                element.value = value;
                seed.deserialize(element).map(Some)
            }
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDeserializer {
    parent: ValueDeserializer,
    iter: vec::IntoIter<(Value, Value)>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(parent: &ValueDeserializer, entries: Vec<(Value, Value)>) -> Self {
        MapDeserializer {
            parent: parent.child(Value::Undefined),
            iter: entries.into_iter(),
            value: None,
        }
    }

    fn at(&self, value: Value) -> ValueDeserializer {
        let mut de = self.parent.clone();
        de.value = value;
        de
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(self.at(key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(self.at(value)),
            None => Err(Error::custom("next_value called before next_key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct EnumDeserializer {
    variant: String,
    value: ValueDeserializer,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let access = VariantDeserializer { value: self.value };
        seed.deserialize(self.variant.into_deserializer())
            .map(|variant| (variant, access))
    }
}

struct VariantDeserializer {
    value: ValueDeserializer,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value.value {
            Value::Undefined | Value::Null => Ok(()),
            ref other => Err(unexpected(other, "a unit variant")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(self.value)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(self.value, visitor)
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_map(self.value, visitor)
    }
}
