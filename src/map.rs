//! Ordered collections used inside a value graph.
//!
//! - [`Record`]: string-keyed fields of an object, in insertion order
//! - [`ValueMap`]: a keyed collection whose keys are arbitrary [`Value`]s
//! - [`ValueSet`]: a collection of unique [`Value`]s
//!
//! All three are backed by [`IndexMap`] so that iteration, and therefore the
//! encoded byte stream, follows insertion order.
//!
//! ## Key equality
//!
//! Map keys and set members use "same value, zero-agnostic" equality:
//! strings and numbers compare by content (`NaN` matches `NaN`, `0.0` matches
//! `-0.0`), while arrays, objects and every other shared value compare by
//! identity.
//!
//! ```rust
//! use freezedry::{Value, ValueSet};
//!
//! let mut set = ValueSet::new();
//! assert!(set.insert(Value::from("a")));
//! assert!(!set.insert(Value::from("a")));
//! assert!(set.insert(Value::array(vec![])));
//! assert!(set.insert(Value::array(vec![])));
//! assert_eq!(set.len(), 3);
//! ```

use crate::Value;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;

/// An ordered map of string keys to values.
///
/// # Examples
///
/// ```rust
/// use freezedry::{Record, Value};
///
/// let mut record = Record::new();
/// record.insert("first", Value::from(1));
/// record.insert("second", Value::from(2));
///
/// let keys: Vec<_> = record.keys().cloned().collect();
/// assert_eq!(keys, vec!["first", "second"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Record(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Record(IndexMap::with_capacity(capacity))
    }

    /// Inserts a field, returning the previous value if the key was present.
    ///
    /// Replacing a field keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.0.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.0.values()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl From<HashMap<String, Value>> for Record {
    fn from(map: HashMap<String, Value>) -> Self {
        Record(map.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Record(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Hashable projection of a [`Value`] used to key maps and sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum MapKey {
    Undefined,
    Null,
    Bool(bool),
    Number(u64),
    String(Rc<str>),
    Identity(usize),
}

impl MapKey {
    pub(crate) fn of(value: &Value) -> Self {
        match value {
            Value::Undefined => MapKey::Undefined,
            Value::Null => MapKey::Null,
            Value::Bool(b) => MapKey::Bool(*b),
            Value::Number(n) => MapKey::Number(normalize(*n)),
            Value::String(s) => MapKey::String(Rc::clone(s)),
            other => MapKey::Identity(other.identity().unwrap_or_default()),
        }
    }
}

fn normalize(n: f64) -> u64 {
    if n == 0.0 {
        0.0f64.to_bits()
    } else if n.is_nan() {
        f64::NAN.to_bits()
    } else {
        n.to_bits()
    }
}

/// An insertion-ordered map with [`Value`] keys.
///
/// # Examples
///
/// ```rust
/// use freezedry::{Value, ValueMap};
///
/// let mut map = ValueMap::new();
/// map.insert(Value::from(1), Value::from("one"));
/// map.insert(Value::from(-0.0), Value::from("zero"));
///
/// assert_eq!(map.get(&Value::from(0)).and_then(Value::as_str), Some("zero"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueMap(IndexMap<MapKey, (Value, Value)>);

impl ValueMap {
    #[must_use]
    pub fn new() -> Self {
        ValueMap(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        ValueMap(IndexMap::with_capacity(capacity))
    }

    /// Inserts an entry. An existing equal key keeps its position and original key value.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.0.get_mut(&MapKey::of(&key)) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, value)),
            None => {
                self.0.insert(MapKey::of(&key), (key, value));
                None
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.get(&MapKey::of(key)).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, key: &Value) -> bool {
        self.0.contains_key(&MapKey::of(key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> + '_ {
        self.0.values().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> + '_ {
        self.0.values().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.0.values().map(|(_, v)| v)
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (Value, Value)>>(iter: T) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// An insertion-ordered set of [`Value`]s.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueSet(IndexMap<MapKey, Value>);

impl ValueSet {
    #[must_use]
    pub fn new() -> Self {
        ValueSet(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        ValueSet(IndexMap::with_capacity(capacity))
    }

    /// Adds a member, returning `false` if an equal member was already present.
    pub fn insert(&mut self, value: Value) -> bool {
        let key = MapKey::of(&value);
        if self.0.contains_key(&key) {
            return false;
        }
        self.0.insert(key, value);
        true
    }

    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        self.0.contains_key(&MapKey::of(value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Values<'_, MapKey, Value> {
        self.0.values()
    }
}

impl FromIterator<Value> for ValueSet {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        let mut set = ValueSet::new();
        for v in iter {
            set.insert(v);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_insertion_order() {
        let mut record = Record::new();
        record.insert("z", Value::from(1));
        record.insert("a", Value::from(2));
        assert_eq!(record.insert("z", Value::from(3)), Some(Value::from(1)));
        let keys: Vec<_> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a"]);
    }

    #[test]
    fn numbers_compare_by_value() {
        let mut map = ValueMap::new();
        map.insert(Value::from(f64::NAN), Value::from("nan"));
        map.insert(Value::from(0.0), Value::from("zero"));
        assert_eq!(map.get(&Value::from(f64::NAN)).and_then(Value::as_str), Some("nan"));
        assert!(map.contains_key(&Value::from(-0.0)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn objects_compare_by_identity() {
        let key = Value::array(vec![]);
        let mut map = ValueMap::new();
        map.insert(key.clone(), Value::from(1));
        assert!(map.contains_key(&key));
        assert!(!map.contains_key(&Value::array(vec![])));
    }

    #[test]
    fn replacing_keeps_first_key() {
        let mut map = ValueMap::new();
        map.insert(Value::from("k"), Value::from(1));
        map.insert(Value::from("k"), Value::from(2));
        let entries: Vec<_> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        assert_eq!(entries, vec![(Value::from("k"), Value::from(2))]);
    }

    #[test]
    fn set_deduplicates() {
        let set: ValueSet = [Value::from(1), Value::from(1.0), Value::from("1")]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Value::from("1")));
    }
}
