//! Type registry: which tokenizer handles which value.
//!
//! Built-in object-like kinds map to a tokenizing function. Host types are
//! added on top and are resolved in two steps: an exact [`TypeId`] match
//! first, then the first capability predicate that accepts the value, in
//! registration order. A host handler does not tokenize directly; it lowers
//! the host value to a built-in value, which is then tokenized in its place.
//!
//! ## Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use freezedry::{from_bytes, value, Codec, TypeRegistry, Value};
//!
//! struct Point {
//!     x: f64,
//!     y: f64,
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Point>("Point", |p| Ok(value!({ "x": (p.x), "y": (p.y) })));
//!
//! let codec = Codec::new().with_registry(Arc::new(registry));
//! let bytes = codec.encode(&Value::host(Point { x: 1.0, y: 2.0 })).unwrap();
//!
//! assert_eq!(from_bytes(&bytes).unwrap(), value!({ "x": 1, "y": 2 }));
//! ```

use crate::token::Token;
use crate::tokenizer::{self, Tokenizer};
use crate::value::{Value, ValueKind};
use crate::{Error, Result};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Tokenizes a built-in object-like value that was just interned.
pub type TokenizeFn = fn(&Value, &mut Tokenizer<'_>) -> Result<Token>;

/// Lowers a host value to a built-in value.
pub(crate) type LowerFn = Box<dyn Fn(&dyn Any) -> Result<Value> + Send + Sync>;

type MatchFn = Box<dyn Fn(&dyn Any) -> bool + Send + Sync>;

struct HostEntry {
    name: String,
    lower: LowerFn,
}

struct CapabilityEntry {
    name: String,
    matches: MatchFn,
    lower: LowerFn,
}

/// Result of resolving a value against the registry.
pub(crate) enum Handler<'r> {
    Builtin(TokenizeFn),
    Host { name: &'r str, lower: &'r LowerFn },
}

/// Maps value kinds and host types to tokenizers.
pub struct TypeRegistry {
    builtins: HashMap<ValueKind, TokenizeFn>,
    exact: HashMap<TypeId, HostEntry>,
    capabilities: Vec<CapabilityEntry>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates a registry holding every built-in kind and no host types.
    #[must_use]
    pub fn new() -> Self {
        let builtins: [(ValueKind, TokenizeFn); 11] = [
            (ValueKind::Array, tokenizer::tokenize_array),
            (ValueKind::Object, tokenizer::tokenize_object),
            (ValueKind::Map, tokenizer::tokenize_map),
            (ValueKind::Set, tokenizer::tokenize_set),
            (ValueKind::Pattern, tokenizer::tokenize_pattern),
            (ValueKind::Date, tokenizer::tokenize_date),
            (ValueKind::ArrayBuffer, tokenizer::tokenize_array_buffer),
            (ValueKind::View, tokenizer::tokenize_view),
            (ValueKind::Blob, tokenizer::tokenize_blob),
            (ValueKind::ImageData, tokenizer::tokenize_image_data),
            (ValueKind::Bitmap, tokenizer::tokenize_bitmap),
        ];
        TypeRegistry {
            builtins: builtins.into_iter().collect(),
            exact: HashMap::new(),
            capabilities: Vec::new(),
        }
    }

    /// The shared default registry, built on first use.
    #[must_use]
    pub fn global() -> Arc<TypeRegistry> {
        static GLOBAL: OnceLock<Arc<TypeRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(TypeRegistry::new())))
    }

    /// Registers a host type by exact type.
    ///
    /// Registering the same type again replaces the earlier entry. If `lower`
    /// returns a value already met elsewhere in the graph, the host encodes
    /// as a reference to it.
    pub fn register<T: Any>(
        &mut self,
        name: &str,
        lower: impl Fn(&T) -> Result<Value> + Send + Sync + 'static,
    ) -> &mut Self {
        let type_name = std::any::type_name::<T>();
        let lower: LowerFn = Box::new(move |any: &dyn Any| match any.downcast_ref::<T>() {
            Some(value) => lower(value),
            None => Err(Error::internal(format!(
                "registry entry for {type_name} received another type"
            ))),
        });
        self.exact.insert(
            TypeId::of::<T>(),
            HostEntry {
                name: name.to_string(),
                lower,
            },
        );
        self
    }

    /// Registers a host handler selected by a predicate.
    ///
    /// Capabilities are consulted only when no exact entry matches, in the
    /// order they were registered.
    pub fn register_capability<M, F>(&mut self, name: &str, matches: M, lower: F) -> &mut Self
    where
        M: Fn(&dyn Any) -> bool + Send + Sync + 'static,
        F: Fn(&dyn Any) -> Result<Value> + Send + Sync + 'static,
    {
        self.capabilities.push(CapabilityEntry {
            name: name.to_string(),
            matches: Box::new(matches),
            lower: Box::new(lower),
        });
        self
    }

    /// Returns `true` if a built-in tokenizer exists for `kind`.
    #[must_use]
    pub fn handles(&self, kind: ValueKind) -> bool {
        self.builtins.contains_key(&kind)
    }

    pub(crate) fn resolve(&self, value: &Value) -> Result<Handler<'_>> {
        if let Value::Host(host) = value {
            if let Some(entry) = self.exact.get(&host.type_id()) {
                return Ok(Handler::Host {
                    name: &entry.name,
                    lower: &entry.lower,
                });
            }
            return self
                .capabilities
                .iter()
                .find(|entry| (entry.matches)(host.as_any()))
                .map(|entry| Handler::Host {
                    name: &entry.name,
                    lower: &entry.lower,
                })
                .ok_or_else(|| Error::unknown_type(host.type_name()));
        }
        self.builtins
            .get(&value.kind())
            .copied()
            .map(Handler::Builtin)
            .ok_or_else(|| Error::unknown_type(value.kind().name()))
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("builtins", &self.builtins.len())
            .field(
                "exact",
                &self.exact.values().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            )
            .field(
                "capabilities",
                &self.capabilities.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
