//! Encoder/decoder entry point bundling options and a registry.

use crate::options::CodecOptions;
use crate::registry::TypeRegistry;
use crate::{decode, encode, Result, Value};
use std::sync::Arc;

/// Encodes and decodes value graphs with a fixed configuration.
///
/// # Examples
///
/// ```rust
/// use freezedry::{value, Codec, CodecOptions};
///
/// let codec = Codec::new().with_options(CodecOptions::new().with_header(true));
/// let bytes = codec.encode(&value!({ "id": 7 })).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), value!({ "id": 7 }));
/// ```
#[derive(Debug, Clone)]
pub struct Codec {
    registry: Arc<TypeRegistry>,
    options: CodecOptions,
}

impl Default for Codec {
    fn default() -> Self {
        Codec {
            registry: TypeRegistry::global(),
            options: CodecOptions::default(),
        }
    }
}

impl Codec {
    /// Creates a codec over the shared default registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the registry, typically one with host types added.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Encodes a value graph.
    ///
    /// Blob contents must already be resident in memory; otherwise use
    /// [`encode_async`](Self::encode_async).
    ///
    /// # Errors
    ///
    /// Fails on functions, unregistered host types, values beyond the
    /// format's 32-bit limits, nesting deeper than `max_depth`, and bitmaps
    /// without a configured [`PixelCodec`](crate::PixelCodec).
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        encode::encode(value, &self.registry, &self.options)
    }

    /// Encodes a value graph, reading blob contents asynchronously.
    pub async fn encode_async(&self, value: &Value) -> Result<Vec<u8>> {
        encode::encode_async(value, &self.registry, &self.options).await
    }

    /// Decodes one complete byte stream.
    ///
    /// # Errors
    ///
    /// Fails on unknown tags, truncated input, invalid references, malformed
    /// patterns and trailing bytes; no partial value is returned.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        decode::decode(bytes, &self.options)
    }
}
