//! Configuration options for encoding and decoding.
//!
//! ## Examples
//!
//! ```rust
//! use freezedry::{from_bytes_with_options, to_bytes_with_options, value, CodecOptions};
//!
//! let options = CodecOptions::new().with_header(true).with_max_depth(32);
//! let bytes = to_bytes_with_options(&value!([1, 2, 3]), &options).unwrap();
//! assert_eq!(&bytes[..4], b"JSOF");
//!
//! let back = from_bytes_with_options(&bytes, &options).unwrap();
//! assert_eq!(back, value!([1, 2, 3]));
//! ```

use crate::platform::PixelCodec;
use std::fmt;
use std::rc::Rc;

/// Default nesting limit for encode, decode and the serde bridge.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Configuration for a single encode or decode call.
///
/// # Examples
///
/// ```rust
/// use freezedry::{CodecOptions, RawPixels};
///
/// // Defaults: no header, depth limit 256, no bitmap support
/// let options = CodecOptions::new();
/// assert!(!options.header);
///
/// let options = CodecOptions::new()
///     .with_max_depth(64)
///     .with_pixel_codec(RawPixels);
/// assert!(options.pixel_codec.is_some());
/// ```
#[derive(Clone)]
pub struct CodecOptions {
    /// Maximum nesting of composite values.
    pub max_depth: usize,
    /// Emit and require the 8-byte `JSOF` stream header.
    pub header: bool,
    /// Converts bitmaps; without one, bitmaps are platform-unavailable.
    pub pixel_codec: Option<Rc<dyn PixelCodec>>,
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            header: false,
            pixel_codec: None,
        }
    }
}

impl CodecOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the nesting limit. A limit of 0 only admits scalar roots.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    #[must_use]
    pub fn with_pixel_codec(mut self, codec: impl PixelCodec + 'static) -> Self {
        self.pixel_codec = Some(Rc::new(codec));
        self
    }
}

impl fmt::Debug for CodecOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecOptions")
            .field("max_depth", &self.max_depth)
            .field("header", &self.header)
            .field("pixel_codec", &self.pixel_codec.is_some())
            .finish()
    }
}
