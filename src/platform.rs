//! Platform collaborators.
//!
//! Blobs and bitmaps are opaque to the codec. Their contents are reached
//! through two traits a host environment implements:
//!
//! - [`BlobSource`]: yields the bytes behind a [`Blob`](crate::Blob),
//!   possibly asynchronously
//! - [`PixelCodec`]: converts a [`Bitmap`] to and from canonical
//!   [`PixelArray`] data
//!
//! [`MemoryBlob`] is the in-memory `BlobSource`; decoded blobs always use it.

use crate::value::{Bitmap, PixelArray};
use crate::{Error, Result};
use async_trait::async_trait;
use thiserror::Error;

/// Failure while reading blob contents.
#[derive(Debug, Clone, Error)]
pub enum BlobError {
    /// The host cannot read blobs at all.
    #[error("blob reading is unsupported: {0}")]
    Unsupported(String),

    /// The read started but failed.
    #[error("{0}")]
    Read(String),
}

impl From<BlobError> for Error {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::Unsupported(msg) => Error::PlatformUnavailable(msg),
            BlobError::Read(msg) => Error::BlobRead(msg),
        }
    }
}

/// Source of a blob's bytes.
///
/// # Example Implementation
///
/// ```rust
/// use async_trait::async_trait;
/// use freezedry::{BlobError, BlobSource};
///
/// struct Remote {
///     len: u64,
/// }
///
/// #[async_trait(?Send)]
/// impl BlobSource for Remote {
///     fn size(&self) -> u64 {
///         self.len
///     }
///
///     async fn read_all_bytes(&self) -> Result<Vec<u8>, BlobError> {
///         Ok(vec![0; self.len as usize])
///     }
/// }
/// ```
#[async_trait(?Send)]
pub trait BlobSource {
    /// Length of the contents in bytes.
    fn size(&self) -> u64;

    /// Reads the complete contents.
    async fn read_all_bytes(&self) -> std::result::Result<Vec<u8>, BlobError>;

    /// Contents, when they can be borrowed without waiting.
    ///
    /// Synchronous encoding only works for blobs that return `Some` here.
    fn as_resident(&self) -> Option<&[u8]> {
        None
    }
}

/// Blob contents held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryBlob {
    bytes: Vec<u8>,
}

impl MemoryBlob {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        MemoryBlob { bytes }
    }
}

#[async_trait(?Send)]
impl BlobSource for MemoryBlob {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    async fn read_all_bytes(&self) -> std::result::Result<Vec<u8>, BlobError> {
        Ok(self.bytes.clone())
    }

    fn as_resident(&self) -> Option<&[u8]> {
        Some(&self.bytes)
    }
}

/// Converts platform bitmaps to and from RGBA pixel data.
pub trait PixelCodec {
    /// Captures the pixels of a bitmap.
    fn to_pixel_array(&self, bitmap: &Bitmap) -> Result<PixelArray>;

    /// Builds a bitmap from decoded pixels.
    fn from_pixel_array(&self, pixels: PixelArray) -> Result<Bitmap>;
}

/// A `PixelCodec` whose bitmaps are plain [`PixelArray`]s.
///
/// Useful where no graphics stack exists but bitmaps still need to round-trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPixels;

impl PixelCodec for RawPixels {
    fn to_pixel_array(&self, bitmap: &Bitmap) -> Result<PixelArray> {
        bitmap
            .downcast_ref::<PixelArray>()
            .cloned()
            .ok_or_else(|| Error::platform_unavailable("bitmap handle is not raw pixel data"))
    }

    fn from_pixel_array(&self, pixels: PixelArray) -> Result<Bitmap> {
        Ok(Bitmap::new(pixels))
    }
}
