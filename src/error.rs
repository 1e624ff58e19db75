//! Error types for encoding and decoding.
//!
//! Every failure aborts the whole encode or decode call and surfaces as a
//! single [`Error`]. There is no partial result: a caller that sees a decode
//! error must not trust any value built before it.
//!
//! ## Error Categories
//!
//! - **Unsupported values**: functions, or host types nobody registered
//! - **Format limits**: a length or index does not fit the 32-bit VarInt format
//! - **Corrupt streams**: unknown tags, truncated input, bad references, malformed patterns
//! - **Internal consistency**: the size pass and the write pass disagreed (a codec bug)
//! - **Platform unavailable**: a blob or bitmap collaborator is missing
//!
//! Use [`Error::kind`] to branch on the category without matching every variant.
//!
//! ## Examples
//!
//! ```rust
//! use freezedry::{from_bytes, ErrorKind};
//!
//! let err = from_bytes(&[0xFF]).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::CorruptStream);
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur while encoding or decoding.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A value that cannot be serialized (for example a function).
    #[error("Unsupported value: {0}")]
    Unsupported(String),

    /// No registry entry can tokenize this value.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A magnitude or length exceeds what the format can represent.
    #[error("Value {value} exceeds the format limit for {what} (maximum {max})")]
    FormatLimit { what: String, value: u64, max: u64 },

    /// The byte stream is structurally invalid.
    #[error("Corrupt stream at byte {offset}: {msg}")]
    Corrupt { offset: usize, msg: String },

    /// A read ran past the end of the input.
    #[error("Unexpected end of input at byte {offset}: {needed} more byte(s) required")]
    UnexpectedEof { offset: usize, needed: usize },

    /// A back-reference points at a slot that does not hold a value.
    #[error("Invalid reference {index} at byte {offset}: {registered} value(s) registered")]
    InvalidReference {
        offset: usize,
        index: u32,
        registered: usize,
    },

    /// Pattern text did not have the `/source/flags` shape.
    #[error("Invalid pattern {text:?}: {msg}")]
    InvalidPattern { text: String, msg: String },

    /// The write pass disagreed with the size pass.
    #[error("Internal consistency error: {0}")]
    Internal(String),

    /// The pre-sized output buffer was too small.
    #[error("Buffer overflow: {requested} byte(s) requested, {available} available")]
    BufferOverflow { requested: usize, available: usize },

    /// A platform collaborator is not available.
    #[error("{0} is unavailable on this platform")]
    PlatformUnavailable(String),

    /// Reading blob contents failed.
    #[error("Failed to read blob: {0}")]
    BlobRead(String),

    /// The value graph nests deeper than the configured limit.
    #[error("Nesting depth exceeds the limit of {limit}")]
    DepthLimit { limit: usize },

    /// Reading from or writing to an I/O stream failed.
    #[error("IO error: {0}")]
    Io(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),

    /// Generic message
    #[error("{0}")]
    Message(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedValue,
    FormatLimit,
    CorruptStream,
    InternalConsistency,
    PlatformUnavailable,
    Io,
    Resource,
    Custom,
}

impl Error {
    /// Returns the category this error belongs to.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use freezedry::{Error, ErrorKind};
    ///
    /// assert_eq!(Error::corrupt(3, "bad tag").kind(), ErrorKind::CorruptStream);
    /// assert_eq!(Error::internal("drift").kind(), ErrorKind::InternalConsistency);
    /// ```
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unsupported(_) | Error::UnknownType(_) => ErrorKind::UnsupportedValue,
            Error::FormatLimit { .. } => ErrorKind::FormatLimit,
            Error::Corrupt { .. }
            | Error::UnexpectedEof { .. }
            | Error::InvalidReference { .. }
            | Error::InvalidPattern { .. } => ErrorKind::CorruptStream,
            Error::Internal(_) | Error::BufferOverflow { .. } => ErrorKind::InternalConsistency,
            Error::PlatformUnavailable(_) => ErrorKind::PlatformUnavailable,
            Error::BlobRead(_) | Error::Io(_) => ErrorKind::Io,
            Error::DepthLimit { .. } => ErrorKind::Resource,
            Error::Custom(_) | Error::Message(_) => ErrorKind::Custom,
        }
    }

    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Creates an unsupported-value error.
    pub fn unsupported(msg: &str) -> Self {
        Error::Unsupported(msg.to_string())
    }

    /// Creates an unknown-type error naming the type that had no handler.
    pub fn unknown_type(name: &str) -> Self {
        Error::UnknownType(name.to_string())
    }

    /// Creates a format-limit error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use freezedry::Error;
    ///
    /// let err = Error::format_limit("varint", 1 << 32, u32::MAX as u64);
    /// assert!(err.to_string().contains("varint"));
    /// ```
    pub fn format_limit(what: &str, value: u64, max: u64) -> Self {
        Error::FormatLimit {
            what: what.to_string(),
            value,
            max,
        }
    }

    /// Creates a corrupt-stream error at a byte offset.
    pub fn corrupt(offset: usize, msg: &str) -> Self {
        Error::Corrupt {
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates an unexpected end-of-input error.
    pub fn unexpected_eof(offset: usize, needed: usize) -> Self {
        Error::UnexpectedEof { offset, needed }
    }

    /// Creates an invalid-reference error.
    pub fn invalid_reference(offset: usize, index: u32, registered: usize) -> Self {
        Error::InvalidReference {
            offset,
            index,
            registered,
        }
    }

    /// Creates a pattern parse error.
    pub fn invalid_pattern(text: &str, msg: &str) -> Self {
        Error::InvalidPattern {
            text: text.to_string(),
            msg: msg.to_string(),
        }
    }

    /// Creates an internal-consistency error. These indicate a codec bug, not bad input.
    pub fn internal<T: fmt::Display>(msg: T) -> Self {
        Error::Internal(msg.to_string())
    }

    /// Creates a platform-unavailable error for a missing collaborator.
    pub fn platform_unavailable(feature: &str) -> Self {
        Error::PlatformUnavailable(feature.to_string())
    }

    /// Creates a nesting-depth error.
    pub fn depth_limit(limit: usize) -> Self {
        Error::DepthLimit { limit }
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use freezedry::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_taxonomy() {
        assert_eq!(
            Error::unsupported("function").kind(),
            ErrorKind::UnsupportedValue
        );
        assert_eq!(
            Error::unknown_type("Point").kind(),
            ErrorKind::UnsupportedValue
        );
        assert_eq!(
            Error::format_limit("varint", 1 << 32, 0).kind(),
            ErrorKind::FormatLimit
        );
        assert_eq!(Error::unexpected_eof(4, 1).kind(), ErrorKind::CorruptStream);
        assert_eq!(
            Error::invalid_reference(0, 9, 2).kind(),
            ErrorKind::CorruptStream
        );
        assert_eq!(
            Error::invalid_pattern("abc", "missing slash").kind(),
            ErrorKind::CorruptStream
        );
        assert_eq!(
            Error::BufferOverflow {
                requested: 2,
                available: 1
            }
            .kind(),
            ErrorKind::InternalConsistency
        );
        assert_eq!(
            Error::platform_unavailable("bitmap conversion").kind(),
            ErrorKind::PlatformUnavailable
        );
        assert_eq!(Error::depth_limit(8).kind(), ErrorKind::Resource);
    }

    #[test]
    fn messages_carry_context() {
        let err = Error::invalid_reference(12, 7, 3);
        let msg = err.to_string();
        assert!(msg.contains("byte 12"));
        assert!(msg.contains("reference 7"));

        let err = Error::platform_unavailable("Blob reading");
        assert_eq!(err.to_string(), "Blob reading is unavailable on this platform");
    }
}
