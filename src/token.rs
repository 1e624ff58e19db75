//! Intermediate token tree.
//!
//! Tokenization turns a value graph into a tree of [`Token`]s whose payload
//! sizes are known exactly, so the encoder can allocate the output once and
//! fill it in a single pass.

use crate::tag::{Layout, Tag};
use crate::value::{BufferRef, FileInfo, PixelArray};
use crate::varint;
use crate::{Error, Result};
use std::rc::Rc;

/// Payload carried by a token.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Fixed tags.
    Empty,
    /// Integer magnitudes and reference indices, written as a VarInt.
    Uint(u32),
    /// Numbers and timestamps, written as a big-endian f64.
    Float(f64),
    /// Strings and pattern text.
    Text(Rc<str>),
    /// Raw buffer contents.
    Bytes(BufferRef),
    /// A typed view: element count, byte offset and the buffer token.
    View {
        count: u32,
        offset: u32,
        buffer: Box<Token>,
    },
    /// Image data or bitmap pixels.
    Pixels(Rc<PixelArray>),
    /// Blob metadata. `slot` indexes the contents fetched before the write pass.
    Blob {
        mime: Rc<str>,
        file: Option<FileInfo>,
        size: usize,
        slot: usize,
    },
    /// Array and set members.
    Items(Vec<Token>),
    /// Object fields.
    Fields(Vec<(Rc<str>, Token)>),
    /// Map entries.
    Entries(Vec<(Token, Token)>),
}

/// A tagged node with the exact byte length of its payload.
#[derive(Debug, Clone)]
pub struct Token {
    tag: Tag,
    length: u32,
    payload: Payload,
}

impl Token {
    /// Creates a token, checking that `length` fits the format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatLimit`] when the payload is 2^32 bytes or larger.
    pub fn new(tag: Tag, length: usize, payload: Payload) -> Result<Self> {
        let length = u32::try_from(length).map_err(|_| {
            Error::format_limit(&format!("{tag} payload length"), length as u64, varint::MAX_VALUE)
        })?;
        Ok(Token {
            tag,
            length,
            payload,
        })
    }

    /// A zero-length token for a fixed tag.
    #[must_use]
    pub fn fixed(tag: Tag) -> Self {
        Token {
            tag,
            length: 0,
            payload: Payload::Empty,
        }
    }

    /// A VarInt-payload token (integers and references).
    #[must_use]
    pub fn uint(tag: Tag, value: u32) -> Self {
        Token {
            tag,
            length: varint::len_u32(value) as u32,
            payload: Payload::Uint(value),
        }
    }

    /// An 8-byte float-payload token (numbers and timestamps).
    #[must_use]
    pub fn float(tag: Tag, value: f64) -> Self {
        Token {
            tag,
            length: 8,
            payload: Payload::Float(value),
        }
    }

    #[must_use]
    pub fn reference(index: u32) -> Self {
        Token::uint(Tag::Reference, index)
    }

    #[must_use]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Payload length in bytes, excluding the tag byte and length prefix.
    #[must_use]
    pub fn length(&self) -> u32 {
        self.length
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Bytes this token occupies on the wire, including tag and prefix.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let prefix = match self.tag.layout() {
            Layout::Prefixed => varint::len_u32(self.length),
            Layout::Fixed | Layout::Inline => 0,
        };
        1 + prefix + self.length as usize
    }
}

/// Bytes taken by a VarInt length followed by that many bytes.
pub(crate) fn sized_text_len(len: usize) -> Result<usize> {
    Ok(varint::encoded_len(len as u64)? + len)
}
