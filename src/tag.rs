//! One-byte type tags and their wire layout.

use std::fmt;

/// How the payload size of a tag is communicated on the wire.
///
/// This is the single description shared by the size pass, the write pass
/// and the decoder, so the three cannot disagree about whether a length
/// prefix is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// No payload at all.
    Fixed,
    /// Payload size is implied by the tag (an f64 or a single VarInt).
    Inline,
    /// Payload is preceded by its length as a VarInt.
    Prefixed,
}

/// The closed set of type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Null = 0x00,
    Undefined = 0x01,
    Float64 = 0x02,
    PositiveInt = 0x03,
    NegativeInt = 0x04,
    True = 0x05,
    False = 0x06,
    Reference = 0x07,
    Date = 0x08,
    String = 0x09,
    Pattern = 0x0A,
    Blob = 0x0B,
    File = 0x0C,
    ArrayBuffer = 0x0D,
    Int8Array = 0x0E,
    Uint8Array = 0x0F,
    Uint8ClampedArray = 0x10,
    Int16Array = 0x11,
    Uint16Array = 0x12,
    Int32Array = 0x13,
    Uint32Array = 0x14,
    Float32Array = 0x15,
    Float64Array = 0x16,
    DataView = 0x17,
    ImageData = 0x18,
    Array = 0x19,
    Object = 0x1A,
    Map = 0x1B,
    Set = 0x1C,
    ImageBitmap = 0x1D,
}

impl Tag {
    #[must_use]
    pub const fn layout(self) -> Layout {
        match self {
            Tag::Null | Tag::Undefined | Tag::True | Tag::False => Layout::Fixed,
            Tag::Float64 | Tag::PositiveInt | Tag::NegativeInt | Tag::Reference | Tag::Date => {
                Layout::Inline
            }
            _ => Layout::Prefixed,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> Self {
        tag as u8
    }
}

impl TryFrom<u8> for Tag {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0x00 => Tag::Null,
            0x01 => Tag::Undefined,
            0x02 => Tag::Float64,
            0x03 => Tag::PositiveInt,
            0x04 => Tag::NegativeInt,
            0x05 => Tag::True,
            0x06 => Tag::False,
            0x07 => Tag::Reference,
            0x08 => Tag::Date,
            0x09 => Tag::String,
            0x0A => Tag::Pattern,
            0x0B => Tag::Blob,
            0x0C => Tag::File,
            0x0D => Tag::ArrayBuffer,
            0x0E => Tag::Int8Array,
            0x0F => Tag::Uint8Array,
            0x10 => Tag::Uint8ClampedArray,
            0x11 => Tag::Int16Array,
            0x12 => Tag::Uint16Array,
            0x13 => Tag::Int32Array,
            0x14 => Tag::Uint32Array,
            0x15 => Tag::Float32Array,
            0x16 => Tag::Float64Array,
            0x17 => Tag::DataView,
            0x18 => Tag::ImageData,
            0x19 => Tag::Array,
            0x1A => Tag::Object,
            0x1B => Tag::Map,
            0x1C => Tag::Set,
            0x1D => Tag::ImageBitmap,
            other => return Err(other),
        })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02X})", self, self.as_u8())
    }
}
