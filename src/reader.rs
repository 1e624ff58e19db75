//! Bounds-checked byte reader.

use crate::varint::{self, VarintError};
use crate::{Error, Result};

/// A cursor over a borrowed byte slice.
///
/// Mirrors [`ByteWriter`](crate::writer::ByteWriter): every read advances the
/// cursor, multi-byte values are big-endian, and reading past the end yields
/// [`Error::UnexpectedEof`] without moving the cursor.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Current byte offset from the start of the input.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total length of the input.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(Error::unexpected_eof(self.position, len - remaining));
        }
        let start = self.position;
        self.position += len;
        Ok(&self.bytes[start..self.position])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Returns the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8> {
        self.bytes
            .get(self.position)
            .copied()
            .ok_or_else(|| Error::unexpected_eof(self.position, 1))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.take_array().map(u16::from_be_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.take_array().map(u32::from_be_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.take_array().map(u64::from_be_bytes)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.take_array().map(i64::from_be_bytes)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.take_array().map(f64::from_be_bytes)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Reads `len` bytes and validates them as UTF-8.
    pub fn read_text(&mut self, len: usize) -> Result<&'a str> {
        let offset = self.position;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|_| Error::corrupt(offset, "text is not valid UTF-8"))
    }

    /// Reads a VarInt.
    pub fn read_varint(&mut self) -> Result<u32> {
        let offset = self.position;
        match varint::decode(&self.bytes[offset..]) {
            Ok((value, len)) => {
                self.position += len;
                Ok(value)
            }
            Err(VarintError::Truncated) => Err(Error::unexpected_eof(self.bytes.len(), 1)),
            Err(VarintError::Overflow) => Err(Error::corrupt(offset, "varint exceeds 32 bits")),
        }
    }

    /// Reads a VarInt and widens it for use as a length or count.
    pub fn read_len(&mut self) -> Result<usize> {
        self.read_varint().map(|v| v as usize)
    }
}
