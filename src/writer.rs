//! Fixed-capacity byte writer.

use crate::varint;
use crate::{Error, Result};

/// A cursor over a pre-sized output buffer.
///
/// The buffer is allocated once with the exact size computed by the size
/// pass and never grows. Writing past the end is reported as
/// [`Error::BufferOverflow`], and [`finish`](Self::finish) fails unless every
/// byte was written. Multi-byte integers and floats are big-endian.
#[derive(Debug)]
pub struct ByteWriter {
    buf: Vec<u8>,
    position: usize,
}

impl ByteWriter {
    /// Creates a writer over a zeroed buffer of exactly `size` bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            buf: vec![0; size],
            position: 0,
        }
    }

    /// Total size of the buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes that can still be written.
    #[must_use]
    pub fn available(&self) -> usize {
        self.buf.len() - self.position
    }

    fn claim(&mut self, len: usize) -> Result<&mut [u8]> {
        let available = self.available();
        if len > available {
            return Err(Error::BufferOverflow {
                requested: len,
                available,
            });
        }
        let start = self.position;
        self.position += len;
        Ok(&mut self.buf[start..self.position])
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.claim(1)?[0] = value;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Writes an IEEE-754 binary64 value.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.claim(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Writes the UTF-8 bytes of `text` with no length prefix.
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        self.write_bytes(text.as_bytes())
    }

    /// Writes a VarInt, returning the number of bytes used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatLimit`] if `value >= 2^32`.
    pub fn write_varint(&mut self, value: u64) -> Result<usize> {
        let mut scratch = [0u8; varint::MAX_LEN];
        let len = varint::encode(value, &mut scratch)?;
        self.write_bytes(&scratch[..len])?;
        Ok(len)
    }

    /// Finishes writing and returns the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the buffer was not completely filled.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.position != self.buf.len() {
            return Err(Error::internal(format!(
                "writer finished with {} of {} bytes written",
                self.position,
                self.buf.len()
            )));
        }
        Ok(self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn empty_writer() {
        let writer = ByteWriter::new(0);
        assert_eq!(writer.available(), 0);
        assert!(writer.finish().unwrap().is_empty());
    }

    #[test]
    fn fixed_width_is_big_endian() {
        let mut writer = ByteWriter::new(1 + 2 + 4 + 8);
        writer.write_u8(0xAB).unwrap();
        writer.write_u16(0x0D0A).unwrap();
        writer.write_u32(0x0102_0304).unwrap();
        writer.write_u64(0x1122_3344_5566_7788).unwrap();
        assert_eq!(
            writer.finish().unwrap(),
            vec![
                0xAB, 0x0D, 0x0A, 0x01, 0x02, 0x03, 0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66,
                0x77, 0x88
            ]
        );
    }

    #[test]
    fn write_f64_matches_ieee() {
        let mut writer = ByteWriter::new(8);
        writer.write_f64(1.0).unwrap();
        assert_eq!(writer.finish().unwrap(), 1.0f64.to_be_bytes().to_vec());
    }

    #[test]
    fn write_varint_reports_length() {
        let mut writer = ByteWriter::new(3);
        assert_eq!(writer.write_varint(0).unwrap(), 1);
        assert_eq!(writer.write_varint(128).unwrap(), 2);
        assert_eq!(writer.finish().unwrap(), vec![0x00, 0x80, 0x01]);
    }

    #[test]
    fn write_text_is_utf8() {
        let text = "héllo";
        let mut writer = ByteWriter::new(text.len());
        writer.write_text(text).unwrap();
        assert_eq!(writer.finish().unwrap(), text.as_bytes());
    }

    #[test]
    fn overflow_is_internal_error() {
        let mut writer = ByteWriter::new(1);
        writer.write_u8(1).unwrap();
        let err = writer.write_u8(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalConsistency);
        assert!(matches!(
            err,
            Error::BufferOverflow {
                requested: 1,
                available: 0
            }
        ));
    }

    #[test]
    fn failed_write_does_not_advance() {
        let mut writer = ByteWriter::new(2);
        writer.write_u8(1).unwrap();
        assert!(writer.write_u16(7).is_err());
        assert_eq!(writer.position(), 1);
    }

    #[test]
    fn finish_rejects_unfilled_buffer() {
        let mut writer = ByteWriter::new(2);
        writer.write_u8(1).unwrap();
        let err = writer.finish().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalConsistency);
    }
}
