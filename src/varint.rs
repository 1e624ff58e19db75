//! Base-128 variable-length unsigned integers.
//!
//! Each byte carries 7 data bits, least-significant group first. The high bit
//! is set on every byte except the last. Only values below 2^32 are
//! representable, so an encoding is between 1 and [`MAX_LEN`] bytes long.
//!
//! | Range | Bytes |
//! |-------|-------|
//! | `0 ..= 127` | 1 |
//! | `128 ..= 16_383` | 2 |
//! | `16_384 ..= 2_097_151` | 3 |
//! | `2_097_152 ..= 268_435_455` | 4 |
//! | `268_435_456 ..= 4_294_967_295` | 5 |
//!
//! ```rust
//! use freezedry::varint;
//!
//! let mut buf = [0u8; varint::MAX_LEN];
//! let n = varint::encode(300, &mut buf).unwrap();
//! assert_eq!(&buf[..n], &[0xAC, 0x02]);
//! assert_eq!(varint::decode(&buf[..n]), Ok((300, 2)));
//! ```

use crate::{Error, Result};

/// Maximum number of bytes a single encoded value occupies.
pub const MAX_LEN: usize = 5;

/// Largest encodable value.
pub const MAX_VALUE: u64 = u32::MAX as u64;

const DATA_BITS: u8 = 0b0111_1111;
const CONTINUATION: u8 = 0b1000_0000;

/// Why a byte sequence could not be decoded as a VarInt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// Input ended while the continuation bit was still set.
    Truncated,
    /// The value does not fit in 32 bits.
    Overflow,
}

/// Returns the number of bytes `value` encodes to, without writing anything.
///
/// # Errors
///
/// Returns [`Error::FormatLimit`] if `value >= 2^32`.
pub fn encoded_len(value: u64) -> Result<usize> {
    if value > MAX_VALUE {
        return Err(Error::format_limit("varint", value, MAX_VALUE));
    }
    Ok(len_u32(value as u32))
}

/// Encoded length of a value already known to be in range.
#[must_use]
pub const fn len_u32(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Encodes `value` into `out`, returning the number of bytes used.
///
/// # Errors
///
/// Returns [`Error::FormatLimit`] if `value >= 2^32`.
pub fn encode(value: u64, out: &mut [u8; MAX_LEN]) -> Result<usize> {
    if value > MAX_VALUE {
        return Err(Error::format_limit("varint", value, MAX_VALUE));
    }
    let mut remaining = value as u32;
    let mut written = 0;
    loop {
        let mut byte = (remaining as u8) & DATA_BITS;
        remaining >>= 7;
        if remaining != 0 {
            byte |= CONTINUATION;
        }
        out[written] = byte;
        written += 1;
        if remaining == 0 {
            return Ok(written);
        }
    }
}

/// Decodes a value from the front of `bytes`, returning it with the number of bytes consumed.
///
/// Non-minimal encodings (redundant trailing zero groups) are accepted as long
/// as they fit in [`MAX_LEN`] bytes.
pub fn decode(bytes: &[u8]) -> std::result::Result<(u32, usize), VarintError> {
    let mut result: u64 = 0;
    for (i, &byte) in bytes.iter().take(MAX_LEN).enumerate() {
        result |= u64::from(byte & DATA_BITS) << (7 * i);
        if byte & CONTINUATION == 0 {
            return u32::try_from(result)
                .map(|v| (v, i + 1))
                .map_err(|_| VarintError::Overflow);
        }
    }
    if bytes.len() >= MAX_LEN {
        Err(VarintError::Overflow)
    } else {
        Err(VarintError::Truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn encode_vec(value: u64) -> Vec<u8> {
        let mut buf = [0u8; MAX_LEN];
        let n = encode(value, &mut buf).unwrap();
        buf[..n].to_vec()
    }

    #[test]
    fn boundary_lengths() {
        let table: [(u64, usize); 10] = [
            (0, 1),
            (127, 1),
            (128, 2),
            (16_383, 2),
            (16_384, 3),
            (2_097_151, 3),
            (2_097_152, 4),
            (268_435_455, 4),
            (268_435_456, 5),
            ((1 << 32) - 1, 5),
        ];
        for (value, expected) in table {
            assert_eq!(encoded_len(value).unwrap(), expected, "len of {value}");
            let bytes = encode_vec(value);
            assert_eq!(bytes.len(), expected, "encoding of {value}");
            assert_eq!(decode(&bytes), Ok((value as u32, expected)));
        }
    }

    #[test]
    fn zero_is_one_byte() {
        assert_eq!(encode_vec(0), vec![0x00]);
    }

    #[test]
    fn known_encodings() {
        assert_eq!(encode_vec(1), vec![0x01]);
        assert_eq!(encode_vec(127), vec![0x7F]);
        assert_eq!(encode_vec(128), vec![0x80, 0x01]);
        assert_eq!(encode_vec(300), vec![0xAC, 0x02]);
        assert_eq!(encode_vec(u64::from(u32::MAX)), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn rejects_two_pow_32() {
        let err = encoded_len(1 << 32).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatLimit);

        let mut buf = [0u8; MAX_LEN];
        let err = encode(1 << 32, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatLimit);
    }

    #[test]
    fn decode_stops_at_first_terminal_byte() {
        assert_eq!(decode(&[0x05, 0xFF, 0xFF]), Ok((5, 1)));
    }

    #[test]
    fn decode_truncated() {
        assert_eq!(decode(&[]), Err(VarintError::Truncated));
        assert_eq!(decode(&[0x80]), Err(VarintError::Truncated));
        assert_eq!(decode(&[0xFF, 0xFF, 0xFF]), Err(VarintError::Truncated));
    }

    #[test]
    fn decode_overflow() {
        // Fifth byte carries bits above 2^32.
        assert_eq!(
            decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F]),
            Err(VarintError::Overflow)
        );
        // Continuation bit still set on the fifth byte.
        assert_eq!(
            decode(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x00]),
            Err(VarintError::Overflow)
        );
    }

    #[test]
    fn decode_accepts_non_minimal() {
        assert_eq!(decode(&[0x81, 0x00]), Ok((1, 2)));
    }
}
