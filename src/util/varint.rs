//! Variable-length integer encoding utilities.
//!
//! Unsigned LEB128: 7 bits per byte, least significant group first, with the
//! high bit of each byte set when more bytes follow. This is the encoding used
//! for every counter in a wire-encoded statistic.

use std::io::{Read, Write};

use byteorder::ReadBytesExt;

use crate::error::{AlignRankError, Result};

/// Maximum number of bytes a u64 occupies once encoded.
pub const MAX_VARINT_LEN_U64: usize = 10;

/// Encode a u64 value using variable-length encoding.
pub fn encode_u64(value: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(encoded_len_u64(value));
    encode_u64_into(value, &mut bytes);
    bytes
}

/// Append the encoding of `value` to `out`.
pub fn encode_u64_into(value: u64, out: &mut Vec<u8>) {
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80; // Set continuation bit
        }

        out.push(byte);

        if val == 0 {
            break;
        }
    }
}

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len_u64(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Decode a u64 value from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;
    let mut bytes_read = 0;

    for &byte in bytes {
        bytes_read += 1;

        // The tenth byte may only carry the single remaining bit.
        if (shift == 63 && (byte & 0x7E) != 0) || shift > 63 {
            return Err(AlignRankError::corrupt_statistics("VarInt overflow"));
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, bytes_read));
        }

        shift += 7;
    }

    Err(AlignRankError::corrupt_statistics("Incomplete VarInt"))
}

/// Write a variable-length encoded u64 to a writer.
pub fn write_u64<W: Write>(writer: &mut W, value: u64) -> Result<usize> {
    let bytes = encode_u64(value);
    writer.write_all(&bytes)?;
    Ok(bytes.len())
}

/// Read a variable-length encoded u64 from a reader.
pub fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0;

    loop {
        let byte = reader.read_u8()?;

        if (shift == 63 && (byte & 0x7E) != 0) || shift > 63 {
            return Err(AlignRankError::corrupt_statistics("VarInt overflow"));
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if (byte & 0x80) == 0 {
            return Ok(result);
        }

        shift += 7;
    }
}

/// A cursor decoding consecutive varints out of a borrowed buffer.
///
/// Used by decoders that must verify a buffer is consumed exactly.
#[derive(Debug, Clone)]
pub struct VarIntCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> VarIntCursor<'a> {
    /// Create a cursor positioned at the start of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        VarIntCursor { bytes, offset: 0 }
    }

    /// Decode the next u64.
    pub fn read_u64(&mut self) -> Result<u64> {
        let (value, read) = decode_u64(&self.bytes[self.offset..])?;
        self.offset += read;
        Ok(value)
    }

    /// Take the next `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                AlignRankError::corrupt_statistics(format!(
                    "frame of {len} bytes exceeds the {} remaining",
                    self.remaining()
                ))
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(AlignRankError::corrupt_statistics(format!(
                "{n} trailing bytes after decoding"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encode_decode_u64() {
        let test_values = [0, 1, 127, 128, 255, 256, 16383, 16384, u64::MAX];

        for &value in &test_values {
            let encoded = encode_u64(value);
            let (decoded, bytes_read) = decode_u64(&encoded).unwrap();

            assert_eq!(value, decoded);
            assert_eq!(encoded.len(), bytes_read);
            assert_eq!(encoded.len(), encoded_len_u64(value));
        }
    }

    #[test]
    fn test_write_read_u64() {
        let mut buffer = Vec::new();
        let value = 123456789012345u64;

        let bytes_written = write_u64(&mut buffer, value).unwrap();
        assert_eq!(bytes_written, buffer.len());

        let mut cursor = Cursor::new(buffer);
        let decoded = read_u64(&mut cursor).unwrap();

        assert_eq!(value, decoded);
    }

    #[test]
    fn test_encoding_efficiency() {
        assert_eq!(encode_u64(0).len(), 1);
        assert_eq!(encode_u64(127).len(), 1);
        assert_eq!(encode_u64(128).len(), 2);
        assert_eq!(encode_u64(16383).len(), 2);
        assert_eq!(encode_u64(16384).len(), 3);
        assert_eq!(encode_u64(u64::MAX).len(), MAX_VARINT_LEN_U64);
    }

    #[test]
    fn test_incomplete_varint() {
        let incomplete = vec![0x80]; // Continuation bit set but no more data
        assert!(matches!(
            decode_u64(&incomplete),
            Err(AlignRankError::CorruptStatistics(_))
        ));
        assert!(decode_u64(&[]).is_err());
    }

    #[test]
    fn test_overflow() {
        let overflow_data = vec![0xFF; 11];
        assert!(decode_u64(&overflow_data).is_err());

        // Ten bytes whose last byte carries more than the final bit.
        let mut too_wide = vec![0xFF; 9];
        too_wide.push(0x02);
        assert!(decode_u64(&too_wide).is_err());
    }

    #[test]
    fn test_cursor_exact_consumption() {
        let mut bytes = encode_u64(300);
        encode_u64_into(7, &mut bytes);

        let mut cursor = VarIntCursor::new(&bytes);
        assert_eq!(cursor.read_u64().unwrap(), 300);
        assert_eq!(cursor.read_u64().unwrap(), 7);
        assert!(cursor.finish().is_ok());

        let mut cursor = VarIntCursor::new(&bytes);
        assert_eq!(cursor.read_u64().unwrap(), 300);
        assert!(cursor.finish().is_err());
    }

    #[test]
    fn test_cursor_read_bytes_bounds() {
        let bytes = [1u8, 2, 3];
        let mut cursor = VarIntCursor::new(&bytes);
        assert_eq!(cursor.read_bytes(2).unwrap(), &[1, 2]);
        assert!(cursor.read_bytes(2).is_err());
        assert_eq!(cursor.remaining(), 1);
    }
}
