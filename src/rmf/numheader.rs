//! Self-delimiting message length prefix ("numheader").
//!
//! One byte when the length is below 128 (top bit clear, value in the
//! remaining 7 bits). Otherwise four bytes: byte 0's top bit is set to mark
//! the long form, and the 31-bit value is packed across the four bytes
//! least-significant-chunk-first — 7 bits in byte 0, then 8 bits in each of
//! bytes 1-3. Per spec.md §9(iii) this crate only implements the 32-bit form;
//! callers that need to advertise header width do so via `Config`.

use crate::error::{ApxError, Result};

const SHORT_FORM_LIMIT: u32 = 128;
const LONG_FORM_MARKER: u8 = 0x80;
const LONG_FORM_MAX: u32 = 0x7FFF_FFFF;

/// Encode `len` as a numheader, choosing the 1-byte form when possible.
pub fn encode_numheader(len: u32) -> Result<Vec<u8>> {
    if len < SHORT_FORM_LIMIT {
        return Ok(vec![len as u8]);
    }
    if len > LONG_FORM_MAX {
        return Err(ApxError::NumberTooLarge);
    }
    let b0 = LONG_FORM_MARKER | (len & 0x7F) as u8;
    let b1 = ((len >> 7) & 0xFF) as u8;
    let b2 = ((len >> 15) & 0xFF) as u8;
    let b3 = ((len >> 23) & 0xFF) as u8;
    Ok(vec![b0, b1, b2, b3])
}

/// Decode a numheader from the front of `buf`, returning the length and the
/// number of bytes consumed (1 or 4).
pub fn decode_numheader(buf: &[u8]) -> Result<(u32, usize)> {
    let b0 = *buf.first().ok_or(ApxError::InvalidHeader)?;
    if b0 & LONG_FORM_MARKER == 0 {
        return Ok((b0 as u32, 1));
    }
    if buf.len() < 4 {
        return Err(ApxError::InvalidHeader);
    }
    let value = (b0 & 0x7F) as u32 | (buf[1] as u32) << 7 | (buf[2] as u32) << 15 | (buf[3] as u32) << 23;
    Ok((value, 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_round_trip() {
        for len in [0u32, 1, 42, 127] {
            let encoded = encode_numheader(len).unwrap();
            assert_eq!(encoded.len(), 1);
            let (decoded, consumed) = decode_numheader(&encoded).unwrap();
            assert_eq!(decoded, len);
            assert_eq!(consumed, 1);
        }
    }

    #[test]
    fn long_form_round_trip() {
        for len in [128u32, 1000, 70_000, LONG_FORM_MAX] {
            let encoded = encode_numheader(len).unwrap();
            assert_eq!(encoded.len(), 4);
            assert_ne!(encoded[0] & LONG_FORM_MARKER, 0);
            let (decoded, consumed) = decode_numheader(&encoded).unwrap();
            assert_eq!(decoded, len);
            assert_eq!(consumed, 4);
        }
    }

    #[test]
    fn oversized_length_rejected() {
        assert_eq!(encode_numheader(LONG_FORM_MAX + 1), Err(ApxError::NumberTooLarge));
    }

    #[test]
    fn truncated_long_form_rejected() {
        assert_eq!(decode_numheader(&[0x80, 0x00]), Err(ApxError::InvalidHeader));
        assert_eq!(decode_numheader(&[]), Err(ApxError::InvalidHeader));
    }
}
