//! SCALE compact integers
//!
//! The two low bits of the first byte select the mode:
//! - `0b00`: single byte, value in the upper six bits (0..=63)
//! - `0b01`: two bytes LE, value in the upper fourteen bits
//! - `0b10`: four bytes LE, value in the upper thirty bits
//! - `0b11`: big integer, upper six bits + 4 give the byte count that follows
//!
//! Decoding rejects encodings that are not the shortest possible one.

use parity_scale_codec::{Compact, Encode};

use super::cursor::Cursor;
use super::DecodeError;

/// Largest big-integer payload that fits `u128`
const MAX_BIG_INT_BYTES: usize = 16;

pub fn read_compact(cursor: &mut Cursor<'_>) -> Result<u128, DecodeError> {
    let first = cursor.peek_byte()?;
    match first & 0b11 {
        0b00 => {
            cursor.read_byte()?;
            Ok((first >> 2) as u128)
        }
        0b01 => {
            let value = (cursor.read_u16_le()? >> 2) as u128;
            if value < 0x40 {
                return Err(non_canonical(value));
            }
            Ok(value)
        }
        0b10 => {
            let value = (cursor.read_u32_le()? >> 2) as u128;
            if value < 0x4000 {
                return Err(non_canonical(value));
            }
            Ok(value)
        }
        _ => {
            let len = (first >> 2) as usize + 4;
            cursor.ensure(1 + len)?;
            if len > MAX_BIG_INT_BYTES {
                return Err(DecodeError::MalformedPayload(format!(
                    "compact integer of {} bytes exceeds 128 bits",
                    len
                )));
            }
            cursor.read_byte()?;
            let bytes = cursor.read_bytes(len)?;

            let mut value = 0u128;
            for (i, byte) in bytes.iter().enumerate() {
                value |= (*byte as u128) << (8 * i);
            }

            let minimal = if len == 4 {
                value >= 1 << 30
            } else {
                bytes[len - 1] != 0
            };
            if !minimal {
                return Err(non_canonical(value));
            }
            Ok(value)
        }
    }
}

/// Compact value used as a length or count
pub fn read_compact_len(cursor: &mut Cursor<'_>) -> Result<usize, DecodeError> {
    let value = read_compact(cursor)?;
    if value > u32::MAX as u128 {
        return Err(DecodeError::MalformedPayload(format!(
            "length prefix {} out of range",
            value
        )));
    }
    Ok(value as usize)
}

pub fn encode_compact(value: u128) -> Vec<u8> {
    Compact(value).encode()
}

/// Append a compact length prefix
pub fn push_compact_len(out: &mut Vec<u8>, len: usize) {
    Compact(len as u32).encode_to(out);
}

fn non_canonical(value: u128) -> DecodeError {
    DecodeError::MalformedPayload(format!("non-canonical compact encoding of {}", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parity_scale_codec::Decode;

    fn decode(bytes: &[u8]) -> Result<u128, DecodeError> {
        let mut cursor = Cursor::new(bytes);
        let value = read_compact(&mut cursor)?;
        assert!(cursor.is_empty(), "compact left unread bytes");
        Ok(value)
    }

    #[test]
    fn test_mode_boundaries() {
        let cases: [(u128, usize); 8] = [
            (0, 1),
            (63, 1),
            (64, 2),
            (16383, 2),
            (16384, 4),
            ((1 << 30) - 1, 4),
            (1 << 30, 5),
            (u128::MAX, 17),
        ];
        for (value, len) in cases {
            let encoded = encode_compact(value);
            assert_eq!(encoded.len(), len, "length for {}", value);
            assert_eq!(decode(&encoded).unwrap(), value);
        }
    }

    #[test]
    fn test_agrees_with_codec() {
        for value in [1u128, 100, 1_000_000, 10u128.pow(12), u64::MAX as u128 + 7] {
            let encoded = encode_compact(value);
            let reference = Compact::<u128>::decode(&mut &encoded[..]).unwrap().0;
            assert_eq!(decode(&encoded).unwrap(), reference);
        }
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(decode(&[0x04]).unwrap(), 1);
        assert_eq!(decode(&[0x15, 0x01]).unwrap(), 69);
        assert_eq!(decode(&[0x02, 0x09, 0x3d, 0x00]).unwrap(), 1_000_000);
    }

    #[test]
    fn test_non_canonical_rejected() {
        // 1 encoded in two-byte mode
        assert!(matches!(
            decode(&[0x05, 0x00]),
            Err(DecodeError::MalformedPayload(_))
        ));
        // 1 encoded in four-byte mode
        assert!(matches!(
            decode(&[0x06, 0x00, 0x00, 0x00]),
            Err(DecodeError::MalformedPayload(_))
        ));
        // big-integer mode with a zero top byte
        assert!(matches!(
            decode(&[0x07, 0x00, 0x00, 0x00, 0x40, 0x00]),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_truncated_modes() {
        for bytes in [&[0x01][..], &[0x02, 0x00][..], &[0x03, 0x00, 0x00][..], &[][..]] {
            assert!(
                matches!(decode(bytes), Err(DecodeError::Truncated { .. })),
                "{:?}",
                bytes
            );
        }
    }

    #[test]
    fn test_too_wide_rejected() {
        let mut bytes = vec![0xffu8];
        bytes.extend_from_slice(&[0xff; 67]);
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_len_range() {
        let encoded = encode_compact(u32::MAX as u128 + 1);
        let mut cursor = Cursor::new(&encoded);
        assert!(read_compact_len(&mut cursor).is_err());
    }
}
