//! Transaction extensions
//!
//! Chain-convention layout following the call in a signing payload:
//! `era | Compact nonce | Compact tip | u32 spec_version | u32 tx_version |
//! [u8; 32] genesis hash | [u8; 32] block hash`.

use serde::{Deserialize, Serialize};

use super::compact::{encode_compact, read_compact};
use super::cursor::Cursor;
use super::DecodeError;

/// Transaction mortality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Era {
    Immortal,
    /// Valid for `period` blocks starting from the block whose number is
    /// congruent to `phase` modulo `period`
    Mortal { period: u64, phase: u64 },
}

impl Era {
    /// Mortal era for `period` blocks (rounded to a power of two in 4..=65536)
    /// starting at `current_block`
    pub fn mortal(period: u64, current_block: u64) -> Self {
        let period = period.clamp(4, 1 << 16).next_power_of_two();
        let phase = current_block % period;
        let quantize = (period >> 12).max(1);
        Era::Mortal {
            period,
            phase: phase / quantize * quantize,
        }
    }

    pub fn is_immortal(&self) -> bool {
        matches!(self, Era::Immortal)
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Era::Immortal => vec![0x00],
            Era::Mortal { period, phase } => {
                let quantize = (*period >> 12).max(1);
                let encoded_period = period.trailing_zeros().saturating_sub(1).clamp(1, 15) as u16;
                let quantized_phase = (*phase / quantize) as u16;
                (encoded_period | (quantized_phase << 4)).to_le_bytes().to_vec()
            }
        }
    }

    pub fn read(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        if cursor.peek_byte()? == 0 {
            cursor.read_byte()?;
            return Ok(Era::Immortal);
        }
        let encoded = cursor.read_u16_le()? as u64;
        let period = 2u64 << (encoded % (1 << 4));
        let quantize = (period >> 12).max(1);
        let phase = (encoded >> 4) * quantize;
        if period >= 4 && phase < period {
            Ok(Era::Mortal { period, phase })
        } else {
            Err(DecodeError::MalformedPayload(format!(
                "invalid mortal era {:#06x}",
                encoded
            )))
        }
    }

    /// First block of the validity window that contains `current`
    pub fn birth(&self, current: u64) -> u64 {
        match self {
            Era::Immortal => 0,
            Era::Mortal { period, phase } => {
                (current.max(*phase) - phase) / period * period + phase
            }
        }
    }

    /// First block after the validity window
    pub fn death(&self, current: u64) -> u64 {
        match self {
            Era::Immortal => u64::MAX,
            Era::Mortal { period, .. } => self.birth(current) + period,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extensions {
    pub era: Era,
    pub nonce: u64,
    pub tip: u128,
    pub spec_version: u32,
    pub tx_version: u32,
    #[serde(with = "crate::serde_bytes::hex32")]
    pub genesis_hash: [u8; 32],
    /// Immortal transactions carry the genesis hash here
    #[serde(with = "crate::serde_bytes::hex32")]
    pub block_hash: [u8; 32],
}

impl Extensions {
    /// Decode exactly one extension block
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(bytes);
        let extensions = Self::read(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(DecodeError::MalformedPayload(format!(
                "{} trailing bytes after extensions",
                cursor.remaining()
            )));
        }
        Ok(extensions)
    }

    pub fn read(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let era = Era::read(cursor)?;
        let nonce = read_compact(cursor)?;
        let nonce = u64::try_from(nonce)
            .map_err(|_| DecodeError::MalformedPayload(format!("nonce {} overflows u64", nonce)))?;
        let tip = read_compact(cursor)?;
        let spec_version = cursor.read_u32_le()?;
        let tx_version = cursor.read_u32_le()?;
        let genesis_hash = cursor.read_array()?;
        let block_hash = cursor.read_array()?;

        Ok(Self {
            era,
            nonce,
            tip,
            spec_version,
            tx_version,
            genesis_hash,
            block_hash,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.signed_extra();
        out.extend_from_slice(&self.spec_version.to_le_bytes());
        out.extend_from_slice(&self.tx_version.to_le_bytes());
        out.extend_from_slice(&self.genesis_hash);
        out.extend_from_slice(&self.block_hash);
        out
    }

    /// Era, nonce and tip: the part carried inside a signed extrinsic
    pub fn signed_extra(&self) -> Vec<u8> {
        let mut out = self.era.encode();
        out.extend(encode_compact(self.nonce as u128));
        out.extend(encode_compact(self.tip));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(era: Era) -> Extensions {
        Extensions {
            era,
            nonce: 261,
            tip: 10_000_000,
            spec_version: 9430,
            tx_version: 22,
            genesis_hash: [0xe1; 32],
            block_hash: [0x98; 32],
        }
    }

    #[test]
    fn test_immortal_era() {
        assert_eq!(Era::Immortal.encode(), vec![0x00]);
        let mut cursor = Cursor::new(&[0x00]);
        assert_eq!(Era::read(&mut cursor).unwrap(), Era::Immortal);
    }

    #[test]
    fn test_mortal_era_roundtrip() {
        let era = Era::mortal(64, 4_398_123);
        let encoded = era.encode();
        assert_eq!(encoded.len(), 2);
        let mut cursor = Cursor::new(&encoded);
        assert_eq!(Era::read(&mut cursor).unwrap(), era);
    }

    #[test]
    fn test_known_mortal_encoding() {
        // period 64, phase 42
        let era = Era::Mortal {
            period: 64,
            phase: 42,
        };
        assert_eq!(era.encode(), vec![0xa5, 0x02]);
        assert_eq!(era.birth(106), 106);
        assert_eq!(era.death(106), 170);
    }

    #[test]
    fn test_long_period_quantized() {
        let era = Era::mortal(65536, 70_000);
        let encoded = era.encode();
        let mut cursor = Cursor::new(&encoded[..]);
        assert_eq!(Era::read(&mut cursor).unwrap(), era);
        if let Era::Mortal { phase, .. } = era {
            assert_eq!(phase % 16, 0);
        }
    }

    #[test]
    fn test_invalid_era_rejected() {
        // period 2 (encoded 0) is below the minimum of 4
        let mut cursor = Cursor::new(&[0x10, 0x00]);
        assert!(matches!(
            Era::read(&mut cursor),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_extensions_roundtrip() {
        for era in [Era::Immortal, Era::mortal(64, 100)] {
            let ext = sample(era);
            let bytes = ext.encode();
            assert_eq!(Extensions::decode(&bytes).unwrap(), ext);
        }
    }

    #[test]
    fn test_extensions_truncated_and_trailing() {
        let bytes = sample(Era::Immortal).encode();
        for cut in 0..bytes.len() {
            assert!(matches!(
                Extensions::decode(&bytes[..cut]),
                Err(DecodeError::Truncated { .. })
            ));
        }
        let mut extra = bytes.clone();
        extra.push(1);
        assert!(matches!(
            Extensions::decode(&extra),
            Err(DecodeError::MalformedPayload(_))
        ));
    }
}
