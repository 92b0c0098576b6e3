//! Derivation junctions
//!
//! Each `/soft` or `//hard` path segment becomes a 32-byte chain code:
//! - a decimal segment that fits `u64` is its little-endian encoding
//! - anything else is the SCALE-encoded string
//! - codes longer than 32 bytes are replaced by their blake2b-256 hash,
//!   shorter ones are zero padded

use parity_scale_codec::Encode;

use crate::utils::crypto::blake2_256;

pub const JUNCTION_ID_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Junction {
    Soft([u8; JUNCTION_ID_LEN]),
    Hard([u8; JUNCTION_ID_LEN]),
}

impl Junction {
    pub fn soft(segment: &str) -> Self {
        Junction::Soft(chain_code(segment))
    }

    pub fn hard(segment: &str) -> Self {
        Junction::Hard(chain_code(segment))
    }

    pub fn is_hard(&self) -> bool {
        matches!(self, Junction::Hard(_))
    }

    pub fn chain_code(&self) -> &[u8; JUNCTION_ID_LEN] {
        match self {
            Junction::Soft(cc) | Junction::Hard(cc) => cc,
        }
    }
}

fn chain_code(segment: &str) -> [u8; JUNCTION_ID_LEN] {
    let encoded = match segment.parse::<u64>() {
        Ok(n) => n.encode(),
        Err(_) => segment.encode(),
    };

    let mut cc = [0u8; JUNCTION_ID_LEN];
    if encoded.len() > JUNCTION_ID_LEN {
        cc = blake2_256(&encoded);
    } else {
        cc[..encoded.len()].copy_from_slice(&encoded);
    }
    cc
}
