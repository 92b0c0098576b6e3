//! Hashing and hex helpers shared by the registry, signer and codec.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Blake2b512, Digest};

type Blake2b256 = Blake2b<U32>;

/// Blake2b-256 hash (Substrate `blake2_256`)
pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Blake2b-512 over several chunks, used by the SS58 checksum
pub fn blake2_512_concat(parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Decode hexadecimal `&str` into `Vec<u8>`, accepting an optional `0x` prefix
pub fn unhex(hex_entry: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let trimmed = hex_entry.trim();
    let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake2_256_empty() {
        // Known answer for blake2b-256("")
        assert_eq!(
            hex::encode(blake2_256(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn test_unhex_prefix() {
        assert_eq!(unhex("0x0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert_eq!(unhex("0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert!(unhex("0xzz").is_err());
    }
}
