//! SS58 addresses
//!
//! `base58(prefix || public_key || blake2b-512("SS58PRE" || prefix || public_key)[..2])`
//! with a one-byte prefix for network ids below 64 and a two-byte prefix up
//! to 16383. Bodies are 32-byte keys, or 33-byte compressed ecdsa keys.

use thiserror::Error;

use crate::utils::crypto::blake2_512_concat;

const SS58_PREFIX: &[u8] = b"SS58PRE";
const CHECKSUM_LEN: usize = 2;
pub const MAX_NETWORK_ID: u16 = 16383;
const BODY_LENS: [usize; 2] = [32, 33];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58: {0}")]
    InvalidBase58(String),
    #[error("invalid address length {0}")]
    BadLength(usize),
    #[error("checksum mismatch")]
    BadChecksum,
    #[error("network id {0} out of range")]
    UnsupportedPrefix(u16),
}

fn checksum(body: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = blake2_512_concat(&[SS58_PREFIX, body]);
    [hash[0], hash[1]]
}

fn prefix_bytes(network_id: u16) -> Result<Vec<u8>, AddressError> {
    match network_id {
        0..=63 => Ok(vec![network_id as u8]),
        64..=MAX_NETWORK_ID => {
            let first = ((network_id & 0x00FC) >> 2) as u8 | 0x40;
            let second = ((network_id >> 8) as u8) | (((network_id & 0x0003) << 6) as u8);
            Ok(vec![first, second])
        }
        _ => Err(AddressError::UnsupportedPrefix(network_id)),
    }
}

pub fn to_ss58(public_key: &[u8], network_id: u16) -> Result<String, AddressError> {
    if !BODY_LENS.contains(&public_key.len()) {
        return Err(AddressError::BadLength(public_key.len()));
    }
    let mut payload = prefix_bytes(network_id)?;
    payload.extend_from_slice(public_key);
    let check = checksum(&payload);
    payload.extend_from_slice(&check);
    Ok(bs58::encode(payload).into_string())
}

/// Decode an address into `(network_id, public_key)`
pub fn from_ss58(address: &str) -> Result<(u16, Vec<u8>), AddressError> {
    let data = bs58::decode(address)
        .into_vec()
        .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;

    let (network_id, prefix_len) = match data.first() {
        Some(&b) if b < 64 => (b as u16, 1),
        Some(&b) if b < 128 => {
            let second = *data.get(1).ok_or(AddressError::BadLength(data.len()))?;
            let lower = ((b as u16) << 2) | ((second as u16) >> 6);
            let upper = (second as u16) & 0x3F;
            ((lower & 0x00FF) | (upper << 8), 2)
        }
        Some(_) => return Err(AddressError::InvalidBase58("reserved prefix".to_string())),
        None => return Err(AddressError::BadLength(0)),
    };

    let key_len = data
        .len()
        .checked_sub(prefix_len + CHECKSUM_LEN)
        .filter(|len| BODY_LENS.contains(len))
        .ok_or(AddressError::BadLength(data.len()))?;
    let body_len = prefix_len + key_len;
    if checksum(&data[..body_len]) != data[body_len..] {
        return Err(AddressError::BadChecksum);
    }

    Ok((network_id, data[prefix_len..body_len].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development account
    const ALICE: &str = "d43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";

    fn alice() -> [u8; 32] {
        hex::decode(ALICE).unwrap().try_into().unwrap()
    }

    #[test]
    fn test_generic_substrate_address() {
        assert_eq!(
            to_ss58(&alice(), 42).unwrap(),
            "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY"
        );
    }

    #[test]
    fn test_polkadot_address() {
        assert_eq!(
            to_ss58(&alice(), 0).unwrap(),
            "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5"
        );
    }

    #[test]
    fn test_two_byte_prefix_roundtrip() {
        for id in [64u16, 255, 1284, MAX_NETWORK_ID] {
            let address = to_ss58(&alice(), id).unwrap();
            assert_eq!(from_ss58(&address).unwrap(), (id, alice().to_vec()));
        }
    }

    #[test]
    fn test_compressed_key_roundtrip() {
        let mut key = vec![0x02];
        key.extend_from_slice(&alice());
        let address = to_ss58(&key, 42).unwrap();
        assert_eq!(from_ss58(&address).unwrap(), (42, key));
        assert_eq!(to_ss58(&[1u8; 20], 42), Err(AddressError::BadLength(20)));
    }

    #[test]
    fn test_prefix_out_of_range() {
        assert_eq!(
            to_ss58(&alice(), 16384),
            Err(AddressError::UnsupportedPrefix(16384))
        );
    }

    #[test]
    fn test_corrupted_address() {
        let mut address = to_ss58(&alice(), 42).unwrap();
        address.pop();
        address.push('Z');
        assert!(from_ss58(&address).is_err());
        assert!(matches!(from_ss58("0OIl"), Err(AddressError::InvalidBase58(_))));
    }
}
