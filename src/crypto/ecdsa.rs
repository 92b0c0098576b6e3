//! ECDSA over secp256k1
//!
//! Substrate flavour: messages are hashed with blake2b-256, signatures are
//! 65 bytes (`r || s || recovery id`) and public keys are 33-byte compressed
//! points. Only hard junctions exist:
//! `blake2_256(SCALE("Secp256k1HDKD", parent_secret, chain_code))`.

use parity_scale_codec::Encode;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use tiny_keccak::{Hasher, Keccak};
use zeroize::Zeroizing;

use super::junction::Junction;
use super::traits::SubstrateCurve;
use super::CurveError;
use crate::types::Encryption;
use crate::utils::crypto::blake2_256;

const HDKD_TAG: &str = "Secp256k1HDKD";

pub const PUBLIC_LEN: usize = 33;
pub const SIGNATURE_LEN: usize = 65;

pub struct Ecdsa;

/// Secret key that is erased on drop
pub struct EcdsaPair(SecretKey);

impl Drop for EcdsaPair {
    fn drop(&mut self) {
        self.0.non_secure_erase();
    }
}

impl SubstrateCurve for Ecdsa {
    const ENCRYPTION: Encryption = Encryption::Ecdsa;
    type Pair = EcdsaPair;

    fn from_mini_secret(mini_secret: &[u8; 32]) -> Result<EcdsaPair, CurveError> {
        SecretKey::from_slice(mini_secret)
            .map(EcdsaPair)
            .map_err(|e| CurveError::InvalidSeed(e.to_string()))
    }

    fn derive(pair: &EcdsaPair, junction: &Junction) -> Result<EcdsaPair, CurveError> {
        match junction {
            Junction::Hard(cc) => {
                let parent = Zeroizing::new(pair.0.secret_bytes());
                let preimage = Zeroizing::new((HDKD_TAG, *parent, *cc).encode());
                let child = Zeroizing::new(blake2_256(&preimage));
                Self::from_mini_secret(&child)
            }
            Junction::Soft(_) => Err(CurveError::SoftDerivationUnsupported(Self::ENCRYPTION)),
        }
    }

    fn public(pair: &EcdsaPair) -> Vec<u8> {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &pair.0).serialize().to_vec()
    }

    fn sign(pair: &EcdsaPair, message: &[u8]) -> Vec<u8> {
        let secp = Secp256k1::new();
        let digest = Message::from_digest(blake2_256(message));
        let (recovery_id, compact) = secp
            .sign_ecdsa_recoverable(&digest, &pair.0)
            .serialize_compact();

        let mut out = Vec::with_capacity(SIGNATURE_LEN);
        out.extend_from_slice(&compact);
        out.push(recovery_id.to_i32() as u8);
        out
    }

    fn verify(public: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CurveError> {
        if public.len() != PUBLIC_LEN {
            return Err(CurveError::InvalidPublicKey(format!(
                "expected {} bytes, got {}",
                PUBLIC_LEN,
                public.len()
            )));
        }
        if signature.len() != SIGNATURE_LEN {
            return Err(CurveError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                SIGNATURE_LEN,
                signature.len()
            )));
        }

        let recovery_id = RecoveryId::from_i32(i32::from(signature[64]))
            .map_err(|e| CurveError::InvalidSignature(e.to_string()))?;
        let sig = RecoverableSignature::from_compact(&signature[..64], recovery_id)
            .map_err(|e| CurveError::InvalidSignature(e.to_string()))?;

        let secp = Secp256k1::new();
        let digest = Message::from_digest(blake2_256(message));
        Ok(match secp.recover_ecdsa(&digest, &sig) {
            Ok(recovered) => recovered.serialize()[..] == *public,
            Err(_) => false,
        })
    }
}

/// EIP-55 checksummed Ethereum address of a compressed secp256k1 key
pub fn ethereum_address(public: &[u8]) -> Result<String, CurveError> {
    let key =
        PublicKey::from_slice(public).map_err(|e| CurveError::InvalidPublicKey(e.to_string()))?;
    let uncompressed = key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    Ok(checksum_address(&hash[12..]))
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut out);
    out
}

fn checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
