//! Ed25519 (RFC 8032)
//!
//! Only hard junctions exist: the child seed is
//! `blake2_256(SCALE("Ed25519HDKD", parent_seed, chain_code))`.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use parity_scale_codec::Encode;
use zeroize::Zeroizing;

use super::junction::Junction;
use super::traits::SubstrateCurve;
use super::CurveError;
use crate::types::Encryption;
use crate::utils::crypto::blake2_256;

const HDKD_TAG: &str = "Ed25519HDKD";

pub struct Ed25519;

impl SubstrateCurve for Ed25519 {
    const ENCRYPTION: Encryption = Encryption::Ed25519;
    type Pair = SigningKey;

    fn from_mini_secret(mini_secret: &[u8; 32]) -> Result<SigningKey, CurveError> {
        Ok(SigningKey::from_bytes(mini_secret))
    }

    fn derive(pair: &SigningKey, junction: &Junction) -> Result<SigningKey, CurveError> {
        match junction {
            Junction::Hard(cc) => {
                let parent = Zeroizing::new(pair.to_bytes());
                let preimage = Zeroizing::new((HDKD_TAG, *parent, *cc).encode());
                let child = Zeroizing::new(blake2_256(&preimage));
                Ok(SigningKey::from_bytes(&child))
            }
            Junction::Soft(_) => Err(CurveError::SoftDerivationUnsupported(Self::ENCRYPTION)),
        }
    }

    fn public(pair: &SigningKey) -> Vec<u8> {
        pair.verifying_key().to_bytes().to_vec()
    }

    fn sign(pair: &SigningKey, message: &[u8]) -> Vec<u8> {
        pair.sign(message).to_bytes().to_vec()
    }

    fn verify(public: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CurveError> {
        let public: &[u8; 32] = public.try_into().map_err(|_| {
            CurveError::InvalidPublicKey(format!("expected 32 bytes, got {}", public.len()))
        })?;
        let key = VerifyingKey::from_bytes(public)
            .map_err(|e| CurveError::InvalidPublicKey(e.to_string()))?;
        let sig = Signature::from_slice(signature)
            .map_err(|e| CurveError::InvalidSignature(e.to_string()))?;
        Ok(key.verify(message, &sig).is_ok())
    }
}
