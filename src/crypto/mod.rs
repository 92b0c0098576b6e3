//! Substrate key schemes
//!
//! - `sr25519`: default for Substrate accounts, hard and soft junctions
//! - `ed25519`: hard junctions only
//! - `ecdsa`: secp256k1, hard junctions only, 33-byte keys
//!
//! All schemes implement [`SubstrateCurve`]; the free functions here
//! dispatch on [`Encryption`] so callers never name a curve type.

pub mod ecdsa;
pub mod ed25519;
pub mod junction;
pub mod sr25519;
pub mod traits;

pub use ecdsa::{ethereum_address, Ecdsa};
pub use ed25519::Ed25519;
pub use junction::Junction;
pub use sr25519::Sr25519;
pub use traits::SubstrateCurve;

use thiserror::Error;

use crate::types::Encryption;
use crate::utils::crypto::blake2_256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("invalid seed: {0}")]
    InvalidSeed(String),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("{0} does not support soft derivation")]
    SoftDerivationUnsupported(Encryption),
    #[error("hard junctions need the secret key")]
    HardFromPublic,
}

fn derive_pair<C: SubstrateCurve>(
    mini_secret: &[u8; 32],
    junctions: &[Junction],
) -> Result<C::Pair, CurveError> {
    let mut pair = C::from_mini_secret(mini_secret)?;
    for junction in junctions {
        pair = C::derive(&pair, junction)?;
    }
    Ok(pair)
}

fn public_of<C: SubstrateCurve>(
    mini_secret: &[u8; 32],
    junctions: &[Junction],
) -> Result<Vec<u8>, CurveError> {
    derive_pair::<C>(mini_secret, junctions).map(|pair| C::public(&pair))
}

fn sign_with<C: SubstrateCurve>(
    mini_secret: &[u8; 32],
    junctions: &[Junction],
    message: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), CurveError> {
    let pair = derive_pair::<C>(mini_secret, junctions)?;
    Ok((C::public(&pair), C::sign(&pair, message)))
}

/// Public key at the end of a junction chain
pub fn derive_public(
    encryption: Encryption,
    mini_secret: &[u8; 32],
    junctions: &[Junction],
) -> Result<Vec<u8>, CurveError> {
    match encryption {
        Encryption::Sr25519 => public_of::<Sr25519>(mini_secret, junctions),
        Encryption::Ed25519 => public_of::<Ed25519>(mini_secret, junctions),
        Encryption::Ecdsa => public_of::<Ecdsa>(mini_secret, junctions),
    }
}

/// Derive, sign, and drop the derived secret. Returns `(public, signature)`.
pub fn derive_and_sign(
    encryption: Encryption,
    mini_secret: &[u8; 32],
    junctions: &[Junction],
    message: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), CurveError> {
    match encryption {
        Encryption::Sr25519 => sign_with::<Sr25519>(mini_secret, junctions, message),
        Encryption::Ed25519 => sign_with::<Ed25519>(mini_secret, junctions, message),
        Encryption::Ecdsa => sign_with::<Ecdsa>(mini_secret, junctions, message),
    }
}

/// 32-byte `AccountId` of a public key; ecdsa accounts hash the compressed key
pub fn account_id(encryption: Encryption, public: &[u8]) -> Vec<u8> {
    match encryption {
        Encryption::Ecdsa => blake2_256(public).to_vec(),
        Encryption::Ed25519 | Encryption::Sr25519 => public.to_vec(),
    }
}

pub fn verify(
    encryption: Encryption,
    public: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool, CurveError> {
    match encryption {
        Encryption::Sr25519 => Sr25519::verify(public, message, signature),
        Encryption::Ed25519 => Ed25519::verify(public, message, signature),
        Encryption::Ecdsa => Ecdsa::verify(public, message, signature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: [u8; 32] = [3u8; 32];

    #[test]
    fn test_sign_matches_derived_public() {
        let path = [Junction::hard("westend"), Junction::soft("0")];
        let public = derive_public(Encryption::Sr25519, &SEED, &path).unwrap();
        let (signer, sig) = derive_and_sign(Encryption::Sr25519, &SEED, &path, b"msg").unwrap();

        assert_eq!(public, signer);
        assert!(verify(Encryption::Sr25519, &public, b"msg", &sig).unwrap());
    }

    #[test]
    fn test_schemes_give_different_keys() {
        let sr = derive_public(Encryption::Sr25519, &SEED, &[]).unwrap();
        let ed = derive_public(Encryption::Ed25519, &SEED, &[]).unwrap();
        assert_ne!(sr, ed);
    }

    #[test]
    fn test_ecdsa_dispatch() {
        let path = [Junction::hard("westend")];
        let public = derive_public(Encryption::Ecdsa, &SEED, &path).unwrap();
        assert_eq!(public.len(), Encryption::Ecdsa.public_len());

        let (signer, sig) = derive_and_sign(Encryption::Ecdsa, &SEED, &path, b"msg").unwrap();
        assert_eq!(public, signer);
        assert_eq!(sig.len(), Encryption::Ecdsa.signature_len());
        assert!(verify(Encryption::Ecdsa, &public, b"msg", &sig).unwrap());
    }

    #[test]
    fn test_account_id() {
        let sr = derive_public(Encryption::Sr25519, &SEED, &[]).unwrap();
        assert_eq!(account_id(Encryption::Sr25519, &sr), sr);

        let ecdsa = derive_public(Encryption::Ecdsa, &SEED, &[]).unwrap();
        let id = account_id(Encryption::Ecdsa, &ecdsa);
        assert_eq!(id.len(), 32);
        assert_eq!(id, blake2_256(&ecdsa).to_vec());
    }

    #[test]
    fn test_ed25519_soft_path_rejected() {
        let err = derive_public(Encryption::Ed25519, &SEED, &[Junction::soft("x")]).unwrap_err();
        assert!(matches!(err, CurveError::SoftDerivationUnsupported(_)));
    }
}
