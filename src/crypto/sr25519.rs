//! Sr25519 (Schnorr on Ristretto255)
//!
//! Default scheme for Substrate accounts. Supports hard and soft junctions.

use schnorrkel::{
    derive::{ChainCode, Derivation},
    signing_context, ExpansionMode, Keypair, MiniSecretKey, PublicKey, Signature,
};

use super::junction::Junction;
use super::traits::SubstrateCurve;
use super::CurveError;
use crate::types::Encryption;

/// Substrate signing context
const SIGNING_CONTEXT: &[u8] = b"substrate";

pub struct Sr25519;

impl SubstrateCurve for Sr25519 {
    const ENCRYPTION: Encryption = Encryption::Sr25519;
    type Pair = Keypair;

    fn from_mini_secret(mini_secret: &[u8; 32]) -> Result<Keypair, CurveError> {
        let mini = MiniSecretKey::from_bytes(mini_secret)
            .map_err(|e| CurveError::InvalidSeed(format!("{:?}", e)))?;
        Ok(mini.expand_to_keypair(ExpansionMode::Ed25519))
    }

    fn derive(pair: &Keypair, junction: &Junction) -> Result<Keypair, CurveError> {
        let cc = ChainCode(*junction.chain_code());
        let child = match junction {
            Junction::Hard(_) => pair
                .secret
                .hard_derive_mini_secret_key(Some(cc), b"")
                .0
                .expand_to_keypair(ExpansionMode::Ed25519),
            Junction::Soft(_) => pair.derived_key_simple(cc, []).0,
        };
        Ok(child)
    }

    fn public(pair: &Keypair) -> Vec<u8> {
        pair.public.to_bytes().to_vec()
    }

    fn sign(pair: &Keypair, message: &[u8]) -> Vec<u8> {
        let context = signing_context(SIGNING_CONTEXT);
        pair.sign(context.bytes(message)).to_bytes().to_vec()
    }

    fn verify(public: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CurveError> {
        let pk = PublicKey::from_bytes(public)
            .map_err(|e| CurveError::InvalidPublicKey(format!("{:?}", e)))?;
        let sig = Signature::from_bytes(signature)
            .map_err(|e| CurveError::InvalidSignature(format!("{:?}", e)))?;
        Ok(pk.verify_simple(SIGNING_CONTEXT, message, &sig).is_ok())
    }
}

impl Sr25519 {
    /// Soft derivation from a public key alone
    pub fn derive_public_soft(public: &[u8], junction: &Junction) -> Result<Vec<u8>, CurveError> {
        if junction.is_hard() {
            return Err(CurveError::HardFromPublic);
        }
        let pk = PublicKey::from_bytes(public)
            .map_err(|e| CurveError::InvalidPublicKey(format!("{:?}", e)))?;
        let (child, _) = pk.derived_key_simple(ChainCode(*junction.chain_code()), []);
        Ok(child.to_bytes().to_vec())
    }
}
