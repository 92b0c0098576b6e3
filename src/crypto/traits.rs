//! Curve abstraction shared by sr25519, ed25519 and ecdsa

use super::junction::Junction;
use super::CurveError;
use crate::types::Encryption;

/// A signature scheme with Substrate-style hierarchical derivation
pub trait SubstrateCurve {
    const ENCRYPTION: Encryption;

    /// Secret keypair; implementations zeroize on drop
    type Pair;

    /// Keypair from a 32-byte mini secret (the first half of the BIP-39 seed)
    fn from_mini_secret(mini_secret: &[u8; 32]) -> Result<Self::Pair, CurveError>;

    /// Child keypair for one junction
    fn derive(pair: &Self::Pair, junction: &Junction) -> Result<Self::Pair, CurveError>;

    /// Public key, `Encryption::public_len` bytes
    fn public(pair: &Self::Pair) -> Vec<u8>;

    /// Signature, `Encryption::signature_len` bytes
    fn sign(pair: &Self::Pair, message: &[u8]) -> Vec<u8>;

    fn verify(public: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CurveError>;
}
