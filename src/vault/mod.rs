//! Key Vault
//!
//! Holds BIP-39 seeds encrypted under a key derived from an opaque
//! authentication proof, and derives/signs with Substrate-style keys.
//!
//! # Security
//!
//! - Seeds are sealed with AES-256-GCM; the key-encryption key comes from
//!   Argon2id over the proof and never touches persisted state
//! - Decrypted phrases and derived secrets are zeroized after every call
//! - Public information about used derivations is kept in the clear so an
//!   incoming request's author can be recognised while locked

pub mod cipher;
pub mod derivation;
pub mod handle;
pub mod secure_memory;
pub mod store;

pub use derivation::DerivationPath;
pub use handle::VaultHandle;
pub use secure_memory::{SecureBuffer, SecureString};
pub use store::{SeedEntry, Vault, VaultState};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::CurveError;
use crate::serde_bytes::hex_vec;
use crate::types::Encryption;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("authentication failed")]
    AuthFailed,
    #[error("vault is locked")]
    VaultLocked,
    #[error("seed not found: {0}")]
    SeedNotFound(String),
    #[error("seed already exists: {0}")]
    SeedExists(String),
    #[error("invalid derivation path: {0}")]
    InvalidPath(String),
    #[error("key does not belong to this vault")]
    KeyMismatch,
    #[error("password-protected key needs the secondary secret")]
    PasswordRequired,
    #[error("invalid seed phrase: {0}")]
    InvalidSeedPhrase(String),
    #[error("proof must be at least {0} bytes")]
    WeakProof(usize),
    #[error("invalid vault state: {0}")]
    InvalidState(String),
    #[error("crypto error: {0}")]
    Crypto(String),
}

impl From<CurveError> for VaultError {
    fn from(e: CurveError) -> Self {
        match e {
            CurveError::SoftDerivationUnsupported(_) => VaultError::InvalidPath(e.to_string()),
            other => VaultError::Crypto(other.to_string()),
        }
    }
}

/// Authentication proof handed over by the platform (PIN hash, biometric
/// token) plus an optional secondary secret for password-protected paths
#[derive(Debug, Clone)]
pub struct AuthProof {
    token: SecureBuffer,
    secondary: Option<SecureString>,
}

impl AuthProof {
    pub fn new(token: &[u8]) -> Self {
        Self {
            token: SecureBuffer::from_bytes(token),
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secret: &str) -> Self {
        self.secondary = Some(SecureString::new(secret));
        self
    }

    pub fn token(&self) -> &[u8] {
        self.token.as_bytes()
    }

    pub fn secondary(&self) -> Option<&str> {
        self.secondary.as_ref().map(|s| s.as_str())
    }
}

/// Public half of a derived key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedKey {
    /// Path without the password part
    pub derivation_path: String,
    #[serde(with = "hex_vec")]
    pub public_key: Vec<u8>,
    pub encryption: Encryption,
    pub has_pwd: bool,
}

impl DerivedKey {
    /// Same derivation under the same scheme
    pub fn same_slot(&self, path: &str, encryption: Encryption) -> bool {
        self.derivation_path == path && self.encryption == encryption
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub encryption: Encryption,
    #[serde(with = "hex_vec")]
    pub bytes: Vec<u8>,
}

impl Signature {
    /// SCALE `MultiSignature`: scheme byte then the raw signature
    pub fn to_multi_signature(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.bytes.len());
        out.push(self.encryption.to_byte());
        out.extend_from_slice(&self.bytes);
        out
    }
}
