//! Authenticated encryption for vault contents
//!
//! - Argon2id turns the unlock proof into a 32-byte key-encryption key
//! - AES-256-GCM seals each seed with a fresh random nonce
//!
//! Sealed values are stored as base64 so the persisted state stays JSON.

#![allow(deprecated)] // GenericArray::from_slice deprecated in generic-array 1.x

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::VaultError;
use crate::utils::settings::KdfParams;

pub const KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Nonce and ciphertext (tag included), both base64
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBox {
    pub nonce: String,
    pub ciphertext: String,
}

pub fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive the key-encryption key from an opaque proof
pub fn derive_kek(
    proof: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, VaultError> {
    use argon2::{Algorithm, Argon2, Params, Version};

    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| VaultError::Crypto(format!("invalid KDF params: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(proof, salt, &mut *key)
        .map_err(|e| VaultError::Crypto(format!("key derivation failed: {}", e)))?;
    Ok(key)
}

pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<SealedBox, VaultError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::Crypto(format!("failed to create cipher: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Crypto(format!("encryption failed: {}", e)))?;

    Ok(SealedBox {
        nonce: base64_encode(&nonce_bytes),
        ciphertext: base64_encode(&ciphertext),
    })
}

/// Open a sealed box. A wrong key and a tampered box are indistinguishable
/// and both report `AuthFailed`.
pub fn open(key: &[u8; KEY_LEN], sealed: &SealedBox) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    let nonce_bytes = base64_decode(&sealed.nonce)?;
    let ciphertext = base64_decode(&sealed.ciphertext)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(VaultError::InvalidState("invalid nonce length".to_string()));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::Crypto(format!("failed to create cipher: {}", e)))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext.as_ref())
        .map(Zeroizing::new)
        .map_err(|_| VaultError::AuthFailed)
}

pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

pub fn base64_decode(s: &str) -> Result<Vec<u8>, VaultError> {
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| VaultError::InvalidState(format!("invalid base64: {}", e)))
}
