//! Vault storage and operations
//!
//! [`VaultState`] is the logical schema handed to platform secure storage:
//! the KDF salt and parameters, a sealed check value, and one [`SeedEntry`]
//! per seed. Everything secret inside it is sealed under the key-encryption
//! key; everything else is public key material.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::cipher::{self, SealedBox, KEY_LEN};
use super::derivation::{validate_phrase, DerivationPath};
use super::handle::{HandleTable, Unlocked, VaultHandle};
use super::{AuthProof, DerivedKey, Signature, VaultError};
use crate::crypto;
use crate::types::Encryption;
use crate::utils::settings::{KdfParams, SignerSettings};
use crate::{log_debug, log_info, log_warn};

const STATE_VERSION: u8 = 1;
const CHECK_PLAINTEXT: &[u8] = b"airgap-signer vault v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedEntry {
    pub seed_name: String,
    pub encrypted_seed: SealedBox,
    /// Used derivations in insertion order, one per (path, encryption)
    pub derivations: Vec<DerivedKey>,
}

impl SeedEntry {
    pub fn keys(&self) -> impl Iterator<Item = &DerivedKey> + '_ {
        self.derivations.iter()
    }

    /// Record a derivation, replacing only the same path under the same scheme
    fn record(&mut self, key: DerivedKey) {
        match self
            .derivations
            .iter_mut()
            .find(|known| known.same_slot(&key.derivation_path, key.encryption))
        {
            Some(slot) => *slot = key,
            None => self.derivations.push(key),
        }
    }

    fn holds(&self, key: &DerivedKey) -> bool {
        self.derivations.iter().any(|known| {
            known.same_slot(&key.derivation_path, key.encryption)
                && known.public_key == key.public_key
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultState {
    pub version: u8,
    /// Argon2 salt, base64
    pub salt: String,
    pub kdf: KdfParams,
    /// Known plaintext sealed under the KEK; opening it proves the proof
    pub check: SealedBox,
    pub seeds: BTreeMap<String, SeedEntry>,
}

pub struct Vault {
    state: RwLock<VaultState>,
    handles: HandleTable,
    min_proof_len: usize,
    signatures_issued: AtomicU64,
}

impl Vault {
    /// Initialise an empty vault protected by `proof`
    pub fn create(proof: &AuthProof, settings: &SignerSettings) -> Result<Self, VaultError> {
        if proof.token().len() < settings.min_proof_len {
            return Err(VaultError::WeakProof(settings.min_proof_len));
        }

        let salt = cipher::random_salt();
        let kek = cipher::derive_kek(proof.token(), &salt, &settings.kdf)?;
        let check = cipher::seal(&kek, CHECK_PLAINTEXT)?;

        let state = VaultState {
            version: STATE_VERSION,
            salt: cipher::base64_encode(&salt),
            kdf: settings.kdf,
            check,
            seeds: BTreeMap::new(),
        };
        log_info!("vault", "Vault created");
        Ok(Self::with_state(state, settings))
    }

    /// Restore from previously exported state
    pub fn from_state(state: VaultState, settings: &SignerSettings) -> Result<Self, VaultError> {
        if state.version != STATE_VERSION {
            return Err(VaultError::InvalidState(format!(
                "unsupported version {}",
                state.version
            )));
        }
        if cipher::base64_decode(&state.salt)?.len() != cipher::SALT_LEN {
            return Err(VaultError::InvalidState("invalid salt length".to_string()));
        }
        for (name, entry) in &state.seeds {
            if name != &entry.seed_name {
                return Err(VaultError::InvalidState(format!(
                    "seed entry {} stored under {}",
                    entry.seed_name, name
                )));
            }
            for (i, key) in entry.derivations.iter().enumerate() {
                let duplicate = entry.derivations[..i]
                    .iter()
                    .any(|earlier| earlier.same_slot(&key.derivation_path, key.encryption));
                if duplicate {
                    return Err(VaultError::InvalidState(format!(
                        "duplicate {} derivation {:?} in seed {}",
                        key.encryption, key.derivation_path, name
                    )));
                }
            }
        }
        Ok(Self::with_state(state, settings))
    }

    pub fn from_json(json: &str, settings: &SignerSettings) -> Result<Self, VaultError> {
        let state: VaultState = serde_json::from_str(json)
            .map_err(|e| VaultError::InvalidState(e.to_string()))?;
        Self::from_state(state, settings)
    }

    fn with_state(state: VaultState, settings: &SignerSettings) -> Self {
        Self {
            state: RwLock::new(state),
            handles: HandleTable::new(settings.vault_idle_timeout),
            min_proof_len: settings.min_proof_len,
            signatures_issued: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, VaultState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VaultState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn export_state(&self) -> VaultState {
        self.read().clone()
    }

    pub fn export_json(&self) -> Result<String, VaultError> {
        serde_json::to_string(&self.export_state())
            .map_err(|e| VaultError::InvalidState(e.to_string()))
    }

    // =========================================================================
    // Unlock
    // =========================================================================

    pub fn unlock(&self, proof: &AuthProof) -> Result<VaultHandle, VaultError> {
        if proof.token().len() < self.min_proof_len {
            log_warn!("vault", "Unlock rejected", reason = "proof too short");
            return Err(VaultError::AuthFailed);
        }

        let (salt, kdf, check) = {
            let state = self.read();
            (state.salt.clone(), state.kdf, state.check.clone())
        };
        let salt = cipher::base64_decode(&salt)?;
        let kek = cipher::derive_kek(proof.token(), &salt, &kdf)?;

        if let Err(e) = cipher::open(&kek, &check) {
            log_warn!("vault", "Unlock rejected", reason = e);
            return Err(VaultError::AuthFailed);
        }

        let handle = self.handles.open(&kek, proof.secondary());
        log_info!("vault", "Vault unlocked", handle = handle.id);
        Ok(handle)
    }

    pub fn release(&self, handle: &VaultHandle) {
        if self.handles.release(handle) {
            log_info!("vault", "Handle released", handle = handle.id);
        }
    }

    pub fn release_all(&self) {
        self.handles.release_all();
    }

    pub fn is_unlocked(&self, handle: &VaultHandle) -> bool {
        self.handles.is_active(handle)
    }

    // =========================================================================
    // Seeds
    // =========================================================================

    /// Store a new seed and record its root sr25519 key
    pub fn add_seed(
        &self,
        handle: &VaultHandle,
        seed_name: &str,
        phrase: &str,
    ) -> Result<DerivedKey, VaultError> {
        let unlocked = self.handles.touch(handle)?;
        if seed_name.trim().is_empty() {
            return Err(VaultError::InvalidState("seed name is empty".to_string()));
        }
        validate_phrase(phrase)?;
        if self.read().seeds.contains_key(seed_name) {
            return Err(VaultError::SeedExists(seed_name.to_string()));
        }

        let root = DerivationPath::root();
        let public_key = crypto::derive_public(
            Encryption::Sr25519,
            &*root.mini_secret(phrase)?,
            root.junctions(),
        )?;
        let encrypted_seed = cipher::seal(&unlocked.kek, phrase.as_bytes())?;

        let key = DerivedKey {
            derivation_path: String::new(),
            public_key,
            encryption: Encryption::Sr25519,
            has_pwd: false,
        };

        let mut state = self.write();
        if state.seeds.contains_key(seed_name) {
            return Err(VaultError::SeedExists(seed_name.to_string()));
        }
        state.seeds.insert(
            seed_name.to_string(),
            SeedEntry {
                seed_name: seed_name.to_string(),
                encrypted_seed,
                derivations: vec![key.clone()],
            },
        );
        log_info!(
            "vault",
            "Seed added",
            seed = seed_name,
            public = hex::encode(&key.public_key)
        );
        Ok(key)
    }

    pub fn seed_names(&self) -> Vec<String> {
        self.read().seeds.keys().cloned().collect()
    }

    /// Every derivation recorded for a seed, root first
    pub fn keys_of(&self, seed_name: &str) -> Result<Vec<DerivedKey>, VaultError> {
        let state = self.read();
        let entry = state
            .seeds
            .get(seed_name)
            .ok_or_else(|| VaultError::SeedNotFound(seed_name.to_string()))?;
        Ok(entry.keys().cloned().collect())
    }

    fn open_phrase(
        &self,
        unlocked: &Unlocked,
        seed_name: &str,
    ) -> Result<Zeroizing<String>, VaultError> {
        let sealed = {
            let state = self.read();
            state
                .seeds
                .get(seed_name)
                .map(|entry| entry.encrypted_seed.clone())
                .ok_or_else(|| VaultError::SeedNotFound(seed_name.to_string()))?
        };
        let plaintext = cipher::open(&unlocked.kek, &sealed)?;
        String::from_utf8(plaintext.to_vec())
            .map(Zeroizing::new)
            .map_err(|_| VaultError::InvalidState("seed is not UTF-8".to_string()))
    }

    // =========================================================================
    // Derivation
    // =========================================================================

    /// Derive an sr25519 key
    pub fn derive(
        &self,
        handle: &VaultHandle,
        seed_name: &str,
        path: &str,
    ) -> Result<DerivedKey, VaultError> {
        self.derive_for(handle, seed_name, path, Encryption::Sr25519)
    }

    /// Derive a key and record its public info under the seed
    pub fn derive_for(
        &self,
        handle: &VaultHandle,
        seed_name: &str,
        path: &str,
        encryption: Encryption,
    ) -> Result<DerivedKey, VaultError> {
        let unlocked = self.handles.touch(handle)?;
        let path = DerivationPath::parse(path)?;
        if encryption != Encryption::Sr25519 && path.has_soft_junction() {
            return Err(VaultError::InvalidPath(format!(
                "{} supports hard junctions only",
                encryption
            )));
        }

        let phrase = self.open_phrase(&unlocked, seed_name)?;
        let public_key =
            crypto::derive_public(encryption, &*path.mini_secret(&phrase)?, path.junctions())?;

        let key = DerivedKey {
            derivation_path: path.public_path().to_string(),
            public_key,
            encryption,
            has_pwd: path.has_password(),
        };

        let mut state = self.write();
        let entry = state
            .seeds
            .get_mut(seed_name)
            .ok_or_else(|| VaultError::SeedNotFound(seed_name.to_string()))?;
        entry.record(key.clone());

        log_debug!(
            "vault",
            "Key derived",
            seed = seed_name,
            path = path.public_path(),
            encryption = encryption,
            public = hex::encode(&key.public_key)
        );
        Ok(key)
    }

    /// Locate a previously derived key by its public key. Needs no unlock.
    pub fn find_key(&self, public_key: &[u8]) -> Option<(String, DerivedKey)> {
        let state = self.read();
        state.seeds.values().find_map(|entry| {
            entry
                .keys()
                .find(|key| key.public_key == public_key)
                .map(|key| (entry.seed_name.clone(), key.clone()))
        })
    }

    // =========================================================================
    // Signing
    // =========================================================================

    /// Sign `message` with a key previously derived from this vault.
    ///
    /// The key is re-derived from the sealed seed; a password-protected path
    /// takes its password from the proof's secondary secret.
    pub fn sign(
        &self,
        handle: &VaultHandle,
        key: &DerivedKey,
        message: &[u8],
    ) -> Result<Signature, VaultError> {
        let unlocked = self.handles.touch(handle)?;

        let seed_name = {
            let state = self.read();
            state
                .seeds
                .values()
                .find(|entry| entry.holds(key))
                .map(|entry| entry.seed_name.clone())
                .ok_or(VaultError::KeyMismatch)?
        };

        let mut path = DerivationPath::parse(&key.derivation_path)?;
        if path.has_password() {
            return Err(VaultError::InvalidPath(
                "stored path carries a password".to_string(),
            ));
        }
        if key.has_pwd {
            let secondary = unlocked
                .secondary
                .as_ref()
                .ok_or(VaultError::PasswordRequired)?;
            path = path.with_password(secondary.as_str());
        }

        let phrase = self.open_phrase(&unlocked, &seed_name)?;
        let (public_key, bytes) = crypto::derive_and_sign(
            key.encryption,
            &*path.mini_secret(&phrase)?,
            path.junctions(),
            message,
        )?;

        if public_key != key.public_key {
            log_warn!("vault", "Re-derived key differs", seed = seed_name);
            return Err(VaultError::KeyMismatch);
        }

        self.signatures_issued.fetch_add(1, Ordering::SeqCst);
        log_info!(
            "vault",
            "Payload signed",
            seed = seed_name,
            public = hex::encode(&public_key),
            bytes = message.len()
        );
        Ok(Signature {
            encryption: key.encryption,
            bytes,
        })
    }

    pub fn signatures_issued(&self) -> u64 {
        self.signatures_issued.load(Ordering::SeqCst)
    }
}

/// Derivation without a vault, for checking keys against known vectors
pub fn derive_from_phrase(
    phrase: &str,
    path: &str,
    encryption: Encryption,
) -> Result<DerivedKey, VaultError> {
    let path = DerivationPath::parse(path)?;
    let secret: Zeroizing<[u8; KEY_LEN]> = path.mini_secret(phrase)?;
    let public_key = crypto::derive_public(encryption, &secret, path.junctions())?;
    Ok(DerivedKey {
        derivation_path: path.public_path().to_string(),
        public_key,
        encryption,
        has_pwd: path.has_password(),
    })
}
