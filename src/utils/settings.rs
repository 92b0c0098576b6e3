//! Signer configuration
//!
//! Preset-based settings for the vault, the QR codec and the decoder.
//! Presets trade convenience for hardening (shorter idle locks, costlier KDF).
//! Settings can also be loaded from JSON, in which case durations are
//! expressed in whole seconds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{SignerError, SignerResult};

/// Smallest frame that can carry the multi-frame header plus one byte
pub const MIN_FRAME_SIZE: usize = 6;

/// Security level presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    Standard,
    High,
    Paranoid,
    Custom,
}

/// Argon2id parameters for the vault key-encryption key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Iterations
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        // 64 MiB, 3 passes, 4 lanes
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerSettings {
    pub level: SecurityLevel,

    // Vault
    /// A handle unused for this long locks itself
    #[serde(with = "duration_secs")]
    pub vault_idle_timeout: Duration,
    pub kdf: KdfParams,
    /// Shortest accepted authentication proof, in bytes
    pub min_proof_len: usize,

    // QR codec
    /// An unfinished multi-frame scan is discarded after this long
    #[serde(with = "duration_secs")]
    pub reassembly_timeout: Duration,
    /// Outbound frame size in bytes, header included
    pub max_frame_size: usize,

    // Decoder / signer
    /// Payloads longer than this are blake2b-256 hashed before signing
    pub signing_hash_threshold: usize,
    /// Nesting limit while walking a type registry
    pub max_decode_depth: usize,
}

impl Default for SignerSettings {
    fn default() -> Self {
        Self::standard()
    }
}

impl SignerSettings {
    pub fn standard() -> Self {
        Self {
            level: SecurityLevel::Standard,
            vault_idle_timeout: Duration::from_secs(5 * 60),
            kdf: KdfParams {
                memory_cost: 19456,
                time_cost: 2,
                parallelism: 1,
            },
            min_proof_len: 6,
            reassembly_timeout: Duration::from_secs(2 * 60),
            max_frame_size: 1024,
            signing_hash_threshold: 256,
            max_decode_depth: 64,
        }
    }

    pub fn high() -> Self {
        Self {
            level: SecurityLevel::High,
            vault_idle_timeout: Duration::from_secs(2 * 60),
            kdf: KdfParams::default(),
            min_proof_len: 8,
            reassembly_timeout: Duration::from_secs(60),
            max_frame_size: 1024,
            signing_hash_threshold: 256,
            max_decode_depth: 48,
        }
    }

    pub fn paranoid() -> Self {
        Self {
            level: SecurityLevel::Paranoid,
            vault_idle_timeout: Duration::from_secs(30),
            kdf: KdfParams {
                memory_cost: 262144,
                time_cost: 4,
                parallelism: 4,
            },
            min_proof_len: 12,
            reassembly_timeout: Duration::from_secs(30),
            max_frame_size: 512,
            signing_hash_threshold: 256,
            max_decode_depth: 32,
        }
    }

    pub fn for_level(level: SecurityLevel) -> Self {
        match level {
            SecurityLevel::Standard | SecurityLevel::Custom => Self::standard(),
            SecurityLevel::High => Self::high(),
            SecurityLevel::Paranoid => Self::paranoid(),
        }
    }

    /// Parse settings from JSON and reject unusable values
    pub fn from_json(json: &str) -> SignerResult<Self> {
        let settings: SignerSettings = serde_json::from_str(json)?;
        settings.check()?;
        Ok(settings)
    }

    /// Hard errors: values the signer cannot operate with
    pub fn check(&self) -> SignerResult<()> {
        if self.max_frame_size < MIN_FRAME_SIZE || self.max_frame_size > u16::MAX as usize {
            return Err(SignerError::invalid_input(format!(
                "max_frame_size must be within {}..={}",
                MIN_FRAME_SIZE,
                u16::MAX
            )));
        }
        if self.max_decode_depth == 0 {
            return Err(SignerError::invalid_input("max_decode_depth must be positive"));
        }
        if self.signing_hash_threshold == 0 {
            return Err(SignerError::invalid_input(
                "signing_hash_threshold must be positive",
            ));
        }
        if self.kdf.parallelism == 0 || self.kdf.time_cost == 0 {
            return Err(SignerError::invalid_input("KDF parameters must be positive"));
        }
        Ok(())
    }

    /// Soft warnings about weak but usable combinations
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.vault_idle_timeout > Duration::from_secs(30 * 60) {
            warnings.push("Warning: vault idle timeout exceeds 30 minutes".to_string());
        }
        if self.kdf.memory_cost < 19456 {
            warnings.push("Warning: KDF memory cost is below 19 MiB".to_string());
        }
        if self.min_proof_len < 6 {
            warnings.push("Warning: authentication proofs shorter than 6 bytes are accepted".to_string());
        }
        if self.signing_hash_threshold != 256 {
            warnings.push(
                "Warning: signing hash threshold differs from the chain convention (256)".to_string(),
            );
        }

        warnings
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
