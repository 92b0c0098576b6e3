//! Shared types for the signer core
//!
//! Data structures that cross module boundaries are defined here
//! for consistent serialization and FFI compatibility.

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// =============================================================================
// Chain Identity
// =============================================================================

/// Chain identifier: the 32-byte genesis hash of the network
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct ChainId(pub [u8; 32]);

impl ChainId {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Parse from hex, with or without `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let raw = crate::utils::crypto::unhex(s)?;
        Self::from_slice(&raw).ok_or(hex::FromHexError::InvalidStringLength)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", self.to_hex())
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ChainId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Signature Schemes
// =============================================================================

/// Signature scheme used by a key, with its wire discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    Ed25519,
    Sr25519,
    Ecdsa,
}

impl Encryption {
    /// Byte used in payload envelopes and `MultiSignature` encoding
    pub fn to_byte(self) -> u8 {
        match self {
            Encryption::Ed25519 => 0x00,
            Encryption::Sr25519 => 0x01,
            Encryption::Ecdsa => 0x02,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Encryption::Ed25519),
            0x01 => Some(Encryption::Sr25519),
            0x02 => Some(Encryption::Ecdsa),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encryption::Ed25519 => "ed25519",
            Encryption::Sr25519 => "sr25519",
            Encryption::Ecdsa => "ecdsa",
        }
    }

    /// Length of a public key in this scheme
    pub fn public_len(&self) -> usize {
        match self {
            Encryption::Ed25519 | Encryption::Sr25519 => 32,
            Encryption::Ecdsa => 33,
        }
    }

    /// Length of a signature in this scheme (ecdsa carries a recovery byte)
    pub fn signature_len(&self) -> usize {
        match self {
            Encryption::Ed25519 | Encryption::Sr25519 => 64,
            Encryption::Ecdsa => 65,
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// API Response Wrapper
// =============================================================================

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<crate::error::SignerError>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: crate::error::SignerError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":{"code":"internal","message":"Serialization failed"}}"#.to_string()
        })
    }
}
