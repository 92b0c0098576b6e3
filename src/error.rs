//! Unified error types for the signer core
//!
//! Every component reports failures through its own `thiserror` enum
//! (`DecodeError`, `RegistryError`, `VaultError`, `SignError`, `CodecError`).
//! This module folds them into one serialisable error that crosses the
//! request/response boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decoder::DecodeError;
use crate::metadata::RegistryError;
use crate::qr::CodecError;
use crate::signing::SignError;
use crate::vault::VaultError;

/// Main error type for all signer operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl SignerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, msg)
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Busy, msg)
    }

    pub fn no_active_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoActiveRequest, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// Whether the user may retry the same action (authentication problems)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::AuthFailed
                | ErrorCode::VaultLocked
                | ErrorCode::PasswordRequired
                | ErrorCode::KeyMismatch
        )
    }
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for SignerError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors
    InvalidInput,

    // Decoding
    MalformedPayload,
    UnknownType,
    Truncated,

    // Registry
    MetadataNotFound,
    VersionConflict,

    // Vault
    AuthFailed,
    VaultLocked,
    SeedNotFound,
    SeedExists,
    InvalidPath,
    KeyMismatch,
    PasswordRequired,

    // Signing
    AlreadySigned,
    DerivationMismatch,
    Cancelled,
    SigningInProgress,

    // QR codec
    IncompleteSequence,
    FrameMismatch,
    InvalidFrame,
    ScanExpired,

    // Pipeline
    Busy,
    NoActiveRequest,

    // Crypto errors
    CryptoError,

    // Parse errors
    ParseError,
    JsonError,
    HexError,

    // Internal
    Internal,
}

/// Result type alias for signer operations
pub type SignerResult<T> = Result<T, SignerError>;

// Conversions from component errors

impl From<DecodeError> for SignerError {
    fn from(e: DecodeError) -> Self {
        let code = match &e {
            DecodeError::MalformedPayload(_) => ErrorCode::MalformedPayload,
            DecodeError::UnknownType(_) => ErrorCode::UnknownType,
            DecodeError::Truncated { .. } => ErrorCode::Truncated,
            DecodeError::Registry(RegistryError::VersionConflict { .. }) => {
                ErrorCode::VersionConflict
            }
            DecodeError::Registry(_) => ErrorCode::MetadataNotFound,
        };
        SignerError::new(code, e.to_string())
    }
}

impl From<RegistryError> for SignerError {
    fn from(e: RegistryError) -> Self {
        let code = match &e {
            RegistryError::NotFound { .. } => ErrorCode::MetadataNotFound,
            RegistryError::VersionConflict { .. } => ErrorCode::VersionConflict,
            RegistryError::UnknownTypeId(_) => ErrorCode::UnknownType,
            RegistryError::InvalidBlob(_) => ErrorCode::ParseError,
        };
        SignerError::new(code, e.to_string())
    }
}

impl From<VaultError> for SignerError {
    fn from(e: VaultError) -> Self {
        let code = match &e {
            VaultError::AuthFailed => ErrorCode::AuthFailed,
            VaultError::VaultLocked => ErrorCode::VaultLocked,
            VaultError::SeedNotFound(_) => ErrorCode::SeedNotFound,
            VaultError::SeedExists(_) => ErrorCode::SeedExists,
            VaultError::InvalidPath(_) => ErrorCode::InvalidPath,
            VaultError::KeyMismatch => ErrorCode::KeyMismatch,
            VaultError::PasswordRequired => ErrorCode::PasswordRequired,
            VaultError::InvalidSeedPhrase(_) | VaultError::WeakProof(_) => ErrorCode::InvalidInput,
            VaultError::InvalidState(_) => ErrorCode::ParseError,
            VaultError::Crypto(_) => ErrorCode::CryptoError,
        };
        SignerError::new(code, e.to_string())
    }
}

impl From<SignError> for SignerError {
    fn from(e: SignError) -> Self {
        match e {
            SignError::Vault(inner) => inner.into(),
            SignError::Payload(inner) => inner.into(),
            other => {
                let code = match &other {
                    SignError::AlreadySigned => ErrorCode::AlreadySigned,
                    SignError::DerivationMismatch => ErrorCode::DerivationMismatch,
                    SignError::VaultLocked => ErrorCode::VaultLocked,
                    SignError::Cancelled => ErrorCode::Cancelled,
                    SignError::SigningInProgress => ErrorCode::SigningInProgress,
                    SignError::Vault(_) | SignError::Payload(_) => ErrorCode::Internal,
                };
                SignerError::new(code, other.to_string())
            }
        }
    }
}

impl From<CodecError> for SignerError {
    fn from(e: CodecError) -> Self {
        let code = match &e {
            CodecError::IncompleteSequence { .. } => ErrorCode::IncompleteSequence,
            CodecError::FrameMismatch { .. } | CodecError::ConflictingFrame { .. } => {
                ErrorCode::FrameMismatch
            }
            CodecError::InvalidFrame(_) => ErrorCode::InvalidFrame,
            CodecError::Expired => ErrorCode::ScanExpired,
            CodecError::InvalidFrameSize(_) | CodecError::PayloadTooLarge(_) => {
                ErrorCode::InvalidInput
            }
        };
        SignerError::new(code, e.to_string())
    }
}

impl From<serde_json::Error> for SignerError {
    fn from(e: serde_json::Error) -> Self {
        SignerError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for SignerError {
    fn from(e: hex::FromHexError) -> Self {
        SignerError::new(ErrorCode::HexError, e.to_string())
    }
}
