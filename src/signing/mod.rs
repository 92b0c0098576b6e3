//! Signing Engine
//!
//! 1. Parse the request envelope scanned from the companion device
//! 2. Track the request through approval or cancellation
//! 3. Sign the canonical payload and assemble the signed extrinsic

pub mod engine;
pub mod envelope;
pub mod payload;
pub mod request;

pub use engine::{SignedOutput, SigningEngine};
pub use envelope::{parse_envelope, Envelope};
pub use payload::{signed_extrinsic, signing_payload};
pub use request::{RequestState, SigningRequest};

use thiserror::Error;

use crate::decoder::DecodeError;
use crate::vault::VaultError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    #[error("request already signed")]
    AlreadySigned,
    #[error("derived key does not match the request author")]
    DerivationMismatch,
    #[error("vault is locked")]
    VaultLocked,
    #[error("request was cancelled")]
    Cancelled,
    #[error("signing already in progress")]
    SigningInProgress,
    #[error(transparent)]
    Vault(VaultError),
    #[error(transparent)]
    Payload(DecodeError),
}
