//! Binary Decoder
//!
//! Turns SCALE-encoded call bytes into a `DecodedField` tree by walking the
//! type registry of the metadata version the payload was built against.
//!
//! # Usage
//! ```rust,ignore
//! use airgap_signer::decoder;
//!
//! let tree = decoder::decode(&registry, &chain_id, 9430, &call_bytes)?;
//! ```

pub mod compact;
pub mod cursor;
pub mod decode;
pub mod encode;
pub mod extensions;
pub mod value;

pub use cursor::Cursor;
pub use decode::Decoder;
pub use encode::{encode, encode_call};
pub use extensions::{Era, Extensions};
pub use value::{DecodedField, DecodedValue};

use serde::Serialize;
use thiserror::Error;

use crate::metadata::{MetadataRegistry, RegistryError, TypeId};
use crate::types::ChainId;

/// Nesting limit used when no settings are supplied
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Decoder errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Unknown type id {0}")]
    UnknownType(TypeId),

    #[error("Payload truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error(transparent)]
    Registry(RegistryError),
}

impl From<RegistryError> for DecodeError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::UnknownTypeId(id) => DecodeError::UnknownType(id),
            other => DecodeError::Registry(other),
        }
    }
}

/// A decoded call plus its extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedTransaction {
    pub call: DecodedField,
    pub extensions: Extensions,
}

/// Decode call bytes against `(chain_id, spec_version)` metadata
pub fn decode(
    registry: &MetadataRegistry,
    chain_id: &ChainId,
    spec_version: u32,
    bytes: &[u8],
) -> Result<DecodedField, DecodeError> {
    decode_with_depth(registry, chain_id, spec_version, bytes, DEFAULT_MAX_DEPTH)
}

pub fn decode_with_depth(
    registry: &MetadataRegistry,
    chain_id: &ChainId,
    spec_version: u32,
    bytes: &[u8],
    max_depth: usize,
) -> Result<DecodedField, DecodeError> {
    let record = registry.lookup(chain_id, spec_version)?;
    Decoder::new(&record, max_depth).decode_call(bytes)
}

/// Decode extensions first (they name the metadata version), then the call
pub fn decode_transaction(
    registry: &MetadataRegistry,
    chain_id: &ChainId,
    call: &[u8],
    extensions: &[u8],
    max_depth: usize,
) -> Result<DecodedTransaction, DecodeError> {
    let extensions = Extensions::decode(extensions)?;
    let call = decode_with_depth(registry, chain_id, extensions.spec_version, call, max_depth)?;
    Ok(DecodedTransaction { call, extensions })
}
