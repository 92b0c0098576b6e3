//! Metadata Registry
//!
//! Chain metadata (type registries) keyed by genesis hash and runtime
//! version. Records are immutable once stored and never pruned.

pub mod builder;
pub mod registry;
pub mod types;

pub use builder::TypeRegistryBuilder;
pub use registry::{InsertOutcome, MetadataRegistry};
pub use types::{
    ChainSpecs, Field, MetadataRecord, Primitive, TypeDef, TypeEntry, TypeId, TypeTag, Variant,
};

use thiserror::Error;

use crate::types::ChainId;

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No metadata for chain {chain_id} at version {spec_version}")]
    NotFound { chain_id: ChainId, spec_version: u32 },

    #[error("Metadata for chain {chain_id} version {spec_version} already stored with different content")]
    VersionConflict { chain_id: ChainId, spec_version: u32 },

    #[error("Type id {0} is not in the registry")]
    UnknownTypeId(TypeId),

    #[error("Invalid metadata blob: {0}")]
    InvalidBlob(String),
}
