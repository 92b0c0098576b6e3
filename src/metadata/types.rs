//! Type registry model
//!
//! A `MetadataRecord` owns one arena of `TypeEntry` values. Types reference
//! each other only through `TypeId` indices into that arena, so cyclic and
//! forward references are representable without shared ownership.

use parity_scale_codec::{Decode, DecodeAll, Encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::RegistryError;
use crate::types::ChainId;
use crate::utils::crypto::blake2_256;

/// Index into a record's type arena
pub type TypeId = u32;

/// Primitive kinds. Width in bytes is implied by the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    Char,
    Str,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    I8,
    I16,
    I32,
    I64,
    I128,
    I256,
}

impl Primitive {
    /// Fixed encoded width; `None` for the length-prefixed `Str`
    pub fn width(&self) -> Option<usize> {
        match self {
            Primitive::Bool | Primitive::U8 | Primitive::I8 => Some(1),
            Primitive::U16 | Primitive::I16 => Some(2),
            Primitive::Char | Primitive::U32 | Primitive::I32 => Some(4),
            Primitive::U64 | Primitive::I64 => Some(8),
            Primitive::U128 | Primitive::I128 => Some(16),
            Primitive::U256 | Primitive::I256 => Some(32),
            Primitive::Str => None,
        }
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            Primitive::U8
                | Primitive::U16
                | Primitive::U32
                | Primitive::U64
                | Primitive::U128
                | Primitive::U256
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            Primitive::I8
                | Primitive::I16
                | Primitive::I32
                | Primitive::I64
                | Primitive::I128
                | Primitive::I256
        )
    }

    /// Largest value representable by an unsigned kind, capped at `u128::MAX`
    pub fn max_unsigned(&self) -> Option<u128> {
        match self {
            Primitive::U8 => Some(u8::MAX as u128),
            Primitive::U16 => Some(u16::MAX as u128),
            Primitive::U32 => Some(u32::MAX as u128),
            Primitive::U64 => Some(u64::MAX as u128),
            Primitive::U128 | Primitive::U256 => Some(u128::MAX),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Char => "char",
            Primitive::Str => "str",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::U128 => "u128",
            Primitive::U256 => "u256",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::I128 => "i128",
            Primitive::I256 => "i256",
        }
    }
}

/// Struct field. Tuple-like structs leave `name` empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Field {
    pub name: Option<String>,
    pub ty: TypeId,
    /// Declared type name at the use site (`T::Balance`, `AccountIdLookupOf<T>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

impl Field {
    pub fn named(name: &str, ty: TypeId) -> Self {
        Self {
            name: Some(name.to_string()),
            ty,
            type_name: None,
        }
    }

    pub fn unnamed(ty: TypeId) -> Self {
        Self {
            name: None,
            ty,
            type_name: None,
        }
    }

    pub fn with_type_name(mut self, type_name: &str) -> Self {
        self.type_name = Some(type_name.to_string());
        self
    }
}

/// Enum variant selected by its one-byte discriminant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Variant {
    pub index: u8,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(rename_all = "snake_case")]
pub enum TypeDef {
    Primitive(Primitive),
    Struct(Vec<Field>),
    Enum(Vec<Variant>),
    Sequence(TypeId),
    Array { len: u32, element: TypeId },
    Tuple(Vec<TypeId>),
    /// Compact-encoded unsigned integer of the given kind
    Compact(Primitive),
}

impl TypeDef {
    pub fn tag(&self) -> TypeTag {
        match self {
            TypeDef::Primitive(_) => TypeTag::Primitive,
            TypeDef::Struct(_) => TypeTag::Struct,
            TypeDef::Enum(_) => TypeTag::Enum,
            TypeDef::Sequence(_) => TypeTag::Sequence,
            TypeDef::Array { .. } => TypeTag::Array,
            TypeDef::Tuple(_) => TypeTag::Tuple,
            TypeDef::Compact(_) => TypeTag::Compact,
        }
    }

    pub fn variant_by_index(&self, index: u8) -> Option<&Variant> {
        match self {
            TypeDef::Enum(variants) => variants.iter().find(|v| v.index == index),
            _ => None,
        }
    }
}

/// Shape of a `TypeDef` without its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Primitive,
    Struct,
    Enum,
    Sequence,
    Array,
    Tuple,
    Compact,
}

/// Arena slot: a definition plus its optional path name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct TypeEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub def: TypeDef,
}

/// Display parameters of a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct ChainSpecs {
    pub name: String,
    pub base58_prefix: u16,
    pub decimals: u8,
    pub unit: String,
}

/// Metadata of one chain at one runtime version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct MetadataRecord {
    pub chain_id: ChainId,
    pub spec_version: u32,
    pub specs: ChainSpecs,
    pub types: Vec<TypeEntry>,
    /// Root type of a call (the runtime call enum)
    pub call_type: TypeId,
    /// Module index to module name
    pub pallets: BTreeMap<u8, String>,
}

impl MetadataRecord {
    pub fn resolve(&self, id: TypeId) -> Result<&TypeEntry, RegistryError> {
        self.types
            .get(id as usize)
            .ok_or(RegistryError::UnknownTypeId(id))
    }

    pub fn pallet_name(&self, index: u8) -> Option<&str> {
        self.pallets.get(&index).map(String::as_str)
    }

    /// SCALE blob: the metadata import format
    pub fn to_blob(&self) -> Vec<u8> {
        self.encode()
    }

    /// Parse a SCALE blob; trailing bytes are rejected
    pub fn from_blob(bytes: &[u8]) -> Result<Self, RegistryError> {
        MetadataRecord::decode_all(&mut &bytes[..])
            .map_err(|e| RegistryError::InvalidBlob(e.to_string()))
    }

    /// blake2b-256 of the SCALE blob
    pub fn metadata_hash(&self) -> [u8; 32] {
        blake2_256(&self.to_blob())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_primitive_widths() {
        assert_eq!(Primitive::Bool.width(), Some(1));
        assert_eq!(Primitive::Char.width(), Some(4));
        assert_eq!(Primitive::I256.width(), Some(32));
        assert_eq!(Primitive::Str.width(), None);
        assert!(Primitive::U64.is_unsigned());
        assert!(!Primitive::I64.is_unsigned());
        assert_eq!(Primitive::U16.max_unsigned(), Some(65535));
    }

    #[test]
    fn test_blob_roundtrip_and_hash() {
        let record = fixtures::westend_record(9430);
        let blob = record.to_blob();
        let back = MetadataRecord::from_blob(&blob).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.metadata_hash(), record.metadata_hash());
    }

    #[test]
    fn test_blob_trailing_bytes_rejected() {
        let mut blob = fixtures::westend_record(9430).to_blob();
        blob.push(0);
        assert!(matches!(
            MetadataRecord::from_blob(&blob),
            Err(RegistryError::InvalidBlob(_))
        ));
    }

    #[test]
    fn test_hash_differs_between_versions() {
        let a = fixtures::westend_record(9420);
        let b = fixtures::westend_record(9430);
        assert_ne!(a.metadata_hash(), b.metadata_hash());
    }

    #[test]
    fn test_typedef_json_shape() {
        let def = TypeDef::Array { len: 32, element: 2 };
        let json = serde_json::to_string(&def).unwrap();
        assert_eq!(json, r#"{"array":{"len":32,"element":2}}"#);

        let seq: TypeDef = serde_json::from_str(r#"{"sequence":5}"#).unwrap();
        assert_eq!(seq, TypeDef::Sequence(5));
    }

    #[test]
    fn test_resolve_out_of_range() {
        let record = fixtures::westend_record(9430);
        assert!(matches!(
            record.resolve(10_000),
            Err(RegistryError::UnknownTypeId(10_000))
        ));
    }
}
