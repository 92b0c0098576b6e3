//! Incremental construction of type arenas
//!
//! Slots can be reserved before their definition is known, which is how
//! recursive types (a call enum containing a sequence of calls) are built.

use std::collections::BTreeMap;

use super::types::{ChainSpecs, Field, MetadataRecord, Primitive, TypeDef, TypeEntry, TypeId, Variant};
use super::RegistryError;
use crate::types::ChainId;

#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    slots: Vec<Option<TypeEntry>>,
    primitives: BTreeMap<&'static str, TypeId>,
    pallets: BTreeMap<u8, String>,
}

impl TypeRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> TypeId {
        self.slots.len() as TypeId
    }

    /// Append a definition, returning its id
    pub fn add(&mut self, name: Option<&str>, def: TypeDef) -> TypeId {
        let id = self.next_id();
        self.slots.push(Some(TypeEntry {
            name: name.map(str::to_string),
            def,
        }));
        id
    }

    /// Shared slot for a primitive kind
    pub fn primitive(&mut self, kind: Primitive) -> TypeId {
        if let Some(id) = self.primitives.get(kind.name()) {
            return *id;
        }
        let id = self.add(None, TypeDef::Primitive(kind));
        self.primitives.insert(kind.name(), id);
        id
    }

    pub fn compact(&mut self, kind: Primitive) -> TypeId {
        self.add(None, TypeDef::Compact(kind))
    }

    pub fn sequence(&mut self, element: TypeId) -> TypeId {
        self.add(None, TypeDef::Sequence(element))
    }

    pub fn array(&mut self, name: Option<&str>, len: u32, element: TypeId) -> TypeId {
        self.add(name, TypeDef::Array { len, element })
    }

    pub fn composite(&mut self, name: &str, fields: Vec<Field>) -> TypeId {
        self.add(Some(name), TypeDef::Struct(fields))
    }

    pub fn variant(&mut self, name: &str, variants: Vec<Variant>) -> TypeId {
        self.add(Some(name), TypeDef::Enum(variants))
    }

    /// Reserve a slot to be filled later with `define`
    pub fn reserve(&mut self) -> TypeId {
        let id = self.next_id();
        self.slots.push(None);
        id
    }

    pub fn define(&mut self, id: TypeId, name: Option<&str>, def: TypeDef) {
        if let Some(slot) = self.slots.get_mut(id as usize) {
            *slot = Some(TypeEntry {
                name: name.map(str::to_string),
                def,
            });
        }
    }

    pub fn pallet(&mut self, index: u8, name: &str) -> &mut Self {
        self.pallets.insert(index, name.to_string());
        self
    }

    /// Finish the arena. Every reserved slot must have been defined.
    pub fn build(
        self,
        chain_id: ChainId,
        spec_version: u32,
        specs: ChainSpecs,
        call_type: TypeId,
    ) -> Result<MetadataRecord, RegistryError> {
        let mut types = Vec::with_capacity(self.slots.len());
        for (id, slot) in self.slots.into_iter().enumerate() {
            let entry = slot.ok_or_else(|| {
                RegistryError::InvalidBlob(format!("type slot {} reserved but never defined", id))
            })?;
            types.push(entry);
        }

        Ok(MetadataRecord {
            chain_id,
            spec_version,
            specs,
            types,
            call_type,
            pallets: self.pallets,
        })
    }
}
