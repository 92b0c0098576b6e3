//! Append-only metadata store
//!
//! Records are keyed by `(chain_id, spec_version)`. Inserting a newer
//! version never evicts older ones: payloads in flight may still refer to
//! them. There is no removal API.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::types::{ChainSpecs, MetadataRecord, TypeDef, TypeId};
use super::RegistryError;
use crate::types::ChainId;
use crate::{log_debug, log_info};

/// Result of a successful insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Identical record already stored
    AlreadyPresent,
}

#[derive(Debug, Default, Clone)]
pub struct MetadataRegistry {
    records: BTreeMap<(ChainId, u32), Arc<MetadataRecord>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the bundled JSON store (an array of records)
    pub fn load_bundled(json: &str) -> Result<Self, RegistryError> {
        let records: Vec<MetadataRecord> = serde_json::from_str(json)
            .map_err(|e| RegistryError::InvalidBlob(format!("bundled store: {}", e)))?;

        let mut registry = Self::new();
        for record in records {
            registry.insert(record)?;
        }
        log_info!(
            "metadata",
            "Loaded bundled metadata",
            records = registry.len(),
            chains = registry.chains().len()
        );
        Ok(registry)
    }

    pub fn lookup(
        &self,
        chain_id: &ChainId,
        spec_version: u32,
    ) -> Result<Arc<MetadataRecord>, RegistryError> {
        self.records
            .get(&(*chain_id, spec_version))
            .cloned()
            .ok_or(RegistryError::NotFound {
                chain_id: *chain_id,
                spec_version,
            })
    }

    pub fn resolve_type(record: &MetadataRecord, id: TypeId) -> Result<&TypeDef, RegistryError> {
        record.resolve(id).map(|entry| &entry.def)
    }

    /// Idempotent for identical content; conflicting content under an
    /// existing key is refused.
    pub fn insert(&mut self, record: MetadataRecord) -> Result<InsertOutcome, RegistryError> {
        let key = (record.chain_id, record.spec_version);
        if let Some(existing) = self.records.get(&key) {
            if **existing == record {
                log_debug!(
                    "metadata",
                    "Duplicate metadata ignored",
                    chain_id = record.chain_id,
                    spec_version = record.spec_version
                );
                return Ok(InsertOutcome::AlreadyPresent);
            }
            return Err(RegistryError::VersionConflict {
                chain_id: record.chain_id,
                spec_version: record.spec_version,
            });
        }

        log_info!(
            "metadata",
            "Metadata stored",
            network = record.specs.name,
            chain_id = record.chain_id,
            spec_version = record.spec_version
        );
        self.records.insert(key, Arc::new(record));
        Ok(InsertOutcome::Inserted)
    }

    /// Decode a SCALE metadata blob and insert it
    pub fn import_blob(&mut self, blob: &[u8]) -> Result<InsertOutcome, RegistryError> {
        let record = MetadataRecord::from_blob(blob)?;
        self.insert(record)
    }

    pub fn newest_version(&self, chain_id: &ChainId) -> Option<u32> {
        self.versions(chain_id).last().copied()
    }

    /// Stored versions for a chain, ascending
    pub fn versions(&self, chain_id: &ChainId) -> Vec<u32> {
        self.records
            .range((*chain_id, 0)..=(*chain_id, u32::MAX))
            .map(|((_, version), _)| *version)
            .collect()
    }

    pub fn chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self.records.keys().map(|(chain, _)| *chain).collect();
        chains.dedup();
        chains
    }

    /// Display specs from the newest record of a chain
    pub fn specs(&self, chain_id: &ChainId) -> Option<ChainSpecs> {
        let newest = self.newest_version(chain_id)?;
        self.records
            .get(&(*chain_id, newest))
            .map(|record| record.specs.clone())
    }

    /// All records, ordered by chain and version
    pub fn records(&self) -> impl Iterator<Item = &Arc<MetadataRecord>> {
        self.records.values()
    }

    /// Serialize every record back into the bundled JSON form
    pub fn to_bundled_json(&self) -> Result<String, RegistryError> {
        let records: Vec<&MetadataRecord> = self.records.values().map(|r| r.as_ref()).collect();
        serde_json::to_string(&records).map_err(|e| RegistryError::InvalidBlob(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, WESTEND_GENESIS};
    use crate::metadata::types::{Primitive, TypeEntry};

    fn westend() -> ChainId {
        ChainId::from_hex(WESTEND_GENESIS).unwrap()
    }

    #[test]
    fn test_lookup_after_insert() {
        let mut registry = MetadataRegistry::new();
        let outcome = registry.insert(fixtures::westend_record(9430)).unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);

        let record = registry.lookup(&westend(), 9430).unwrap();
        assert_eq!(record.spec_version, 9430);
        assert!(matches!(
            registry.lookup(&westend(), 9000),
            Err(RegistryError::NotFound { spec_version: 9000, .. })
        ));
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut registry = MetadataRegistry::new();
        registry.insert(fixtures::westend_record(9430)).unwrap();
        let outcome = registry.insert(fixtures::westend_record(9430)).unwrap();
        assert_eq!(outcome, InsertOutcome::AlreadyPresent);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflicting_insert_rejected() {
        let mut registry = MetadataRegistry::new();
        registry.insert(fixtures::westend_record(9430)).unwrap();

        let mut altered = fixtures::westend_record(9430);
        altered.types.push(TypeEntry {
            name: None,
            def: TypeDef::Primitive(Primitive::U8),
        });
        assert!(matches!(
            registry.insert(altered),
            Err(RegistryError::VersionConflict { spec_version: 9430, .. })
        ));

        // Original record untouched
        let stored = registry.lookup(&westend(), 9430).unwrap();
        assert_eq!(*stored, fixtures::westend_record(9430));
    }

    #[test]
    fn test_versions_coexist() {
        let mut registry = MetadataRegistry::new();
        registry.insert(fixtures::westend_record(9430)).unwrap();
        registry.insert(fixtures::westend_record(9420)).unwrap();
        registry.insert(fixtures::westend_record(9440)).unwrap();

        assert_eq!(registry.versions(&westend()), vec![9420, 9430, 9440]);
        assert_eq!(registry.newest_version(&westend()), Some(9440));
        assert!(registry.lookup(&westend(), 9420).is_ok());
        assert_eq!(registry.chains(), vec![westend()]);
    }

    #[test]
    fn test_import_blob() {
        let mut registry = MetadataRegistry::new();
        let blob = fixtures::westend_record(9430).to_blob();
        registry.import_blob(&blob).unwrap();
        assert_eq!(registry.newest_version(&westend()), Some(9430));

        assert!(matches!(
            registry.import_blob(&blob[..blob.len() / 2]),
            Err(RegistryError::InvalidBlob(_))
        ));
    }

    #[test]
    fn test_bundled_json_roundtrip() {
        let mut registry = MetadataRegistry::new();
        registry.insert(fixtures::westend_record(9420)).unwrap();
        registry.insert(fixtures::westend_record(9430)).unwrap();

        let json = registry.to_bundled_json().unwrap();
        let loaded = MetadataRegistry::load_bundled(&json).unwrap();
        assert_eq!(loaded.versions(&westend()), vec![9420, 9430]);
        assert_eq!(loaded.specs(&westend()).unwrap().unit, "WND");
    }

    #[test]
    fn test_bundled_json_garbage() {
        assert!(matches!(
            MetadataRegistry::load_bundled("{not json"),
            Err(RegistryError::InvalidBlob(_))
        ));
    }

    #[test]
    fn test_resolve_type() {
        let record = fixtures::westend_record(9430);
        let def = MetadataRegistry::resolve_type(&record, record.call_type).unwrap();
        assert!(matches!(def, TypeDef::Enum(_)));
        assert!(MetadataRegistry::resolve_type(&record, 9999).is_err());
    }
}
