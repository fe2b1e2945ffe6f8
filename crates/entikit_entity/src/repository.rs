//! Named-entity collection persisted as one JSON blob.

use tracing::{debug, info, warn};

use crate::conf::C_KEY_SLOT_SAVED_ENTITIES;
use crate::error::{EntityError, Result};
use crate::slot::SlotStorage;
use crate::spec::{SpecSavedEntity, ValueRecord};

/// Durable, ordered collection of [`SpecSavedEntity`] keyed by entity name.
///
/// The slot is read lazily the first time the collection is needed and then
/// served from memory; every successful save rewrites the whole collection.
/// Names are treated as keys by [`Self::save`] but are not enforced unique in
/// the stored blob: lookups return the first match.
#[derive(Debug)]
pub struct EntityRepository<S: SlotStorage> {
    storage: S,
    key_slot: String,
    l_entities_cached: Option<Vec<SpecSavedEntity>>,
}

impl<S: SlotStorage> EntityRepository<S> {
    /// Repository over the default `savedEntities` slot.
    pub fn new(storage: S) -> Self {
        Self::with_slot(storage, C_KEY_SLOT_SAVED_ENTITIES)
    }

    /// Repository over a custom slot key.
    pub fn with_slot(storage: S, key_slot: impl Into<String>) -> Self {
        Self {
            storage,
            key_slot: key_slot.into(),
            l_entities_cached: None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn slot_key(&self) -> &str {
        &self.key_slot
    }

    /// Load the collection, failing soft.
    ///
    /// An absent, unreadable or corrupt slot yields an empty collection.
    pub fn load(&mut self) -> &[SpecSavedEntity] {
        let l_entities = match self.read_persisted() {
            Ok(l_entities) => l_entities,
            Err(err) => {
                warn!(slot = %self.key_slot, error = %err, "saved entities unreadable; starting empty");
                Vec::new()
            }
        };
        debug!(slot = %self.key_slot, count = l_entities.len(), "saved entities loaded");
        self.l_entities_cached.insert(l_entities)
    }

    /// Drop the in-memory copy and read the slot again.
    pub fn reload(&mut self) -> &[SpecSavedEntity] {
        self.l_entities_cached = None;
        self.load()
    }

    /// Strict read of the persisted collection.
    pub fn read_persisted(&self) -> Result<Vec<SpecSavedEntity>> {
        let Some(c_blob) = self.storage.read_slot(&self.key_slot)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&c_blob).map_err(|err| {
            EntityError::persistence(format!(
                "Corrupt saved-entity blob in slot {:?}: {err}",
                self.key_slot
            ))
        })
    }

    /// Saved entities in insertion order.
    pub fn entities(&mut self) -> &[SpecSavedEntity] {
        if self.l_entities_cached.is_none() {
            return self.load();
        }
        self.l_entities_cached.as_deref().unwrap_or(&[])
    }

    pub fn len(&mut self) -> usize {
        self.entities().len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.entities().is_empty()
    }

    /// Create or replace the entity called `name` (last write wins).
    ///
    /// An empty or whitespace-only name is a [`EntityError::Validation`] and
    /// nothing is written. Non-blank names are stored as given.
    /// A failed write leaves the in-memory collection untouched.
    pub fn save(&mut self, name: &str, data: ValueRecord) -> Result<SpecSavedEntity> {
        if name.trim().is_empty() {
            return Err(EntityError::validation(
                "Entity name is required to save data.",
            ));
        }

        let entity = SpecSavedEntity {
            name: name.to_string(),
            data,
        };

        let mut l_entities_updated = self.entities().to_vec();
        match l_entities_updated.iter().position(|saved| saved.name == name) {
            Some(n_idx) => l_entities_updated[n_idx] = entity.clone(),
            None => l_entities_updated.push(entity.clone()),
        }

        let c_blob = serde_json::to_string(&l_entities_updated)?;
        self.storage.write_slot(&self.key_slot, &c_blob)?;
        info!(entity = name, count = l_entities_updated.len(), "entity saved");

        self.l_entities_cached = Some(l_entities_updated);
        Ok(entity)
    }

    /// First entity whose name equals `name` exactly.
    pub fn load_by_name(&mut self, name: &str) -> Option<SpecSavedEntity> {
        self.entities()
            .iter()
            .find(|saved| saved.name == name)
            .cloned()
    }

    /// Entity names in insertion order.
    pub fn list_names(&mut self) -> Vec<String> {
        self.entities()
            .iter()
            .map(|saved| saved.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::MemorySlotStorage;

    fn record(pairs: &[(&str, &str)]) -> ValueRecord {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    struct FailingSlotStorage;

    impl SlotStorage for FailingSlotStorage {
        fn read_slot(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn write_slot(&mut self, key: &str, _blob: &str) -> Result<()> {
            Err(EntityError::persistence(format!("slot {key} is read-only")))
        }
    }

    #[test]
    fn save_then_load_by_name_round_trips() {
        let mut repo = EntityRepository::new(MemorySlotStorage::new());
        let data = record(&[("b_01_01_0020", "Acme"), ("b_02_03_0010", "France")]);

        let saved = repo.save("Acme", data.clone()).expect("save");
        assert_eq!(saved.data, data);
        assert_eq!(repo.load_by_name("Acme").expect("found").data, data);
        assert_eq!(repo.load_by_name("acme"), None);
    }

    #[test]
    fn save_same_name_replaces_in_place() {
        let mut repo = EntityRepository::new(MemorySlotStorage::new());
        repo.save("X", record(&[("k", "1")])).expect("save");
        repo.save("Y", record(&[("k", "2")])).expect("save");
        repo.save("X", record(&[("k", "3")])).expect("save");

        assert_eq!(repo.list_names(), vec!["X".to_string(), "Y".to_string()]);
        assert_eq!(repo.len(), 2);
        assert_eq!(
            repo.load_by_name("X").expect("found").data,
            record(&[("k", "3")])
        );
    }

    #[test]
    fn save_with_empty_name_is_rejected_without_write() {
        let mut repo = EntityRepository::new(MemorySlotStorage::new());
        repo.save("Acme", ValueRecord::new()).expect("save");
        let l_names_before = repo.list_names();

        let err = repo.save("", record(&[("k", "v")])).expect_err("must fail");
        assert!(err.is_validation());
        let err = repo.save("  \t", record(&[("k", "v")])).expect_err("must fail");
        assert!(err.is_validation());
        assert_eq!(repo.list_names(), l_names_before);
        assert_eq!(repo.read_persisted().expect("read").len(), 1);
    }

    #[test]
    fn corrupt_blob_loads_as_empty() {
        let mut storage = MemorySlotStorage::new();
        storage
            .write_slot(C_KEY_SLOT_SAVED_ENTITIES, "{not json")
            .expect("write");
        let mut repo = EntityRepository::new(storage);

        assert!(repo.load().is_empty());
        assert!(repo.read_persisted().is_err());
    }

    #[test]
    fn duplicate_names_in_blob_resolve_to_first_match() {
        let mut storage = MemorySlotStorage::new();
        storage
            .write_slot(
                C_KEY_SLOT_SAVED_ENTITIES,
                r#"[{"name":"Acme","data":{"k":"first"}},{"name":"Acme","data":{"k":"second"}}]"#,
            )
            .expect("write");
        let mut repo = EntityRepository::new(storage);

        assert_eq!(
            repo.load_by_name("Acme").expect("found").data,
            record(&[("k", "first")])
        );
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn save_reads_existing_slot_before_writing() {
        let mut storage = MemorySlotStorage::new();
        storage
            .write_slot(
                C_KEY_SLOT_SAVED_ENTITIES,
                r#"[{"name":"Globex","data":{}}]"#,
            )
            .expect("write");
        let mut repo = EntityRepository::new(storage);

        repo.save("Acme", ValueRecord::new()).expect("save");
        assert_eq!(
            repo.reload()
                .iter()
                .map(|saved| saved.name.as_str())
                .collect::<Vec<_>>(),
            vec!["Globex", "Acme"]
        );
    }

    #[test]
    fn failed_write_leaves_collection_unchanged() {
        let mut repo = EntityRepository::new(FailingSlotStorage);
        let err = repo.save("Acme", ValueRecord::new()).expect_err("must fail");
        assert!(matches!(err, EntityError::Persistence { .. }));
        assert!(repo.list_names().is_empty());
    }
}
