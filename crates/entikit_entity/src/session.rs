//! Form session: the value store of the entity currently being edited.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::FieldCatalog;
use crate::error::Result;
use crate::repository::EntityRepository;
use crate::slot::SlotStorage;
use crate::spec::{SpecNotice, SpecSavedEntity, ValueRecord};
use crate::util::{derive_entity_name, derive_entity_name_key, normalize_field_id};

/// Draft state of the inline entity-name editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecNameEditState {
    pub if_editing: bool,
    pub name_draft: String,
}

/// Holds one [`ValueRecord`] and hands snapshots to an [`EntityRepository`].
///
/// The entity name is always read from the record's entity-name key, so the
/// displayed name and the stored field cannot diverge.
///
/// Outcomes the user should see are queued as [`SpecNotice`]s and drained by
/// the host independently of the data operations that produced them.
#[derive(Debug)]
pub struct FormSession<S: SlotStorage> {
    catalog: Arc<FieldCatalog>,
    repository: EntityRepository<S>,
    record: ValueRecord,
    name_edit: SpecNameEditState,
    l_notices: VecDeque<SpecNotice>,
}

impl<S: SlotStorage> FormSession<S> {
    pub fn new(catalog: Arc<FieldCatalog>, repository: EntityRepository<S>) -> Self {
        Self {
            catalog,
            repository,
            record: ValueRecord::new(),
            name_edit: SpecNameEditState::default(),
            l_notices: VecDeque::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<FieldCatalog> {
        &self.catalog
    }

    pub fn repository(&self) -> &EntityRepository<S> {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut EntityRepository<S> {
        &mut self.repository
    }

    ////////////////////////////////////////////////////////////////////////////
    // #region ValueStore

    /// Current record, keyed by normalized ids.
    pub fn values(&self) -> &ValueRecord {
        &self.record
    }

    /// Current entity name (empty when unset).
    pub fn entity_name(&self) -> &str {
        derive_entity_name(&self.record)
    }

    /// Value of `field_id` (raw or normalized).
    pub fn field_value(&self, field_id: &str) -> Option<&str> {
        self.record
            .get(&normalize_field_id(field_id))
            .map(String::as_str)
    }

    /// Write `value` under the normalized form of `field_id`.
    pub fn set_field(&mut self, field_id: &str, value: impl Into<String>) {
        let c_key = normalize_field_id(field_id);
        if !self.catalog.contains(&c_key) {
            warn!(field_id, "value written for field outside the catalog");
        }
        debug!(field = %c_key, "field updated");
        self.record.insert(c_key, value.into());
    }

    /// Set the entity name through its record key.
    pub fn rename_entity(&mut self, name_new: impl Into<String>) {
        self.record.insert(derive_entity_name_key(), name_new.into());
    }

    /// Clear the record to start a new entity. The repository is untouched.
    pub fn reset(&mut self) {
        self.record.clear();
        self.name_edit = SpecNameEditState::default();
        self.push_notice(SpecNotice::info(
            "New entity created",
            "You can now enter information for a new entity.",
        ));
    }

    /// Required catalog fields whose value is absent or blank, in catalog order.
    pub fn missing_required_fields(&self) -> Vec<&str> {
        self.catalog
            .required_fields()
            .filter(|field| {
                self.field_value(&field.id)
                    .is_none_or(|value| value.trim().is_empty())
            })
            .map(|field| field.id.as_str())
            .collect()
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region NameEditing

    pub fn name_edit_state(&self) -> &SpecNameEditState {
        &self.name_edit
    }

    /// Open the name editor with the current name as draft.
    pub fn begin_name_edit(&mut self) {
        self.name_edit = SpecNameEditState {
            if_editing: true,
            name_draft: self.entity_name().to_string(),
        };
    }

    pub fn set_name_draft(&mut self, name_draft: impl Into<String>) {
        self.name_edit.name_draft = name_draft.into();
    }

    /// Apply the draft as the entity name and close the editor.
    pub fn commit_name_edit(&mut self) {
        let c_name = std::mem::take(&mut self.name_edit.name_draft);
        self.name_edit.if_editing = false;
        self.rename_entity(c_name);
    }

    /// Close the editor, discarding the draft.
    pub fn cancel_name_edit(&mut self) {
        self.name_edit = SpecNameEditState::default();
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Persistence

    /// Validate and persist a snapshot of the record under the entity name.
    ///
    /// Returns as soon as the repository write completes; the matching notice
    /// is queued for the host.
    pub fn submit(&mut self) -> Result<SpecSavedEntity> {
        let c_name = self.entity_name().to_string();
        match self.repository.save(&c_name, self.record.clone()) {
            Ok(entity) => {
                self.push_notice(SpecNotice::info(
                    "Entity saved",
                    format!("Entity \"{c_name}\" has been saved successfully."),
                ));
                Ok(entity)
            }
            Err(err) => {
                let c_description = if err.is_validation() {
                    "Entity name is required to save data.".to_string()
                } else {
                    err.to_string()
                };
                self.push_notice(SpecNotice::error("Error saving entity", c_description));
                Err(err)
            }
        }
    }

    /// Replace the record with the stored entity called `name`.
    ///
    /// The stored name overwrites the record's name key, so a later
    /// [`Self::submit`] updates the same entry.
    ///
    /// Returns `false` and leaves the session untouched when no entity matches.
    pub fn load_entity(&mut self, name: &str) -> bool {
        let Some(entity) = self.repository.load_by_name(name) else {
            return false;
        };
        self.record = entity.data;
        self.rename_entity(entity.name);
        self.name_edit = SpecNameEditState::default();
        self.push_notice(SpecNotice::info(
            "Entity loaded",
            format!("Entity \"{name}\" has been loaded successfully."),
        ));
        true
    }

    /// Re-read saved entities from storage.
    pub fn refresh_saved_entities(&mut self) -> &[SpecSavedEntity] {
        self.repository.reload()
    }

    pub fn saved_entity_names(&mut self) -> Vec<String> {
        self.repository.list_names()
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region Notices

    fn push_notice(&mut self, notice: SpecNotice) {
        self.l_notices.push_back(notice);
    }

    /// Take all pending notices, oldest first.
    pub fn drain_notices(&mut self) -> Vec<SpecNotice> {
        self.l_notices.drain(..).collect()
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
}
