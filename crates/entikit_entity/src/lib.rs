//! `entikit_entity` v1:
//! Rust-side entity data pipeline.
//!
//! Architecture:
//! - `conf`       : constants, default catalog and runtime configuration
//! - `spec`       : field/entity/notice models
//! - `error`      : error taxonomy
//! - `util`       : pure helper functions (identifier normalization)
//! - `catalog`    : validated field catalog + sheet classification
//! - `slot`       : persistence slot backends
//! - `repository` : named-entity collection with last-write-wins saves
//! - `session`    : form session (value store) driving the repository
//! - `export`     : pure transformer from value records to sheet rows
pub mod catalog;
pub mod conf;
pub mod error;
pub mod export;
pub mod repository;
pub mod session;
pub mod slot;
pub mod spec;
pub mod util;

pub use catalog::{FieldCatalog, SpecCatalogDocument, SpecSheetClassification};
pub use conf::{
    C_FIELD_ID_ENTITY_NAME, C_KEY_SLOT_SAVED_ENTITIES, SpecEntikitConfig,
    derive_default_field_catalog,
};
pub use error::{EntityError, Result};
pub use export::{ExportTransformer, SpecExportSheet, SpecSheetColumn, SpecSheetRow};
pub use repository::EntityRepository;
pub use session::{FormSession, SpecNameEditState};
pub use slot::{FileSlotStorage, MemorySlotStorage, SlotStorage};
pub use spec::{
    EnumFieldType, EnumNoticeVariant, EnumSheetCategory, SpecFieldDefinition, SpecNotice,
    SpecSavedEntity, ValueRecord,
};
pub use util::{is_hierarchical_field_id, normalize_field_id};
