//! Entity constants, default catalog presets and runtime configuration.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::catalog::{FieldCatalog, SpecSheetClassification};
use crate::error::{EntityError, Result};
use crate::spec::{EnumFieldType, EnumSheetCategory, SpecFieldDefinition};

/// Field id of the distinguished entity-name field.
pub const C_FIELD_ID_ENTITY_NAME: &str = "b_01.01.0020";
/// Well-known slot holding the saved-entity collection.
pub const C_KEY_SLOT_SAVED_ENTITIES: &str = "savedEntities";
/// Header text of the leading key column on every export sheet.
pub const C_HEADER_KEY_COLUMN_LABEL: &str = "Entity name";
/// Machine id of the leading key column on every export sheet.
pub const C_HEADER_KEY_COLUMN_ID: &str = "entity_name";
/// Key column prefix for records without an entity name (`#1`, `#2`, ...).
pub const C_PREFIX_KEY_ROW_INDEX: &str = "#";

/// Options offered by `b_01.01.0040`.
pub const TUP_ENTITY_TYPES: [&str; 6] = [
    "Credit institution",
    "Investment firm",
    "Payment institution",
    "Electronic money institution",
    "Insurance undertaking",
    "Other financial entity",
];

/// Options offered by `b_01.02.0050`.
pub const TUP_GROUP_HIERARCHY: [&str; 4] = [
    "Ultimate parent undertaking",
    "Parent undertaking",
    "Subsidiary",
    "Entity not part of a group",
];

/// Options offered by `b_02.03.0030`.
pub const TUP_RELATIONSHIP_TYPES: [&str; 3] = [
    "Direct ICT third-party service provider",
    "Subcontractor",
    "Intra-group provider",
];

////////////////////////////////////////////////////////////////////////////////
// #region DefaultCatalog

/// Static field -> sheet assignment for the default catalog.
pub const TUP_DEFAULT_SHEET_CLASSIFICATION: [(&str, EnumSheetCategory); 12] = [
    ("b_01.01.0010", EnumSheetCategory::Identity),
    ("b_01.01.0020", EnumSheetCategory::Identity),
    ("b_01.01.0030", EnumSheetCategory::Identity),
    ("b_01.01.0040", EnumSheetCategory::Identity),
    ("b_01.01.0050", EnumSheetCategory::Identity),
    ("b_01.01.0060", EnumSheetCategory::Identity),
    ("b_01.02.0050", EnumSheetCategory::Classification),
    ("b_01.02.0060", EnumSheetCategory::Classification),
    ("b_01.02.0070", EnumSheetCategory::Classification),
    ("b_02.03.0010", EnumSheetCategory::Relationship),
    ("b_02.03.0020", EnumSheetCategory::Relationship),
    ("b_02.03.0030", EnumSheetCategory::Relationship),
];

/// Build the default field definitions in catalog order.
pub fn derive_default_field_definitions() -> Vec<SpecFieldDefinition> {
    vec![
        SpecFieldDefinition::new(
            "b_01.01.0010",
            "LEI of the entity maintaining the register of information",
            EnumFieldType::Alphanumerical,
            true,
        ),
        SpecFieldDefinition::new(
            C_FIELD_ID_ENTITY_NAME,
            "Name of the entity",
            EnumFieldType::Alphanumerical,
            true,
        )
        .with_description("Legal name as registered"),
        SpecFieldDefinition::new(
            "b_01.01.0030",
            "Country of the entity",
            EnumFieldType::Country,
            true,
        ),
        SpecFieldDefinition::new(
            "b_01.01.0040",
            "Type of entity",
            EnumFieldType::ClosedOptions,
            true,
        )
        .with_options(TUP_ENTITY_TYPES),
        SpecFieldDefinition::new(
            "b_01.01.0050",
            "Competent Authority",
            EnumFieldType::Alphanumerical,
            false,
        ),
        SpecFieldDefinition::new(
            "b_01.01.0060",
            "Date of the reporting",
            EnumFieldType::Date,
            true,
        ),
        SpecFieldDefinition::new(
            "b_01.02.0050",
            "Hierarchy of the entity within the group",
            EnumFieldType::ClosedOptions,
            false,
        )
        .with_options(TUP_GROUP_HIERARCHY),
        SpecFieldDefinition::new(
            "b_01.02.0060",
            "LEI of the direct parent undertaking",
            EnumFieldType::Alphanumerical,
            false,
        ),
        SpecFieldDefinition::new(
            "b_01.02.0070",
            "Date of last update",
            EnumFieldType::Date,
            false,
        ),
        SpecFieldDefinition::new(
            "b_02.03.0010",
            "Country of the ICT third-party service provider",
            EnumFieldType::Country,
            false,
        ),
        SpecFieldDefinition::new(
            "b_02.03.0020",
            "Contractual arrangement reference number",
            EnumFieldType::Alphanumerical,
            false,
        ),
        SpecFieldDefinition::new(
            "b_02.03.0030",
            "Type of relationship",
            EnumFieldType::ClosedOptions,
            false,
        )
        .with_options(TUP_RELATIONSHIP_TYPES),
    ]
}

/// Build the default sheet classification table.
pub fn derive_default_sheet_classification() -> SpecSheetClassification {
    SpecSheetClassification::from_pairs(TUP_DEFAULT_SHEET_CLASSIFICATION)
}

/// Build the default, validated field catalog.
pub fn derive_default_field_catalog() -> Result<FieldCatalog> {
    FieldCatalog::new(
        derive_default_field_definitions(),
        derive_default_sheet_classification(),
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RuntimeConfig

/// Runtime configuration: defaults, then TOML file, then environment overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpecEntikitConfig {
    /// Directory holding persisted slots.
    pub dir_storage: PathBuf,
    /// Slot key of the saved-entity collection.
    pub key_storage_slot: String,
    /// Directory receiving exported workbooks.
    pub dir_export: PathBuf,
    /// Optional JSON catalog document; the default catalog is used when unset.
    pub file_catalog: Option<PathBuf>,
}

impl Default for SpecEntikitConfig {
    fn default() -> Self {
        Self {
            dir_storage: PathBuf::from(".entikit"),
            key_storage_slot: C_KEY_SLOT_SAVED_ENTITIES.to_string(),
            dir_export: PathBuf::from("."),
            file_catalog: None,
        }
    }
}

impl SpecEntikitConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    /// Load a TOML file, then apply environment overrides.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let c_text = fs::read_to_string(path).map_err(|err| {
            EntityError::config(format!("Failed to read {}: {err}", path.display()))
        })?;
        let mut cfg = Self::from_toml_str(&c_text)?;
        cfg.apply_env();
        Ok(cfg)
    }

    /// Parse TOML text; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| EntityError::config(format!("Invalid TOML: {err}")))
    }

    fn apply_env(&mut self) {
        if let Ok(val) = env::var("ENTIKIT_STORAGE_DIR") {
            self.dir_storage = PathBuf::from(val);
        }
        if let Ok(val) = env::var("ENTIKIT_STORAGE_KEY")
            && !val.trim().is_empty()
        {
            self.key_storage_slot = val;
        }
        if let Ok(val) = env::var("ENTIKIT_EXPORT_DIR") {
            self.dir_export = PathBuf::from(val);
        }
        if let Ok(val) = env::var("ENTIKIT_CATALOG") {
            self.file_catalog = Some(PathBuf::from(val));
        }
    }

    /// Load the configured catalog document, or the default catalog.
    pub fn load_field_catalog(&self) -> Result<FieldCatalog> {
        match &self.file_catalog {
            Some(path) => FieldCatalog::from_json_file(path),
            None => derive_default_field_catalog(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid_and_classified() {
        let catalog = derive_default_field_catalog().expect("default catalog");
        assert_eq!(catalog.len(), TUP_DEFAULT_SHEET_CLASSIFICATION.len());
        for category in EnumSheetCategory::ALL {
            assert!(!catalog.fields_in_category(category).is_empty());
        }
        assert!(catalog.get(C_FIELD_ID_ENTITY_NAME).is_some());
    }

    #[test]
    fn config_from_toml_keeps_defaults_for_missing_keys() {
        let cfg = SpecEntikitConfig::from_toml_str("dir_export = \"out\"\n").expect("parse toml");
        assert_eq!(cfg.dir_export, PathBuf::from("out"));
        assert_eq!(cfg.key_storage_slot, C_KEY_SLOT_SAVED_ENTITIES);
        assert_eq!(cfg.file_catalog, None);
    }

    #[test]
    fn config_from_invalid_toml_is_config_error() {
        let err = SpecEntikitConfig::from_toml_str("dir_export = [").expect_err("must fail");
        assert!(matches!(err, EntityError::Config { .. }));
    }
}
