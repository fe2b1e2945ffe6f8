//! Validated field catalog and its static sheet classification.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::conf::C_FIELD_ID_ENTITY_NAME;
use crate::error::{EntityError, Result};
use crate::spec::{EnumFieldType, EnumSheetCategory, SpecFieldDefinition};
use crate::util::{derive_normalized_key_collisions, is_hierarchical_field_id, normalize_field_id};

////////////////////////////////////////////////////////////////////////////////
// #region SheetClassification

/// Static table mapping field id -> export sheet category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecSheetClassification {
    dict_category_by_id: BTreeMap<String, EnumSheetCategory>,
}

impl SpecSheetClassification {
    /// Build from `(field id, category)` pairs. Later pairs overwrite earlier ones.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, EnumSheetCategory)>,
        S: Into<String>,
    {
        Self {
            dict_category_by_id: pairs
                .into_iter()
                .map(|(field_id, category)| (field_id.into(), category))
                .collect(),
        }
    }

    /// Category assigned to `field_id`.
    pub fn category_of(&self, field_id: &str) -> Option<EnumSheetCategory> {
        self.dict_category_by_id.get(field_id).copied()
    }

    /// Classified field ids.
    pub fn field_ids(&self) -> impl Iterator<Item = &str> {
        self.dict_category_by_id.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.dict_category_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict_category_by_id.is_empty()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CatalogDocument

/// On-disk catalog document: ordered fields plus the classification table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecCatalogDocument {
    pub fields: Vec<SpecFieldDefinition>,
    pub sheets: SpecSheetClassification,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldCatalog

/// Ordered, immutable field catalog.
///
/// Construction guarantees: ids are dot-hierarchical and unique, their
/// normalized keys are collision-free, `closedOptions` fields carry options,
/// the entity-name field is present, and every field is classified into
/// exactly one sheet category.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    l_fields: Vec<SpecFieldDefinition>,
    dict_idx_by_id: BTreeMap<String, usize>,
    dict_idx_by_key: BTreeMap<String, usize>,
    classification: SpecSheetClassification,
}

impl FieldCatalog {
    /// Validate and build a catalog.
    pub fn new(
        fields: Vec<SpecFieldDefinition>,
        classification: SpecSheetClassification,
    ) -> Result<Self> {
        validate_field_definitions(&fields)?;
        validate_sheet_classification(&fields, &classification)?;

        let dict_idx_by_id = fields
            .iter()
            .enumerate()
            .map(|(n_idx, field)| (field.id.clone(), n_idx))
            .collect();
        let dict_idx_by_key = fields
            .iter()
            .enumerate()
            .map(|(n_idx, field)| (normalize_field_id(&field.id), n_idx))
            .collect();

        Ok(Self {
            l_fields: fields,
            dict_idx_by_id,
            dict_idx_by_key,
            classification,
        })
    }

    pub fn from_document(document: SpecCatalogDocument) -> Result<Self> {
        Self::new(document.fields, document.sheets)
    }

    /// Parse and validate a JSON catalog document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: SpecCatalogDocument = serde_json::from_str(text)
            .map_err(|err| EntityError::catalog(format!("Invalid catalog JSON: {err}")))?;
        Self::from_document(document)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let c_text = fs::read_to_string(path).map_err(|err| {
            EntityError::catalog(format!("Failed to read {}: {err}", path.display()))
        })?;
        Self::from_json_str(&c_text)
    }

    /// Serializable document equivalent of this catalog.
    pub fn to_document(&self) -> SpecCatalogDocument {
        SpecCatalogDocument {
            fields: self.l_fields.clone(),
            sheets: self.classification.clone(),
        }
    }

    /// Fields in catalog order.
    pub fn fields(&self) -> &[SpecFieldDefinition] {
        &self.l_fields
    }

    pub fn len(&self) -> usize {
        self.l_fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.l_fields.is_empty()
    }

    /// Look up by raw dotted id.
    pub fn get(&self, field_id: &str) -> Option<&SpecFieldDefinition> {
        self.dict_idx_by_id
            .get(field_id)
            .map(|n_idx| &self.l_fields[*n_idx])
    }

    /// Look up by normalized key.
    pub fn get_by_key(&self, key: &str) -> Option<&SpecFieldDefinition> {
        self.dict_idx_by_key
            .get(key)
            .map(|n_idx| &self.l_fields[*n_idx])
    }

    /// True when `field_id` (raw or normalized) belongs to the catalog.
    pub fn contains(&self, field_id: &str) -> bool {
        self.dict_idx_by_key
            .contains_key(&normalize_field_id(field_id))
    }

    /// The distinguished entity-name field.
    pub fn entity_name_field(&self) -> Option<&SpecFieldDefinition> {
        self.get(C_FIELD_ID_ENTITY_NAME)
    }

    pub fn classification(&self) -> &SpecSheetClassification {
        &self.classification
    }

    /// Sheet category of `field_id`.
    pub fn category_of(&self, field_id: &str) -> Option<EnumSheetCategory> {
        self.classification.category_of(field_id)
    }

    /// Fields of one category, in catalog order.
    pub fn fields_in_category(&self, category: EnumSheetCategory) -> Vec<&SpecFieldDefinition> {
        self.l_fields
            .iter()
            .filter(|field| self.classification.category_of(&field.id) == Some(category))
            .collect()
    }

    /// Required fields, in catalog order.
    pub fn required_fields(&self) -> impl Iterator<Item = &SpecFieldDefinition> {
        self.l_fields.iter().filter(|field| field.required)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Validation

fn validate_field_definitions(fields: &[SpecFieldDefinition]) -> Result<()> {
    if fields.is_empty() {
        return Err(EntityError::catalog("Catalog must contain >= 1 field."));
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, field) in fields.iter().enumerate() {
        if !is_hierarchical_field_id(&field.id) {
            return Err(EntityError::catalog(format!(
                "Field id is not dot-hierarchical: {:?}",
                field.id
            )));
        }
        if field.field_type == EnumFieldType::ClosedOptions
            && field.options.as_ref().is_none_or(Vec::is_empty)
        {
            return Err(EntityError::catalog(format!(
                "Field {:?} is closedOptions but declares no options.",
                field.id
            )));
        }
        dict_pos.entry(&field.id).or_default().push(n_idx);
    }

    let c_msg_duplicates = dict_pos
        .iter()
        .filter(|(_, l_pos)| l_pos.len() > 1)
        .map(|(c_id, l_pos)| format!("{c_id:?} x{} at indices {l_pos:?}", l_pos.len()))
        .collect::<Vec<_>>()
        .join("; ");
    if !c_msg_duplicates.is_empty() {
        return Err(EntityError::catalog(format!(
            "Duplicate field ids detected: {c_msg_duplicates}"
        )));
    }

    let dict_collisions = derive_normalized_key_collisions(fields.iter().map(|f| f.id.as_str()));
    if !dict_collisions.is_empty() {
        let c_msg = dict_collisions
            .iter()
            .map(|(c_key, l_ids)| format!("{c_key:?} <- {l_ids:?}"))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(EntityError::catalog(format!(
            "Field ids collide after normalization: {c_msg}"
        )));
    }

    if !fields.iter().any(|field| field.id == C_FIELD_ID_ENTITY_NAME) {
        return Err(EntityError::catalog(format!(
            "Catalog is missing the entity-name field {C_FIELD_ID_ENTITY_NAME:?}."
        )));
    }

    Ok(())
}

fn validate_sheet_classification(
    fields: &[SpecFieldDefinition],
    classification: &SpecSheetClassification,
) -> Result<()> {
    let l_unclassified: Vec<&str> = fields
        .iter()
        .filter(|field| classification.category_of(&field.id).is_none())
        .map(|field| field.id.as_str())
        .collect();
    if !l_unclassified.is_empty() {
        return Err(EntityError::catalog(format!(
            "Fields without sheet category: {l_unclassified:?}"
        )));
    }

    let l_unknown: Vec<&str> = classification
        .field_ids()
        .filter(|c_id| !fields.iter().any(|field| field.id == *c_id))
        .collect();
    if !l_unknown.is_empty() {
        return Err(EntityError::catalog(format!(
            "Sheet classification names unknown fields: {l_unknown:?}"
        )));
    }

    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::derive_default_field_catalog;

    fn two_field_catalog() -> Result<FieldCatalog> {
        FieldCatalog::new(
            vec![
                SpecFieldDefinition::new(
                    "b_01.01.0020",
                    "Name of the entity",
                    EnumFieldType::Alphanumerical,
                    true,
                ),
                SpecFieldDefinition::new(
                    "b_02.03.0010",
                    "Country",
                    EnumFieldType::Country,
                    false,
                ),
            ],
            SpecSheetClassification::from_pairs([
                ("b_01.01.0020", EnumSheetCategory::Identity),
                ("b_02.03.0010", EnumSheetCategory::Relationship),
            ]),
        )
    }

    #[test]
    fn lookups_by_id_and_key_agree() {
        let catalog = two_field_catalog().expect("catalog");
        let field_by_id = catalog.get("b_02.03.0010").expect("by id");
        let field_by_key = catalog.get_by_key("b_02_03_0010").expect("by key");
        assert_eq!(field_by_id, field_by_key);
        assert!(catalog.contains("b_02.03.0010"));
        assert!(catalog.contains("b_02_03_0010"));
        assert!(!catalog.contains("b_09.09.0090"));
    }

    #[test]
    fn normalized_keys_are_injective_over_default_catalog() {
        let catalog = derive_default_field_catalog().expect("catalog");
        let l_keys: Vec<String> = catalog
            .fields()
            .iter()
            .map(|field| normalize_field_id(&field.id))
            .collect();
        for (n_idx_a, c_key_a) in l_keys.iter().enumerate() {
            for c_key_b in &l_keys[n_idx_a + 1..] {
                assert_ne!(c_key_a, c_key_b);
            }
        }
    }

    #[test]
    fn colliding_ids_are_rejected() {
        let err = FieldCatalog::new(
            vec![
                SpecFieldDefinition::new(
                    "b_01.01.0020",
                    "Name",
                    EnumFieldType::Alphanumerical,
                    true,
                ),
                SpecFieldDefinition::new("a.b_c", "x", EnumFieldType::Alphanumerical, false),
                SpecFieldDefinition::new("a_b.c", "y", EnumFieldType::Alphanumerical, false),
            ],
            SpecSheetClassification::from_pairs([
                ("b_01.01.0020", EnumSheetCategory::Identity),
                ("a.b_c", EnumSheetCategory::Identity),
                ("a_b.c", EnumSheetCategory::Identity),
            ]),
        )
        .expect_err("must fail");
        assert!(err.to_string().contains("collide"));
    }

    #[test]
    fn unclassified_field_is_rejected() {
        let err = FieldCatalog::new(
            vec![SpecFieldDefinition::new(
                "b_01.01.0020",
                "Name",
                EnumFieldType::Alphanumerical,
                true,
            )],
            SpecSheetClassification::default(),
        )
        .expect_err("must fail");
        assert!(err.to_string().contains("without sheet category"));
    }

    #[test]
    fn closed_options_without_options_is_rejected() {
        let err = FieldCatalog::new(
            vec![
                SpecFieldDefinition::new(
                    "b_01.01.0020",
                    "Name",
                    EnumFieldType::Alphanumerical,
                    true,
                ),
                SpecFieldDefinition::new("b_01.01.0040", "Type", EnumFieldType::ClosedOptions, true),
            ],
            SpecSheetClassification::from_pairs([
                ("b_01.01.0020", EnumSheetCategory::Identity),
                ("b_01.01.0040", EnumSheetCategory::Identity),
            ]),
        )
        .expect_err("must fail");
        assert!(matches!(err, EntityError::Catalog { .. }));
    }

    #[test]
    fn missing_entity_name_field_is_rejected() {
        let err = FieldCatalog::new(
            vec![SpecFieldDefinition::new(
                "b_02.03.0010",
                "Country",
                EnumFieldType::Country,
                false,
            )],
            SpecSheetClassification::from_pairs([(
                "b_02.03.0010",
                EnumSheetCategory::Relationship,
            )]),
        )
        .expect_err("must fail");
        assert!(err.to_string().contains("entity-name"));
    }

    #[test]
    fn json_document_round_trips_through_catalog() {
        let catalog = two_field_catalog().expect("catalog");
        let c_json = serde_json::to_string(&catalog.to_document()).expect("serialize");
        let catalog_back = FieldCatalog::from_json_str(&c_json).expect("parse");
        assert_eq!(catalog_back.fields(), catalog.fields());
        assert_eq!(
            catalog_back.category_of("b_02.03.0010"),
            Some(EnumSheetCategory::Relationship)
        );
    }

    #[test]
    fn fields_in_category_keep_catalog_order() {
        let catalog = derive_default_field_catalog().expect("catalog");
        let l_ids: Vec<&str> = catalog
            .fields_in_category(EnumSheetCategory::Identity)
            .into_iter()
            .map(|field| field.id.as_str())
            .collect();
        assert_eq!(
            l_ids,
            vec![
                "b_01.01.0010",
                "b_01.01.0020",
                "b_01.01.0030",
                "b_01.01.0040",
                "b_01.01.0050",
                "b_01.01.0060"
            ]
        );
    }
}
