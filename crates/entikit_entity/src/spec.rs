//! Shared entity specification models.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Flat value store of one entity: normalized key -> value.
///
/// Dates are stored as ISO `YYYY-MM-DD` strings.
pub type ValueRecord = BTreeMap<String, String>;

////////////////////////////////////////////////////////////////////////////////
// #region FieldSpecification

/// Input kind of a catalog field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnumFieldType {
    /// Free text.
    Alphanumerical,
    /// One value out of the country list.
    Country,
    /// One value out of the field's own `options`.
    ClosedOptions,
    /// ISO date.
    Date,
}

impl EnumFieldType {
    /// Human-readable label shown next to the field.
    pub fn label(self) -> &'static str {
        match self {
            Self::Alphanumerical => "Alphanumerical",
            Self::Country => "Country",
            Self::ClosedOptions => "Closed set of options",
            Self::Date => "Date",
        }
    }
}

/// One catalog field definition. Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecFieldDefinition {
    /// Dot-hierarchical identifier, e.g. `b_01.01.0020`.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Input kind.
    pub field_type: EnumFieldType,
    /// Presence required before the entity is complete.
    #[serde(default)]
    pub required: bool,
    /// Ordered option list for `closedOptions` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl SpecFieldDefinition {
    /// Build a definition without options/description/placeholder.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        field_type: EnumFieldType,
        required: bool,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            field_type,
            required,
            options: None,
            description: None,
            placeholder: None,
        }
    }

    /// Return a copy carrying `options`.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// Return a copy carrying `description`.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetCategory

/// Export sheet a field's value lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumSheetCategory {
    /// Identity/profile fields.
    Identity,
    /// Classification/taxonomy fields.
    Classification,
    /// Supplementary/relationship fields.
    Relationship,
}

impl EnumSheetCategory {
    /// All categories in export order.
    pub const ALL: [EnumSheetCategory; 3] = [
        EnumSheetCategory::Identity,
        EnumSheetCategory::Classification,
        EnumSheetCategory::Relationship,
    ];

    /// Default workbook sheet name.
    pub fn sheet_name(self) -> &'static str {
        match self {
            Self::Identity => "Entity Identity",
            Self::Classification => "Entity Classification",
            Self::Relationship => "Entity Relationships",
        }
    }
}

impl fmt::Display for EnumSheetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_name = match self {
            Self::Identity => "identity",
            Self::Classification => "classification",
            Self::Relationship => "relationship",
        };
        write!(f, "{c_name}")
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region EntitySpecification

/// One persisted entity: display name + its value record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecSavedEntity {
    /// Value of the entity-name field; identity key in the repository.
    pub name: String,
    /// Snapshot of the value record.
    pub data: ValueRecord,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NoticeSpecification

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumNoticeVariant {
    #[default]
    Default,
    Destructive,
}

/// User-visible outcome of one session action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecNotice {
    pub title: String,
    pub description: String,
    pub variant: EnumNoticeVariant,
}

impl SpecNotice {
    /// Informational notice.
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: EnumNoticeVariant::Default,
        }
    }

    /// Error notice.
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: EnumNoticeVariant::Destructive,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
