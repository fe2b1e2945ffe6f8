//! Pure transformer from value records to categorized sheet rows.

use crate::catalog::FieldCatalog;
use crate::conf::{C_HEADER_KEY_COLUMN_ID, C_HEADER_KEY_COLUMN_LABEL, C_PREFIX_KEY_ROW_INDEX};
use crate::spec::{EnumSheetCategory, ValueRecord};
use crate::util::{derive_entity_name, normalize_field_id};

////////////////////////////////////////////////////////////////////////////////
// #region ExportModels

/// One data column of a sheet, derived from a catalog field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetColumn {
    /// Raw dotted field id.
    pub field_id: String,
    /// Normalized record key.
    pub key: String,
    /// Display label (header text).
    pub label: String,
}

/// One entity's row in one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetRow {
    /// Leading key column shared by the entity's rows across all sheets: the
    /// entity name, or `#<1-based row>` for unnamed records.
    pub key: String,
    /// One value per sheet column; empty string when absent.
    pub values: Vec<String>,
}

/// Header + rows of one categorized sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecExportSheet {
    pub category: EnumSheetCategory,
    pub sheet_name: String,
    /// Label of the leading key column.
    pub key_header_label: String,
    /// Machine id of the leading key column.
    pub key_header_id: String,
    pub columns: Vec<SpecSheetColumn>,
    pub rows: Vec<SpecSheetRow>,
}

impl SpecExportSheet {
    /// Number of data columns (the key column excluded).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of data rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Header labels including the leading key column.
    pub fn header_labels(&self) -> Vec<String> {
        std::iter::once(self.key_header_label.clone())
            .chain(self.columns.iter().map(|col| col.label.clone()))
            .collect()
    }

    /// Header ids including the leading key column.
    pub fn header_ids(&self) -> Vec<String> {
        std::iter::once(self.key_header_id.clone())
            .chain(self.columns.iter().map(|col| col.field_id.clone()))
            .collect()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportTransformer

#[derive(Debug, Clone)]
struct SpecSheetLayout {
    category: EnumSheetCategory,
    columns: Vec<SpecSheetColumn>,
}

/// Fans value records out into the three category sheets.
///
/// Column layouts are fixed once from the catalog, independent of which
/// fields a record happens to populate.
#[derive(Debug, Clone)]
pub struct ExportTransformer {
    l_layouts: Vec<SpecSheetLayout>,
}

impl ExportTransformer {
    pub fn new(catalog: &FieldCatalog) -> Self {
        let l_layouts = EnumSheetCategory::ALL
            .into_iter()
            .map(|category| SpecSheetLayout {
                category,
                columns: catalog
                    .fields_in_category(category)
                    .into_iter()
                    .map(|field| SpecSheetColumn {
                        field_id: field.id.clone(),
                        key: normalize_field_id(&field.id),
                        label: field.label.clone(),
                    })
                    .collect(),
            })
            .collect();
        Self { l_layouts }
    }

    /// Transform a single record.
    pub fn transform_one(&self, record: &ValueRecord) -> Vec<SpecExportSheet> {
        self.transform(std::slice::from_ref(record))
    }

    /// Transform an ordered batch: N records give N rows on every sheet.
    pub fn transform(&self, records: &[ValueRecord]) -> Vec<SpecExportSheet> {
        self.l_layouts
            .iter()
            .map(|layout| SpecExportSheet {
                category: layout.category,
                sheet_name: layout.category.sheet_name().to_string(),
                key_header_label: C_HEADER_KEY_COLUMN_LABEL.to_string(),
                key_header_id: C_HEADER_KEY_COLUMN_ID.to_string(),
                columns: layout.columns.clone(),
                rows: records
                    .iter()
                    .enumerate()
                    .map(|(n_idx, record)| derive_sheet_row(&layout.columns, n_idx + 1, record))
                    .collect(),
            })
            .collect()
    }
}

fn derive_sheet_row(
    columns: &[SpecSheetColumn],
    n_row_1based: usize,
    record: &ValueRecord,
) -> SpecSheetRow {
    let c_name = derive_entity_name(record);
    let c_key = if c_name.is_empty() {
        format!("{C_PREFIX_KEY_ROW_INDEX}{n_row_1based}")
    } else {
        c_name.to_string()
    };
    SpecSheetRow {
        key: c_key,
        values: columns
            .iter()
            .map(|col| record.get(&col.key).cloned().unwrap_or_default())
            .collect(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SpecSheetClassification;
    use crate::conf::derive_default_field_catalog;
    use crate::spec::{EnumFieldType, SpecFieldDefinition};

    fn record(pairs: &[(&str, &str)]) -> ValueRecord {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn columns_are_stable_regardless_of_population() {
        let catalog = derive_default_field_catalog().expect("catalog");
        let transformer = ExportTransformer::new(&catalog);

        let l_sheets = transformer.transform_one(&record(&[
            ("b_01_01_0020", "Acme"),
            ("b_02_03_0010", "France"),
        ]));

        assert_eq!(l_sheets.len(), 3);
        let n_width_total: usize = l_sheets.iter().map(SpecExportSheet::width).sum();
        assert_eq!(n_width_total, catalog.len());

        for sheet in &l_sheets {
            assert_eq!(sheet.height(), 1);
            let row = &sheet.rows[0];
            assert_eq!(row.key, "Acme");
            assert_eq!(row.values.len(), catalog.fields_in_category(sheet.category).len());
        }

        let n_empty: usize = l_sheets
            .iter()
            .flat_map(|sheet| sheet.rows[0].values.iter())
            .filter(|value| value.is_empty())
            .count();
        assert_eq!(n_empty, catalog.len() - 2);

        let sheet_identity = &l_sheets[0];
        assert_eq!(sheet_identity.category, EnumSheetCategory::Identity);
        assert_eq!(sheet_identity.rows[0].values[1], "Acme");
        let sheet_relationship = &l_sheets[2];
        assert_eq!(sheet_relationship.rows[0].values[0], "France");
    }

    #[test]
    fn row_count_matches_input_on_every_sheet() {
        let catalog = derive_default_field_catalog().expect("catalog");
        let transformer = ExportTransformer::new(&catalog);

        for n_records in [0usize, 1, 5] {
            let l_records: Vec<ValueRecord> = (0..n_records)
                .map(|n_idx| record(&[("b_01_01_0020", format!("Entity {n_idx}").as_str())]))
                .collect();
            let l_sheets = transformer.transform(&l_records);
            assert_eq!(l_sheets.len(), 3);
            for sheet in &l_sheets {
                assert_eq!(sheet.height(), n_records);
                assert_eq!(
                    sheet.header_labels().len(),
                    sheet.width() + 1,
                    "header carries the key column"
                );
            }
        }
    }

    #[test]
    fn key_column_joins_rows_across_sheets_in_input_order() {
        let catalog = derive_default_field_catalog().expect("catalog");
        let transformer = ExportTransformer::new(&catalog);

        let l_sheets = transformer.transform(&[
            record(&[("b_01_01_0020", "Acme")]),
            record(&[("b_01_01_0020", "Globex"), ("b_01_02_0050", "Subsidiary")]),
        ]);

        for sheet in &l_sheets {
            let l_keys: Vec<&str> = sheet.rows.iter().map(|row| row.key.as_str()).collect();
            assert_eq!(l_keys, vec!["Acme", "Globex"]);
        }
        assert_eq!(l_sheets[1].rows[1].values[0], "Subsidiary");
    }

    #[test]
    fn unnamed_records_are_keyed_by_row_index() {
        let catalog = derive_default_field_catalog().expect("catalog");
        let transformer = ExportTransformer::new(&catalog);

        let l_sheets = transformer.transform(&[
            record(&[("b_01_01_0030", "France")]),
            record(&[("b_01_01_0020", "Acme")]),
            record(&[("b_02_03_0010", "Spain")]),
        ]);

        for sheet in &l_sheets {
            let l_keys: Vec<&str> = sheet.rows.iter().map(|row| row.key.as_str()).collect();
            assert_eq!(l_keys, vec!["#1", "Acme", "#3"]);
        }
        assert_eq!(transformer.transform_one(&ValueRecord::new())[0].rows[0].key, "#1");
    }

    #[test]
    fn empty_category_still_yields_its_sheet() {
        let catalog = FieldCatalog::new(
            vec![SpecFieldDefinition::new(
                "b_01.01.0020",
                "Name of the entity",
                EnumFieldType::Alphanumerical,
                true,
            )],
            SpecSheetClassification::from_pairs([(
                "b_01.01.0020",
                EnumSheetCategory::Identity,
            )]),
        )
        .expect("catalog");
        let l_sheets = ExportTransformer::new(&catalog).transform(&[]);

        assert_eq!(l_sheets.len(), 3);
        assert_eq!(l_sheets[0].width(), 1);
        assert_eq!(l_sheets[1].width(), 0);
        assert_eq!(l_sheets[1].header_ids(), vec!["entity_name".to_string()]);
        assert!(l_sheets.iter().all(|sheet| sheet.rows.is_empty()));
    }
}
