//! Conversion of exported sheets into polars DataFrames for the writer kernel.

use polars::prelude::{AnyValue, Column, DataFrame};

use entikit_entity::SpecExportSheet;

use crate::error::Result;

/// Body frame: one String column per header id, key column first.
pub fn derive_data_frame(sheet: &SpecExportSheet) -> Result<DataFrame> {
    let l_header_ids = sheet.header_ids();
    let mut l_columns = Vec::with_capacity(l_header_ids.len());

    let l_keys: Vec<String> = sheet.rows.iter().map(|row| row.key.clone()).collect();
    l_columns.push(Column::new(l_header_ids[0].as_str().into(), l_keys));

    for (n_idx_col, c_col_name) in l_header_ids.iter().enumerate().skip(1) {
        let l_values: Vec<String> = sheet
            .rows
            .iter()
            .map(|row| row.values.get(n_idx_col - 1).cloned().unwrap_or_default())
            .collect();
        l_columns.push(Column::new(c_col_name.as_str().into(), l_values));
    }

    Ok(DataFrame::new(l_columns)?)
}

/// Two-row header frame aligned with [`derive_data_frame`]: labels, then field ids.
pub fn derive_header_frame(sheet: &SpecExportSheet) -> Result<DataFrame> {
    let l_columns = sheet
        .header_ids()
        .into_iter()
        .zip(sheet.header_labels())
        .map(|(c_id, c_label)| Column::new(c_id.as_str().into(), vec![c_label, c_id.clone()]))
        .collect();

    Ok(DataFrame::new(l_columns)?)
}

/// Cell text of a String-typed frame value; nulls read as empty.
pub(crate) fn derive_text_from_any_value(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(val) => val.to_string(),
        AnyValue::StringOwned(val) => val.to_string(),
        _ => value.to_string(),
    }
}
