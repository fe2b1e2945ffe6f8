use std::io::Cursor;

use calamine::{Reader, Xlsx, open_workbook_from_rs};
use entikit_entity::{ExportTransformer, ValueRecord, derive_default_field_catalog};
use entikit_io_xlsx::export_records_to_buffer;

fn record(pairs: &[(&str, &str)]) -> ValueRecord {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn read_sheet_rows(v_buffer: &[u8], sheet_name: &str) -> Vec<Vec<String>> {
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(Cursor::new(v_buffer.to_vec())).expect("open workbook");
    let range = workbook.worksheet_range(sheet_name).expect("sheet");
    range
        .rows()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect()
}

#[test]
fn workbook_holds_header_rows_and_one_row_per_record() {
    let catalog = derive_default_field_catalog().expect("catalog");
    let l_records = vec![
        record(&[("b_01_01_0020", "Acme"), ("b_02_03_0010", "France")]),
        record(&[("b_01_01_0020", "Globex")]),
    ];
    let v_buffer = export_records_to_buffer(&catalog, &l_records).expect("export");

    let workbook: Xlsx<_> =
        open_workbook_from_rs(Cursor::new(v_buffer.clone())).expect("open workbook");
    assert_eq!(
        workbook.sheet_names(),
        vec![
            "Entity Identity".to_string(),
            "Entity Classification".to_string(),
            "Entity Relationships".to_string()
        ]
    );

    for sheet in ExportTransformer::new(&catalog).transform(&l_records) {
        let l_rows = read_sheet_rows(&v_buffer, &sheet.sheet_name);
        assert_eq!(l_rows.len(), 4, "{}", sheet.sheet_name);
        assert_eq!(l_rows[0], sheet.header_labels());
        assert_eq!(l_rows[1], sheet.header_ids());
        assert_eq!(l_rows[2][0], "Acme");
        assert_eq!(l_rows[3][0], "Globex");
    }

    let l_rows_relationships = read_sheet_rows(&v_buffer, "Entity Relationships");
    assert_eq!(l_rows_relationships[2], vec!["Acme", "France", "", ""]);
    assert_eq!(l_rows_relationships[3], vec!["Globex", "", "", ""]);
}

#[test]
fn empty_export_keeps_only_header_rows() {
    let catalog = derive_default_field_catalog().expect("catalog");
    let v_buffer = export_records_to_buffer(&catalog, &[]).expect("export");

    for sheet in ExportTransformer::new(&catalog).transform(&[]) {
        let l_rows = read_sheet_rows(&v_buffer, &sheet.sheet_name);
        assert_eq!(l_rows.len(), 2, "{}", sheet.sheet_name);
        assert_eq!(l_rows[1], sheet.header_ids());
    }
}
