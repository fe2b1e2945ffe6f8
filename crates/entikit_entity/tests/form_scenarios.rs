use std::sync::Arc;

use entikit_entity::{
    EntityRepository, EnumFieldType, EnumSheetCategory, ExportTransformer, FieldCatalog,
    FileSlotStorage, FormSession, SpecFieldDefinition, SpecSavedEntity, SpecSheetClassification,
    ValueRecord,
};

fn two_field_catalog() -> Arc<FieldCatalog> {
    let catalog = FieldCatalog::new(
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
    .expect("catalog");
    Arc::new(catalog)
}

#[test]
fn submitted_entity_survives_a_fresh_repository() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let catalog = two_field_catalog();

    let mut form = FormSession::new(
        Arc::clone(&catalog),
        EntityRepository::new(FileSlotStorage::new(tmp.path())),
    );
    form.set_field("b_01.01.0020", "Acme");
    form.set_field("b_02.03.0010", "France");
    form.submit().expect("submit");

    let mut repo = EntityRepository::new(FileSlotStorage::new(tmp.path()));
    let expected = SpecSavedEntity {
        name: "Acme".to_string(),
        data: ValueRecord::from([
            ("b_01_01_0020".to_string(), "Acme".to_string()),
            ("b_02_03_0010".to_string(), "France".to_string()),
        ]),
    };
    assert_eq!(repo.load_by_name("Acme"), Some(expected));
}

#[test]
fn last_write_wins_across_sessions() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let catalog = two_field_catalog();

    let mut form = FormSession::new(
        Arc::clone(&catalog),
        EntityRepository::new(FileSlotStorage::new(tmp.path())),
    );
    form.set_field("b_01.01.0020", "X");
    form.set_field("b_02.03.0010", "France");
    form.submit().expect("first submit");
    form.set_field("b_02.03.0010", "Spain");
    form.submit().expect("second submit");

    let mut repo = EntityRepository::new(FileSlotStorage::new(tmp.path()));
    assert_eq!(repo.list_names(), vec!["X".to_string()]);
    let saved = repo.load_by_name("X").expect("found");
    assert_eq!(
        saved.data.get("b_02_03_0010").map(String::as_str),
        Some("Spain")
    );
}

#[test]
fn exported_rows_follow_saved_entities() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let catalog = two_field_catalog();

    let mut form = FormSession::new(
        Arc::clone(&catalog),
        EntityRepository::new(FileSlotStorage::new(tmp.path())),
    );
    for (c_name, c_country) in [("Acme", "France"), ("Globex", "Germany")] {
        form.reset();
        form.set_field("b_01.01.0020", c_name);
        form.set_field("b_02.03.0010", c_country);
        form.submit().expect("submit");
    }

    let l_records: Vec<ValueRecord> = form
        .refresh_saved_entities()
        .iter()
        .map(|saved| saved.data.clone())
        .collect();
    let l_sheets = ExportTransformer::new(&catalog).transform(&l_records);

    assert_eq!(l_sheets.len(), 3);
    for sheet in &l_sheets {
        assert_eq!(sheet.height(), 2);
        assert_eq!(sheet.rows[0].key, "Acme");
        assert_eq!(sheet.rows[1].key, "Globex");
    }
    assert_eq!(l_sheets[2].rows[1].values, vec!["Germany".to_string()]);
    assert!(l_sheets[1].rows.iter().all(|row| row.values.is_empty()));
}
