//! Stateless helper utilities shared by the entity pipeline.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::conf::C_FIELD_ID_ENTITY_NAME;
use crate::spec::ValueRecord;

static RE_FIELD_ID_HIERARCHICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+(\.[A-Za-z0-9_]+)+$").expect("static field id pattern")
});

////////////////////////////////////////////////////////////////////////////////
// #region IdentifierNormalization

/// Map a dot-hierarchical field id to its flat storage key (`.` -> `_`).
///
/// Pure and idempotent: a key that is already normalized maps to itself.
pub fn normalize_field_id(field_id: &str) -> String {
    field_id.replace('.', "_")
}

/// True when `field_id` has at least two dot-separated `[A-Za-z0-9_]` segments.
pub fn is_hierarchical_field_id(field_id: &str) -> bool {
    RE_FIELD_ID_HIERARCHICAL.is_match(field_id)
}

/// Normalized key of the distinguished entity-name field.
pub fn derive_entity_name_key() -> String {
    normalize_field_id(C_FIELD_ID_ENTITY_NAME)
}

/// Read the entity name out of a value record (empty when absent).
pub fn derive_entity_name(record: &ValueRecord) -> &str {
    record
        .get(&derive_entity_name_key())
        .map(String::as_str)
        .unwrap_or("")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CollisionChecks

/// Group ids whose normalized keys collide; empty when normalization is injective.
pub fn derive_normalized_key_collisions<'a, I>(field_ids: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut dict_ids_by_key: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for field_id in field_ids {
        dict_ids_by_key
            .entry(normalize_field_id(field_id))
            .or_default()
            .push(field_id.to_string());
    }
    dict_ids_by_key.retain(|_, l_ids| l_ids.len() > 1);
    dict_ids_by_key
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_normalize_replaces_every_dot() {
        assert_eq!(normalize_field_id("b_01.01.0020"), "b_01_01_0020");
        assert_eq!(normalize_field_id("b_02.03.0010"), "b_02_03_0010");
        assert_eq!(normalize_field_id("plain"), "plain");
    }

    #[test]
    fn test_hierarchical_field_id_shape() {
        assert!(is_hierarchical_field_id("b_01.01.0020"));
        assert!(is_hierarchical_field_id("a.b"));
        assert!(!is_hierarchical_field_id("b_01_01_0020"));
        assert!(!is_hierarchical_field_id("b_01..0020"));
        assert!(!is_hierarchical_field_id(".b_01"));
        assert!(!is_hierarchical_field_id(""));
    }

    #[test]
    fn test_collisions_reported_per_key() {
        let dict_collisions =
            derive_normalized_key_collisions(["a.b_c", "a_b.c", "a.b.d", "x.y"]);
        assert_eq!(dict_collisions.len(), 1);
        assert_eq!(
            dict_collisions["a_b_c"],
            vec!["a.b_c".to_string(), "a_b.c".to_string()]
        );
    }

    #[test]
    fn test_entity_name_read_from_record() {
        let mut record = ValueRecord::new();
        assert_eq!(derive_entity_name(&record), "");
        record.insert("b_01_01_0020".to_string(), "Acme".to_string());
        assert_eq!(derive_entity_name(&record), "Acme");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(field_id in "[a-z0-9_]{1,6}(\\.[a-z0-9_]{1,6}){0,4}") {
            let c_key = normalize_field_id(&field_id);
            prop_assert_eq!(normalize_field_id(&c_key), c_key.clone());
            prop_assert!(!c_key.contains('.'));
        }

        #[test]
        fn prop_normalize_is_injective_without_underscores(
            a in "[a-z0-9]{1,4}(\\.[a-z0-9]{1,4}){1,3}",
            b in "[a-z0-9]{1,4}(\\.[a-z0-9]{1,4}){1,3}",
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(normalize_field_id(&a), normalize_field_id(&b));
        }
    }
}
