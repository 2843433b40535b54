//! Property-based tests for the merge engine and site extraction.
//!
//! Uses proptest to generate documents and verify the insertion,
//! substitution and extraction invariants.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use site_merger::extraction::{extract_sites, FragmentFields, TargetNames};
use site_merger::merge::{insert_sites, substitute};
use site_merger::ReplacementMap;

// ============================================================================
// STRATEGIES
// ============================================================================

/// Strategy for generating site entries
fn arb_site() -> impl Strategy<Value = Value> {
    ("[A-Za-z]{1,8}", 0i64..5).prop_map(|(name, kind)| json!({"name": name, "type": kind}))
}

/// Strategy for generating leaf values
fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[a-z./:]{0,30}".prop_map(Value::String),
    ]
}

/// Strategy for generating nested documents
fn arb_document() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::hash_map("[a-z]{1,6}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

// ============================================================================
// INSERTION
// ============================================================================

proptest! {
    #[test]
    fn insertion_places_items_in_order_and_shifts_rest(
        original in prop::collection::vec(arb_site(), 0..12),
        items in prop::collection::vec(arb_site(), 0..6),
        raw_index in 0usize..20,
    ) {
        let n = original.len();
        let k = items.len();
        let index = raw_index.min(n);

        let mut doc = json!({"sites": original.clone()});
        let inserted = insert_sites(&mut doc, items.clone(), index).unwrap();
        prop_assert_eq!(inserted, k);

        let sites = doc["sites"].as_array().unwrap();
        prop_assert_eq!(sites.len(), n + k);
        prop_assert_eq!(&sites[..index], &original[..index]);
        prop_assert_eq!(&sites[index..index + k], &items[..]);
        prop_assert_eq!(&sites[index + k..], &original[index..]);
    }

    #[test]
    fn insertion_past_end_appends(
        original in prop::collection::vec(arb_site(), 0..8),
        item in arb_site(),
        extra in 1usize..10,
    ) {
        let n = original.len();
        let mut doc = json!({"sites": original});
        insert_sites(&mut doc, vec![item.clone()], n + extra).unwrap();
        prop_assert_eq!(&doc["sites"][n], &item);
    }
}

// ============================================================================
// SUBSTITUTION
// ============================================================================

proptest! {
    #[test]
    fn substitution_is_idempotent(doc in arb_document()) {
        // replacement values never contain an old key
        let replacements = ReplacementMap::new().with("a", "Z").with("b", "Y");
        let has_old_key = contains_string_with(&doc, "a") || contains_string_with(&doc, "b");

        let mut once = doc.clone();
        let first = substitute(&mut once, &replacements);
        prop_assert_eq!(first > 0, has_old_key);

        let mut twice = once.clone();
        let second = substitute(&mut twice, &replacements);
        prop_assert_eq!(second, 0);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn substitution_leaves_no_old_keys(doc in arb_document()) {
        let replacements = ReplacementMap::new().with("a", "Z");
        let mut out = doc;
        substitute(&mut out, &replacements);
        prop_assert!(!contains_string_with(&out, "a"));
    }
}

fn contains_string_with(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.contains(needle),
        Value::Array(items) => items.iter().any(|v| contains_string_with(v, needle)),
        Value::Object(fields) => fields.values().any(|v| contains_string_with(v, needle)),
        _ => false,
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

proptest! {
    #[test]
    fn extraction_never_fails_without_sites(doc in arb_document(), name in "[A-Z]{1,4}") {
        let mut doc = doc;
        if let Value::Object(fields) = &mut doc {
            fields.remove("sites");
        }
        let found = extract_sites(Some(&doc), &TargetNames::new([name]), &FragmentFields::default());
        prop_assert!(found.is_empty());
    }

    #[test]
    fn extraction_only_returns_targets(
        sites in prop::collection::vec(arb_site(), 0..12),
        wanted in prop::collection::vec("[A-Za-z]{1,8}", 0..4),
    ) {
        let doc = json!({"sites": sites});
        let targets = TargetNames::new(wanted.iter().cloned());
        let found = extract_sites(Some(&doc), &targets, &FragmentFields::default());
        for entry in &found {
            prop_assert!(targets.contains(entry["name"].as_str().unwrap()));
        }
    }

    #[test]
    fn fragment_parse_never_panics(fragment in ".{0,80}") {
        let _ = FragmentFields::parse(&fragment);
    }
}
