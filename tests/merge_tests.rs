//! Merge engine tests
//!
//! These tests exercise rename, substitution and insertion on realistic
//! site documents.

use pretty_assertions::assert_eq;
use serde_json::json;
use site_merger::error::MergeError;
use site_merger::merge::{insert_site, insert_sites, rename_key, substitute};
use site_merger::ReplacementMap;

fn base_document() -> serde_json::Value {
    json!({
        "spider": "http://old.host/jar/custom_spider.jar",
        "wallpaper": "http://old.host/wall",
        "sites": [
            {"key": "douban", "name": "豆瓣", "type": 3, "api": "csp_Douban"},
            {"key": "push", "name": "推送", "type": 3, "api": "csp_Push",
             "ext": {"url": "http://old.host/push", "tags": ["old.host", 1]}}
        ],
        "lives": [{"name": "live", "url": "http://old.host/live.txt"}]
    })
}

#[test]
fn test_full_merge_sequence() {
    let mut doc = base_document();

    assert!(rename_key(&mut doc, "spider", "http://new.host/jar/custom_spider.jar"));
    let changed = substitute(&mut doc, &ReplacementMap::new().with("old.host", "new.host"));
    assert_eq!(changed, 4);

    let inserted = insert_sites(
        &mut doc,
        vec![
            json!({"key": "emby", "name": "Emby", "type": 3}),
            json!({"key": "alist", "name": "Alist", "type": 3}),
        ],
        1,
    )
    .unwrap();
    assert_eq!(inserted, 2);

    assert_eq!(
        doc,
        json!({
            "spider": "http://new.host/jar/custom_spider.jar",
            "wallpaper": "http://new.host/wall",
            "sites": [
                {"key": "douban", "name": "豆瓣", "type": 3, "api": "csp_Douban"},
                {"key": "emby", "name": "Emby", "type": 3},
                {"key": "alist", "name": "Alist", "type": 3},
                {"key": "push", "name": "推送", "type": 3, "api": "csp_Push",
                 "ext": {"url": "http://new.host/push", "tags": ["new.host", 1]}}
            ],
            "lives": [{"name": "live", "url": "http://new.host/live.txt"}]
        })
    );
}

#[test]
fn test_key_order_is_preserved() {
    let mut doc = json!({"z": "old", "spider": "a", "a": "old", "sites": []});
    rename_key(&mut doc, "spider", "b");
    substitute(&mut doc, &ReplacementMap::new().with("old", "new"));
    let keys: Vec<_> = doc.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["z", "spider", "a", "sites"]);
}

#[test]
fn test_insert_at_start_and_end() {
    let mut doc = json!({"sites": [{"name": "A"}, {"name": "B"}]});
    insert_site(&mut doc, json!({"name": "first"}), 0).unwrap();
    insert_site(&mut doc, json!({"name": "last"}), 3).unwrap();
    assert_eq!(
        doc,
        json!({"sites": [{"name": "first"}, {"name": "A"}, {"name": "B"}, {"name": "last"}]})
    );
}

#[test]
fn test_insert_into_empty_sites() {
    let mut doc = json!({"sites": []});
    insert_sites(&mut doc, vec![json!({"name": "X"})], 1).unwrap();
    assert_eq!(doc, json!({"sites": [{"name": "X"}]}));
}

#[test]
fn test_insert_failures_leave_document_untouched() {
    let mut doc = json!({"sites": [{"name": "A"}]});
    let before = doc.clone();

    assert_eq!(
        insert_site(&mut doc, json!(["not", "an", "object"]), 1),
        Err(MergeError::NotAnObject(0))
    );
    assert_eq!(doc, before);

    let mut not_object = json!([{"name": "A"}]);
    assert_eq!(
        insert_site(&mut not_object, json!({"name": "B"}), 0),
        Err(MergeError::MissingSites)
    );
}

#[test]
fn test_empty_replacement_map_changes_nothing() {
    let mut doc = base_document();
    let before = doc.clone();
    assert_eq!(substitute(&mut doc, &ReplacementMap::new()), 0);
    assert_eq!(doc, before);
}
