//! Merge engine
//!
//! Three independent operations on the base document:
//!
//! - [`rename_key`]: overwrite a top-level value if the key is present
//! - [`substitute`]: depth-first substring replacement over every string leaf
//! - [`insert_sites`] / [`insert_site`]: positional insertion into `sites`
//!
//! None of them panic on a malformed document; structural problems come back
//! as [`MergeError`].

use crate::error::{ConfigError, MergeError};
use crate::extraction::SITES_KEY;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Default insertion index (second position)
pub const DEFAULT_INSERT_INDEX: usize = 1;

/// Ordered `old substring -> new substring` pairs.
///
/// Deserializes from a JSON object whose values are all strings; pairs are
/// applied in the object's key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ReplacementMap {
    pairs: Vec<(String, String)>,
}

impl ReplacementMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair (builder style); a repeated `old` replaces the earlier pair
    pub fn with<O: Into<String>, N: Into<String>>(mut self, old: O, new: N) -> Self {
        self.insert(old, new);
        self
    }

    /// Add or replace a pair
    pub fn insert<O: Into<String>, N: Into<String>>(&mut self, old: O, new: N) {
        let old = old.into();
        let new = new.into();
        match self.pairs.iter_mut().find(|(o, _)| *o == old) {
            Some(pair) => pair.1 = new,
            None => self.pairs.push((old, new)),
        }
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when there is nothing to replace
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over pairs in application order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(o, n)| (o.as_str(), n.as_str()))
    }

    /// Apply every pair to one string, returning `None` if nothing changed
    pub fn apply(&self, text: &str) -> Option<String> {
        let mut current: Option<String> = None;
        for (old, new) in self.iter() {
            if old.is_empty() {
                continue;
            }
            let haystack = current.as_deref().unwrap_or(text);
            if haystack.contains(old) {
                current = Some(haystack.replace(old, new));
            }
        }
        current
    }
}

impl TryFrom<Map<String, Value>> for ReplacementMap {
    type Error = ConfigError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut replacements = Self::new();
        for (old, new) in map {
            let Value::String(new) = new else {
                return Err(ConfigError::invalid(
                    "replacements",
                    format!("value for '{}' must be a string", old),
                ));
            };
            if old.is_empty() {
                return Err(ConfigError::invalid(
                    "replacements",
                    "keys must be non-empty",
                ));
            }
            replacements.insert(old, new);
        }
        Ok(replacements)
    }
}

impl From<ReplacementMap> for Map<String, Value> {
    fn from(replacements: ReplacementMap) -> Self {
        replacements
            .pairs
            .into_iter()
            .map(|(o, n)| (o, Value::String(n)))
            .collect()
    }
}

impl<O: Into<String>, N: Into<String>> FromIterator<(O, N)> for ReplacementMap {
    fn from_iter<I: IntoIterator<Item = (O, N)>>(iter: I) -> Self {
        let mut replacements = Self::new();
        for (old, new) in iter {
            replacements.insert(old, new);
        }
        replacements
    }
}

/// Overwrite the value of a top-level `key` if it exists.
///
/// Returns `true` when the key was present. Absent keys (or a non-object
/// document) are left alone.
pub fn rename_key(document: &mut Value, key: &str, value: &str) -> bool {
    match document.get_mut(key) {
        Some(slot) => {
            debug!("Setting '{}' to {}", key, value);
            *slot = Value::String(value.to_string());
            true
        }
        None => false,
    }
}

/// Replace every occurrence of each old substring in every string leaf.
///
/// Walks objects and arrays depth-first; object keys are not rewritten.
/// Returns the number of strings that changed.
pub fn substitute(document: &mut Value, replacements: &ReplacementMap) -> usize {
    if replacements.is_empty() {
        return 0;
    }
    let changed = substitute_value(document, replacements);
    debug!("Substitution changed {} strings", changed);
    changed
}

fn substitute_value(value: &mut Value, replacements: &ReplacementMap) -> usize {
    match value {
        Value::String(text) => match replacements.apply(text) {
            Some(updated) => {
                *text = updated;
                1
            }
            None => 0,
        },
        Value::Array(items) => items
            .iter_mut()
            .map(|item| substitute_value(item, replacements))
            .sum(),
        Value::Object(fields) => fields
            .values_mut()
            .map(|field| substitute_value(field, replacements))
            .sum(),
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}

/// Insert `items` into the document's `sites` array starting at `index`.
///
/// Relative order of `items` is kept and entries at or after `index` shift
/// down. An index past the end appends. The batch is all-or-nothing: if the
/// document has no `sites` array or any item is not an object, nothing is
/// inserted. Returns the number of inserted entries.
pub fn insert_sites(
    document: &mut Value,
    items: Vec<Value>,
    index: usize,
) -> Result<usize, MergeError> {
    let sites = sites_mut(document)?;

    if let Some(position) = items.iter().position(|item| !item.is_object()) {
        return Err(MergeError::NotAnObject(position));
    }

    let at = index.min(sites.len());
    let count = items.len();
    sites.splice(at..at, items);

    info!("Inserted {} sites at position {}", count, at);
    Ok(count)
}

/// Insert a single entry into `sites` at `index`
pub fn insert_site(document: &mut Value, item: Value, index: usize) -> Result<usize, MergeError> {
    insert_sites(document, vec![item], index)
}

fn sites_mut(document: &mut Value) -> Result<&mut Vec<Value>, MergeError> {
    document
        .get_mut(SITES_KEY)
        .and_then(Value::as_array_mut)
        .ok_or(MergeError::MissingSites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_rename_then_substitute() {
        let mut doc = json!({"spider": "old.jar", "sites": [{"name": "A"}]});
        assert!(rename_key(&mut doc, "spider", "new.jar"));
        substitute(&mut doc, &ReplacementMap::new().with("old.jar", "new.jar"));
        assert_eq!(doc, json!({"spider": "new.jar", "sites": [{"name": "A"}]}));
    }

    #[test]
    fn test_rename_absent_key_is_noop() {
        let mut doc = json!({"sites": []});
        assert!(!rename_key(&mut doc, "spider", "x.jar"));
        assert_eq!(doc, json!({"sites": []}));
    }

    #[test]
    fn test_substitute_nested_and_arrays() {
        let mut doc = json!({
            "spider": "http://old.host/a.jar",
            "lives": [{"url": "http://old.host/live.txt"}],
            "rules": ["old.host", 3, null, true],
            "old.host": "key untouched"
        });
        let changed = substitute(&mut doc, &ReplacementMap::new().with("old.host", "new.host"));
        assert_eq!(changed, 3);
        assert_eq!(
            doc,
            json!({
                "spider": "http://new.host/a.jar",
                "lives": [{"url": "http://new.host/live.txt"}],
                "rules": ["new.host", 3, null, true],
                "old.host": "key untouched"
            })
        );
    }

    #[test]
    fn test_multiple_replacements_in_one_string() {
        let mut doc = json!({"ext": "a-b"});
        substitute(&mut doc, &ReplacementMap::new().with("a", "x").with("b", "y"));
        assert_eq!(doc["ext"], "x-y");
    }

    #[test]
    fn test_insert_scenario() {
        let mut doc = json!({"sites": [{"name": "A"}, {"name": "B"}]});
        let inserted =
            insert_sites(&mut doc, vec![json!({"name": "X"}), json!({"name": "Y"})], 1).unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(
            doc,
            json!({"sites": [{"name": "A"}, {"name": "X"}, {"name": "Y"}, {"name": "B"}]})
        );
    }

    #[test]
    fn test_insert_past_end_appends() {
        let mut doc = json!({"sites": [{"name": "A"}]});
        insert_site(&mut doc, json!({"name": "Z"}), 10).unwrap();
        assert_eq!(doc, json!({"sites": [{"name": "A"}, {"name": "Z"}]}));
    }

    #[test]
    fn test_insert_without_sites() {
        let mut doc = json!({"spider": "x"});
        assert_eq!(
            insert_site(&mut doc, json!({"name": "A"}), 1),
            Err(MergeError::MissingSites)
        );
        let mut doc = json!({"sites": "nope"});
        assert_eq!(
            insert_site(&mut doc, json!({"name": "A"}), 1),
            Err(MergeError::MissingSites)
        );
    }

    #[test]
    fn test_insert_rejects_non_object_batch() {
        let mut doc = json!({"sites": [{"name": "A"}]});
        let result = insert_sites(&mut doc, vec![json!({"name": "X"}), json!("bad")], 0);
        assert_eq!(result, Err(MergeError::NotAnObject(1)));
        assert_eq!(doc, json!({"sites": [{"name": "A"}]}));
    }

    #[test]
    fn test_replacement_map_from_json() {
        let map: ReplacementMap =
            serde_json::from_str(r#"{"old.jar": "new.jar", "a": "b"}"#).unwrap();
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("old.jar", "new.jar"), ("a", "b")]);

        assert!(serde_json::from_str::<ReplacementMap>(r#"{"a": 1}"#).is_err());
        assert!(serde_json::from_str::<ReplacementMap>(r#"{"": "x"}"#).is_err());
    }

    #[test]
    fn test_replacement_map_serializes_as_object() {
        let map: ReplacementMap = [("a", "b")].into_iter().collect();
        assert_eq!(serde_json::to_value(&map).unwrap(), json!({"a": "b"}));
    }
}
