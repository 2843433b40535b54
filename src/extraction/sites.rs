//! Site entry extraction
//!
//! Picks the entries whose `name` is wanted out of a fetched site document.

use crate::extraction::fragment::FragmentFields;
use serde_json::Value;
use std::collections::HashSet;

/// Well-known key holding the ordered site list
pub const SITES_KEY: &str = "sites";

/// Identity key of a site entry
pub const NAME_KEY: &str = "name";

/// The set of site names a run is looking for.
///
/// Keeps the configured order (for not-found reporting) alongside a set for
/// membership checks. Duplicate names are collapsed.
#[derive(Debug, Clone, Default)]
pub struct TargetNames {
    ordered: Vec<String>,
    lookup: HashSet<String>,
}

impl TargetNames {
    /// Build from names in configured order
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut targets = Self::default();
        for name in names {
            let name = name.into();
            if targets.lookup.insert(name.clone()) {
                targets.ordered.push(name);
            }
        }
        targets
    }

    /// Whether `name` is requested
    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains(name)
    }

    /// Requested names in configured order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// True when nothing is requested
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// Name of a site entry, if it is an object with a string `name`
pub fn site_name(entry: &Value) -> Option<&str> {
    entry.get(NAME_KEY).and_then(Value::as_str)
}

/// Extract copies of the requested entries from a site document.
///
/// Returns an empty vector when the document is absent or has no `sites`
/// array. Each match is cloned and gets `fields` overlaid on top. The source
/// document is left untouched and duplicates are kept.
pub fn extract_sites(
    document: Option<&Value>,
    targets: &TargetNames,
    fields: &FragmentFields,
) -> Vec<Value> {
    let Some(sites) = document
        .and_then(|doc| doc.get(SITES_KEY))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    sites
        .iter()
        .filter_map(Value::as_object)
        .filter(|entry| {
            entry
                .get(NAME_KEY)
                .and_then(Value::as_str)
                .is_some_and(|name| targets.contains(name))
        })
        .map(|entry| {
            let mut copy = entry.clone();
            fields.apply_to(&mut copy);
            Value::Object(copy)
        })
        .collect()
}
