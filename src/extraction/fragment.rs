//! URL fragment field parsing
//!
//! A source URL may carry extra site fields after a `#`, written as loose
//! `key:value` pairs (`http://host/tv.json#ua:okhttp "quick":"1"`). Those
//! fields are overlaid on every entry extracted from that source.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

fn pair_regex() -> &'static Regex {
    static PAIR: OnceLock<Regex> = OnceLock::new();
    PAIR.get_or_init(|| Regex::new(r"(\w+)\s*:\s*(\w+)").expect("static regex"))
}

/// Split a configured source URL into its fetchable base and optional fragment
pub fn split_source_url(url: &str) -> (&str, Option<&str>) {
    match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    }
}

/// Extra fields parsed from a URL fragment, in first-seen key order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentFields {
    fields: Map<String, Value>,
}

impl FragmentFields {
    /// Parse `word:word` pairs out of a fragment.
    ///
    /// Quote characters are stripped first. Anything that is not a
    /// well-formed pair is ignored, so malformed input just yields fewer
    /// (or zero) fields.
    pub fn parse(fragment: &str) -> Self {
        let cleaned: String = fragment.chars().filter(|c| !matches!(c, '"' | '\'')).collect();

        let mut fields = Map::new();
        for caps in pair_regex().captures_iter(&cleaned) {
            fields.insert(caps[1].to_string(), Value::String(caps[2].to_string()));
        }

        Self { fields }
    }

    /// Parse the fragment of a full source URL, if it has one
    pub fn from_url(url: &str) -> Self {
        split_source_url(url)
            .1
            .map(Self::parse)
            .unwrap_or_default()
    }

    /// Look up a field value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Number of parsed fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the fragment produced no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overlay these fields onto a site entry; fragment values win on collision
    pub fn apply_to(&self, entry: &mut Map<String, Value>) {
        for (key, value) in &self.fields {
            entry.insert(key.clone(), value.clone());
        }
    }

    /// Iterate over `(key, value)` pairs in parse order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.as_str(), v)))
    }
}
