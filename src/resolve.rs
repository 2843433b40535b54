//! Placeholder resolution
//!
//! Aggregated entries may carry a sentinel (e.g. `"jar": "{{spider}}"`) in
//! place of a value only known from another document. This module swaps the
//! sentinel for that document's `spider` value.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Top-level key read from the secondary document
pub const SPIDER_KEY: &str = "spider";

/// Default sentinel string
pub const DEFAULT_PLACEHOLDER: &str = "{{spider}}";

/// Outcome of a resolution pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum Resolution {
    /// The placeholder was resolved
    Resolved {
        /// Value substituted for the placeholder
        value: String,
        /// Number of fields replaced
        replaced: usize,
    },
    /// Resolution was skipped and placeholders remain
    Skipped {
        /// Why nothing was resolved
        reason: String,
    },
}

impl Resolution {
    /// True when placeholders were left in place
    pub fn is_degraded(&self) -> bool {
        matches!(self, Resolution::Skipped { .. })
    }

    fn skipped<S: Into<String>>(reason: S) -> Self {
        Resolution::Skipped {
            reason: reason.into(),
        }
    }
}

/// Look up `spider` in `secondary` and write it into every top-level entry
/// field whose value is exactly `placeholder`.
///
/// A missing document or field is not an error: the entries are left as-is
/// and a `Skipped` outcome is returned (and warned about) so the caller can
/// report that placeholders survived.
pub fn resolve_placeholders(
    secondary: Option<&Value>,
    placeholder: &str,
    sites: &mut [Value],
) -> Resolution {
    let Some(document) = secondary else {
        warn!("Secondary document unavailable, '{}' left unresolved", placeholder);
        return Resolution::skipped("secondary document unavailable");
    };

    let Some(value) = document.get(SPIDER_KEY).and_then(Value::as_str) else {
        warn!(
            "Secondary document has no '{}' field, '{}' left unresolved",
            SPIDER_KEY, placeholder
        );
        return Resolution::skipped(format!("no '{}' field in secondary document", SPIDER_KEY));
    };

    let mut replaced = 0;
    for entry in sites.iter_mut().filter_map(Value::as_object_mut) {
        for field in entry.values_mut() {
            if field.as_str() == Some(placeholder) {
                *field = Value::String(value.to_string());
                replaced += 1;
            }
        }
    }

    debug!("Resolved {} placeholder fields to {}", replaced, value);
    Resolution::Resolved {
        value: value.to_string(),
        replaced,
    }
}

/// True when any top-level entry field equals `placeholder`
pub fn has_placeholder(sites: &[Value], placeholder: &str) -> bool {
    sites
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|entry| entry.values())
        .any(|field| field.as_str() == Some(placeholder))
}
