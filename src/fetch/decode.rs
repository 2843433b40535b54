//! Payload decoding
//!
//! Site documents are published either as plain JSON or wrapped in base64,
//! sometimes buried inside a larger blob (an image, an HTML page). This
//! module peels those layers off until it finds a JSON document.

use crate::error::FetchError;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use regex::bytes::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// Minimum length of an embedded base64 run worth trying
pub const MIN_EMBEDDED_LEN: usize = 100;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

fn embedded_regex() -> &'static Regex {
    static EMBEDDED: OnceLock<Regex> = OnceLock::new();
    EMBEDDED.get_or_init(|| {
        Regex::new(&format!("[A-Za-z0-9+/]{{{},}}={{0,2}}", MIN_EMBEDDED_LEN)).expect("static regex")
    })
}

/// Decode a response body into a JSON document.
///
/// Tries, in order: the body as JSON, the whole trimmed body as base64, then
/// every embedded base64 run of at least [`MIN_EMBEDDED_LEN`] characters,
/// last one first and then first one first. The first candidate that yields
/// JSON wins.
pub fn decode_payload(body: &[u8]) -> Result<Value, FetchError> {
    if let Ok(doc) = serde_json::from_slice::<Value>(body) {
        return Ok(doc);
    }

    if let Some(doc) = decode_base64_json(trim_whitespace(body)) {
        debug!("Decoded whole body as base64");
        return Ok(doc);
    }

    let candidates: Vec<&[u8]> = embedded_regex()
        .find_iter(body)
        .map(|m| m.as_bytes())
        .collect();

    if let Some(doc) = candidates
        .iter()
        .rev()
        .chain(candidates.iter())
        .find_map(|candidate| decode_base64_json(candidate))
    {
        debug!("Decoded embedded base64 payload ({} candidates)", candidates.len());
        return Ok(doc);
    }

    Err(FetchError::Decode(format!(
        "no JSON document in {} byte body ({} base64 candidates)",
        body.len(),
        candidates.len()
    )))
}

fn trim_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

fn decode_base64_json(candidate: &[u8]) -> Option<Value> {
    if candidate.is_empty() {
        return None;
    }

    let mut padded = candidate.to_vec();
    let missing = padded.len() % 4;
    if missing != 0 {
        padded.extend(std::iter::repeat(b'=').take(4 - missing));
    }

    let decoded = LENIENT.decode(&padded).ok()?;
    serde_json::from_slice(&decoded).ok()
}
