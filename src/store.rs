//! Local artifact persistence
//!
//! Reads and writes JSON documents on disk. Output is 4-space indented UTF-8
//! with non-ASCII characters written as-is.

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Read and parse a JSON document
pub fn read_document(path: &Path) -> Result<Value> {
    let bytes = fs::read(path).map_err(|e| Error::persist(path, e))?;
    let document = serde_json::from_slice(&bytes)?;
    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(document)
}

/// Serialize `value` with 4-space indentation
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Write `value` to `path`, creating parent directories as needed
pub fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = to_pretty_json(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::persist(parent, e))?;
    }

    fs::write(path, &bytes).map_err(|e| Error::persist(path, e))?;
    info!("Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pretty_json_keeps_non_ascii() {
        let bytes = to_pretty_json(&json!({"name": "影视", "sites": []})).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"name\": \"影视\""));
        assert!(text.contains("\n    \"sites\""));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        let doc = json!({"spider": "a.jar", "sites": [{"name": "A"}]});
        write_document(&path, &doc).unwrap();
        assert_eq!(read_document(&path).unwrap(), doc);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_document(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Persist { .. }));
    }

    #[test]
    fn test_read_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_document(&path), Err(Error::Json(_))));
    }
}
