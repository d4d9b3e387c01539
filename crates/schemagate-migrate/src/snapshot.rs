//! `_meta` patch for the schema-diff tool's snapshot file
//!
//! Older snapshots lack the `_meta` object the diff tool expects. The patch
//! adds the missing keys and leaves everything else as it was.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Keys required under `_meta`
pub const META_KEYS: [&str; 3] = ["schemas", "tables", "columns"];

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot file {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Snapshot {} is not a JSON object", .0.display())]
    NotAnObject(PathBuf),
}

/// Absent, `null`, `false`, `0` and `""` all count as not set
fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Ensure `_meta.{schemas,tables,columns}` exist in the snapshot at `path`,
/// writing it back pretty-printed. Returns the keys that were added.
pub fn ensure_snapshot_meta(path: &Path) -> Result<Vec<String>, SnapshotError> {
    if !path.exists() {
        return Err(SnapshotError::Missing(path.to_path_buf()));
    }

    let io_err = |source: std::io::Error| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    let json_err = |source: serde_json::Error| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    };

    let content = std::fs::read_to_string(path).map_err(io_err)?;
    let mut snapshot: Value = serde_json::from_str(&content).map_err(json_err)?;
    let root = snapshot
        .as_object_mut()
        .ok_or_else(|| SnapshotError::NotAnObject(path.to_path_buf()))?;

    let mut added = Vec::new();
    let meta = root.entry("_meta").or_insert(Value::Null);
    if is_unset(meta) {
        *meta = Value::Object(Map::new());
        added.push("_meta".to_string());
    }
    let meta = meta
        .as_object_mut()
        .ok_or_else(|| SnapshotError::NotAnObject(path.to_path_buf()))?;

    for key in META_KEYS {
        let entry = meta.entry(key).or_insert(Value::Null);
        if is_unset(entry) {
            *entry = Value::Object(Map::new());
            added.push(format!("_meta.{}", key));
        }
    }

    let pretty = serde_json::to_string_pretty(&snapshot).map_err(json_err)?;
    std::fs::write(path, pretty).map_err(io_err)?;

    tracing::info!(snapshot = %path.display(), added = added.len(), "snapshot _meta ensured");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn adds_missing_meta() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("0000_snapshot.json");
        fs::write(&path, r#"{"version":"5","dialect":"pg","tables":{}}"#).unwrap();

        let added = ensure_snapshot_meta(&path).unwrap();
        assert_eq!(
            added,
            vec!["_meta", "_meta.schemas", "_meta.tables", "_meta.columns"]
        );

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("{\n  \"version\": \"5\""));
        let value: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["_meta"]["columns"], Value::Object(Map::new()));
    }

    #[test]
    fn keeps_existing_meta() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("0000_snapshot.json");
        fs::write(&path, r#"{"_meta":{"columns":{"a":"b"}}}"#).unwrap();

        let added = ensure_snapshot_meta(&path).unwrap();
        assert_eq!(added, vec!["_meta.schemas", "_meta.tables"]);

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["_meta"]["columns"]["a"], "b");
    }

    #[test]
    fn null_meta_values_are_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("0000_snapshot.json");
        fs::write(&path, r#"{"_meta":null}"#).unwrap();
        assert_eq!(ensure_snapshot_meta(&path).unwrap().len(), 4);

        fs::write(&path, r#"{"_meta":{"schemas":null,"tables":{},"columns":""}}"#).unwrap();
        let added = ensure_snapshot_meta(&path).unwrap();
        assert_eq!(added, vec!["_meta.schemas", "_meta.columns"]);

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["_meta"]["schemas"], Value::Object(Map::new()));
        assert_eq!(value["_meta"]["columns"], Value::Object(Map::new()));
    }

    #[test]
    fn non_object_meta_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("0000_snapshot.json");
        fs::write(&path, r#"{"_meta":[1]}"#).unwrap();

        let err = ensure_snapshot_meta(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::NotAnObject(_)));
    }

    #[test]
    fn missing_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ensure_snapshot_meta(&tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Missing(_)));
    }
}
