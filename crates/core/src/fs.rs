//! JSON file helpers shared by tasks and persistence fallbacks.

use std::path::Path;

use crate::error::CoreError;

/// Write a value to `path` as pretty-printed JSON.
pub fn save_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a JSON value from `path`. Returns `None` if the file does not exist.
pub fn load_json(path: &Path) -> Result<Option<serde_json::Value>, CoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&json)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("out.json");
        save_json(&path, &serde_json::json!({"ok": true})).unwrap();

        let loaded = load_json(&path).unwrap().unwrap();
        assert_eq!(loaded["ok"], true);
    }

    #[test]
    fn load_missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_json(&tmp.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn load_invalid_json_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_json(&path).is_err());
    }
}
