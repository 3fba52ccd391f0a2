//! Durable state for the posting engine
//!
//! Two artifacts live under the data directory: the posted-record store
//! (`posted.json`) and the stats store (`stats.json`). Both are written with
//! write-to-temp-then-rename semantics so a crash mid-write never leaves a
//! truncated file behind.

pub mod posted;
pub mod stats;

pub use posted::PostedCache;
pub use stats::StatsTracker;

use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{EngineError, Result};

/// Atomically replace `path` with the JSON serialization of `value`.
pub(crate) fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            EngineError::cache_io(format!(
                "failed to create data directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let temp_path = path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| {
        EngineError::cache_io(format!("failed to create {}: {e}", temp_path.display()))
    })?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value)
        .map_err(|e| EngineError::cache_io(format!("failed to serialize state: {e}")))?;

    // Atomic rename
    fs::rename(&temp_path, path)
        .map_err(|e| EngineError::cache_io(format!("failed to rename {}: {e}", path.display())))?;

    Ok(())
}

/// Load a JSON artifact. A missing file is not an error (`Ok(None)`); corrupt
/// JSON is surfaced so the operator notices instead of silently reposting.
pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)
        .map_err(|e| EngineError::cache_io(format!("failed to open {}: {e}", path.display())))?;
    let reader = BufReader::new(file);
    let value = serde_json::from_reader(reader)
        .map_err(|e| EngineError::cache_io(format!("corrupt state file {}: {e}", path.display())))?;

    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let mut value = HashMap::new();
        value.insert("key".to_string(), 42u64);

        save_json(&path, &value).unwrap();
        let loaded: HashMap<String, u64> = load_json(&path).unwrap().unwrap();
        assert_eq!(loaded.get("key"), Some(&42));
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        let loaded: Option<HashMap<String, u64>> = load_json(&path).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let result: Result<Option<HashMap<String, u64>>> = load_json(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deep").join("state.json");
        save_json(&path, &vec![1u32, 2, 3]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        save_json(&path, &1u32).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
    }
}
