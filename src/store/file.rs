//! Token persistence in a single JSON document on disk

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::error::{GatewayError, Result};
use crate::store::TokenStore;

/// Stores every record as a field of one JSON object written to `path`.
///
/// Writes replace the whole file. A process-local mutex serializes
/// read-modify-write cycles; concurrent processes are last-writer-wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store backed by the file at `path`. The file is created on
    /// first write.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Returns `<data dir>/tokens.json` for the platform, if known.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "tollgate", "tollgate")
            .map(|dirs| dirs.data_dir().join("tokens.json"))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(GatewayError::Storage(format!(
                "token file {} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(document)?)?;
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| GatewayError::Storage("token file lock poisoned".to_string()))
    }
}

impl TokenStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.guard()?;
        Ok(self.read_document()?.remove(key))
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let _guard = self.guard()?;
        let mut document = self.read_document()?;
        document.insert(key.to_string(), value.clone());
        self.write_document(&document)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut document = self.read_document()?;
        if document.remove(key).is_some() {
            self.write_document(&document)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn make_store(dir: &TempDir) -> FileStore {
        FileStore::new(dir.path().join("nested").join("tokens.json"))
    }

    #[test]
    fn test_get_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);
        assert!(store.get("auth_token").unwrap().is_none());
    }

    #[test]
    fn test_set_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);
        store.set("auth_token", &json!({"a": 1})).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.get("auth_token").unwrap(), Some(json!({"a": 1})));
    }

    #[test]
    fn test_records_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);
        store.set("auth_token", &json!("t")).unwrap();
        store.set("client", &json!({"id": 7})).unwrap();

        store.delete("auth_token").unwrap();

        assert!(store.get("auth_token").unwrap().is_none());
        assert_eq!(store.get("client").unwrap(), Some(json!({"id": 7})));
    }

    #[test]
    fn test_delete_absent_key_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = make_store(&dir);
        store.delete("auth_token").unwrap();
        store.delete("auth_token").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_non_object_document_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let store = FileStore::new(path);

        let err = store.get("auth_token").unwrap_err();
        assert!(matches!(err, GatewayError::Storage(_)));
    }
}
