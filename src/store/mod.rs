//! Durable key/value persistence for token and client-identity records
//!
//! The [`TokenStore`] trait is the only seam the token lifecycle depends on.
//! Records are JSON values addressed by a string key; the store has no
//! knowledge of what the records mean.
//!
//! # Module Layout
//!
//! - [`file`]       -- single JSON document on disk
//! - [`memory`]     -- in-process map, used by tests and ephemeral sessions
//! - [`os_keyring`] -- OS native credential store (one entry per key)

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{GatewayError, Result};

pub mod file;
pub mod memory;
pub mod os_keyring;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use os_keyring::KeyringStore;

/// Key/value persistence used by the token lifecycle.
///
/// Implementations must treat `delete` of an absent key as a successful
/// no-op so that logout stays idempotent.
#[cfg_attr(test, mockall::automock)]
pub trait TokenStore: Send + Sync {
    /// Loads the record stored under `key`, or `None` when absent.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous record.
    fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Removes the record stored under `key`.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Reads a single field of the record stored under `key`.
///
/// Returns `None` when the record is absent, is not an object, or lacks the
/// field.
pub fn get_field(store: &dyn TokenStore, key: &str, field: &str) -> Result<Option<Value>> {
    Ok(store
        .get(key)?
        .and_then(|record| record.get(field).cloned()))
}

/// Builds the store selected by the storage configuration.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] when the file backend is selected and no
/// path is configured and no platform data directory can be determined.
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn TokenStore>> {
    let store: Arc<dyn TokenStore> = match config.backend {
        StorageBackend::Keyring => Arc::new(KeyringStore::new(config.service.clone())),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => {
            let path = match &config.path {
                Some(p) => PathBuf::from(p),
                None => FileStore::default_path().ok_or_else(|| {
                    GatewayError::Config(
                        "storage.path is not set and no data directory is available".to_string(),
                    )
                })?,
            };
            Arc::new(FileStore::new(path))
        }
    };
    tracing::debug!(backend = ?config.backend, "Token store initialized");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_field_reads_nested_value() {
        let store = MemoryStore::new();
        store
            .set("client", &json!({"id": 42, "name": "Acme"}))
            .unwrap();

        let id = get_field(&store, "client", "id").unwrap();
        assert_eq!(id, Some(json!(42)));
    }

    #[test]
    fn test_get_field_absent_record_is_none() {
        let store = MemoryStore::new();
        assert!(get_field(&store, "client", "id").unwrap().is_none());
    }

    #[test]
    fn test_get_field_non_object_record_is_none() {
        let store = MemoryStore::new();
        store.set("client", &json!("plain")).unwrap();
        assert!(get_field(&store, "client", "id").unwrap().is_none());
    }

    #[test]
    fn test_from_config_memory_backend() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        };
        let store = from_config(&config).unwrap();
        store.set("k", &json!(1)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_from_config_file_backend_uses_configured_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        let config = StorageConfig {
            backend: StorageBackend::File,
            path: Some(path.to_string_lossy().to_string()),
            ..StorageConfig::default()
        };
        let store = from_config(&config).unwrap();
        store.set("k", &json!("v")).unwrap();
        assert!(path.exists());
    }
}
