//! In-process token store

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::store::TokenStore;

/// Non-durable store backed by a `HashMap`. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> GatewayError {
    GatewayError::Storage("memory store lock poisoned".to_string())
}

impl TokenStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_replaces_previous_record() {
        let store = MemoryStore::new();
        store.set("auth_token", &json!("first")).unwrap();
        store.set("auth_token", &json!("second")).unwrap();
        assert_eq!(store.get("auth_token").unwrap(), Some(json!("second")));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.set("auth_token", &json!("t")).unwrap();
        store.delete("auth_token").unwrap();
        store.delete("auth_token").unwrap();
        assert!(store.get("auth_token").unwrap().is_none());
    }
}
