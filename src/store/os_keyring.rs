//! Token persistence via OS keyring
//!
//! Records are serialized to JSON before storage and deserialized on load.
//! The keyring itself is stateless; [`KeyringStore`] only carries the service
//! name that namespaces its entries.

use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::store::TokenStore;

/// Accessor for the OS native keyring (Keychain on macOS, Secret Service on
/// Linux, Windows Credential Manager on Windows).
///
/// Each record lives in its own keyring entry, keyed by
/// `<service>` / `<key>`.
///
/// # Examples
///
/// ```no_run
/// use serde_json::json;
/// use tollgate::store::{KeyringStore, TokenStore};
///
/// let store = KeyringStore::new("tollgate".to_string());
/// store.set("auth_token", &json!({"access_token": "abc"})).unwrap();
/// let loaded = store.get("auth_token").unwrap();
/// assert!(loaded.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Creates an accessor that stores entries under `service`.
    pub fn new(service: String) -> Self {
        Self { service }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key).map_err(GatewayError::Keyring)
    }
}

impl TokenStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.entry(key)?.get_password() {
            Ok(json_str) => Ok(Some(serde_json::from_str(&json_str)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(GatewayError::Keyring(e)),
        }
    }

    fn set(&self, key: &str, value: &Value) -> Result<()> {
        let json_str = serde_json::to_string(value)?;
        self.entry(key)?
            .set_password(&json_str)
            .map_err(GatewayError::Keyring)
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(GatewayError::Keyring(e)),
        }
    }
}
