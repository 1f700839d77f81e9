use std::sync::Arc;

use serde_json::{json, Value};
use tollgate::config::Config;
use tollgate::http::url_version::NamespaceEntry;
use tollgate::store::{MemoryStore, TokenStore};
use tollgate::Gateway;

/// Config pointing both base URLs at mock servers.
///
/// `widgets` is pinned to `v2`; everything else resolves to `v3`.
#[allow(dead_code)]
pub fn config_for(api_url: &str, auth_url: &str) -> Config {
    let mut config = Config::default();
    config.api.base_url = api_url.to_string();
    config.api.latest_version = "v3".to_string();
    config.api.namespaces = vec![
        NamespaceEntry::new("widgets", Some("v2")),
        NamespaceEntry::new("reports", None),
    ];
    config.auth.base_url = auth_url.to_string();
    config
}

/// Gateway over an in-memory store; the store is returned for inspection.
#[allow(dead_code)]
pub fn memory_gateway(config: &Config) -> (Gateway, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let gateway =
        Gateway::with_store(config, store.clone()).expect("failed to build gateway");
    (gateway, store)
}

/// Stores a token record as a previous login would have.
#[allow(dead_code)]
pub fn seed_token(store: &dyn TokenStore, access: &str, refresh: &str) {
    store
        .set(
            "auth_token",
            &json!({
                "access_token": access,
                "refresh_token": refresh,
                "expires_at": 4_102_444_800_000i64
            }),
        )
        .expect("failed to seed token");
}

/// Token endpoint success body.
#[allow(dead_code)]
pub fn token_body(access: &str, refresh: &str) -> Value {
    json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": refresh
    })
}
