//! Process-wide client context
//!
//! A [`Gateway`] is assembled once from [`Config`] and then passed by
//! reference. It owns the token store, the token lifecycle (with its own
//! interceptor-free auth client), and the authenticated [`ApiClient`].

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::api::ApiClient;
use crate::auth::{TokenLifecycleManager, TokenSource};
use crate::config::Config;
use crate::error::Result;
use crate::identity::fetch_identity;
use crate::store::{self, TokenStore};

/// Wired-up token lifecycle and API client.
#[derive(Debug)]
pub struct Gateway {
    config: Config,
    tokens: Arc<TokenLifecycleManager>,
    api: ApiClient,
}

impl Gateway {
    /// Builds the gateway with the token store selected by `config.storage`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = store::from_config(&config.storage)?;
        Self::with_store(config, store)
    }

    /// Builds the gateway over an explicit token store.
    pub fn with_store(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        let tokens = Arc::new(TokenLifecycleManager::from_config(config, store)?);
        let source: Arc<dyn TokenSource> = tokens.clone();
        let api = ApiClient::from_config(&config.api, source)?;

        tracing::debug!(
            api = %config.api.base_url,
            auth = %config.auth.base_url,
            "Gateway initialized"
        );
        Ok(Self {
            config: config.clone(),
            tokens,
            api,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tokens(&self) -> &TokenLifecycleManager {
        &self.tokens
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Identity claims of the logged-in user, filtered by
    /// `auth.identity_fields`.
    pub async fn identity(&self) -> Result<Map<String, Value>> {
        fetch_identity(
            &self.api,
            &self.config.auth.identity_path,
            &self.config.auth.identity_fields,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_gateway_builds_from_default_config() {
        let config = Config::default();
        let gateway = Gateway::with_store(&config, Arc::new(MemoryStore::new())).unwrap();

        assert_eq!(gateway.config().api.latest_version, "v1");
        assert!(gateway.tokens().get_access_token().unwrap().is_none());
    }
}
