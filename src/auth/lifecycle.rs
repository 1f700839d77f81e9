//! Token lifecycle: login, refresh, expiry, logout, client context
//!
//! [`TokenLifecycleManager`] is the only owner of the persisted [`Token`].
//! It talks to the auth server through an interceptor-free [`HttpClient`]
//! (the token endpoint must never see a bearer header or a 401 replay) and
//! persists through a [`TokenStore`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Method;
use serde_json::{Map, Value};

use crate::auth::client_identity::{client_id_from_value, ClientIdentity};
use crate::auth::source::TokenSource;
use crate::auth::token::{
    expires_at_from, fields, LoginGrant, RefreshedToken, Token, TokenErrorBody, TokenResponse,
};
use crate::config::Config;
use crate::error::{AuthFailure, GatewayError, Result};
use crate::http::client::HttpClient;
use crate::http::request::{RequestBody, RequestConfig};
use crate::http::response::HttpResponse;
use crate::http::transport::ReqwestTransport;
use crate::store::{get_field, TokenStore};

/// Endpoint paths, form fields, and store keys used by the lifecycle.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub login_path: String,
    pub forgot_password_path: String,
    /// Forgot-password is served by the API, not the auth server
    pub api_base_url: String,
    pub login_fields: BTreeMap<String, String>,
    pub refresh_fields: BTreeMap<String, String>,
    pub token_key: String,
    pub client_key: String,
}

impl LifecycleSettings {
    /// Extracts the lifecycle settings from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            login_path: config.auth.login_path.clone(),
            forgot_password_path: config.auth.forgot_password_path.clone(),
            api_base_url: config.api.base_url.clone(),
            login_fields: config.auth.login_fields.clone(),
            refresh_fields: config.auth.refresh_fields.clone(),
            token_key: config.storage.token_key.clone(),
            client_key: config.storage.client_key.clone(),
        }
    }
}

/// Owns login, refresh, expiry checks, and client context.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tollgate::auth::TokenLifecycleManager;
/// use tollgate::config::Config;
/// use tollgate::store::MemoryStore;
///
/// # async fn example() -> tollgate::error::Result<()> {
/// let config = Config::default();
/// let tokens = TokenLifecycleManager::from_config(&config, Arc::new(MemoryStore::new()))?;
/// let grant = tokens.login("alice", "secret", "device-1").await?;
/// println!("expires at {}", grant.expires_at);
/// # Ok(())
/// # }
/// ```
pub struct TokenLifecycleManager {
    http: HttpClient,
    store: Arc<dyn TokenStore>,
    settings: LifecycleSettings,
}

impl std::fmt::Debug for TokenLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLifecycleManager")
            .field("http", &self.http)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TokenLifecycleManager {
    /// Creates a manager over an auth-server client.
    ///
    /// `http` should be interceptor-free and rooted at the auth base URL.
    pub fn new(http: HttpClient, store: Arc<dyn TokenStore>, settings: LifecycleSettings) -> Self {
        Self {
            http,
            store,
            settings,
        }
    }

    /// Builds the auth-server transport from `config` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        let transport = ReqwestTransport::new(
            &config.auth.base_url,
            config.auth.headers.clone(),
            Duration::from_secs(config.api.timeout_seconds),
        )?;
        Ok(Self::new(
            HttpClient::bare(Arc::new(transport)),
            store,
            LifecycleSettings::from_config(config),
        ))
    }

    /// Authenticates with username, password, and device guid.
    ///
    /// Stores the issued token and returns its public part.
    ///
    /// # Errors
    ///
    /// - `Auth { reason: InvalidGrant }` with the server's
    ///   `error_description` when the credentials are rejected
    /// - `Auth { reason: LoginFailed }` for any other failure of the exchange
    pub async fn login(&self, username: &str, password: &str, guid: &str) -> Result<LoginGrant> {
        let mut form = self.settings.login_fields.clone();
        form.insert("username".to_string(), username.to_string());
        form.insert("password".to_string(), password.to_string());
        form.insert("guid".to_string(), guid.to_string());

        tracing::debug!(username = %username, "Requesting access token");
        let response = self
            .http
            .post(&self.settings.login_path, Some(RequestBody::form(form)))
            .await
            .map_err(login_error)?;

        let issued = parse_token_response(response, AuthFailure::LoginFailed)?;
        let token = Token {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token.unwrap_or_default(),
            expires_at: expires_at_from(Utc::now(), issued.expires_in, AuthFailure::LoginFailed)?,
        };
        self.store_token(&token)?;

        tracing::info!(username = %username, expires_at = %token.expires_at, "Logged in");
        Ok(LoginGrant::from(&token))
    }

    /// Exchanges the stored refresh token for a new token and stores it.
    ///
    /// When the server omits a new refresh token the current one is kept.
    /// Never retried internally.
    ///
    /// # Errors
    ///
    /// `Auth { reason: RefreshFailed }` when no refresh token is stored, the
    /// exchange fails, or the response is malformed.
    pub async fn refresh(&self) -> Result<RefreshedToken> {
        let current = self
            .get_refresh_token()?
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                GatewayError::auth(AuthFailure::RefreshFailed, "no refresh token is stored")
            })?;

        let mut form = self.settings.refresh_fields.clone();
        form.insert(fields::REFRESH_TOKEN.to_string(), current.clone());

        let response = self
            .http
            .post(&self.settings.login_path, Some(RequestBody::form(form)))
            .await
            .map_err(|e| GatewayError::auth(AuthFailure::RefreshFailed, e.to_string()))?;

        let issued = parse_token_response(response, AuthFailure::RefreshFailed)?;
        let token = Token {
            access_token: issued.access_token,
            refresh_token: issued
                .refresh_token
                .filter(|token| !token.is_empty())
                .unwrap_or(current),
            expires_at: expires_at_from(Utc::now(), issued.expires_in, AuthFailure::RefreshFailed)?,
        };
        self.store_token(&token)?;

        tracing::info!(expires_at = %token.expires_at, "Access token refreshed");
        Ok(RefreshedToken::from(token))
    }

    /// The whole persisted token, if any.
    pub fn token(&self) -> Result<Option<Token>> {
        match self.store.get(&self.settings.token_key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn get_access_token(&self) -> Result<Option<String>> {
        self.token_str(fields::ACCESS_TOKEN)
    }

    pub fn get_refresh_token(&self) -> Result<Option<String>> {
        self.token_str(fields::REFRESH_TOKEN)
    }

    pub fn get_token_expiration(&self) -> Result<Option<DateTime<Utc>>> {
        let millis = get_field(self.store.as_ref(), &self.settings.token_key, fields::EXPIRES_AT)?
            .and_then(|value| value.as_i64());
        Ok(millis.and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
    }

    /// `now >= expires_at`; `false` when no expiry is stored.
    pub fn is_token_expired(&self) -> Result<bool> {
        Ok(self
            .get_token_expiration()?
            .map_or(false, |expires_at| Utc::now() >= expires_at))
    }

    /// Clears the client context and deletes the token. Idempotent.
    pub fn logout(&self) -> Result<()> {
        self.clear_client()?;
        self.store.delete(&self.settings.token_key)?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Stores the active client context.
    ///
    /// # Errors
    ///
    /// [`GatewayError::Validation`] when `client` is not a JSON object.
    pub fn set_client(&self, client: &Value) -> Result<()> {
        if !client.is_object() {
            return Err(GatewayError::Validation(vec![
                "client is not an object".to_string()
            ]));
        }
        self.store.set(&self.settings.client_key, client)
    }

    /// Typed variant of [`Self::set_client`].
    pub fn set_client_identity(&self, client: &ClientIdentity) -> Result<()> {
        self.set_client(&serde_json::to_value(client)?)
    }

    /// The whole client record, or one field of it when `key` is given.
    pub fn get_client(&self, key: Option<&str>) -> Result<Option<Value>> {
        match key.filter(|k| !k.is_empty()) {
            None => self.store.get(&self.settings.client_key),
            Some(key) => get_field(self.store.as_ref(), &self.settings.client_key, key),
        }
    }

    pub fn clear_client(&self) -> Result<()> {
        self.store.delete(&self.settings.client_key)
    }

    /// Numeric id of the active client; `None` when unset, zero, or unparseable.
    pub fn client_id(&self) -> Result<Option<i64>> {
        Ok(self
            .get_client(Some("id"))?
            .as_ref()
            .and_then(client_id_from_value))
    }

    /// Starts the password-reset flow for `username`.
    ///
    /// The request goes to the API base URL and the body is returned as the
    /// provider sent it.
    pub async fn forgot_password(&self, username: &str) -> Result<Option<Value>> {
        let mut params = Map::new();
        params.insert("username".to_string(), Value::from(username));
        let config = RequestConfig::new(Method::GET, self.settings.forgot_password_path.clone())
            .with_base_url(self.settings.api_base_url.clone())
            .with_params(params);

        let response = self.http.request(config).await?;
        tracing::info!(username = %username, "Password reset requested");
        Ok(response.body)
    }

    fn token_str(&self, field: &str) -> Result<Option<String>> {
        Ok(get_field(self.store.as_ref(), &self.settings.token_key, field)?
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    fn store_token(&self, token: &Token) -> Result<()> {
        self.store
            .set(&self.settings.token_key, &serde_json::to_value(token)?)
    }
}

#[async_trait::async_trait]
impl TokenSource for TokenLifecycleManager {
    async fn access_token(&self) -> Result<Option<String>> {
        self.get_access_token()
    }

    async fn refresh(&self) -> Result<RefreshedToken> {
        TokenLifecycleManager::refresh(self).await
    }

    async fn client_id(&self) -> Result<Option<i64>> {
        TokenLifecycleManager::client_id(self)
    }
}

fn login_error(error: GatewayError) -> GatewayError {
    if let GatewayError::Response {
        body: Some(body), ..
    } = &error
    {
        let parsed: TokenErrorBody = serde_json::from_value(body.clone()).unwrap_or_default();
        if parsed.error.as_deref() == Some("invalid_grant") {
            let message = parsed
                .error_description
                .unwrap_or_else(|| "invalid_grant".to_string());
            tracing::warn!(reason = %message, "Login rejected");
            return GatewayError::auth(AuthFailure::InvalidGrant, message);
        }
    }
    tracing::warn!(error = %error, "Login failed");
    GatewayError::auth(AuthFailure::LoginFailed, error.to_string())
}

fn parse_token_response(response: HttpResponse, reason: AuthFailure) -> Result<TokenResponse> {
    let body = response.body.unwrap_or(Value::Null);
    serde_json::from_value(body)
        .map_err(|e| GatewayError::auth(reason, format!("malformed token response: {}", e)))
}
