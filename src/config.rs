//! Configuration management for Tollgate
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//!
//! A [`Config`] is built once at process start and handed by reference to
//! [`crate::gateway::Gateway::from_config`]; nothing reads configuration from
//! global state afterwards.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};
use crate::http::url_version::NamespaceEntry;

/// Main configuration structure for Tollgate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resource API settings (the authenticated pipeline)
    #[serde(default)]
    pub api: ApiConfig,
    /// Auth server settings (login, refresh, identity)
    #[serde(default)]
    pub auth: AuthConfig,
    /// Token persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Resource API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every API path is resolved against
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Global latest API version, inserted when a namespace is not pinned
    #[serde(default = "default_latest_version")]
    pub latest_version: String,

    /// Namespaces pinned to a specific API version
    #[serde(default)]
    pub namespaces: Vec<NamespaceEntry>,

    /// Name of the client-id body field / query parameter
    #[serde(default = "default_client_id_param")]
    pub client_id_param: String,

    /// Static headers sent with every API request
    #[serde(default = "default_api_headers")]
    pub headers: HashMap<String, String>,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Coalesce concurrent 401 refreshes into one refresh call
    #[serde(default = "default_single_flight_refresh")]
    pub single_flight_refresh: bool,
}

fn default_api_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_latest_version() -> String {
    "v1".to_string()
}

fn default_client_id_param() -> String {
    "clientId".to_string()
}

fn default_api_headers() -> HashMap<String, String> {
    HashMap::from([("Accept".to_string(), "application/json".to_string())])
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_single_flight_refresh() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            latest_version: default_latest_version(),
            namespaces: Vec::new(),
            client_id_param: default_client_id_param(),
            headers: default_api_headers(),
            timeout_seconds: default_timeout_seconds(),
            single_flight_refresh: default_single_flight_refresh(),
        }
    }
}

/// Auth server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the auth server
    #[serde(default = "default_auth_base_url")]
    pub base_url: String,

    /// Token endpoint path, used for both login and refresh
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Forgot-password path, resolved against the **API** base URL
    #[serde(default = "default_forgot_password_path")]
    pub forgot_password_path: String,

    /// Identity claims path, resolved through the authenticated API pipeline
    #[serde(default = "default_identity_path")]
    pub identity_path: String,

    /// Static headers sent with every auth request
    #[serde(default = "default_api_headers")]
    pub headers: HashMap<String, String>,

    /// Extra form fields merged under the login credentials
    #[serde(default = "default_login_fields")]
    pub login_fields: BTreeMap<String, String>,

    /// Extra form fields merged under the refresh token
    #[serde(default = "default_refresh_fields")]
    pub refresh_fields: BTreeMap<String, String>,

    /// Identity claim types kept by [`crate::identity::fetch_identity`]
    #[serde(default = "default_identity_fields")]
    pub identity_fields: Vec<String>,
}

fn default_auth_base_url() -> String {
    "http://localhost:5001".to_string()
}

fn default_login_path() -> String {
    "/connect/token".to_string()
}

fn default_forgot_password_path() -> String {
    "/api/account/forgot-password".to_string()
}

fn default_identity_path() -> String {
    "/api/identity".to_string()
}

fn default_login_fields() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("grant_type".to_string(), "password".to_string()),
        ("scope".to_string(), "openid offline_access".to_string()),
    ])
}

fn default_refresh_fields() -> BTreeMap<String, String> {
    BTreeMap::from([("grant_type".to_string(), "refresh_token".to_string())])
}

fn default_identity_fields() -> Vec<String> {
    [
        "client_id",
        "client_name",
        "is_enhanced_client",
        "is_client_application_feature_roles",
        "machine_id",
        "user_id",
        "username",
        "username_preferred",
        "is_admin",
        "is_ivm_admin",
        "is_resetting_password",
        "profile_type",
        "machine_user_id",
        "role",
        "role_id",
        "email",
        "first_name",
        "middle_name",
        "last_name",
        "is_verifying_email",
        "is_verifying_email_code_expired",
        "last_successful_email_verification_date",
        "is_active",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: default_auth_base_url(),
            login_path: default_login_path(),
            forgot_password_path: default_forgot_password_path(),
            identity_path: default_identity_path(),
            headers: default_api_headers(),
            login_fields: default_login_fields(),
            refresh_fields: default_refresh_fields(),
            identity_fields: default_identity_fields(),
        }
    }
}

/// Which [`crate::store::TokenStore`] implementation to use
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// OS native keyring
    Keyring,
    /// JSON file in the platform data directory (or `storage.path`)
    #[default]
    File,
    /// In-process only; tokens do not survive the process
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "keyring" => Ok(StorageBackend::Keyring),
            "file" => Ok(StorageBackend::File),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(GatewayError::Config(format!(
                "Invalid storage backend: {}. Must be one of: keyring, file, memory",
                other
            ))),
        }
    }
}

/// Token persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store implementation
    #[serde(default)]
    pub backend: StorageBackend,

    /// File path for the `file` backend; platform data dir when unset
    #[serde(default)]
    pub path: Option<String>,

    /// Keyring service name for the `keyring` backend
    #[serde(default = "default_service")]
    pub service: String,

    /// Key of the token record
    #[serde(default = "default_token_key")]
    pub token_key: String,

    /// Key of the client-identity record
    #[serde(default = "default_client_key")]
    pub client_key: String,
}

fn default_service() -> String {
    "tollgate".to_string()
}

fn default_token_key() -> String {
    "auth_token".to_string()
}

fn default_client_key() -> String {
    "client_identity".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: None,
            service: default_service(),
            token_key: default_token_key(),
            client_key: default_client_key(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment, and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged. Environment variables (`TOLLGATE_*`) are applied next, then
    /// CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Parse a configuration file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("TOLLGATE_API_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(base_url) = std::env::var("TOLLGATE_AUTH_BASE_URL") {
            self.auth.base_url = base_url;
        }

        if let Ok(version) = std::env::var("TOLLGATE_API_VERSION") {
            self.api.latest_version = version;
        }

        if let Ok(timeout) = std::env::var("TOLLGATE_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid TOLLGATE_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(single_flight) = std::env::var("TOLLGATE_SINGLE_FLIGHT_REFRESH") {
            if let Ok(value) = single_flight.parse() {
                self.api.single_flight_refresh = value;
            } else {
                tracing::warn!("Invalid TOLLGATE_SINGLE_FLIGHT_REFRESH: {}", single_flight);
            }
        }

        if let Ok(backend) = std::env::var("TOLLGATE_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(value) => self.storage.backend = value,
                Err(_) => tracing::warn!("Invalid storage backend: {}, keeping configured", backend),
            }
        }

        if let Ok(path) = std::env::var("TOLLGATE_STORAGE_PATH") {
            self.storage.path = Some(path);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(api_url) = &cli.api_url {
            self.api.base_url = api_url.clone();
        }

        if let Some(auth_url) = &cli.auth_url {
            self.auth.base_url = auth_url.clone();
        }

        if let Some(backend) = cli.storage {
            self.storage.backend = backend;
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("api.base_url", &self.api.base_url),
            ("auth.base_url", &self.auth.base_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                GatewayError::Config(format!("{} is not a valid URL ({}): {}", name, value, e))
            })?;
        }

        if self.api.latest_version.trim().is_empty() {
            return Err(GatewayError::Config(
                "api.latest_version cannot be empty".to_string(),
            ));
        }

        if self.api.client_id_param.trim().is_empty() {
            return Err(GatewayError::Config(
                "api.client_id_param cannot be empty".to_string(),
            ));
        }

        if self.api.timeout_seconds == 0 {
            return Err(GatewayError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &self.api.namespaces {
            if entry.namespace.is_empty() || entry.namespace.contains('/') {
                return Err(GatewayError::Config(format!(
                    "Invalid namespace '{}': must be a single non-empty path segment",
                    entry.namespace
                )));
            }
            if !seen.insert(entry.namespace.as_str()) {
                return Err(GatewayError::Config(format!(
                    "Duplicate namespace '{}'",
                    entry.namespace
                )));
            }
        }

        if self.storage.token_key.is_empty() || self.storage.client_key.is_empty() {
            return Err(GatewayError::Config(
                "storage keys cannot be empty".to_string(),
            ));
        }

        if self.storage.token_key == self.storage.client_key {
            return Err(GatewayError::Config(
                "storage.token_key and storage.client_key must differ".to_string(),
            ));
        }

        Ok(())
    }
}
