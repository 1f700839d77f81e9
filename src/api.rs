//! Caller-facing API facade
//!
//! [`ApiClient`] runs every call through the authenticated pipeline and
//! hands back [`NormalizedResponse`] values. HTTP error responses are folded
//! through [`normalize_error`]: recognizable message lists become
//! [`GatewayError::Validation`], anything else stays a
//! [`GatewayError::Response`] with the raw body. Auth, transport,
//! cancellation, and legacy-status errors pass through unchanged.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::auth::TokenSource;
use crate::config::ApiConfig;
use crate::error::{GatewayError, Result};
use crate::http::client::HttpClient;
use crate::http::normalize::{normalize_error, normalize_response, NormalizedResponse};
use crate::http::request::{RequestBody, RequestConfig};
use crate::http::transport::ReqwestTransport;
use crate::http::url_version::UrlVersionResolver;

/// Authenticated, normalizing API client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
}

impl ApiClient {
    /// Wraps an already composed client.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Builds the authenticated pipeline described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &ApiConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let transport = ReqwestTransport::new(
            &config.base_url,
            config.headers.clone(),
            Duration::from_secs(config.timeout_seconds),
        )?;
        let resolver =
            UrlVersionResolver::new(config.namespaces.clone(), config.latest_version.clone());

        Ok(Self::new(HttpClient::authenticated(
            Arc::new(transport),
            tokens,
            resolver,
            config.client_id_param.clone(),
            config.single_flight_refresh,
        )))
    }

    /// The underlying pipeline.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// `GET url` with optional query parameters and cancellation.
    pub async fn get(
        &self,
        url: &str,
        params: Option<Map<String, Value>>,
        cancel: Option<CancellationToken>,
    ) -> Result<NormalizedResponse> {
        let mut config = RequestConfig::new(Method::GET, url);
        config.params = params;
        config.cancel = cancel;
        self.send(config).await
    }

    /// `POST url` with an optional JSON body.
    pub async fn post(&self, url: &str, data: Option<Value>) -> Result<NormalizedResponse> {
        let mut config = RequestConfig::new(Method::POST, url);
        config.data = data.map(RequestBody::Json);
        self.send(config).await
    }

    /// `PUT url` with an optional JSON body.
    pub async fn put(&self, url: &str, data: Option<Value>) -> Result<NormalizedResponse> {
        let mut config = RequestConfig::new(Method::PUT, url);
        config.data = data.map(RequestBody::Json);
        self.send(config).await
    }

    /// `DELETE url`. Parameters travel in the query string.
    pub async fn delete(
        &self,
        url: &str,
        params: Option<Map<String, Value>>,
    ) -> Result<NormalizedResponse> {
        let mut config = RequestConfig::new(Method::DELETE, url);
        config.params = params;
        self.send(config).await
    }

    /// `GET url` returning the raw body bytes.
    pub async fn download(&self, url: &str, params: Option<Map<String, Value>>) -> Result<Bytes> {
        let mut config = RequestConfig::new(Method::GET, url);
        config.params = params;

        let response = self.http.request(config).await.map_err(normalize_failure)?;
        normalize_response(&response)?;
        tracing::debug!(url = %url, bytes = response.bytes.len(), "Downloaded body");
        Ok(response.bytes)
    }

    /// `POST url` with a raw payload.
    pub async fn upload(
        &self,
        url: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<NormalizedResponse> {
        let config = RequestConfig::new(Method::POST, url).with_body(RequestBody::Bytes {
            content_type: content_type.to_string(),
            bytes,
        });
        self.send(config).await
    }

    /// Runs an arbitrary request through the pipeline and normalizes it.
    pub async fn send(&self, config: RequestConfig) -> Result<NormalizedResponse> {
        let response = self.http.request(config).await.map_err(normalize_failure)?;
        normalize_response(&response)
    }
}

/// Folds an HTTP error response into messages; other errors pass through.
pub fn normalize_failure(error: GatewayError) -> GatewayError {
    match error {
        GatewayError::Response { status, body } => {
            normalize_error(body.as_ref()).into_gateway_error(status)
        }
        other => other,
    }
}
