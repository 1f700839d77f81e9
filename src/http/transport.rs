//! Transport abstraction and the reqwest-backed implementation
//!
//! A [`Transport`] performs exactly one HTTP exchange for a fully prepared
//! [`RequestConfig`]. It never runs interceptors and never retries; those are
//! the job of [`crate::http::client::HttpClient`].
//!
//! Non-2xx statuses are returned as `Ok(HttpResponse)`. Only network failures,
//! timeouts, malformed URLs, and cancellation are errors at this layer.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{GatewayError, Result};
use crate::http::request::{RequestBody, RequestConfig};
use crate::http::response::HttpResponse;

/// Abstraction over HTTP transports.
///
/// Used polymorphically through `Arc<dyn Transport>` so that tests can swap
/// the network for an in-process fake.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Sends the request described by `config` and returns the response.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Cancelled`] if the request's cancellation
    /// token fires before or during the exchange, and
    /// [`GatewayError::Transport`] for network failures and timeouts.
    async fn dispatch(&self, config: &RequestConfig) -> Result<HttpResponse>;
}

/// Joins a base URL and a request path the way browser HTTP clients do:
/// absolute request URLs are used as-is, otherwise exactly one slash
/// separates the two parts.
pub fn combine_url(base_url: &str, url: &str) -> String {
    if url.contains("://") {
        return url.to_string();
    }
    if url.is_empty() {
        return base_url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

/// [`Transport`] backed by a shared `reqwest::Client`.
///
/// # Examples
///
/// ```no_run
/// use std::collections::HashMap;
/// use std::time::Duration;
/// use tollgate::http::transport::ReqwestTransport;
///
/// let transport = ReqwestTransport::new(
///     "https://api.example.com",
///     HashMap::new(),
///     Duration::from_secs(30),
/// )
/// .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    headers: HashMap<String, String>,
}

impl ReqwestTransport {
    /// Builds a transport rooted at `base_url`.
    ///
    /// `headers` are sent with every request; per-request headers on the
    /// [`RequestConfig`] win on conflict. `timeout` applies to each exchange.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] if the underlying client cannot be
    /// constructed (TLS initialisation failure).
    pub fn new(base_url: &str, headers: HashMap<String, String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            headers,
        })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build(&self, config: &RequestConfig) -> Result<reqwest::RequestBuilder> {
        let base = config.base_url.as_deref().unwrap_or(&self.base_url);
        let target = combine_url(base, &config.url);
        let url = url::Url::parse(&target)
            .map_err(|e| GatewayError::Transport(format!("invalid request URL {}: {}", target, e)))?;

        let mut req = self.client.request(config.method.clone(), url);

        for (k, v) in &self.headers {
            if !config.headers.keys().any(|name| name.eq_ignore_ascii_case(k)) {
                req = req.header(k.as_str(), v.as_str());
            }
        }
        for (k, v) in &config.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let query = config.query_pairs();
        if !query.is_empty() {
            req = req.query(&query);
        }

        req = match &config.data {
            None => req,
            Some(RequestBody::Json(value)) => req.json(value),
            Some(RequestBody::Form(fields)) => req.form(fields),
            Some(RequestBody::Bytes {
                content_type,
                bytes,
            }) => req
                .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                .body(bytes.clone()),
        };

        Ok(req)
    }

    async fn exchange(&self, req: reqwest::RequestBuilder) -> Result<HttpResponse> {
        let response = req
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(format!("failed to read response body: {e}")))?;

        Ok(HttpResponse::from_parts(status, headers, bytes))
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn dispatch(&self, config: &RequestConfig) -> Result<HttpResponse> {
        if config.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let req = self.build(config)?;
        tracing::debug!(method = %config.method, url = %config.url, retry = config.is_retry, "Dispatching request");

        let response = match &config.cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Err(GatewayError::Cancelled),
                    result = self.exchange(req) => result?,
                }
            }
            None => self.exchange(req).await?,
        };

        tracing::debug!(status = response.status, url = %config.url, "Received response");
        Ok(response)
    }
}
