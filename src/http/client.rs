//! Interceptor-aware HTTP client and the factory that composes it
//!
//! An [`HttpClient`] runs every request through three stages:
//!
//! 1. each [`RequestInterceptor`] in registration order mutates the
//!    [`RequestConfig`];
//! 2. the [`Transport`] performs the exchange (non-2xx becomes
//!    [`GatewayError::Response`]);
//! 3. each [`ResponseInterceptor`] in registration order sees either the
//!    response (`on_response`) or the error (`on_error`). An interceptor that
//!    recovers from an error hands a response to the next one, and vice versa.
//!
//! [`HttpClientBuilder`] is the factory: it takes a transport and the
//! interceptors and returns a ready client. [`HttpClient::authenticated`]
//! wires the standard pipeline (auth header, client-id, version rewrite,
//! 401 refresh-and-replay).

use std::sync::Arc;

use reqwest::Method;
use serde_json::{Map, Value};

use crate::auth::TokenSource;
use crate::error::{GatewayError, Result};
use crate::http::auth_interceptor::RequestAuthInterceptor;
use crate::http::request::{RequestBody, RequestConfig};
use crate::http::response::HttpResponse;
use crate::http::retry::AuthRetryInterceptor;
use crate::http::transport::Transport;
use crate::http::url_version::UrlVersionResolver;

/// Mutates a request before it is dispatched.
#[async_trait::async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Edits `config` in place. Returning an error aborts the request.
    async fn on_request(&self, config: &mut RequestConfig) -> Result<()>;
}

/// Observes, and may replace, the outcome of a dispatched request.
#[async_trait::async_trait]
pub trait ResponseInterceptor: Send + Sync {
    /// Called with a successful (2xx) response.
    async fn on_response(&self, response: HttpResponse) -> Result<HttpResponse> {
        Ok(response)
    }

    /// Called with a failed outcome. `config` is the request as it was
    /// dispatched (after request interceptors ran).
    async fn on_error(&self, config: &RequestConfig, error: GatewayError) -> Result<HttpResponse> {
        let _ = config;
        Err(error)
    }
}

/// HTTP client with request and response interceptor chains.
///
/// Cheap to clone; clones share the transport and interceptors.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("transport", &self.transport)
            .field("request_interceptors", &self.request_interceptors.len())
            .field("response_interceptors", &self.response_interceptors.len())
            .finish()
    }
}

/// Composes a transport with interceptors into an [`HttpClient`].
pub struct HttpClientBuilder {
    transport: Arc<dyn Transport>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl HttpClientBuilder {
    /// Appends a request interceptor.
    pub fn request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    /// Appends a response interceptor.
    pub fn response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response_interceptors.push(interceptor);
        self
    }

    /// Finishes the client.
    pub fn build(self) -> HttpClient {
        HttpClient {
            transport: self.transport,
            request_interceptors: self.request_interceptors,
            response_interceptors: self.response_interceptors,
        }
    }
}

impl HttpClient {
    /// Starts a client over `transport` with no interceptors.
    pub fn builder(transport: Arc<dyn Transport>) -> HttpClientBuilder {
        HttpClientBuilder {
            transport,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        }
    }

    /// Client without interceptors; requests go straight to the transport.
    pub fn bare(transport: Arc<dyn Transport>) -> Self {
        Self::builder(transport).build()
    }

    /// Client running the authenticated pipeline.
    ///
    /// Registers a [`RequestAuthInterceptor`] (version rewrite, bearer
    /// header, client-id) and an [`AuthRetryInterceptor`] that replays a
    /// request once after refreshing on `401`. With `single_flight_refresh`
    /// concurrent 401s share one refresh.
    pub fn authenticated(
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenSource>,
        resolver: UrlVersionResolver,
        client_id_param: impl Into<String>,
        single_flight_refresh: bool,
    ) -> Self {
        let request_auth = RequestAuthInterceptor::new(resolver, Arc::clone(&tokens), client_id_param);
        let retry = AuthRetryInterceptor::new(Arc::clone(&transport), tokens)
            .with_single_flight(single_flight_refresh);

        Self::builder(transport)
            .request_interceptor(Arc::new(request_auth))
            .response_interceptor(Arc::new(retry))
            .build()
    }

    /// Underlying transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Runs `config` through the interceptor chains and the transport.
    pub async fn request(&self, mut config: RequestConfig) -> Result<HttpResponse> {
        for interceptor in &self.request_interceptors {
            interceptor.on_request(&mut config).await?;
        }

        let mut outcome = match self.transport.dispatch(&config).await {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(response.into_error()),
            Err(e) => Err(e),
        };

        for interceptor in &self.response_interceptors {
            outcome = match outcome {
                Ok(response) => interceptor.on_response(response).await,
                Err(error) => interceptor.on_error(&config, error).await,
            };
        }

        outcome
    }

    /// `HEAD url`
    pub async fn head(&self, url: &str) -> Result<HttpResponse> {
        self.request(RequestConfig::new(Method::HEAD, url)).await
    }

    /// `OPTIONS url`
    pub async fn options(&self, url: &str) -> Result<HttpResponse> {
        self.request(RequestConfig::new(Method::OPTIONS, url)).await
    }

    /// `GET url` with optional query parameters.
    pub async fn get(&self, url: &str, params: Option<Map<String, Value>>) -> Result<HttpResponse> {
        let mut config = RequestConfig::new(Method::GET, url);
        config.params = params;
        self.request(config).await
    }

    /// `DELETE url` with optional query parameters.
    pub async fn delete(&self, url: &str, params: Option<Map<String, Value>>) -> Result<HttpResponse> {
        let mut config = RequestConfig::new(Method::DELETE, url);
        config.params = params;
        self.request(config).await
    }

    /// `POST url` with an optional body.
    pub async fn post(&self, url: &str, data: Option<RequestBody>) -> Result<HttpResponse> {
        let mut config = RequestConfig::new(Method::POST, url);
        config.data = data;
        self.request(config).await
    }

    /// `PUT url` with an optional body.
    pub async fn put(&self, url: &str, data: Option<RequestBody>) -> Result<HttpResponse> {
        let mut config = RequestConfig::new(Method::PUT, url);
        config.data = data;
        self.request(config).await
    }

    /// `PATCH url` with an optional body.
    pub async fn patch(&self, url: &str, data: Option<RequestBody>) -> Result<HttpResponse> {
        let mut config = RequestConfig::new(Method::PATCH, url);
        config.data = data;
        self.request(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedTransport;
    use serde_json::json;

    struct TagHeader(&'static str);

    #[async_trait::async_trait]
    impl RequestInterceptor for TagHeader {
        async fn on_request(&self, config: &mut RequestConfig) -> Result<()> {
            let current = config.headers.get("X-Trail").cloned().unwrap_or_default();
            config
                .headers
                .insert("X-Trail".to_string(), format!("{}{}", current, self.0));
            Ok(())
        }
    }

    struct RecoverAll;

    #[async_trait::async_trait]
    impl ResponseInterceptor for RecoverAll {
        async fn on_error(&self, _config: &RequestConfig, _error: GatewayError) -> Result<HttpResponse> {
            Ok(HttpResponse::json(200, json!("recovered")))
        }
    }

    #[tokio::test]
    async fn test_request_interceptors_run_in_order() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(HttpResponse::empty(200))]));
        let client = HttpClient::builder(transport.clone())
            .request_interceptor(Arc::new(TagHeader("a")))
            .request_interceptor(Arc::new(TagHeader("b")))
            .build();

        client.get("/api/x", None).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].headers.get("X-Trail").unwrap(), "ab");
    }

    #[tokio::test]
    async fn test_non_success_status_becomes_response_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(HttpResponse::json(
            404,
            json!("missing"),
        ))]));
        let client = HttpClient::bare(transport);

        let err = client.get("/api/x", None).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_response_interceptor_can_recover_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(HttpResponse::empty(500))]));
        let client = HttpClient::builder(transport)
            .response_interceptor(Arc::new(RecoverAll))
            .build();

        let response = client.post("/api/x", None).await.unwrap();
        assert_eq!(response.body, Some(json!("recovered")));
    }

    #[tokio::test]
    async fn test_verb_helpers_set_method_and_body() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(HttpResponse::empty(200)),
            Ok(HttpResponse::empty(200)),
            Ok(HttpResponse::empty(200)),
        ]));
        let client = HttpClient::bare(transport.clone());

        client
            .put("/api/a", Some(RequestBody::Json(json!({"k": 1}))))
            .await
            .unwrap();
        client.patch("/api/b", None).await.unwrap();
        client.head("/api/c").await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::PUT);
        assert_eq!(sent[0].data, Some(RequestBody::Json(json!({"k": 1}))));
        assert_eq!(sent[1].method, Method::PATCH);
        assert_eq!(sent[2].method, Method::HEAD);
    }
}
