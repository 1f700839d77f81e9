//! Outbound request description shared by the interceptors and transports

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use reqwest::Method;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as `application/json`
    Json(Value),
    /// Serialized as `application/x-www-form-urlencoded`, in order
    Form(Vec<(String, String)>),
    /// Sent verbatim with the given content type (uploads)
    Bytes {
        /// `Content-Type` header value
        content_type: String,
        /// Raw payload
        bytes: Bytes,
    },
}

impl RequestBody {
    /// Builds a form body from ordered key/value pairs.
    pub fn form(fields: BTreeMap<String, String>) -> Self {
        RequestBody::Form(fields.into_iter().collect())
    }
}

/// Mutable description of one outbound call.
///
/// Request interceptors receive `&mut RequestConfig` and edit it in place
/// before the transport sees it. The same value (cloned) is what the
/// 401-retry interceptor replays.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL
    pub url: String,
    /// Overrides the transport's base URL for this request only
    pub base_url: Option<String>,
    /// Per-request headers, applied after the transport's static headers
    pub headers: HashMap<String, String>,
    /// Query parameters. `null` values are not sent.
    pub params: Option<Map<String, Value>>,
    /// Request body
    pub data: Option<RequestBody>,
    /// Set once the request has been replayed after a 401
    pub is_retry: bool,
    /// Cancels the request before or during dispatch
    pub cancel: Option<CancellationToken>,
}

impl RequestConfig {
    /// Creates a request with no headers, params, or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            base_url: None,
            headers: HashMap::new(),
            params: None,
            data: None,
            is_retry: false,
            cancel: None,
        }
    }

    /// Sets the query parameters.
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.data = Some(body);
        self
    }

    /// Sets a JSON request body.
    pub fn with_json(self, data: Value) -> Self {
        self.with_body(RequestBody::Json(data))
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Overrides the base URL for this request.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Attaches a cancellation token.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns `true` if the attached cancellation token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, CancellationToken::is_cancelled)
    }

    /// Returns the credential of the `Authorization: Bearer` header, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION))
            .and_then(|(_, value)| value.strip_prefix("Bearer "))
    }

    /// Replaces the `Authorization` header with `Bearer <token>`.
    ///
    /// A missing token still sets the header, with an empty credential.
    pub fn set_bearer(&mut self, token: Option<&str>) {
        self.headers
            .retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION));
        self.headers.insert(
            AUTHORIZATION.to_string(),
            format!("Bearer {}", token.unwrap_or_default()),
        );
    }

    /// Query parameters flattened to strings, skipping `null` values.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .flatten()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect()
    }
}
