//! Request interceptor attaching credentials and tenant context
//!
//! [`RequestAuthInterceptor`] runs before every API request and, in order:
//!
//! 1. rewrites the URL through the [`UrlVersionResolver`];
//! 2. sets `Authorization: Bearer <token>` from the [`TokenSource`]. With no
//!    stored token the header carries an empty credential and the request
//!    still goes out; the server's 401 is what reports the problem;
//! 3. injects the client id following [`inject_client_id`].

use std::sync::Arc;

use reqwest::Method;
use serde_json::{Map, Value};

use crate::auth::TokenSource;
use crate::error::Result;
use crate::http::client::RequestInterceptor;
use crate::http::request::{RequestBody, RequestConfig};
use crate::http::url_version::UrlVersionResolver;

/// Attaches bearer token, client id, and API version to outgoing requests.
pub struct RequestAuthInterceptor {
    resolver: UrlVersionResolver,
    tokens: Arc<dyn TokenSource>,
    client_id_param: String,
}

impl RequestAuthInterceptor {
    /// Creates the interceptor. `client_id_param` is the body field / query
    /// parameter name the backend expects.
    pub fn new(
        resolver: UrlVersionResolver,
        tokens: Arc<dyn TokenSource>,
        client_id_param: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            tokens,
            client_id_param: client_id_param.into(),
        }
    }
}

#[async_trait::async_trait]
impl RequestInterceptor for RequestAuthInterceptor {
    async fn on_request(&self, config: &mut RequestConfig) -> Result<()> {
        let resolved = self.resolver.resolve(&config.url);
        tracing::debug!(from = %config.url, to = %resolved, "Resolved API version");
        config.url = resolved;

        let token = self.tokens.access_token().await?;
        if token.is_none() {
            tracing::debug!(url = %config.url, "No access token stored, sending empty bearer");
        }
        config.set_bearer(token.as_deref());

        let client_id = self.tokens.client_id().await?;
        inject_client_id(config, &self.client_id_param, client_id);
        Ok(())
    }
}

/// JavaScript-style falsiness: `null`, `false`, `0`, and `""`.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Injects `client_id` under `param` according to the method policy.
///
/// - `PUT` / `POST`: into the JSON body object. A missing body becomes an
///   object; form, byte, and non-object JSON bodies are left untouched.
/// - every other method (`DELETE`, `GET`, ...): into the query parameters,
///   creating them when absent.
///
/// An existing non-falsy value is never replaced. When `client_id` is
/// unknown a falsy value is removed, since it would not be sent anyway.
pub fn inject_client_id(config: &mut RequestConfig, param: &str, client_id: Option<i64>) {
    if config.method == Method::PUT || config.method == Method::POST {
        match &mut config.data {
            None => {
                let mut body = Map::new();
                fill_if_falsy(&mut body, param, client_id);
                config.data = Some(RequestBody::Json(Value::Object(body)));
            }
            Some(RequestBody::Json(Value::Object(body))) => fill_if_falsy(body, param, client_id),
            Some(_) => {
                tracing::debug!(url = %config.url, "Body is not a JSON object, client id not injected");
            }
        }
    } else {
        let params = config.params.get_or_insert_with(Map::new);
        fill_if_falsy(params, param, client_id);
    }
}

fn fill_if_falsy(target: &mut Map<String, Value>, param: &str, client_id: Option<i64>) {
    if !target.get(param).map_or(true, is_falsy) {
        return;
    }
    match client_id {
        Some(id) => {
            target.insert(param.to_string(), Value::from(id));
        }
        None => {
            target.remove(param);
        }
    }
}
