//! 401 refresh-and-replay response interceptor
//!
//! Per request the interceptor moves through
//! `Normal -> Unauthorized -> Refreshing -> Replayed`. A request enters
//! `Unauthorized` only when its first attempt fails with HTTP 401; the replay
//! is marked `is_retry`, so a second 401 surfaces to the caller instead of
//! looping.
//!
//! The replay goes straight to the [`Transport`]: request interceptors are
//! not run again, so the already-versioned URL is kept and only the
//! `Authorization` header changes.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::auth::TokenSource;
use crate::error::{GatewayError, Result};
use crate::http::client::ResponseInterceptor;
use crate::http::request::RequestConfig;
use crate::http::response::HttpResponse;
use crate::http::transport::Transport;

/// Per-request position in the auth-retry flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// First attempt in flight or completed without a 401
    Normal,
    /// First attempt returned 401
    Unauthorized,
    /// Waiting for a fresh access token
    Refreshing,
    /// Replay dispatched with the fresh token
    Replayed,
}

impl fmt::Display for RetryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RetryState::Normal => "normal",
            RetryState::Unauthorized => "unauthorized",
            RetryState::Refreshing => "refreshing",
            RetryState::Replayed => "replayed",
        };
        f.write_str(s)
    }
}

fn transition(url: &str, from: RetryState, to: RetryState) -> RetryState {
    tracing::debug!(url = %url, from = %from, to = %to, "Auth retry state change");
    to
}

/// Replays a request once with a refreshed token after a 401.
pub struct AuthRetryInterceptor {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenSource>,
    refresh_gate: Option<Mutex<()>>,
}

impl AuthRetryInterceptor {
    /// Creates the interceptor with single-flight refresh enabled.
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            transport,
            tokens,
            refresh_gate: Some(Mutex::new(())),
        }
    }

    /// Enables or disables single-flight refresh.
    ///
    /// When enabled, concurrent 401s wait on one gate. A waiter whose failed
    /// credential is no longer the stored one reuses the stored token instead
    /// of refreshing again. When disabled every 401 triggers its own refresh.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.refresh_gate = enabled.then(|| Mutex::new(()));
        self
    }

    async fn fresh_token(&self, failed: Option<&str>) -> Result<String> {
        let Some(gate) = &self.refresh_gate else {
            return Ok(self.tokens.refresh().await?.access_token);
        };

        let _guard = gate.lock().await;
        if let Some(current) = self.tokens.access_token().await? {
            if !current.is_empty() && Some(current.as_str()) != failed {
                tracing::debug!("Reusing token refreshed by a concurrent request");
                return Ok(current);
            }
        }
        Ok(self.tokens.refresh().await?.access_token)
    }
}

#[async_trait::async_trait]
impl ResponseInterceptor for AuthRetryInterceptor {
    async fn on_error(&self, config: &RequestConfig, error: GatewayError) -> Result<HttpResponse> {
        if matches!(error, GatewayError::Cancelled) || error.status() != Some(401) || config.is_retry {
            return Err(error);
        }

        let mut state = transition(&config.url, RetryState::Normal, RetryState::Unauthorized);
        tracing::info!(method = %config.method, url = %config.url, "Access token rejected, refreshing");

        let mut replay = config.clone();
        replay.is_retry = true;

        state = transition(&config.url, state, RetryState::Refreshing);
        let token = match self.fresh_token(config.bearer()).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(url = %config.url, error = %e, "Token refresh failed");
                return Err(e);
            }
        };
        replay.set_bearer(Some(&token));

        transition(&config.url, state, RetryState::Replayed);
        let response = self.transport.dispatch(&replay).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(response.into_error())
        }
    }
}
