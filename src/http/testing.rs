//! In-process test doubles for the HTTP pipeline (cfg(test) only)
//!
//! - [`ScriptedTransport`] replays queued outcomes, or answers through a
//!   handler closure, and records every request it receives.
//! - [`FakeTokenSource`] hands out `T0`, `T1`, ... as access tokens and
//!   counts refresh calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use crate::auth::{RefreshedToken, TokenSource};
use crate::error::{AuthFailure, GatewayError, Result};
use crate::http::request::RequestConfig;
use crate::http::response::HttpResponse;
use crate::http::transport::Transport;

type Handler = Box<dyn Fn(&RequestConfig) -> Result<HttpResponse> + Send + Sync>;

/// Transport double.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse>>>,
    handler: Option<Handler>,
    requests: Mutex<Vec<RequestConfig>>,
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport").finish_non_exhaustive()
    }
}

impl ScriptedTransport {
    /// Answers requests with `script`, in order.
    pub fn new(script: Vec<Result<HttpResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            handler: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request by calling `handler`.
    pub fn with_handler(
        handler: impl Fn(&RequestConfig) -> Result<HttpResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            handler: Some(Box::new(handler)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RequestConfig> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn dispatch(&self, config: &RequestConfig) -> Result<HttpResponse> {
        if config.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        self.requests.lock().unwrap().push(config.clone());
        tokio::task::yield_now().await;

        if let Some(handler) = &self.handler {
            return handler(config);
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Transport("script exhausted".to_string())))
    }
}

/// Token source double.
#[derive(Debug)]
pub struct FakeTokenSource {
    current: Mutex<Option<String>>,
    client_id: Option<i64>,
    refresh_calls: AtomicUsize,
    fail_refresh: bool,
}

impl FakeTokenSource {
    /// Source whose current token is `T0`.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Some("T0".to_string())),
            client_id: Some(42),
            refresh_calls: AtomicUsize::new(0),
            fail_refresh: false,
        }
    }

    /// Source with no token at all.
    pub fn without_token() -> Self {
        let source = Self::new();
        *source.current.lock().unwrap() = None;
        source
    }

    /// Makes every refresh fail with `refresh_failed`.
    pub fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    /// Overrides the client id.
    pub fn with_client_id(mut self, client_id: Option<i64>) -> Self {
        self.client_id = client_id;
        self
    }

    /// Number of refresh calls made.
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TokenSource for FakeTokenSource {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn refresh(&self) -> Result<RefreshedToken> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;
        if self.fail_refresh {
            return Err(GatewayError::auth(
                AuthFailure::RefreshFailed,
                "refresh endpoint returned 400",
            ));
        }
        let token = format!("T{}", n);
        *self.current.lock().unwrap() = Some(token.clone());
        Ok(RefreshedToken {
            access_token: token,
            refresh_token: format!("R{}", n),
            expires_at: Utc::now(),
        })
    }

    async fn client_id(&self) -> Result<Option<i64>> {
        Ok(self.client_id)
    }
}
