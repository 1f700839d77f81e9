//! Error types for Tollgate
//!
//! This module defines all error types used throughout the library,
//! using `thiserror` for ergonomic error handling.
//!
//! Unlike the binary, which reports through `anyhow`, the library returns
//! [`GatewayError`] directly so that callers can match on the failure class
//! (authentication, validation, transport, ...) without downcasting.

use serde_json::Value;
use thiserror::Error;

/// Why an authentication operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The auth server rejected the submitted credentials.
    InvalidGrant,
    /// Login failed for any reason other than rejected credentials.
    LoginFailed,
    /// Exchanging the refresh token for a new access token failed.
    RefreshFailed,
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuthFailure::InvalidGrant => "invalid_grant",
            AuthFailure::LoginFailed => "login_failed",
            AuthFailure::RefreshFailed => "refresh_failed",
        };
        f.write_str(s)
    }
}

/// Main error type for Tollgate operations
///
/// Every failure a caller can observe is one of these variants. The payload
/// is always a message, an ordered list of messages, or a raw response body;
/// transport exceptions never escape unwrapped.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network failures and timeouts. Never retried by the pipeline.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request was cancelled by its caller
    #[error("Request was cancelled")]
    Cancelled,

    /// Login or refresh failed
    #[error("Authentication error ({reason}): {message}")]
    Auth {
        /// Failure class
        reason: AuthFailure,
        /// Human-readable message (server description or transport message)
        message: String,
    },

    /// Field-level validation messages, in the order the server listed them
    #[error("Validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A 2xx response whose body embeds a legacy error status code
    #[error("Request failed with embedded status code {0}")]
    LegacyStatus(u16),

    /// Non-2xx response whose body has no recognized error shape
    #[error("Request failed with status {status}")]
    Response {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        body: Option<Value>,
    },

    /// Identity lookup failed
    #[error("Identity error: {0}")]
    Identity(String),

    /// Token store errors that are not keyring or IO specific
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl GatewayError {
    /// Returns the HTTP status carried by a [`GatewayError::Response`].
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for [`GatewayError::Auth`] with the given reason.
    pub fn is_auth(&self, reason: AuthFailure) -> bool {
        matches!(self, GatewayError::Auth { reason: r, .. } if *r == reason)
    }

    pub(crate) fn auth(reason: AuthFailure, message: impl Into<String>) -> Self {
        GatewayError::Auth {
            reason,
            message: message.into(),
        }
    }
}

/// Result type alias for Tollgate operations
pub type Result<T> = std::result::Result<T, GatewayError>;
