//! Token records and the token endpoint's wire format

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthFailure, GatewayError, Result};

/// Field names of the persisted token record.
pub mod fields {
    /// Bearer credential
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Credential exchanged for a new access token
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Expiry, epoch milliseconds
    pub const EXPIRES_AT: &str = "expires_at";
}

/// The persisted credential set of one authenticated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Bearer credential
    pub access_token: String,
    /// Refresh credential; empty when the server issued none
    #[serde(default)]
    pub refresh_token: String,
    /// Access token expiry, persisted as epoch milliseconds
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Returns `true` once `now` has reached the expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Body returned by the token endpoint for both login and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error body of the token endpoint (OAuth2 style).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Public result of a login. The refresh token is deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginGrant {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshedToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&Token> for LoginGrant {
    fn from(token: &Token) -> Self {
        Self {
            access_token: token.access_token.clone(),
            expires_at: token.expires_at,
        }
    }
}

impl From<Token> for RefreshedToken {
    fn from(token: Token) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_at,
        }
    }
}

/// `now + expires_in * 1000` milliseconds.
///
/// # Errors
///
/// Returns an auth error with `reason` when the lifetime overflows the
/// representable time range.
pub fn expires_at_from(now: DateTime<Utc>, expires_in: i64, reason: AuthFailure) -> Result<DateTime<Utc>> {
    Duration::try_milliseconds(expires_in.saturating_mul(1000))
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            GatewayError::auth(reason, format!("expires_in out of range: {}", expires_in))
        })
}
