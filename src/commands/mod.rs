/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `session` -- login, logout, refresh, status, forgot-password
- `client`  -- client context management and identity
- `request` -- ad-hoc requests through the authenticated pipeline

Handlers are small: they call into [`Gateway`] and render the result.
*/

use anyhow::Context;
use colored::Colorize;
use serde_json::Value;

use crate::gateway::Gateway;

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// Token lifecycle commands
pub mod session {
    //! Login, logout, refresh, status, and password reset.

    use super::*;
    use chrono::Utc;

    /// Log in and store the issued token
    ///
    /// A random device guid is generated when none is given.
    pub async fn login(
        gateway: &Gateway,
        username: &str,
        password: &str,
        guid: Option<String>,
    ) -> anyhow::Result<()> {
        let guid = guid.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tracing::debug!(guid = %guid, "Using device guid");

        let grant = gateway.tokens().login(username, password, &guid).await?;
        println!(
            "{} Logged in as {} (token expires {})",
            "✓".green(),
            username.bold(),
            grant.expires_at.to_rfc3339()
        );
        Ok(())
    }

    pub fn logout(gateway: &Gateway) -> anyhow::Result<()> {
        gateway.tokens().logout()?;
        println!("{} Logged out", "✓".green());
        Ok(())
    }

    pub async fn refresh(gateway: &Gateway) -> anyhow::Result<()> {
        let refreshed = gateway.tokens().refresh().await?;
        println!(
            "{} Token refreshed (expires {})",
            "✓".green(),
            refreshed.expires_at.to_rfc3339()
        );
        Ok(())
    }

    /// Show token expiry and the active client. Never prints the token.
    pub fn status(gateway: &Gateway) -> anyhow::Result<()> {
        let tokens = gateway.tokens();

        match tokens.get_token_expiration()? {
            None => println!("{}", "Not logged in.".yellow()),
            Some(expires_at) => {
                let state = if tokens.is_token_expired()? {
                    "expired".red()
                } else {
                    let remaining = expires_at - Utc::now();
                    format!("valid for {}m", remaining.num_minutes()).green()
                };
                println!("{:<10} {}", "Token:".bold(), state);
                println!("{:<10} {}", "Expires:".bold(), expires_at.to_rfc3339());
            }
        }

        match tokens.client_id()? {
            Some(id) => println!("{:<10} {}", "Client:".bold(), id),
            None => println!("{:<10} {}", "Client:".bold(), "none".dimmed()),
        }
        Ok(())
    }

    pub async fn forgot_password(gateway: &Gateway, username: &str) -> anyhow::Result<()> {
        let body = gateway.tokens().forgot_password(username).await?;
        println!("{} Password reset requested for {}", "✓".green(), username.bold());
        if let Some(body) = body {
            print_json(&body)?;
        }
        Ok(())
    }
}

// Client context and identity commands
pub mod client {
    //! Active client context and identity claims.

    use super::*;

    pub fn set(gateway: &Gateway, json: &str) -> anyhow::Result<()> {
        let value: Value = serde_json::from_str(json).context("client must be valid JSON")?;
        gateway.tokens().set_client(&value)?;
        println!("{} Client context stored", "✓".green());
        Ok(())
    }

    pub fn show(gateway: &Gateway, key: Option<&str>) -> anyhow::Result<()> {
        match gateway.tokens().get_client(key)? {
            Some(value) => print_json(&value),
            None => {
                println!("{}", "No client context set.".yellow());
                Ok(())
            }
        }
    }

    pub fn clear(gateway: &Gateway) -> anyhow::Result<()> {
        gateway.tokens().clear_client()?;
        println!("{} Client context cleared", "✓".green());
        Ok(())
    }

    pub async fn identity(gateway: &Gateway) -> anyhow::Result<()> {
        let identity = gateway.identity().await?;
        print_json(&Value::Object(identity))
    }
}

// Ad-hoc request command
pub mod request {
    //! `tollgate request METHOD PATH` through the authenticated pipeline.

    use super::*;
    use crate::http::request::{RequestBody, RequestConfig};
    use reqwest::Method;
    use serde_json::Map;

    /// Parses repeated `key=value` arguments into query parameters.
    pub fn parse_params(params: &[String]) -> anyhow::Result<Option<Map<String, Value>>> {
        if params.is_empty() {
            return Ok(None);
        }
        let mut out = Map::new();
        for param in params {
            let (key, value) = param
                .split_once('=')
                .with_context(|| format!("parameter '{}' is not key=value", param))?;
            out.insert(key.to_string(), Value::from(value));
        }
        Ok(Some(out))
    }

    /// Builds the request described by the CLI arguments.
    pub fn build(
        method: &str,
        path: &str,
        params: &[String],
        data: Option<&str>,
    ) -> anyhow::Result<RequestConfig> {
        let method: Method = method
            .to_uppercase()
            .parse()
            .with_context(|| format!("invalid HTTP method '{}'", method))?;

        let mut config = RequestConfig::new(method, path);
        config.params = parse_params(params)?;
        if let Some(data) = data {
            let body: Value = serde_json::from_str(data).context("--data must be valid JSON")?;
            config.data = Some(RequestBody::Json(body));
        }
        Ok(config)
    }

    pub async fn run(
        gateway: &Gateway,
        method: &str,
        path: &str,
        params: &[String],
        data: Option<&str>,
    ) -> anyhow::Result<()> {
        let config = build(method, path, params, data)?;
        let response = gateway.api().send(config).await?;
        print_json(&response.to_value())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        #[test]
        fn test_parse_params() {
            let params = parse_params(&["page=2".to_string(), "q=a=b".to_string()])
                .unwrap()
                .unwrap();
            assert_eq!(Value::Object(params), json!({"page": "2", "q": "a=b"}));
            assert!(parse_params(&[]).unwrap().is_none());
        }

        #[test]
        fn test_parse_params_rejects_missing_equals() {
            assert!(parse_params(&["page".to_string()]).is_err());
        }

        #[test]
        fn test_build_request() {
            let config = build("post", "/api/widgets", &[], Some(r#"{"a":1}"#)).unwrap();
            assert_eq!(config.method, Method::POST);
            assert_eq!(config.data, Some(RequestBody::Json(json!({"a": 1}))));
        }

        #[test]
        fn test_build_rejects_bad_json() {
            assert!(build("put", "/api/x", &[], Some("{nope")).is_err());
        }
    }
}
