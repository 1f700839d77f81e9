//! Authenticated user identity claims
//!
//! The identity endpoint answers with a collection of `{type, value}` claim
//! pairs. [`fetch_identity`] turns it into a flat, allow-listed object with
//! boolean strings coerced to booleans.

use serde_json::{Map, Value};

use crate::api::ApiClient;
use crate::error::{GatewayError, Result};

/// Fetches identity claims through `api` and keeps only `allow_list` keys.
///
/// # Errors
///
/// Any failure (transport, auth, unexpected shape) is reported as
/// [`GatewayError::Identity`].
pub async fn fetch_identity(
    api: &ApiClient,
    path: &str,
    allow_list: &[String],
) -> Result<Map<String, Value>> {
    let response = api.get(path, None, None).await.map_err(|e| {
        tracing::warn!(error = %e, "Identity request failed");
        GatewayError::Identity(format!("unable to load identity: {}", e))
    })?;

    let claims = match response.data() {
        Some(Value::Array(items)) => items,
        other => {
            return Err(GatewayError::Identity(format!(
                "identity response is not a claim collection: {}",
                other.unwrap_or(Value::Null)
            )))
        }
    };

    let keyed = collection_to_key_value(&claims, "type", "value");
    let identity: Map<String, Value> = keyed
        .into_iter()
        .filter(|(key, _)| allow_list.iter().any(|allowed| allowed == key))
        .map(|(key, value)| (key, parse_boolean(value)))
        .collect();

    tracing::debug!(claims = identity.len(), "Identity loaded");
    Ok(identity)
}

/// Folds `[{key_field: k, value_field: v}, ...]` into `{k: v}`; later
/// entries win. Entries without a string key are skipped.
pub fn collection_to_key_value(items: &[Value], key_field: &str, value_field: &str) -> Map<String, Value> {
    let mut out = Map::new();
    for item in items {
        if let Some(key) = item.get(key_field).and_then(Value::as_str) {
            let value = item.get(value_field).cloned().unwrap_or(Value::Null);
            out.insert(key.to_string(), value);
        }
    }
    out
}

/// `"true"` / `"false"` (any case) become booleans; anything else is kept.
pub fn parse_boolean(value: Value) -> Value {
    match &value {
        Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
        _ => value,
    }
}
