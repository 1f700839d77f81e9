//! Response and error normalization
//!
//! Backends answer in several shapes: bare arrays, objects carrying a
//! `statusMessage` envelope, empty 204 bodies, and 2xx bodies that embed a
//! legacy failure code. [`normalize_response`] folds these into
//! [`NormalizedResponse`]; [`normalize_error`] folds error bodies into an
//! ordered list of messages.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{GatewayError, Result};
use crate::http::response::HttpResponse;

/// Statuses that legitimately carry no body.
pub const NO_BODY_STATUS_CODES: &[u16] = &[204];

/// Embedded status codes that mark a 2xx response as failed.
pub const LEGACY_ERROR_STATUS_CODES: &[u16] = &[400, 401, 402, 403, 404, 415, 500];

/// Status message attached to empty no-body responses.
pub const NO_CONTENT_MESSAGE: &str = "No content found for the selected request";

/// Canonical success payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResponse {
    /// Empty body on a no-body status; `data` is absent
    NoContent {
        /// Always [`NO_CONTENT_MESSAGE`]
        status_message: String,
    },
    /// Array body wrapped as `{data, statusMessage}`
    Collection {
        /// Copy of the array
        data: Vec<Value>,
        /// Envelope message, `""` when none
        status_message: String,
    },
    /// Object body with `statusMessage` flattened to its message string
    Record(Map<String, Value>),
    /// Any other body, unchanged
    Raw(Option<Value>),
}

impl NormalizedResponse {
    /// Status message, if this shape carries one.
    pub fn status_message(&self) -> Option<&str> {
        match self {
            NormalizedResponse::NoContent { status_message }
            | NormalizedResponse::Collection { status_message, .. } => Some(status_message),
            NormalizedResponse::Record(fields) => {
                fields.get("statusMessage").and_then(Value::as_str)
            }
            NormalizedResponse::Raw(_) => None,
        }
    }

    /// The `data` part: the array for collections, the `data` field of a
    /// record, the raw body otherwise.
    pub fn data(&self) -> Option<Value> {
        match self {
            NormalizedResponse::NoContent { .. } => None,
            NormalizedResponse::Collection { data, .. } => Some(Value::Array(data.clone())),
            NormalizedResponse::Record(fields) => fields.get("data").cloned(),
            NormalizedResponse::Raw(body) => body.clone(),
        }
    }

    /// JSON rendering as callers see it.
    pub fn to_value(&self) -> Value {
        match self {
            NormalizedResponse::NoContent { status_message } => {
                let mut out = Map::new();
                out.insert("statusMessage".to_string(), Value::from(status_message.as_str()));
                Value::Object(out)
            }
            NormalizedResponse::Collection {
                data,
                status_message,
            } => {
                let mut out = Map::new();
                out.insert("data".to_string(), Value::Array(data.clone()));
                out.insert("statusMessage".to_string(), Value::from(status_message.as_str()));
                Value::Object(out)
            }
            NormalizedResponse::Record(fields) => Value::Object(fields.clone()),
            NormalizedResponse::Raw(body) => body.clone().unwrap_or(Value::Null),
        }
    }
}

impl Serialize for NormalizedResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

fn is_empty_body(body: Option<&Value>) -> bool {
    match body {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn envelope(body: Option<&Value>) -> Option<&Map<String, Value>> {
    body.and_then(Value::as_object)
        .and_then(|fields| fields.get("statusMessage"))
        .and_then(Value::as_object)
}

fn extract_message(body: Option<&Value>) -> String {
    envelope(body)
        .and_then(|status| status.get("message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn embedded_status(body: Option<&Value>, http_status: u16) -> u16 {
    envelope(body)
        .and_then(|status| status.get("statusCode"))
        .and_then(|code| match code {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .filter(|code| *code != 0)
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(http_status)
}

/// Maps a successful response to its canonical shape.
///
/// # Errors
///
/// Returns [`GatewayError::LegacyStatus`] when the body's
/// `statusMessage.statusCode` is one of [`LEGACY_ERROR_STATUS_CODES`].
pub fn normalize_response(response: &HttpResponse) -> Result<NormalizedResponse> {
    let body = response.body.as_ref();

    let code = embedded_status(body, response.status);
    if LEGACY_ERROR_STATUS_CODES.contains(&code) {
        tracing::debug!(status = response.status, embedded = code, "Body embeds a failure status");
        return Err(GatewayError::LegacyStatus(code));
    }

    if is_empty_body(body) && NO_BODY_STATUS_CODES.contains(&response.status) {
        return Ok(NormalizedResponse::NoContent {
            status_message: NO_CONTENT_MESSAGE.to_string(),
        });
    }

    let message = extract_message(body);
    let normalized = match body {
        Some(Value::Array(items)) => NormalizedResponse::Collection {
            data: items.clone(),
            status_message: message,
        },
        Some(Value::Object(fields)) => {
            let mut merged = fields.clone();
            merged.insert("statusMessage".to_string(), Value::String(message));
            NormalizedResponse::Record(merged)
        }
        other => NormalizedResponse::Raw(other.cloned()),
    };
    Ok(normalized)
}

/// Canonical error payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedError {
    /// Human-readable messages in server order
    Messages(Vec<String>),
    /// Body with no recognized shape, unchanged
    Raw(Option<Value>),
}

impl NormalizedError {
    /// Converts into the error callers receive for an HTTP `status`.
    pub fn into_gateway_error(self, status: u16) -> GatewayError {
        match self {
            NormalizedError::Messages(messages) => GatewayError::Validation(messages),
            NormalizedError::Raw(body) => GatewayError::Response { status, body },
        }
    }
}

/// Maps an error response body to messages.
///
/// A string body is one message. An object whose `errors` field maps field
/// names to message arrays is flattened in field order. A field whose entry
/// is a single string contributes that string.
pub fn normalize_error(body: Option<&Value>) -> NormalizedError {
    match body {
        Some(Value::String(message)) => NormalizedError::Messages(vec![message.clone()]),
        Some(Value::Object(fields)) => match fields.get("errors") {
            Some(Value::Object(errors)) => {
                NormalizedError::Messages(errors.values().flat_map(field_messages).collect())
            }
            _ => NormalizedError::Raw(body.cloned()),
        },
        other => NormalizedError::Raw(other.cloned()),
    }
}

fn field_messages(entry: &Value) -> Vec<String> {
    match entry {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => vec![s.clone()],
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}
