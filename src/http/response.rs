//! Transport response as seen by the response interceptors

use std::collections::HashMap;

use bytes::Bytes;
use serde_json::Value;

use crate::error::GatewayError;

/// A received HTTP response.
///
/// `body` is the parsed payload: JSON when the bytes parse as JSON, a JSON
/// string for other UTF-8 text, and `None` for an empty or binary body. The
/// raw `bytes` are always kept for downloads.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lower-cased names)
    pub headers: HashMap<String, String>,
    /// Parsed body
    pub body: Option<Value>,
    /// Raw body
    pub bytes: Bytes,
}

impl HttpResponse {
    /// Builds a response from raw parts, parsing the body.
    pub fn from_parts(status: u16, headers: HashMap<String, String>, bytes: Bytes) -> Self {
        let body = parse_body(&bytes);
        Self {
            status,
            headers,
            body,
            bytes,
        }
    }

    /// Builds a response carrying a JSON body.
    pub fn json(status: u16, body: Value) -> Self {
        let bytes = Bytes::from(body.to_string());
        Self {
            status,
            headers: HashMap::from([(
                "content-type".to_string(),
                "application/json".to_string(),
            )]),
            body: Some(body),
            bytes,
        }
    }

    /// Builds a response with no body.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: None,
            bytes: Bytes::new(),
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts a non-2xx response into [`GatewayError::Response`].
    pub fn into_error(self) -> GatewayError {
        GatewayError::Response {
            status: self.status,
            body: self.body,
        }
    }
}

fn parse_body(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_slice(bytes) {
        return Some(value);
    }
    std::str::from_utf8(bytes)
        .ok()
        .map(|text| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_parts_parses_json() {
        let response = HttpResponse::from_parts(200, HashMap::new(), Bytes::from(r#"{"a":1}"#));
        assert_eq!(response.body, Some(json!({"a": 1})));
    }

    #[test]
    fn test_from_parts_keeps_plain_text_as_string() {
        let response = HttpResponse::from_parts(400, HashMap::new(), Bytes::from("Bad things"));
        assert_eq!(response.body, Some(json!("Bad things")));
    }

    #[test]
    fn test_from_parts_empty_and_binary_bodies_are_none() {
        let empty = HttpResponse::from_parts(204, HashMap::new(), Bytes::new());
        assert!(empty.body.is_none());

        let binary = HttpResponse::from_parts(200, HashMap::new(), Bytes::from(vec![0xff, 0xfe]));
        assert!(binary.body.is_none());
        assert_eq!(binary.bytes.len(), 2);
    }

    #[test]
    fn test_into_error_carries_status_and_body() {
        let err = HttpResponse::json(422, json!({"errors": {}})).into_error();
        assert_eq!(err.status(), Some(422));
    }
}
