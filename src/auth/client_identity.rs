//! Active client context (possibly impersonated)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The tenant the session acts for. Extra fields are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub id: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClientIdentity {
    /// Identity with no extra fields.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            extra: Map::new(),
        }
    }
}

/// Coerces a stored `id` field to a client id.
///
/// Integers and numeric strings are accepted; `0`, fractions that truncate
/// to zero, and anything unparseable mean "no client".
pub fn client_id_from_value(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    };
    id.filter(|id| *id != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_id_from_number_and_string() {
        assert_eq!(client_id_from_value(&json!(42)), Some(42));
        assert_eq!(client_id_from_value(&json!("42")), Some(42));
        assert_eq!(client_id_from_value(&json!(" 7 ")), Some(7));
    }

    #[test]
    fn test_client_id_zero_and_garbage_are_none() {
        assert_eq!(client_id_from_value(&json!(0)), None);
        assert_eq!(client_id_from_value(&json!("0")), None);
        assert_eq!(client_id_from_value(&json!("abc")), None);
        assert_eq!(client_id_from_value(&json!(null)), None);
        assert_eq!(client_id_from_value(&json!({"id": 1})), None);
    }

    #[test]
    fn test_identity_keeps_extra_fields() {
        let identity: ClientIdentity =
            serde_json::from_value(json!({"id": 3, "name": "Acme"})).unwrap();
        assert_eq!(identity.id, 3);
        assert_eq!(identity.extra.get("name"), Some(&json!("Acme")));
        assert_eq!(
            serde_json::to_value(&identity).unwrap(),
            json!({"id": 3, "name": "Acme"})
        );
    }
}
