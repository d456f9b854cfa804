//! Redaction of sensitive header and body values.
//!
//! Captured entries can be read by anyone with dashboard access, so
//! credentials are replaced with [`REDACTED`] before anything is stored.

use serde_json::Value;
use std::collections::HashMap;

/// Marker written in place of a redacted value.
pub const REDACTED: &str = "[REDACTED]";

/// Header names (lowercase) whose values are always redacted.
pub const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "x-api-key", "x-auth-token"];

/// Top-level body fields whose values are redacted.
pub const SENSITIVE_FIELDS: &[&str] = &["password", "token", "secret", "key", "api_key", "auth"];

/// Returns true if `name` is on the header deny-list (case-insensitive).
pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|sensitive| name.eq_ignore_ascii_case(sensitive))
}

/// Redact sensitive headers.
///
/// Names are kept as given; values on the deny-list become `"[REDACTED]"`,
/// every other value is passed through as a string.
pub fn sanitize_headers<I, K, V>(headers: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: ToString,
{
    headers
        .into_iter()
        .map(|(name, value)| {
            let name = name.as_ref();
            let value = if is_sensitive_header(name) {
                REDACTED.to_string()
            } else {
                value.to_string()
            };
            (name.to_string(), value)
        })
        .collect()
}

/// Redact sensitive fields of a body.
///
/// - falsy bodies (`null`, `false`, `0`, `""`) become `None`
/// - strings are parsed as JSON; a string that is not JSON is returned as is
/// - objects get their top-level [`SENSITIVE_FIELDS`] redacted
/// - anything else is returned unchanged
///
/// Redaction is shallow: nested objects are not inspected.
pub fn sanitize_body(body: Value) -> Option<Value> {
    if is_falsy(&body) {
        return None;
    }

    let body = match body {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => parsed,
            Err(_) => return Some(Value::String(text)),
        },
        other => other,
    };

    match body {
        Value::Object(mut map) => {
            for field in SENSITIVE_FIELDS {
                if let Some(value) = map.get_mut(*field) {
                    if !is_falsy(value) {
                        *value = Value::String(REDACTED.to_string());
                    }
                }
            }
            Some(Value::Object(map))
        }
        other => Some(other),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
