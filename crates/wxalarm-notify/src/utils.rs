//! Helpers for logging notification payloads.

use serde_json::Value;
use std::collections::BTreeMap;

/// Maximum length of a body excerpt written to the log.
pub const MAX_LOGGED_BODY: usize = 500;

/// Truncate to at most `max_len` bytes, backing off to a char boundary.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    ["authorization", "password", "passwd", "token", "secret", "api_key", "apikey", "api-key", "cookie"]
        .iter()
        .any(|needle| key.contains(needle))
}

/// Copy of `headers` with credential-bearing values replaced by `***`.
pub fn redact_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| {
            let value = if is_sensitive(k) { "***".to_string() } else { v.clone() };
            (k.clone(), value)
        })
        .collect()
}

/// Redact sensitive keys anywhere in a JSON document.
pub fn redact_sensitive_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if is_sensitive(k) {
                        Value::String("***".to_string())
                    } else {
                        redact_sensitive_json(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_json).collect()),
        other => other.clone(),
    }
}

/// Loggable excerpt of a body: JSON bodies are redacted, then everything is
/// truncated to [`MAX_LOGGED_BODY`].
pub fn body_excerpt(body: &str) -> String {
    let body = match serde_json::from_str::<Value>(body) {
        Ok(value) => redact_sensitive_json(&value).to_string(),
        Err(_) => body.to_string(),
    };
    truncate_string(&body, MAX_LOGGED_BODY)
}
