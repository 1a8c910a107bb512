use serde_json::Value;

use crate::models::ErrorBody;

/// Extracts the backend's `message` from an error body, if it sent a usable one.
pub fn backend_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    parsed
        .message
        .map(sanitize_message)
        .filter(|m| !m.trim().is_empty())
}

/// Parses a body as JSON for attaching to errors; non-JSON bodies become a string.
pub fn body_value(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(String::from_utf8_lossy(body).into_owned())),
    }
}

fn sanitize_message(s: String) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}
