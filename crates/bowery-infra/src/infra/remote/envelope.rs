use serde_json::Map;
use serde_json::Value;

use crate::usecases::ports::RemoteError;

/// Parses a daemon reply body.
///
/// An empty body is an empty object. A non-empty string `error` field rejects the
/// reply even when other fields are present.
pub fn parse_envelope(body: &str) -> Result<Value, RemoteError> {
    if body.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|err| RemoteError::Malformed(format!("{err}: {}", truncate(body))))?;
    if let Some(message) = rejection(&value) {
        return Err(RemoteError::Rejected { message });
    }
    Ok(value)
}

pub(crate) fn rejection(value: &Value) -> Option<String> {
    value
        .get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

fn truncate(body: &str) -> &str {
    const MAX: usize = 120;
    match body.char_indices().nth(MAX) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}
