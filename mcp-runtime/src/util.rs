use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ToolError;

/// Deserialize tool arguments into a typed parameter struct.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: &Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(args.clone())).map_err(|e| {
        let message = e.to_string();
        let mut err = ToolError::validation(format!("Invalid arguments for {tool}: {message}"))
            .with_docs_hint(format!(
                "Check the input schema via tools/list or GET /api/v1/tools/{tool}."
            ));
        if let Some(field) = extract_field_from_serde_message(&message) {
            err = err.with_field(field);
        }
        err
    })
}

/// Try to extract a field name from serde's error messages.
pub fn extract_field_from_serde_message(msg: &str) -> Option<String> {
    for pattern in ["missing field `", "unknown field `"] {
        if let Some(start) = msg.find(pattern) {
            let after = &msg[start + pattern.len()..];
            if let Some(end) = after.find('`') {
                return Some(after[..end].to_string());
            }
        }
    }
    None
}

/// Validate an identifier that will be interpolated into an upstream path.
pub fn path_segment<'a>(field: &str, value: &'a str) -> Result<&'a str, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::validation(format!("'{field}' must not be empty")).with_field(field));
    }
    if trimmed.contains(['/', '?', '#']) || trimmed == "." || trimmed == ".." {
        return Err(
            ToolError::validation(format!("'{field}' must be a plain identifier"))
                .with_field(field),
        );
    }
    Ok(trimmed)
}

pub fn normalize_api_path(raw: &str) -> Result<String, ToolError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ToolError::validation("API path must not be empty").with_field("path"));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Err(
            ToolError::validation("Pass API path only (e.g. /properties), not full URL")
                .with_field("path"),
        );
    }
    if trimmed.starts_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{trimmed}"))
    }
}

pub fn parse_response_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).to_string()))
}

pub fn arg_optional_bool(args: &Map<String, Value>, key: &str) -> Result<Option<bool>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(v)) => Ok(Some(*v)),
        Some(_) => Err(ToolError::validation(format!("'{key}' must be a boolean")).with_field(key)),
    }
}

pub fn arg_optional_u64(args: &Map<String, Value>, key: &str) -> Result<Option<u64>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| {
                ToolError::validation(format!("'{key}' must be an unsigned integer")).with_field(key)
            })
            .map(Some),
        Some(_) => Err(
            ToolError::validation(format!("'{key}' must be an unsigned integer")).with_field(key),
        ),
    }
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Probe {
        #[allow(dead_code)]
        id: String,
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn normalize_api_path_adds_leading_slash() {
        assert_eq!(normalize_api_path("properties").unwrap(), "/properties");
        assert_eq!(normalize_api_path("/properties").unwrap(), "/properties");
        assert!(normalize_api_path("https://x.test/properties").is_err());
    }

    #[test]
    fn serde_errors_point_at_the_field() {
        let err = parse_args::<Probe>("channex_get_property", &args(json!({}))).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("id"));

        let err = parse_args::<Probe>("channex_get_property", &args(json!({ "id": "1", "bogus": 1 })))
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("bogus"));
    }

    #[test]
    fn path_segments_reject_traversal() {
        assert_eq!(path_segment("id", " abc ").unwrap(), "abc");
        assert!(path_segment("id", "").is_err());
        assert!(path_segment("id", "../admin").is_err());
        assert!(path_segment("id", "a?b=c").is_err());
    }

    #[test]
    fn response_body_parsing_tolerates_non_json() {
        assert_eq!(parse_response_body(b""), Value::Null);
        assert_eq!(parse_response_body(b"{\"a\":1}"), json!({ "a": 1 }));
        assert_eq!(parse_response_body(b"oops"), json!("oops"));
    }

    #[test]
    fn optional_number_args_are_type_checked() {
        let map = args(json!({ "max_depth": 2, "bad": "x", "neg": -1 }));
        assert_eq!(arg_optional_u64(&map, "max_depth").unwrap(), Some(2));
        assert_eq!(arg_optional_u64(&map, "missing").unwrap(), None);
        assert!(arg_optional_u64(&map, "bad").is_err());
        assert!(arg_optional_u64(&map, "neg").is_err());
    }
}
