use serde::Serialize;
use utoipa::ToSchema;

/// Structured error envelope returned by every surface.
///
/// Always wrapped as `{ "error": { ... } }` so callers can branch on the
/// presence of the `error` key regardless of transport.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "validation_failed", "not_found", "upstream_error")
    pub code: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
    /// Structured details (upstream error payload, offending record index, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Which input field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
    /// Request ID for tracing and debugging (HTTP surface only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp (HTTP surface only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            field: None,
            docs_hint: None,
            request_id: None,
            timestamp: None,
        }
    }

    pub fn into_body(self) -> ErrorBody {
        ErrorBody { error: self }
    }
}

/// Error codes used across the bridge
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const NOT_FOUND: &str = "not_found";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const MISSING_API_KEY: &str = "missing_api_key";
    pub const INVALID_API_KEY: &str = "invalid_api_key";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const CONNECTION_ERROR: &str = "connection_error";
    pub const RESPONSE_ERROR: &str = "response_error";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const INVALID_CATEGORY: &str = "invalid_category";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_body_omits_empty_optionals() {
        let body = ErrorDetail::new(codes::NOT_FOUND, "Tool 'x' not found").into_body();
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({ "error": { "code": "not_found", "message": "Tool 'x' not found" } })
        );
    }
}
