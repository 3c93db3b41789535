use std::fmt;

use channex_core::ari::AriError;
use channex_core::error::{ErrorDetail, codes};
use serde_json::{Value, json};

/// Where a tool failure originated. Drives the HTTP status on the REST surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input rejected before any upstream call.
    Validation,
    /// Unknown tool, category or resource.
    NotFound,
    /// Upstream returned a non-2xx status or could not be reached.
    Upstream,
}

#[derive(Debug, Clone)]
pub struct ToolError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    pub field: Option<String>,
    pub docs_hint: Option<String>,
    pub details: Option<Value>,
    /// Upstream HTTP status, when one was received.
    pub status: Option<u16>,
}

impl ToolError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            field: None,
            docs_hint: None,
            details: None,
            status: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, codes::VALIDATION_FAILED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, codes::NOT_FOUND, message)
    }

    pub fn upstream(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, code, message)
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_docs_hint(mut self, docs_hint: impl Into<String>) -> Self {
        self.docs_hint = Some(docs_hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn to_detail(&self) -> ErrorDetail {
        let mut detail = ErrorDetail::new(self.code.clone(), self.message.clone());
        detail.field = self.field.clone();
        detail.docs_hint = self.docs_hint.clone();
        detail.details = self.details.clone();
        detail
    }

    /// `{"error": {code, message, details?, field?, docs_hint?}}`
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self.to_detail().into_body()).unwrap_or_else(|_| {
            json!({ "error": { "code": self.code, "message": self.message } })
        })
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ToolError {}

impl From<AriError> for ToolError {
    fn from(err: AriError) -> Self {
        let mut details = json!({ "kind": err.kind() });
        if let AriError::InvalidRecord { index, .. } = &err {
            details["index"] = json!(index);
        }
        let mut tool_error = ToolError::validation(err.to_string()).with_details(details);
        if let Some(field) = err.field() {
            tool_error = tool_error.with_field(field);
        }
        tool_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_value_wraps_under_error_key() {
        let value = ToolError::validation("'id' must not be empty")
            .with_field("id")
            .to_value();
        assert_eq!(
            value,
            json!({ "error": {
                "code": "validation_failed",
                "message": "'id' must not be empty",
                "field": "id"
            }})
        );
    }

    #[test]
    fn ari_record_errors_carry_index() {
        let err: ToolError = AriError::InvalidRecord {
            index: 2,
            reason: "bad".to_string(),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.field.as_deref(), Some("values[2]"));
        assert_eq!(err.details.unwrap()["index"], 2);
    }
}
