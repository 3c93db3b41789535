//! Extractors that turn axum rejections into structured `AppError` responses.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

/// Drop-in replacement for `axum::Json<T>` whose deserialization failures
/// become a JSON 400 instead of axum's plain-text 422.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

pub fn map_json_rejection(rejection: JsonRejection) -> AppError {
    let body_text = rejection.body_text();
    let field = field_from_serde_message(&body_text).unwrap_or_else(|| "body".to_string());

    AppError::Validation {
        message: format!("Invalid request body: {body_text}"),
        field: Some(field),
        docs_hint: Some(
            "Check the request body against the OpenAPI document at /api-doc/openapi.json."
                .to_string(),
        ),
    }
}

/// "missing field `requests`" or "unknown field `foo`" → the backticked name.
fn field_from_serde_message(msg: &str) -> Option<String> {
    ["missing field `", "unknown field `"]
        .iter()
        .find_map(|pattern| {
            let start = msg.find(pattern)? + pattern.len();
            let after = &msg[start..];
            after.find('`').map(|end| after[..end].to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_missing_field_name() {
        let msg = "Failed to deserialize the JSON body: missing field `requests` at line 1 column 2";
        assert_eq!(field_from_serde_message(msg), Some("requests".to_string()));
    }

    #[test]
    fn extracts_unknown_field_name() {
        let msg = "unknown field `foo`, expected `tool` or `params`";
        assert_eq!(field_from_serde_message(msg), Some("foo".to_string()));
    }

    #[test]
    fn returns_none_for_generic_error() {
        assert_eq!(field_from_serde_message("invalid type: string, expected u64"), None);
    }
}
