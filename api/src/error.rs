use axum::Json;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use channex_core::error::{ErrorDetail, codes};
use channex_mcp_runtime::{ErrorKind, ToolError};
use serde_json::json;

use crate::state::AppState;

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Malformed request (400)
    Validation {
        message: String,
        field: Option<String>,
        docs_hint: Option<String>,
    },
    /// Missing or unknown API key (401)
    Unauthorized {
        code: &'static str,
        message: String,
        docs_hint: Option<String>,
    },
    /// Unknown route-level resource (404)
    NotFound {
        message: String,
        docs_hint: Option<String>,
    },
    /// Tool failure; status follows the error kind
    Tool(ToolError),
    /// Internal error (500)
    Internal(String),
}

impl AppError {
    fn status_and_detail(self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::Validation {
                message,
                field,
                docs_hint,
            } => {
                let mut detail = ErrorDetail::new(codes::VALIDATION_FAILED, message);
                detail.field = field;
                detail.docs_hint = docs_hint;
                (StatusCode::BAD_REQUEST, detail)
            }
            AppError::Unauthorized {
                code,
                message,
                docs_hint,
            } => {
                let mut detail = ErrorDetail::new(code, message);
                detail.docs_hint = docs_hint;
                (StatusCode::UNAUTHORIZED, detail)
            }
            AppError::NotFound { message, docs_hint } => {
                let mut detail = ErrorDetail::new(codes::NOT_FOUND, message);
                detail.docs_hint = docs_hint;
                (StatusCode::NOT_FOUND, detail)
            }
            AppError::Tool(err) => (tool_status(&err), err.to_detail()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorDetail::new(codes::INTERNAL_ERROR, "An internal error occurred"),
                )
            }
        }
    }
}

/// 400 validation, 404 not found, upstream status when it is an error
/// status, otherwise 502.
pub fn tool_status(err: &ToolError) -> StatusCode {
    match err.kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Upstream => err
            .status
            .and_then(|s| StatusCode::from_u16(s).ok())
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::BAD_GATEWAY),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, mut detail) = self.status_and_detail();
        detail.request_id = Some(uuid::Uuid::now_v7().to_string());
        detail.timestamp = Some(chrono::Utc::now().to_rfc3339());
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), code = %detail.code, "request failed");
        }

        let mut response = error_response(status, &detail);
        response.extensions_mut().insert(detail);
        response
    }
}

fn error_response(status: StatusCode, detail: &ErrorDetail) -> Response {
    (status, Json(json!({ "success": false, "error": detail }))).into_response()
}

/// In production, re-renders `AppError` responses without `details`.
/// Relies on the `ErrorDetail` extension that `AppError` attaches.
pub async fn redact_error_details(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    if !state.production {
        return response;
    }
    let Some(mut detail) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };
    if detail.details.is_none() {
        return response;
    }
    detail.details = None;

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let (_, body) = error_response(parts.status, &detail).into_parts();
    Response::from_parts(parts, body)
}

impl From<ToolError> for AppError {
    fn from(err: ToolError) -> Self {
        AppError::Tool(err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use channex_core::shaping::ShapingPolicy;
    use channex_mcp_runtime::{ToolRuntime, UpstreamClient, UpstreamConfig};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::ApiKeyRegistry;

    fn state(production: bool) -> AppState {
        let client = UpstreamClient::new(&UpstreamConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "k".to_string(),
            timeout: std::time::Duration::from_secs(1),
        })
        .unwrap();
        AppState {
            runtime: Arc::new(ToolRuntime::new(client, ShapingPolicy::default())),
            api_keys: Arc::new(ApiKeyRegistry::default()),
            production,
        }
    }

    async fn failing() -> AppError {
        AppError::Tool(
            ToolError::upstream(codes::UPSTREAM_ERROR, "Not Found")
                .with_status(404)
                .with_details(json!({ "status": 404, "upstream_code": "not_found" })),
        )
    }

    async fn error_body(production: bool) -> (StatusCode, Value) {
        let state = state(production);
        let app = Router::new()
            .route("/fail", get(failing))
            .layer(from_fn_with_state(state.clone(), redact_error_details))
            .with_state(state);
        let response = app
            .oneshot(axum::http::Request::builder().uri("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn details_are_kept_outside_production() {
        let (status, body) = error_body(false).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["details"]["upstream_code"], "not_found");
    }

    #[tokio::test]
    async fn production_strips_details_only() {
        let (status, body) = error_body(true).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert!(body["error"].get("details").is_none());
        assert_eq!(body["error"]["code"], codes::UPSTREAM_ERROR);
        assert_eq!(body["error"]["message"], "Not Found");
        assert!(body["error"]["request_id"].is_string());
    }

    #[test]
    fn upstream_status_is_forwarded_when_it_is_an_error() {
        let err = ToolError::upstream(codes::UPSTREAM_ERROR, "gone").with_status(404);
        assert_eq!(tool_status(&err), StatusCode::NOT_FOUND);

        let err = ToolError::upstream(codes::UPSTREAM_ERROR, "odd").with_status(302);
        assert_eq!(tool_status(&err), StatusCode::BAD_GATEWAY);

        let err = ToolError::upstream(codes::CONNECTION_ERROR, "down");
        assert_eq!(tool_status(&err), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn validation_and_not_found_map_to_client_errors() {
        assert_eq!(
            tool_status(&ToolError::validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            tool_status(&ToolError::not_found("nope")),
            StatusCode::NOT_FOUND
        );
    }
}
