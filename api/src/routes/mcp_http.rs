use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::state::AppState;

const MCP_PATH: &str = "/mcp";

pub fn router() -> Router<AppState> {
    Router::new().route(MCP_PATH, post(mcp_post).get(mcp_get))
}

async fn mcp_get() -> Response {
    StatusCode::METHOD_NOT_ALLOWED.into_response()
}

/// MCP JSON-RPC over HTTP. Notifications alone yield 202 with no body.
async fn mcp_post(State(state): State<AppState>, body: Bytes) -> Response {
    let incoming: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => {
            return (
                StatusCode::OK,
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": {
                        "code": -32700,
                        "message": "Parse error"
                    }
                })),
            )
                .into_response();
        }
    };

    let batch = incoming.is_array();
    let responses =
        channex_mcp_runtime::handle_http_jsonrpc(state.runtime.clone(), incoming).await;

    if responses.is_empty() {
        return StatusCode::ACCEPTED.into_response();
    }

    if !batch && responses.len() == 1 {
        return (
            StatusCode::OK,
            Json(responses.into_iter().next().unwrap_or(Value::Null)),
        )
            .into_response();
    }

    (StatusCode::OK, Json(Value::Array(responses))).into_response()
}
