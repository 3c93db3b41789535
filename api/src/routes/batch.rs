use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use channex_mcp_runtime::{BatchItemResult, BatchRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

/// Upper bound on tool calls per batch request.
pub const MAX_BATCH_REQUESTS: usize = 50;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/batch", post(execute_batch))
}

#[derive(Deserialize, ToSchema)]
pub struct BatchItem {
    pub tool: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub params: Map<String, Value>,
    /// Echoed back on the matching result; defaults to the item's position
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct BatchBody {
    pub requests: Vec<BatchItem>,
}

#[derive(Serialize, ToSchema)]
pub struct BatchResponse {
    pub data: Vec<BatchItemResult>,
}

/// Runs the tool calls concurrently; each entry succeeds or fails on its own.
#[utoipa::path(
    post,
    path = "/api/v1/batch",
    request_body = BatchBody,
    responses(
        (status = 200, description = "One result per request, in request order", body = BatchResponse),
        (status = 400, description = "Malformed batch", body = channex_core::error::ErrorBody)
    ),
    security(("api_key" = [])),
    tag = "tools"
)]
pub async fn execute_batch(
    State(state): State<AppState>,
    AppJson(body): AppJson<BatchBody>,
) -> Result<Json<BatchResponse>, AppError> {
    if body.requests.len() > MAX_BATCH_REQUESTS {
        return Err(AppError::Validation {
            message: format!(
                "A batch may contain at most {MAX_BATCH_REQUESTS} requests, got {}",
                body.requests.len()
            ),
            field: Some("requests".to_string()),
            docs_hint: Some("Split the work into several batch calls.".to_string()),
        });
    }

    let requests = body
        .requests
        .into_iter()
        .map(|item| BatchRequest {
            tool: item.tool,
            params: item.params,
            id: item.id,
        })
        .collect();
    let results = state.runtime.execute_batch(requests).await;
    let failed = results.iter().filter(|r| !r.success).count();
    tracing::info!(total = results.len(), failed, "batch executed");

    Ok(Json(BatchResponse {
        data: results,
    }))
}
