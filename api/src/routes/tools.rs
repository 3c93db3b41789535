use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use channex_mcp_runtime::tools::{find_tool, suggest_tool, tool_definitions};
use serde::Serialize;
use serde_json::{Map, Value, json};
use utoipa::ToSchema;

use crate::auth::AuthenticatedClient;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/tools", get(list_tools))
        .route("/api/v1/tools/{tool_name}", get(get_tool).post(execute_tool))
}

#[derive(Serialize, ToSchema)]
pub struct ToolListMeta {
    pub count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct ToolListResponse {
    /// Tool definitions: name, description, category, read_only, inputSchema
    pub data: Vec<Value>,
    pub meta: ToolListMeta,
}

#[derive(Serialize, ToSchema)]
pub struct ToolResponse {
    pub data: Value,
}

#[derive(Serialize, ToSchema)]
pub struct ExecuteToolResponse {
    pub success: bool,
    pub data: Value,
    /// Present when the response was shortened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<Value>,
}

#[utoipa::path(
    get,
    path = "/api/v1/tools",
    responses(
        (status = 200, description = "All tools", body = ToolListResponse),
        (status = 401, description = "Missing or invalid API key", body = channex_core::error::ErrorBody)
    ),
    security(("api_key" = [])),
    tag = "tools"
)]
pub async fn list_tools() -> Json<ToolListResponse> {
    let data: Vec<Value> = tool_definitions().iter().map(|t| t.to_value()).collect();
    Json(ToolListResponse {
        meta: ToolListMeta { count: data.len() },
        data,
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/tools/{tool_name}",
    params(("tool_name" = String, Path, description = "Tool name, e.g. channex_list_properties")),
    responses(
        (status = 200, description = "Tool definition", body = ToolResponse),
        (status = 404, description = "Unknown tool", body = channex_core::error::ErrorBody)
    ),
    security(("api_key" = [])),
    tag = "tools"
)]
pub async fn get_tool(Path(tool_name): Path<String>) -> Result<Json<ToolResponse>, AppError> {
    let tool = find_tool(&tool_name).ok_or_else(|| AppError::NotFound {
        message: format!("Tool {tool_name} not found"),
        docs_hint: suggest_tool(&tool_name).map(|s| format!("Did you mean '{s}'?")),
    })?;
    Ok(Json(ToolResponse {
        data: tool.to_value(),
    }))
}

/// The JSON body holds the tool parameters described by its `inputSchema`;
/// an empty body means no parameters.
#[utoipa::path(
    post,
    path = "/api/v1/tools/{tool_name}",
    params(("tool_name" = String, Path, description = "Tool name")),
    request_body = Object,
    responses(
        (status = 200, description = "Tool result", body = ExecuteToolResponse),
        (status = 400, description = "Invalid parameters", body = channex_core::error::ErrorBody),
        (status = 404, description = "Unknown tool", body = channex_core::error::ErrorBody),
        (status = 502, description = "Upstream unreachable", body = channex_core::error::ErrorBody)
    ),
    security(("api_key" = [])),
    tag = "tools"
)]
pub async fn execute_tool(
    State(state): State<AppState>,
    caller: AuthenticatedClient,
    Path(tool_name): Path<String>,
    body: Bytes,
) -> Result<Json<ExecuteToolResponse>, AppError> {
    let args = parse_tool_args(&body)?;
    tracing::debug!(tool = %tool_name, user_id = %caller.user_id, "executing tool");

    let output = state.runtime.execute(&tool_name, args).await?;
    Ok(Json(ExecuteToolResponse {
        success: true,
        data: output.data,
        truncation: output.truncation.map(|note| json!(note)),
    }))
}

/// Empty body means no parameters; anything else must be a JSON object.
fn parse_tool_args(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err(AppError::Validation {
            message: "Tool parameters must be a JSON object".to_string(),
            field: Some("body".to_string()),
            docs_hint: None,
        }),
        Err(e) => Err(AppError::Validation {
            message: format!("Invalid JSON body: {e}"),
            field: Some("body".to_string()),
            docs_hint: None,
        }),
    }
}
