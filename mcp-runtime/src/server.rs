use std::sync::Arc;

use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::tools::{ToolRuntime, tool_definitions};
use crate::transport::{Framing, read_frame, write_frame};

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "channex-mcp";

const INSTRUCTIONS: &str = "Tools for the Channex channel manager. Start with channex_list_properties to find property IDs, then room types and rate plans. Read tools accept truncate/max_depth/max_array_length to bound response size; large responses are truncated automatically and carry a truncation note. channex_update_ari validates the whole batch before anything is sent.";

#[derive(Debug)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(-32700, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(-32600, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(-32602, message)
    }
}

pub fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn error_response(id: Value, error: RpcError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    });
    if let Some(data) = error.data {
        payload["error"]["data"] = data;
    }
    payload
}

/// JSON-RPC dispatcher over a shared [`ToolRuntime`]. Stateless per message,
/// so the stdio loop and the HTTP endpoint share one implementation.
#[derive(Clone)]
pub struct McpServer {
    runtime: Arc<ToolRuntime>,
}

impl McpServer {
    pub fn new(runtime: Arc<ToolRuntime>) -> Self {
        Self { runtime }
    }

    pub async fn serve<R, W>(&self, reader: &mut R, writer: &mut W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let frame = read_frame(reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            let Some(frame) = frame else {
                break;
            };

            let responses = match serde_json::from_slice::<Value>(&frame.body) {
                Ok(incoming) => self.handle_incoming_message(incoming).await,
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unparseable MCP message");
                    vec![error_response(
                        Value::Null,
                        RpcError::parse_error(format!("Invalid JSON payload: {e}")),
                    )]
                }
            };
            for response in responses {
                write_response(writer, frame.framing, &response).await?;
            }
        }
        tracing::info!("stdin closed, MCP server stopping");
        Ok(())
    }

    pub async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        // A message without a method is a client response; nothing to answer.
        let method = obj.get("method").and_then(Value::as_str)?;

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        match obj.get("id").cloned() {
            Some(id) => {
                let result = self.handle_request(method, params).await;
                Some(match result {
                    Ok(payload) => success_response(id, payload),
                    Err(err) => error_response(id, err),
                })
            }
            None => {
                tracing::debug!(method, "ignoring notification");
                None
            }
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        // Tool failures are results, not protocol errors.
        Ok(match self.runtime.execute(name, args).await {
            Ok(output) => tool_result(&output.to_value(), false),
            Err(err) => tool_result(&err.to_value(), true),
        })
    }
}

async fn write_response<W>(writer: &mut W, framing: Framing, response: &Value) -> Result<(), String>
where
    W: AsyncWrite + Unpin,
{
    write_frame(writer, framing, response)
        .await
        .map_err(|e| format!("Failed to write MCP response: {e}"))
}

fn tool_result(payload: &Value, is_error: bool) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": crate::util::to_pretty_json(payload)
        }],
        "isError": is_error
    })
}

pub fn initialize_payload() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {
            "tools": {
                "listChanged": false
            },
            "resources": {
                "listChanged": false
            },
            "prompts": {
                "listChanged": false
            }
        },
        "serverInfo": {
            "name": MCP_SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "instructions": INSTRUCTIONS
    })
}

pub fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tool_definitions()
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}
