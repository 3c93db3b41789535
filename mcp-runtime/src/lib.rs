//! Channex upstream client, typed resource wrappers, tool registry and the
//! MCP JSON-RPC server shared by the `channex-mcp` binary and the HTTP API.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tokio::io::{self, BufReader};

pub mod client;
pub mod config;
pub mod error;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;
mod util;

pub use client::UpstreamClient;
pub use config::{ConfigError, RuntimeConfig, UpstreamConfig};
pub use error::{ErrorKind, ToolError};
pub use server::McpServer;
pub use tools::{BatchItemResult, BatchRequest, ToolOutput, ToolRuntime};
pub use util::to_pretty_json;

use config::{ENV_API_KEY, ENV_AUTO_TRUNCATE_CHARS, ENV_BASE_URL, ENV_TIMEOUT_SECS};

#[derive(Subcommand)]
pub enum McpCommands {
    /// Run the Channex MCP server over stdio
    Serve(McpServeArgs),
    /// Print the tool catalog as JSON (no upstream call)
    Tools(McpToolsArgs),
}

#[derive(Args, Clone, Debug)]
pub struct McpServeArgs {
    /// Channex API key sent as `user-api-key`
    #[arg(long, env = "CHANNEX_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Upstream base URL
    #[arg(long, env = "CHANNEX_BASE_URL")]
    pub base_url: Option<String>,
    /// Upstream request timeout in seconds
    #[arg(long, env = "CHANNEX_TIMEOUT_SECS")]
    pub timeout_secs: Option<String>,
    /// Serialized size above which responses are truncated automatically
    #[arg(long, env = "CHANNEX_AUTO_TRUNCATE_CHARS")]
    pub auto_truncate_chars: Option<String>,
}

impl McpServeArgs {
    pub fn to_config(&self) -> Result<RuntimeConfig, ConfigError> {
        RuntimeConfig::from_lookup(|name| match name {
            ENV_API_KEY => self.api_key.clone(),
            ENV_BASE_URL => self.base_url.clone(),
            ENV_TIMEOUT_SECS => self.timeout_secs.clone(),
            ENV_AUTO_TRUNCATE_CHARS => self.auto_truncate_chars.clone(),
            _ => None,
        })
    }
}

#[derive(Args, Clone, Debug)]
pub struct McpToolsArgs {
    /// Only print tools in this category
    #[arg(long)]
    pub category: Option<String>,
}

pub async fn run(command: McpCommands) -> i32 {
    match command {
        McpCommands::Serve(args) => {
            let runtime = match args.to_config().and_then(|c| ToolRuntime::from_config(&c)) {
                Ok(runtime) => runtime,
                Err(err) => {
                    let payload = json!({
                        "error": "config_error",
                        "message": err.to_string(),
                    });
                    eprintln!("{}", to_pretty_json(&payload));
                    return 1;
                }
            };
            tracing::info!(
                base_url = runtime.client().base_url(),
                version = env!("CARGO_PKG_VERSION"),
                "starting MCP server on stdio"
            );

            let server = McpServer::new(Arc::new(runtime));
            let mut reader = BufReader::new(io::stdin());
            let mut stdout = io::stdout();
            match server.serve(&mut reader, &mut stdout).await {
                Ok(()) => 0,
                Err(err) => {
                    let payload = json!({
                        "error": "mcp_server_error",
                        "message": err,
                    });
                    eprintln!("{}", to_pretty_json(&payload));
                    1
                }
            }
        }
        McpCommands::Tools(args) => match tools::tool_catalog(args.category.as_deref()) {
            Ok(catalog) => {
                println!("{}", to_pretty_json(&catalog));
                0
            }
            Err(err) => {
                eprintln!("{}", to_pretty_json(&err.to_value()));
                1
            }
        },
    }
}

/// Answer one JSON-RPC payload (single or batch) received over HTTP.
pub async fn handle_http_jsonrpc(runtime: Arc<ToolRuntime>, incoming: Value) -> Vec<Value> {
    McpServer::new(runtime).handle_incoming_message(incoming).await
}
