use std::sync::Arc;

use channex_mcp_runtime::ToolRuntime;

use crate::auth::ApiKeyRegistry;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ToolRuntime>,
    pub api_keys: Arc<ApiKeyRegistry>,
    /// Hides error `details` from HTTP responses.
    pub production: bool,
}
