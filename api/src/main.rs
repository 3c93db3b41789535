use std::net::SocketAddr;
use std::sync::Arc;

use channex_mcp_runtime::{RuntimeConfig, ToolRuntime};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

mod app;
mod auth;
mod config;
mod error;
mod extract;
mod middleware;
mod routes;
mod state;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Channex Bridge API",
        version = "0.1.0",
        description = "REST surface over the Channex channel manager: properties, room types, rate plans, ARI and OTA channels, with responses sized for LLM agents."
    ),
    paths(
        routes::health::health_check,
        routes::tools::list_tools,
        routes::tools::get_tool,
        routes::tools::execute_tool,
        routes::batch::execute_batch,
    ),
    components(schemas(
        HealthResponse,
        routes::tools::ToolListMeta,
        routes::tools::ToolListResponse,
        routes::tools::ToolResponse,
        routes::tools::ExecuteToolResponse,
        routes::batch::BatchItem,
        routes::batch::BatchBody,
        channex_mcp_runtime::BatchItemResult,
        routes::batch::BatchResponse,
        channex_core::error::ErrorBody,
        channex_core::error::ErrorDetail,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            utoipa::openapi::security::SecurityScheme::ApiKey(
                utoipa::openapi::security::ApiKey::Header(
                    utoipa::openapi::security::ApiKeyValue::new("user-api-key"),
                ),
            ),
        );
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// RFC 3339
    pub timestamp: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "channex_api=debug,channex_mcp_runtime=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let server_config = config::ServerConfig::from_env().expect("invalid server configuration");
    let runtime_config = RuntimeConfig::from_env().expect("invalid Channex configuration");

    let (api_keys, dev_key) = auth::ApiKeyRegistry::from_config(
        server_config.api_keys.as_deref(),
        server_config.production,
    );
    if let Some(key) = dev_key {
        // Shown once so a local developer can call the API; never logged in full.
        eprintln!("No API_KEYS configured. Development API key: {key}");
        tracing::warn!(
            key_prefix = %channex_core::auth::key_prefix(&key),
            "generated development API key"
        );
    } else if api_keys.is_empty() {
        tracing::warn!("no API keys configured; every /api and /mcp request will be rejected");
    } else {
        tracing::info!(count = api_keys.len(), "loaded API keys");
    }

    let runtime =
        ToolRuntime::from_config(&runtime_config).expect("failed to build Channex client");
    let app_state = state::AppState {
        runtime: Arc::new(runtime),
        api_keys: Arc::new(api_keys),
        production: server_config.production,
    };

    let cors_layer =
        middleware::cors::build_cors_layer(server_config.allowed_origins.as_deref());
    let app = app::build_router(
        app_state,
        cors_layer,
        Some(middleware::rate_limit::api_layer()),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!(
        production = server_config.production,
        upstream = %runtime_config.upstream.base_url,
        "Channex bridge API listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
