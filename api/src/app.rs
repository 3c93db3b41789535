use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::ApiDoc;
use crate::auth;
use crate::error::{self, AppError};
use crate::middleware::{rate_limit::RateLimitLayer, security_headers};
use crate::routes;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Full application router. `rate_limit` wraps only the `/api/v1` routes.
pub fn build_router(
    state: AppState,
    cors: CorsLayer,
    rate_limit: Option<RateLimitLayer>,
) -> Router {
    let require_key = from_fn_with_state(state.clone(), auth::require_api_key);

    let mut api = Router::new()
        .merge(routes::tools::router())
        .merge(routes::batch::router())
        .route_layer(require_key.clone());
    if let Some(layer) = rate_limit {
        api = api.layer(layer);
    }
    let mcp = routes::mcp_http::router().route_layer(require_key);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(api)
        .merge(mcp)
        .fallback(route_not_found)
        .layer(from_fn_with_state(state.clone(), error::redact_error_details))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(security_headers::apply))
                .layer(cors),
        )
        .with_state(state)
}

async fn route_not_found(uri: axum::http::Uri) -> AppError {
    AppError::NotFound {
        message: format!("No route for {}", uri.path()),
        docs_hint: Some("See /swagger-ui for the available endpoints.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use channex_core::shaping::ShapingPolicy;
    use channex_mcp_runtime::{ToolRuntime, UpstreamClient, UpstreamConfig};
    use httpmock::prelude::*;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::ApiKeyRegistry;
    use crate::middleware::cors::build_cors_layer;

    const KEY: &str = "test-key";

    fn app_with_upstream(base_url: &str) -> Router {
        app_for(base_url, false)
    }

    fn app_for(base_url: &str, production: bool) -> Router {
        let client = UpstreamClient::new(&UpstreamConfig {
            base_url: base_url.to_string(),
            api_key: "upstream-key".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        let state = AppState {
            runtime: Arc::new(ToolRuntime::new(client, ShapingPolicy::default())),
            api_keys: Arc::new(ApiKeyRegistry::parse(Some("test-key:u1:Tester"))),
            production,
        };
        build_router(state, build_cors_layer(None), None)
    }

    fn app() -> Router {
        app_with_upstream("http://127.0.0.1:9")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("user-api-key", KEY)
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("user-api-key", KEY)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn health_needs_no_key() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn missing_and_invalid_keys_are_rejected() {
        let req = Request::builder()
            .uri("/api/v1/tools")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "missing_api_key");

        let req = Request::builder()
            .uri("/api/v1/tools")
            .header("user-api-key", "nope")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "invalid_api_key");
    }

    #[tokio::test]
    async fn lists_and_describes_tools() {
        let (status, body) = send(app(), get("/api/v1/tools")).await;
        assert_eq!(status, StatusCode::OK);
        let count = body["data"].as_array().unwrap().len();
        assert_eq!(body["meta"]["count"], count);

        let (status, body) = send(app(), get("/api/v1/tools/channex_update_ari")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["category"], "ari");

        let (status, body) = send(app(), get("/api/v1/tools/channex_nothing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn executes_catalog_tool() {
        let req = post_json("/api/v1/tools/channex_list_tools", json!({ "category": "system" }));
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["categories"][0]["name"], "system");
        assert!(body.get("truncation").is_none());
    }

    #[tokio::test]
    async fn invalid_parameters_are_400() {
        let req = post_json(
            "/api/v1/tools/channex_get_availability",
            json!({ "property_id": "p1", "date_from": "2024-03-01" }),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "validation_failed");
        assert!(body["error"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_502() {
        let req = post_json("/api/v1/tools/channex_get_property", json!({ "id": "p1" }));
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "connection_error");
    }

    #[tokio::test]
    async fn upstream_status_is_forwarded() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/properties/missing")
                    .header("user-api-key", "upstream-key");
                then.status(404).json_body(json!({
                    "errors": { "code": "resource_not_found", "title": "Resource Not Found" }
                }));
            })
            .await;

        let req = post_json("/api/v1/tools/channex_get_property", json!({ "id": "missing" }));
        let (status, body) = send(app_with_upstream(&server.base_url()), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "upstream_error");
        assert_eq!(body["error"]["message"], "Resource Not Found");
    }

    #[tokio::test]
    async fn production_hides_upstream_details() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/properties/missing");
                then.status(404).json_body(json!({
                    "errors": { "code": "resource_not_found", "title": "Resource Not Found" }
                }));
            })
            .await;

        let req = || post_json("/api/v1/tools/channex_get_property", json!({ "id": "missing" }));
        let (_, body) = send(app_for(&server.base_url(), false), req()).await;
        assert_eq!(body["error"]["details"]["upstream_code"], "resource_not_found");

        let (status, body) = send(app_for(&server.base_url(), true), req()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].get("details").is_none());
        assert_eq!(body["error"]["message"], "Resource Not Found");
    }

    #[test]
    fn openapi_reuses_the_runtime_batch_result() {
        let doc = crate::ApiDoc::openapi();
        let schemas = &doc.components.as_ref().unwrap().schemas;
        assert!(schemas.contains_key("BatchItemResult"));
        assert!(schemas.contains_key("BatchResponse"));
    }

    #[tokio::test]
    async fn batch_isolates_the_failing_entry() {
        let req = post_json(
            "/api/v1/batch",
            json!({
                "requests": [
                    { "tool": "channex_list_tools", "params": {}, "id": "a" },
                    { "tool": "channex_unknown_tool", "params": {}, "id": "b" },
                    { "tool": "channex_list_tools", "id": "c" }
                ]
            }),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data[0]["success"], true);
        assert_eq!(data[1]["success"], false);
        assert_eq!(data[1]["id"], "b");
        assert_eq!(data[1]["error"]["code"], "not_found");
        assert_eq!(data[2]["success"], true);
    }

    #[tokio::test]
    async fn malformed_batch_is_400() {
        let req = post_json("/api/v1/batch", json!({ "calls": [] }));
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "requests");
    }

    #[tokio::test]
    async fn mcp_over_http_shares_the_dispatcher() {
        let req = post_json(
            "/mcp",
            json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }),
        );
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["result"]["tools"].as_array().unwrap().is_empty());

        let req = post_json(
            "/mcp",
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        );
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn mcp_parse_error_is_jsonrpc() {
        let req = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("user-api-key", KEY)
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], -32700);
        assert_eq!(body["id"], Value::Null);
    }

    #[tokio::test]
    async fn unknown_routes_are_json_404() {
        let (status, body) = send(app(), get("/api/v2/anything")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }
}
