use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use channex_mcp_runtime::client::API_KEY_HEADER;

/// CORS for the configured origins, or any origin when none are configured.
///
/// Credentials are only allowed with an explicit origin list; browsers
/// reject credentialed wildcard responses.
pub fn build_cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static(API_KEY_HEADER),
            HeaderName::from_static("content-type"),
        ])
        .max_age(std::time::Duration::from_secs(3600));

    match allowed_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect();
            base.allow_origin(AllowOrigin::list(origins))
                .allow_credentials(true)
        }
        None => base.allow_origin(Any),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn ok() -> StatusCode {
        StatusCode::OK
    }

    async fn preflight(layer: CorsLayer, origin: &str) -> Option<HeaderValue> {
        let app = Router::new().route("/health", get(ok)).layer(layer);
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/health")
                    .header("origin", origin)
                    .header("access-control-request-method", "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        response
            .headers()
            .get("access-control-allow-origin")
            .cloned()
    }

    #[tokio::test]
    async fn listed_origin_is_echoed() {
        let origins = vec!["https://app.test".to_string()];
        let allowed = preflight(build_cors_layer(Some(&origins)), "https://app.test").await;
        assert_eq!(allowed.unwrap(), "https://app.test");

        let denied = preflight(build_cors_layer(Some(&origins)), "https://evil.test").await;
        assert!(denied.is_none());
    }

    #[tokio::test]
    async fn no_configuration_allows_any_origin() {
        let allowed = preflight(build_cors_layer(None), "https://anywhere.test").await;
        assert_eq!(allowed.unwrap(), "*");
    }
}
