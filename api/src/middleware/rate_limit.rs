use axum::http::Response;
use channex_core::error::{ErrorDetail, codes};
use tower_governor::{
    GovernorError, GovernorLayer, governor::GovernorConfigBuilder,
    key_extractor::SmartIpKeyExtractor,
};

pub type RateLimitLayer =
    GovernorLayer<SmartIpKeyExtractor, governor::middleware::NoOpMiddleware, axum::body::Body>;

/// Rate limit for /api/v1: 100 requests per 15 minutes per IP.
pub fn api_layer() -> RateLimitLayer {
    GovernorLayer::new(
        GovernorConfigBuilder::default()
            .per_second(9) // 900s / 100 requests = one token every 9 seconds
            .burst_size(100)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("invalid governor config for api"),
    )
    .error_handler(json_error_handler)
}

/// JSON error body in the shared envelope, with `Retry-After`.
fn json_error_handler(err: GovernorError) -> Response<axum::body::Body> {
    let (status, retry_after, message) = match err {
        GovernorError::TooManyRequests { wait_time, .. } => (
            axum::http::StatusCode::TOO_MANY_REQUESTS,
            Some(wait_time),
            format!("Too many requests from this IP. Retry after {wait_time} seconds."),
        ),
        GovernorError::UnableToExtractKey => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            None,
            "Unable to determine client identity for rate limiting".to_string(),
        ),
        GovernorError::Other { code, msg, .. } => (code, None, msg.unwrap_or_default()),
    };

    let mut detail = ErrorDetail::new(codes::RATE_LIMITED, message);
    detail.request_id = Some(uuid::Uuid::now_v7().to_string());
    detail.timestamp = Some(chrono::Utc::now().to_rfc3339());
    let body = serde_json::json!({ "success": false, "error": detail });

    let mut response = Response::new(axum::body::Body::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("application/json"),
    );
    if let Some(wait_time) = retry_after {
        response
            .headers_mut()
            .insert(axum::http::header::RETRY_AFTER, wait_time.into());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn too_many_requests_is_json_with_retry_after() {
        let response = json_error_handler(GovernorError::TooManyRequests {
            wait_time: 9,
            headers: None,
        });
        assert_eq!(response.status(), axum::http::StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "9");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], codes::RATE_LIMITED);
    }
}
