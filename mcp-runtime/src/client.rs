use std::time::Instant;

use channex_core::error::codes;
use reqwest::Method;
use serde_json::{Value, json};

use crate::config::{ConfigError, UpstreamConfig};
use crate::error::ToolError;
use crate::util::{normalize_api_path, parse_response_body};

/// Header the upstream authenticates on.
pub const API_KEY_HEADER: &str = "user-api-key";

/// Authenticated JSON client for the upstream REST API.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("channex-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, ToolError> {
        self.send(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ToolError> {
        self.send(Method::POST, path, &[], Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ToolError> {
        self.send(Method::PUT, path, &[], Some(body)).await
    }

    pub async fn delete(&self, path: &str, query: &[(String, String)]) -> Result<Value, ToolError> {
        self.send(Method::DELETE, path, query, None).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, ToolError> {
        let path = normalize_api_path(path)?;
        let mut url = reqwest::Url::parse(&format!("{}{}", self.base_url, path)).map_err(|e| {
            ToolError::validation(format!("Invalid upstream URL/path: {e}")).with_field("path")
        })?;
        if !query.is_empty() {
            let mut qp = url.query_pairs_mut();
            for (k, v) in query {
                qp.append_pair(k, v);
            }
        }

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(API_KEY_HEADER, &self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, %path, error = %e, "upstream request failed");
            let reason = if e.is_timeout() { "timed out" } else { "unreachable" };
            ToolError::upstream(
                codes::CONNECTION_ERROR,
                format!("Upstream API at {} {reason}: {e}", self.base_url),
            )
            .with_docs_hint("Check CHANNEX_BASE_URL and network access to the channel manager.")
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| {
            ToolError::upstream(
                codes::RESPONSE_ERROR,
                format!("Failed to read upstream response body: {e}"),
            )
            .with_status(status)
        })?;
        let body = parse_response_body(&bytes);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if (200..=299).contains(&status) {
            tracing::debug!(%method, %path, status, elapsed_ms, "upstream call");
            Ok(body)
        } else {
            tracing::warn!(%method, %path, status, elapsed_ms, "upstream returned error status");
            Err(upstream_error(status, body))
        }
    }
}

/// Normalize an upstream error envelope (`{"errors": {code, title, details}}`)
/// into a [`ToolError`] that keeps the upstream fields under `details`.
pub fn upstream_error(status: u16, body: Value) -> ToolError {
    let errors = body.get("errors").cloned();
    let title = errors
        .as_ref()
        .and_then(|e| e.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let upstream_code = errors
        .as_ref()
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let message = match (&title, &upstream_code) {
        (Some(title), _) => title.clone(),
        (None, Some(code)) => format!("Upstream rejected the request ({code})"),
        (None, None) => format!("Upstream returned HTTP {status}"),
    };

    let mut details = json!({ "status": status });
    match errors {
        Some(errors) => {
            if let Some(code) = upstream_code {
                details["upstream_code"] = Value::String(code);
            }
            if let Some(inner) = errors.get("details").filter(|d| !d.is_null()) {
                details["upstream_details"] = inner.clone();
            }
        }
        None if !body.is_null() => details["body"] = body,
        None => {}
    }

    ToolError::upstream(codes::UPSTREAM_ERROR, message)
        .with_status(status)
        .with_details(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn client_for(base_url: String) -> UpstreamClient {
        UpstreamClient::new(&UpstreamConfig {
            base_url,
            api_key: "test-key".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sends_api_key_header_and_query() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/properties")
                    .header(API_KEY_HEADER, "test-key")
                    .query_param("pagination[page]", "2");
                then.status(200).json_body(json!({ "data": [], "meta": { "page": 2 } }));
            })
            .await;

        let client = client_for(server.url("/api/v1"));
        let body = client
            .get("/properties", &[("pagination[page]".to_string(), "2".to_string())])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body["meta"]["page"], 2);
    }

    #[tokio::test]
    async fn upstream_error_envelope_is_normalized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/properties");
                then.status(422).json_body(json!({
                    "errors": {
                        "code": "validation_error",
                        "title": "Validation Error",
                        "details": { "currency": ["is invalid"] }
                    }
                }));
            })
            .await;

        let client = client_for(server.base_url());
        let err = client
            .post("/properties", &json!({ "property": {} }))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Upstream);
        assert_eq!(err.code, "upstream_error");
        assert_eq!(err.status, Some(422));
        assert_eq!(err.message, "Validation Error");
        let details = err.details.unwrap();
        assert_eq!(details["upstream_code"], "validation_error");
        assert_eq!(details["upstream_details"]["currency"][0], "is invalid");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_connection_error() {
        let client = client_for("http://127.0.0.1:9".to_string());
        let err = client.get("/properties", &[]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Upstream);
        assert_eq!(err.code, "connection_error");
        assert_eq!(err.status, None);
    }

    #[test]
    fn non_envelope_error_bodies_are_kept() {
        let err = upstream_error(500, json!("Internal Server Error"));
        assert_eq!(err.message, "Upstream returned HTTP 500");
        assert_eq!(err.details.unwrap()["body"], "Internal Server Error");
    }
}
