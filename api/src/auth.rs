use std::collections::HashMap;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use channex_core::auth::{generate_dev_api_key, hash_token, key_prefix};
use channex_core::error::codes;
use channex_mcp_runtime::client::API_KEY_HEADER;

use crate::error::AppError;
use crate::state::AppState;

/// Caller identity resolved from the `user-api-key` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedClient {
    pub user_id: String,
    pub name: String,
}

/// Immutable key table, keyed by SHA-256 of the key. Built once at startup.
#[derive(Debug, Default)]
pub struct ApiKeyRegistry {
    by_hash: HashMap<String, AuthenticatedClient>,
}

impl ApiKeyRegistry {
    /// Parse `key:user_id:name` entries separated by commas. Entries missing
    /// any of the three parts are skipped.
    pub fn parse(raw: Option<&str>) -> Self {
        let mut by_hash = HashMap::new();
        for entry in raw.unwrap_or_default().split(',') {
            let mut parts = entry.trim().splitn(3, ':').map(str::trim);
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(user_id), Some(name))
                    if !key.is_empty() && !user_id.is_empty() && !name.is_empty() =>
                {
                    by_hash.insert(
                        hash_token(key),
                        AuthenticatedClient {
                            user_id: user_id.to_string(),
                            name: name.to_string(),
                        },
                    );
                }
                _ if entry.trim().is_empty() => {}
                _ => tracing::warn!("skipping malformed API_KEYS entry"),
            }
        }
        Self { by_hash }
    }

    /// Registry for startup: configured keys, plus a generated development
    /// key when none are configured outside production. Returns the dev key
    /// so it can be shown once.
    pub fn from_config(raw: Option<&str>, production: bool) -> (Self, Option<String>) {
        let mut registry = Self::parse(raw);
        if !registry.is_empty() || production {
            return (registry, None);
        }
        let (key, hash) = generate_dev_api_key();
        registry.by_hash.insert(
            hash,
            AuthenticatedClient {
                user_id: "dev_user".to_string(),
                name: "Development User".to_string(),
            },
        );
        (registry, Some(key))
    }

    pub fn authenticate(&self, key: &str) -> Option<&AuthenticatedClient> {
        self.by_hash.get(&hash_token(key))
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

/// Rejects requests without a known `user-api-key` and stores the caller in
/// request extensions.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned);

    let Some(key) = key else {
        tracing::warn!(path = %req.uri().path(), "request without API key");
        return AppError::Unauthorized {
            code: codes::MISSING_API_KEY,
            message: "API key is required. Provide it in the user-api-key header.".to_string(),
            docs_hint: None,
        }
        .into_response();
    };

    let Some(client) = state.api_keys.authenticate(&key).cloned() else {
        tracing::warn!(key_prefix = %key_prefix(&key), "rejected unknown API key");
        return AppError::Unauthorized {
            code: codes::INVALID_API_KEY,
            message: "Invalid API key provided.".to_string(),
            docs_hint: Some("Check the key against the API_KEYS configuration.".to_string()),
        }
        .into_response();
    };

    tracing::info!(
        user_id = %client.user_id,
        method = %req.method(),
        path = %req.uri().path(),
        "authenticated API call"
    );
    req.extensions_mut().insert(client);
    next.run(req).await
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedClient {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedClient>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized {
                code: codes::UNAUTHORIZED,
                message: "Request was not authenticated".to_string(),
                docs_hint: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_entries_only() {
        let registry = ApiKeyRegistry::parse(Some("k1:u1:Alice, k2:u2 ,k3:u3:Ops Team,,"));
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.authenticate("k3"),
            Some(&AuthenticatedClient {
                user_id: "u3".to_string(),
                name: "Ops Team".to_string(),
            })
        );
        assert!(registry.authenticate("k2").is_none());
    }

    #[test]
    fn keys_are_stored_hashed() {
        let registry = ApiKeyRegistry::parse(Some("secret:u1:Alice"));
        assert!(!registry.by_hash.contains_key("secret"));
        assert!(registry.by_hash.contains_key(&hash_token("secret")));
    }

    #[test]
    fn dev_key_only_outside_production_and_without_keys() {
        let (registry, dev_key) = ApiKeyRegistry::from_config(None, false);
        let dev_key = dev_key.unwrap();
        assert_eq!(registry.authenticate(&dev_key).unwrap().user_id, "dev_user");

        let (registry, dev_key) = ApiKeyRegistry::from_config(None, true);
        assert!(registry.is_empty());
        assert!(dev_key.is_none());

        let (registry, dev_key) = ApiKeyRegistry::from_config(Some("k:u:n"), false);
        assert_eq!(registry.len(), 1);
        assert!(dev_key.is_none());
    }
}
