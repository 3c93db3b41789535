//! One-to-one wrappers over upstream endpoints.
//!
//! Each module adds methods to [`UpstreamClient`](crate::client::UpstreamClient)
//! and defines the typed parameters its tools deserialize into.

pub mod ari;
pub mod channels;
pub mod properties;
pub mod rate_plans;
pub mod room_types;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ToolError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// `pagination[page]` / `pagination[limit]`, always sent with defaults.
pub(crate) fn pagination_query(page: Option<u32>, limit: Option<u32>) -> Vec<(String, String)> {
    vec![
        (
            "pagination[page]".to_string(),
            page.unwrap_or(DEFAULT_PAGE).to_string(),
        ),
        (
            "pagination[limit]".to_string(),
            limit.unwrap_or(DEFAULT_LIMIT).to_string(),
        ),
    ]
}

pub(crate) fn push_filter(query: &mut Vec<(String, String)>, key: &str, value: Option<impl ToString>) {
    if let Some(value) = value {
        query.push((format!("filter[{key}]"), value.to_string()));
    }
}

pub(crate) fn force_query(force: bool) -> Vec<(String, String)> {
    if force {
        vec![("force".to_string(), "true".to_string())]
    } else {
        Vec::new()
    }
}

/// Parameters shared by every `get`/`delete`-by-id tool.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdParams {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteParams {
    pub id: String,
    #[serde(default)]
    pub force: bool,
}

/// Partial update: `data` is forwarded as-is under the resource's envelope key.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateParams {
    pub id: String,
    pub data: Map<String, Value>,
}

impl UpdateParams {
    pub(crate) fn non_empty_data(&self) -> Result<Value, ToolError> {
        if self.data.is_empty() {
            return Err(
                ToolError::validation("'data' must contain at least one field to update")
                    .with_field("data"),
            );
        }
        Ok(Value::Object(self.data.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_are_always_sent() {
        assert_eq!(
            pagination_query(None, Some(25)),
            vec![
                ("pagination[page]".to_string(), "1".to_string()),
                ("pagination[limit]".to_string(), "25".to_string()),
            ]
        );
    }

    #[test]
    fn empty_update_data_is_rejected() {
        let params = UpdateParams {
            id: "p1".to_string(),
            data: Map::new(),
        };
        assert_eq!(params.non_empty_data().unwrap_err().field.as_deref(), Some("data"));
    }
}
