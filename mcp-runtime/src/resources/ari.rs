use channex_core::ari::{self, DateFilterInput};
use serde::Deserialize;
use serde_json::Value;

use crate::client::UpstreamClient;
use crate::error::ToolError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetAvailabilityParams {
    pub property_id: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub date_gte: Option<String>,
    #[serde(default)]
    pub date_lte: Option<String>,
}

impl GetAvailabilityParams {
    fn dates(&self) -> DateFilterInput {
        DateFilterInput {
            date: self.date.clone(),
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            date_gte: self.date_gte.clone(),
            date_lte: self.date_lte.clone(),
        }
    }
}

/// Restriction names as a comma-separated string or an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RestrictionNames {
    Joined(String),
    List(Vec<String>),
}

impl RestrictionNames {
    fn as_slice(&self) -> Vec<&str> {
        match self {
            RestrictionNames::Joined(joined) => vec![joined.as_str()],
            RestrictionNames::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetRestrictionsParams {
    pub property_id: String,
    pub restrictions: RestrictionNames,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub date_gte: Option<String>,
    #[serde(default)]
    pub date_lte: Option<String>,
}

impl GetRestrictionsParams {
    fn dates(&self) -> DateFilterInput {
        DateFilterInput {
            date: self.date.clone(),
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            date_gte: self.date_gte.clone(),
            date_lte: self.date_lte.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAriParams {
    pub values: Vec<Value>,
}

impl UpstreamClient {
    pub async fn get_availability(&self, params: &GetAvailabilityParams) -> Result<Value, ToolError> {
        let query = ari::availability_query(&params.property_id, &params.dates())?;
        self.get("/availability", &query).await
    }

    pub async fn get_restrictions(&self, params: &GetRestrictionsParams) -> Result<Value, ToolError> {
        let kinds = ari::parse_restrictions(&params.restrictions.as_slice())?;
        let query = ari::restrictions_query(&params.property_id, &kinds, &params.dates())?;
        self.get("/restrictions", &query).await
    }

    /// Validates the whole batch before a single byte goes upstream.
    pub async fn update_ari(&self, params: &UpdateAriParams) -> Result<Value, ToolError> {
        let payload = ari::build_update_payload(&params.values)?;
        tracing::debug!(records = params.values.len(), "submitting ARI batch");
        self.post("/ari", &payload).await
    }
}
