//! Tool registry and dispatch shared by the HTTP and MCP surfaces.

pub mod definitions;

use std::time::Instant;

use channex_core::error::codes;
use channex_core::shaping::{ShapingPolicy, TruncationLimits, TruncationNote, shape_response};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::client::UpstreamClient;
use crate::config::{ConfigError, RuntimeConfig};
use crate::error::{ErrorKind, ToolError};
use crate::resources::ari::{GetAvailabilityParams, GetRestrictionsParams, UpdateAriParams};
use crate::resources::channels::{
    ChannelByCodeParams, ChannelIdParams, CheckConnectionParams, CreateChannelParams,
    ListChannelsParams, UpdateListingParams, UpdateMappingParams,
};
use crate::resources::properties::{CreatePropertyParams, ListPropertiesParams};
use crate::resources::rate_plans::{CreateRatePlanParams, ListRatePlansParams, RatePlanOptionsParams};
use crate::resources::room_types::{CreateRoomTypeParams, ListRoomTypesParams};
use crate::resources::{DeleteParams, IdParams, UpdateParams};
use crate::util::{arg_optional_bool, arg_optional_u64, parse_args};

pub use definitions::{Category, ToolDefinition, find_tool, suggest_tool, tool_definitions};

const SHAPING_ARGS: [&str; 3] = ["truncate", "max_depth", "max_array_length"];

/// Result of a successful tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub data: Value,
    pub truncation: Option<TruncationNote>,
}

impl ToolOutput {
    /// Plain data, or `{data, truncation}` when the governor removed anything.
    pub fn to_value(&self) -> Value {
        match &self.truncation {
            None => self.data.clone(),
            Some(note) => json!({ "data": self.data, "truncation": note }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub tool: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub id: Option<String>,
}

/// One entry of a batch response; exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct BatchItemResult {
    pub id: String,
    pub tool: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListToolsParams {
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ToolRuntime {
    client: UpstreamClient,
    shaping: ShapingPolicy,
}

impl ToolRuntime {
    pub fn new(client: UpstreamClient, shaping: ShapingPolicy) -> Self {
        Self { client, shaping }
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(UpstreamClient::new(&config.upstream)?, config.shaping))
    }

    pub fn client(&self) -> &UpstreamClient {
        &self.client
    }

    pub async fn execute(
        &self,
        name: &str,
        mut args: Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let definition = find_tool(name).ok_or_else(|| unknown_tool(name))?;
        let explicit = if definition.read_only {
            take_shaping_args(&mut args)?
        } else {
            None
        };

        let started = Instant::now();
        let outcome = self.dispatch(definition.name, &args).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => tracing::info!(tool = name, duration_ms, "tool call succeeded"),
            Err(err) => tracing::warn!(
                tool = name,
                duration_ms,
                code = %err.code,
                "tool call failed"
            ),
        }
        let data = outcome?;

        if definition.category == Category::System {
            return Ok(ToolOutput {
                data,
                truncation: None,
            });
        }
        let (data, truncation) = shape_response(data, self.shaping, explicit);
        if let Some(note) = &truncation {
            tracing::debug!(
                tool = name,
                original_chars = note.original_chars,
                shaped_chars = note.shaped_chars,
                "response truncated"
            );
        }
        Ok(ToolOutput { data, truncation })
    }

    /// Runs every request concurrently. One failing item never affects the others.
    pub async fn execute_batch(&self, requests: Vec<BatchRequest>) -> Vec<BatchItemResult> {
        let calls = requests.into_iter().enumerate().map(|(index, request)| async move {
            let id = request.id.unwrap_or_else(|| index.to_string());
            match self.execute(&request.tool, request.params).await {
                Ok(output) => BatchItemResult {
                    id,
                    tool: request.tool,
                    success: true,
                    result: Some(output.to_value()),
                    error: None,
                },
                Err(err) => BatchItemResult {
                    id,
                    tool: request.tool,
                    success: false,
                    result: None,
                    error: Some(err.to_value()["error"].clone()),
                },
            }
        });
        join_all(calls).await
    }

    async fn dispatch(&self, name: &str, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let client = &self.client;
        match name {
            "channex_list_properties" => {
                client
                    .list_properties(&parse_args::<ListPropertiesParams>(name, args)?)
                    .await
            }
            "channex_get_property" => {
                client
                    .get_property(&parse_args::<IdParams>(name, args)?.id)
                    .await
            }
            "channex_create_property" => {
                client
                    .create_property(&parse_args::<CreatePropertyParams>(name, args)?)
                    .await
            }
            "channex_update_property" => {
                client
                    .update_property(&parse_args::<UpdateParams>(name, args)?)
                    .await
            }
            "channex_delete_property" => {
                client
                    .delete_property(&parse_args::<DeleteParams>(name, args)?)
                    .await
            }
            "channex_get_property_options" => {
                parse_args::<Empty>(name, args)?;
                client.property_options().await
            }

            "channex_list_room_types" => {
                client
                    .list_room_types(&parse_args::<ListRoomTypesParams>(name, args)?)
                    .await
            }
            "channex_get_room_type" => {
                client
                    .get_room_type(&parse_args::<IdParams>(name, args)?.id)
                    .await
            }
            "channex_create_room_type" => {
                client
                    .create_room_type(&parse_args::<CreateRoomTypeParams>(name, args)?)
                    .await
            }
            "channex_update_room_type" => {
                client
                    .update_room_type(&parse_args::<UpdateParams>(name, args)?)
                    .await
            }
            "channex_delete_room_type" => {
                client
                    .delete_room_type(&parse_args::<DeleteParams>(name, args)?)
                    .await
            }
            "channex_get_room_type_options" => {
                parse_args::<Empty>(name, args)?;
                client.room_type_options().await
            }

            "channex_list_rate_plans" => {
                client
                    .list_rate_plans(&parse_args::<ListRatePlansParams>(name, args)?)
                    .await
            }
            "channex_get_rate_plan" => {
                client
                    .get_rate_plan(&parse_args::<IdParams>(name, args)?.id)
                    .await
            }
            "channex_create_rate_plan" => {
                client
                    .create_rate_plan(&parse_args::<CreateRatePlanParams>(name, args)?)
                    .await
            }
            "channex_update_rate_plan" => {
                client
                    .update_rate_plan(&parse_args::<UpdateParams>(name, args)?)
                    .await
            }
            "channex_delete_rate_plan" => {
                client
                    .delete_rate_plan(&parse_args::<DeleteParams>(name, args)?)
                    .await
            }
            "channex_get_rate_plan_options" => {
                client
                    .rate_plan_options(&parse_args::<RatePlanOptionsParams>(name, args)?)
                    .await
            }

            "channex_get_availability" => {
                client
                    .get_availability(&parse_args::<GetAvailabilityParams>(name, args)?)
                    .await
            }
            "channex_get_restrictions" => {
                client
                    .get_restrictions(&parse_args::<GetRestrictionsParams>(name, args)?)
                    .await
            }
            "channex_update_ari" => {
                client
                    .update_ari(&parse_args::<UpdateAriParams>(name, args)?)
                    .await
            }

            "channex_test_channel_api" => {
                parse_args::<Empty>(name, args)?;
                let results = client.test_channel_access().await;
                let accessible = results.values().filter(|r| r.accessible).count();
                Ok(json!({
                    "base_url": client.base_url(),
                    "accessible_endpoints": accessible,
                    "results": results,
                }))
            }
            "channex_check_existing_connection" => {
                client
                    .check_existing_connection(&parse_args::<CheckConnectionParams>(name, args)?)
                    .await
            }
            "channex_list_channels" => {
                client
                    .list_channels(&parse_args::<ListChannelsParams>(name, args)?)
                    .await
            }
            "channex_get_channel_by_code" => {
                client
                    .get_channels_by_code(&parse_args::<ChannelByCodeParams>(name, args)?)
                    .await
            }
            "channex_get_channel" => {
                client
                    .get_channel(&parse_args::<IdParams>(name, args)?.id)
                    .await
            }
            "channex_create_channel" => {
                client
                    .create_channel(&parse_args::<CreateChannelParams>(name, args)?)
                    .await
            }
            "channex_update_channel" => {
                client
                    .update_channel(&parse_args::<UpdateParams>(name, args)?)
                    .await
            }
            "channex_delete_channel" => {
                client
                    .delete_channel(&parse_args::<IdParams>(name, args)?.id)
                    .await
            }
            "channex_get_channel_mappings" => {
                client
                    .get_channel_mappings(&parse_args::<ChannelIdParams>(name, args)?.channel_id)
                    .await
            }
            "channex_update_channel_mapping" => {
                client
                    .update_channel_mapping(&parse_args::<UpdateMappingParams>(name, args)?)
                    .await
            }
            "channex_get_airbnb_listings" => {
                client
                    .get_airbnb_listings(&parse_args::<ChannelIdParams>(name, args)?.channel_id)
                    .await
            }
            "channex_update_airbnb_listing" => {
                client
                    .update_airbnb_listing(&parse_args::<UpdateListingParams>(name, args)?)
                    .await
            }

            "channex_list_tools" => {
                let params = parse_args::<ListToolsParams>(name, args)?;
                tool_catalog(params.category.as_deref())
            }

            other => Err(unknown_tool(other)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Empty {}

fn unknown_tool(name: &str) -> ToolError {
    let mut err = ToolError::not_found(format!("Unknown tool '{name}'"))
        .with_docs_hint("Call channex_list_tools to see every available tool.");
    if let Some(suggestion) = suggest_tool(name) {
        err = err
            .with_details(json!({ "suggestion": suggestion }))
            .with_docs_hint(format!("Did you mean '{suggestion}'?"));
    }
    err
}

/// Removes the shaping arguments so the typed params never see them.
/// `max_depth` or `max_array_length` alone imply `truncate: true`;
/// an explicit `truncate: false` wins.
fn take_shaping_args(args: &mut Map<String, Value>) -> Result<Option<TruncationLimits>, ToolError> {
    let truncate = arg_optional_bool(args, "truncate")?;
    let max_depth = arg_optional_u64(args, "max_depth")?;
    let max_array_length = arg_optional_u64(args, "max_array_length")?;
    for key in SHAPING_ARGS {
        args.remove(key);
    }

    let wanted = truncate.unwrap_or(max_depth.is_some() || max_array_length.is_some());
    if !wanted {
        return Ok(None);
    }
    let defaults = TruncationLimits::DEFAULT;
    Ok(Some(TruncationLimits {
        max_depth: max_depth.map_or(defaults.max_depth, |v| v as usize),
        max_array_length: max_array_length.map_or(defaults.max_array_length, |v| v as usize),
    }))
}

/// Catalog grouped by category, optionally restricted to one.
pub fn tool_catalog(category: Option<&str>) -> Result<Value, ToolError> {
    let selected: Vec<Category> = match category.map(str::trim).filter(|c| !c.is_empty()) {
        None => Category::ALL.to_vec(),
        Some(raw) => match Category::parse(raw) {
            Some(category) => vec![category],
            None => {
                let valid: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
                return Err(ToolError::new(
                    ErrorKind::Validation,
                    codes::INVALID_CATEGORY,
                    format!("Unknown category '{raw}'. Valid categories: {}", valid.join(", ")),
                )
                .with_field("category")
                .with_details(json!({ "valid_categories": valid })));
            }
        },
    };

    let categories: Vec<Value> = selected
        .into_iter()
        .map(|category| {
            let tools: Vec<Value> = tool_definitions()
                .iter()
                .filter(|tool| tool.category == category)
                .map(ToolDefinition::to_value)
                .collect();
            json!({
                "name": category.as_str(),
                "title": category.title(),
                "description": category.description(),
                "tool_count": tools.len(),
                "tools": tools,
            })
        })
        .collect();
    let total: usize = categories
        .iter()
        .map(|c| c["tool_count"].as_u64().unwrap_or(0) as usize)
        .sum();

    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "total_tools": total,
        "categories": categories,
    }))
}
