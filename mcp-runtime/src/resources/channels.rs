use std::collections::BTreeMap;

use channex_core::shaping::{TruncationLimits, essential_channel_fields, truncate};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::push_filter;
use crate::client::UpstreamClient;
use crate::error::ToolError;
use crate::util::path_segment;

/// Endpoints probed by [`UpstreamClient::test_channel_access`].
pub const CHANNEL_PROBE_ENDPOINTS: [&str; 3] = ["/channels", "/channel_types", "/channel_connections"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListChannelsParams {
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub channel_code: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    /// Attribute names to keep on each channel.
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelByCodeParams {
    pub channel_code: String,
    #[serde(default)]
    pub property_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConnectionParams {
    pub channel_code: String,
    pub property_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChannelParams {
    pub channel_code: String,
    pub title: String,
    pub property_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelIdParams {
    pub channel_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMappingParams {
    pub channel_id: String,
    pub mapping_id: String,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateListingParams {
    pub channel_id: String,
    pub listing_id: String,
    pub settings: ListingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ListingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_settings: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_settings: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// 403 from the upstream means the account lacks white-label channel access.
    pub requires_whitelabel: bool,
}

impl UpstreamClient {
    /// Probe every channel endpoint concurrently; failures are reported per
    /// endpoint, never raised.
    pub async fn test_channel_access(&self) -> BTreeMap<String, ProbeResult> {
        let probes = CHANNEL_PROBE_ENDPOINTS
            .iter()
            .map(|endpoint| async move { (*endpoint, self.get(endpoint, &[]).await) });

        join_all(probes)
            .await
            .into_iter()
            .map(|(endpoint, outcome)| {
                let result = match outcome {
                    Ok(data) => ProbeResult {
                        accessible: true,
                        status: Some(200),
                        data: Some(data),
                        error: None,
                        requires_whitelabel: false,
                    },
                    Err(err) => ProbeResult {
                        accessible: false,
                        status: err.status,
                        data: None,
                        requires_whitelabel: err.status == Some(403),
                        error: Some(err.to_value()["error"].clone()),
                    },
                };
                (endpoint.to_string(), result)
            })
            .collect()
    }

    pub async fn list_channels(&self, params: &ListChannelsParams) -> Result<Value, ToolError> {
        let mut query = Vec::new();
        if let Some(page) = params.page {
            query.push(("page[number]".to_string(), page.to_string()));
        }
        if let Some(limit) = params.limit {
            query.push(("page[size]".to_string(), limit.to_string()));
        }
        push_filter(&mut query, "property_id", params.property_id.as_deref());
        push_filter(&mut query, "channel_code", params.channel_code.as_deref());
        push_filter(&mut query, "is_active", params.is_active);

        let body = self.get("/channels", &query).await?;
        match params.fields.as_deref() {
            Some(fields) if !fields.is_empty() => Ok(project_channel_fields(body, fields)),
            _ => Ok(body),
        }
    }

    /// Channels with the given code, reduced to identifying fields.
    pub async fn get_channels_by_code(&self, params: &ChannelByCodeParams) -> Result<Value, ToolError> {
        let code = required_code(&params.channel_code)?;
        let channels = self
            .channels_with_code(&code, params.property_id.as_deref())
            .await?;
        let slim: Vec<Value> = channels
            .iter()
            .map(slim_channel)
            .collect();
        let count = slim.len();
        Ok(json!({
            "data": slim,
            "meta": { "channel_code": code, "count": count }
        }))
    }

    /// Which of the given properties already have a channel with this code.
    pub async fn check_existing_connection(
        &self,
        params: &CheckConnectionParams,
    ) -> Result<Value, ToolError> {
        let code = required_code(&params.channel_code)?;
        if params.property_ids.is_empty() {
            return Err(
                ToolError::validation("'property_ids' must contain at least one property")
                    .with_field("property_ids"),
            );
        }
        let channels = self.channels_with_code(&code, None).await?;

        let connections: Vec<Value> = params
            .property_ids
            .iter()
            .map(|property_id| {
                let channel_ids: Vec<Value> = channels
                    .iter()
                    .filter(|channel| channel_property_ids(channel).contains(&property_id.as_str()))
                    .filter_map(|channel| channel.get("id").cloned())
                    .collect();
                json!({
                    "property_id": property_id,
                    "connected": !channel_ids.is_empty(),
                    "channel_ids": channel_ids
                })
            })
            .collect();
        let any_connected = connections
            .iter()
            .any(|c| c["connected"].as_bool().unwrap_or(false));

        Ok(json!({
            "channel_code": code,
            "connected": any_connected,
            "connections": connections
        }))
    }

    pub async fn get_channel(&self, id: &str) -> Result<Value, ToolError> {
        let id = path_segment("id", id)?;
        self.get(&format!("/channels/{id}"), &[]).await
    }

    pub async fn create_channel(&self, params: &CreateChannelParams) -> Result<Value, ToolError> {
        required_code(&params.channel_code)?;
        if params.title.trim().is_empty() {
            return Err(ToolError::validation("'title' must not be empty").with_field("title"));
        }
        if params.property_ids.is_empty() {
            return Err(
                ToolError::validation("'property_ids' must contain at least one property")
                    .with_field("property_ids"),
            );
        }
        self.post("/channels", &json!({ "channel": params })).await
    }

    pub async fn update_channel(&self, params: &super::UpdateParams) -> Result<Value, ToolError> {
        let id = path_segment("id", &params.id)?;
        let data = params.non_empty_data()?;
        self.put(&format!("/channels/{id}"), &json!({ "channel": data }))
            .await
    }

    pub async fn delete_channel(&self, id: &str) -> Result<Value, ToolError> {
        let id = path_segment("id", id)?;
        self.delete(&format!("/channels/{id}"), &[]).await
    }

    pub async fn get_channel_mappings(&self, channel_id: &str) -> Result<Value, ToolError> {
        let channel_id = path_segment("channel_id", channel_id)?;
        self.get(&format!("/channels/{channel_id}/mappings"), &[])
            .await
    }

    pub async fn update_channel_mapping(&self, params: &UpdateMappingParams) -> Result<Value, ToolError> {
        let channel_id = path_segment("channel_id", &params.channel_id)?;
        let mapping_id = path_segment("mapping_id", &params.mapping_id)?;
        if params.data.is_empty() {
            return Err(
                ToolError::validation("'data' must contain at least one field to update")
                    .with_field("data"),
            );
        }
        self.put(
            &format!("/channels/{channel_id}/mappings/{mapping_id}"),
            &json!({ "mapping": params.data }),
        )
        .await
    }

    pub async fn get_airbnb_listings(&self, channel_id: &str) -> Result<Value, ToolError> {
        let channel_id = path_segment("channel_id", channel_id)?;
        self.get(&format!("/channels/{channel_id}/listings"), &[])
            .await
    }

    pub async fn update_airbnb_listing(&self, params: &UpdateListingParams) -> Result<Value, ToolError> {
        let channel_id = path_segment("channel_id", &params.channel_id)?;
        let listing_id = path_segment("listing_id", &params.listing_id)?;
        if params.settings.price_settings.is_none() && params.settings.availability_settings.is_none() {
            return Err(ToolError::validation(
                "'settings' needs price_settings and/or availability_settings",
            )
            .with_field("settings"));
        }
        self.put(
            &format!("/channels/{channel_id}/listings/{listing_id}"),
            &json!({ "listing": params.settings }),
        )
        .await
    }

    async fn channels_with_code(
        &self,
        code: &str,
        property_id: Option<&str>,
    ) -> Result<Vec<Value>, ToolError> {
        let mut query = Vec::new();
        push_filter(&mut query, "channel_code", Some(code));
        push_filter(&mut query, "property_id", property_id);
        let body = self.get("/channels", &query).await?;

        // The upstream filter is advisory; re-check locally.
        let channels = body
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(channels
            .into_iter()
            .filter(|channel| {
                channel
                    .get("attributes")
                    .and_then(|a| a.get("channel_code"))
                    .and_then(Value::as_str)
                    .is_some_and(|c| c.eq_ignore_ascii_case(code))
            })
            .filter(|channel| property_id.is_none_or(|p| channel_property_ids(channel).contains(&p)))
            .collect())
    }
}

fn required_code(raw: &str) -> Result<String, ToolError> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(
            ToolError::validation("'channel_code' must not be empty").with_field("channel_code"),
        );
    }
    Ok(code.to_string())
}

/// Property ids a channel is attached to, from attributes or relationships.
fn channel_property_ids(channel: &Value) -> Vec<&str> {
    let mut ids = Vec::new();
    if let Some(properties) = channel
        .get("attributes")
        .and_then(|a| a.get("properties"))
        .and_then(Value::as_array)
    {
        for entry in properties {
            match entry {
                Value::String(id) => ids.push(id.as_str()),
                Value::Object(obj) => {
                    if let Some(id) = obj.get("id").and_then(Value::as_str) {
                        ids.push(id);
                    }
                }
                _ => {}
            }
        }
    }
    if let Some(related) = channel
        .get("relationships")
        .and_then(|r| r.get("properties"))
        .and_then(|p| p.get("data"))
        .and_then(Value::as_array)
    {
        ids.extend(related.iter().filter_map(|r| r.get("id").and_then(Value::as_str)));
    }
    ids
}

/// Keep `id`, `type` and only the requested attributes on each channel.
fn project_channel_fields(mut body: Value, fields: &[String]) -> Value {
    let Some(items) = body.get_mut("data").and_then(Value::as_array_mut) else {
        return body;
    };
    for item in items.iter_mut() {
        let mut projected = Map::new();
        for key in ["id", "type"] {
            if let Some(value) = item.get(key) {
                projected.insert(key.to_string(), value.clone());
            }
        }
        let attributes: Map<String, Value> = item
            .get("attributes")
            .and_then(Value::as_object)
            .map(|attrs| {
                fields
                    .iter()
                    .filter_map(|f| attrs.get(f).map(|v| (f.clone(), v.clone())))
                    .collect()
            })
            .unwrap_or_default();
        projected.insert("attributes".to_string(), Value::Object(attributes));
        *item = Value::Object(projected);
    }
    body
}

/// Essential fields with arrays capped for the lookup. `settings_keys` is
/// exempt: every configured key name stays visible.
fn slim_channel(channel: &Value) -> Value {
    let mut essential = essential_channel_fields(channel);
    let settings_keys = essential
        .get_mut("attributes")
        .and_then(Value::as_object_mut)
        .and_then(|attributes| attributes.remove("settings_keys"));
    let mut slim = truncate(&essential, TruncationLimits::CHANNEL_LOOKUP);
    if let (Some(keys), Some(attributes)) = (
        settings_keys,
        slim.get_mut("attributes").and_then(Value::as_object_mut),
    ) {
        attributes.insert("settings_keys".to_string(), keys);
    }
    slim
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn client_for(base_url: String) -> UpstreamClient {
        UpstreamClient::new(&UpstreamConfig {
            base_url,
            api_key: "k".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn channel(id: &str, code: &str, properties: &[&str]) -> Value {
        json!({
            "id": id,
            "type": "channel",
            "attributes": {
                "channel_code": code,
                "title": format!("{code} {id}"),
                "is_active": true,
                "properties": properties,
                "settings": { "api_token": "secret", "hotel_id": "123" }
            }
        })
    }

    #[tokio::test]
    async fn access_check_flags_forbidden_endpoints() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/channels");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/channel_types");
                then.status(403)
                    .json_body(json!({ "errors": { "code": "forbidden", "title": "Forbidden" } }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/channel_connections");
                then.status(404).json_body(json!({ "errors": { "code": "not_found", "title": "Not Found" } }));
            })
            .await;

        let results = client_for(server.base_url()).test_channel_access().await;
        assert_eq!(results.len(), 3);
        assert!(results["/channels"].accessible);
        assert!(!results["/channel_types"].accessible);
        assert!(results["/channel_types"].requires_whitelabel);
        assert_eq!(results["/channel_connections"].status, Some(404));
        assert!(!results["/channel_connections"].requires_whitelabel);
    }

    #[tokio::test]
    async fn list_channels_uses_page_params_and_projects_fields() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/channels")
                    .query_param("page[number]", "2")
                    .query_param("page[size]", "5");
                then.status(200)
                    .json_body(json!({ "data": [channel("c1", "ABB", &["p1"])] }));
            })
            .await;

        let params = ListChannelsParams {
            page: Some(2),
            limit: Some(5),
            fields: Some(vec!["title".to_string()]),
            ..Default::default()
        };
        let body = client_for(server.base_url())
            .list_channels(&params)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(
            body["data"][0],
            json!({ "id": "c1", "type": "channel", "attributes": { "title": "ABB c1" } })
        );
    }

    #[tokio::test]
    async fn by_code_returns_essential_fields_only() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/channels")
                    .query_param("filter[channel_code]", "ABB");
                then.status(200).json_body(json!({ "data": [
                    channel("c1", "ABB", &["p1"]),
                    channel("c2", "BDC", &["p1"])
                ]}));
            })
            .await;

        let body = client_for(server.base_url())
            .get_channels_by_code(&ChannelByCodeParams {
                channel_code: "ABB".to_string(),
                property_id: None,
            })
            .await
            .unwrap();
        assert_eq!(body["meta"]["count"], 1);
        let first = &body["data"][0];
        assert_eq!(first["id"], "c1");
        assert!(first["attributes"].get("settings").is_none());
        assert_eq!(first["attributes"]["settings_keys"], json!(["api_token", "hotel_id"]));
    }

    #[tokio::test]
    async fn by_code_lists_every_settings_key() {
        let settings: Map<String, Value> = (0..200)
            .map(|i| (format!("setting_{i:03}"), json!(i)))
            .collect();
        let properties: Vec<String> = (0..30).map(|i| format!("p{i}")).collect();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/channels");
                then.status(200).json_body(json!({ "data": [{
                    "id": "c1",
                    "type": "channel",
                    "attributes": {
                        "channel_code": "ABB",
                        "title": "Airbnb",
                        "is_active": true,
                        "properties": properties,
                        "settings": settings
                    }
                }]}));
            })
            .await;

        let body = client_for(server.base_url())
            .get_channels_by_code(&ChannelByCodeParams {
                channel_code: "ABB".to_string(),
                property_id: None,
            })
            .await
            .unwrap();
        let attributes = &body["data"][0]["attributes"];
        let keys = attributes["settings_keys"].as_array().unwrap();
        assert_eq!(keys.len(), 200);
        assert!(keys.iter().all(Value::is_string));
        assert_eq!(keys[199], "setting_199");
        assert!(attributes.get("settings").is_none());

        // Other arrays still follow the lookup cap.
        let listed = attributes["properties"].as_array().unwrap();
        assert_eq!(listed.len(), 21);
        assert_eq!(listed[20], json!({ "truncated": true, "remaining": 10 }));
    }

    #[tokio::test]
    async fn existing_connections_are_reported_per_property() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/channels");
                then.status(200).json_body(json!({ "data": [
                    channel("c1", "ABB", &["p1", "p2"]),
                    channel("c3", "ABB", &["p2"])
                ]}));
            })
            .await;

        let body = client_for(server.base_url())
            .check_existing_connection(&CheckConnectionParams {
                channel_code: "ABB".to_string(),
                property_ids: vec!["p2".to_string(), "p9".to_string()],
            })
            .await
            .unwrap();
        assert_eq!(body["connected"], true);
        assert_eq!(body["connections"][0]["channel_ids"], json!(["c1", "c3"]));
        assert_eq!(body["connections"][1]["connected"], false);
    }

    #[tokio::test]
    async fn listing_update_requires_some_settings() {
        let params: UpdateListingParams = serde_json::from_value(json!({
            "channel_id": "c1",
            "listing_id": "l1",
            "settings": {}
        }))
        .unwrap();
        let err = client_for("http://127.0.0.1:9".to_string())
            .update_airbnb_listing(&params)
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("settings"));
    }
}
