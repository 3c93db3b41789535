use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{DeleteParams, UpdateParams, force_query, pagination_query, push_filter};
use crate::client::UpstreamClient;
use crate::error::ToolError;
use crate::util::path_segment;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListPropertiesParams {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub filter: Option<PropertyFilter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyFilter {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePropertyParams {
    pub title: String,
    /// ISO 4217 code.
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    /// ISO 3166-1 alpha-2 code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facilities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

impl CreatePropertyParams {
    fn validate(&self) -> Result<(), ToolError> {
        if self.title.trim().is_empty() {
            return Err(ToolError::validation("'title' must not be empty").with_field("title"));
        }
        if self.currency.chars().count() != 3 {
            return Err(
                ToolError::validation("'currency' must be a 3-letter ISO 4217 code")
                    .with_field("currency"),
            );
        }
        if let Some(country) = &self.country {
            if country.chars().count() != 2 {
                return Err(
                    ToolError::validation("'country' must be a 2-letter ISO 3166 code")
                        .with_field("country"),
                );
            }
        }
        Ok(())
    }
}

impl UpstreamClient {
    pub async fn list_properties(&self, params: &ListPropertiesParams) -> Result<Value, ToolError> {
        let mut query = pagination_query(params.page, params.limit);
        if let Some(filter) = &params.filter {
            push_filter(&mut query, "id", filter.id.as_deref());
            push_filter(&mut query, "title", filter.title.as_deref());
            push_filter(&mut query, "is_active", filter.is_active);
        }
        self.get("/properties", &query).await
    }

    pub async fn get_property(&self, id: &str) -> Result<Value, ToolError> {
        let id = path_segment("id", id)?;
        self.get(&format!("/properties/{id}"), &[]).await
    }

    pub async fn create_property(&self, params: &CreatePropertyParams) -> Result<Value, ToolError> {
        params.validate()?;
        self.post("/properties", &json!({ "property": params })).await
    }

    pub async fn update_property(&self, params: &UpdateParams) -> Result<Value, ToolError> {
        let id = path_segment("id", &params.id)?;
        let data = params.non_empty_data()?;
        self.put(&format!("/properties/{id}"), &json!({ "property": data }))
            .await
    }

    pub async fn delete_property(&self, params: &DeleteParams) -> Result<Value, ToolError> {
        let id = path_segment("id", &params.id)?;
        self.delete(&format!("/properties/{id}"), &force_query(params.force))
            .await
    }

    pub async fn property_options(&self) -> Result<Value, ToolError> {
        self.get("/properties/options", &[]).await
    }
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

    #[tokio::test]
    async fn list_sends_pagination_and_filters() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/properties")
                    .query_param("pagination[page]", "1")
                    .query_param("pagination[limit]", "10")
                    .query_param("filter[is_active]", "true");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let params = ListPropertiesParams {
            filter: Some(PropertyFilter {
                is_active: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        client_for(server.base_url())
            .list_properties(&params)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_wraps_body_under_property_key() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/properties")
                    .json_body(json!({ "property": { "title": "Seaside", "currency": "EUR" } }));
                then.status(201).json_body(json!({ "data": { "id": "p1" } }));
            })
            .await;

        let params: CreatePropertyParams =
            serde_json::from_value(json!({ "title": "Seaside", "currency": "EUR" })).unwrap();
        let body = client_for(server.base_url())
            .create_property(&params)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(body["data"]["id"], "p1");
    }

    #[tokio::test]
    async fn create_rejects_bad_currency_before_network() {
        let params: CreatePropertyParams =
            serde_json::from_value(json!({ "title": "Seaside", "currency": "EURO" })).unwrap();
        let err = client_for("http://127.0.0.1:9".to_string())
            .create_property(&params)
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("currency"));
    }

    #[tokio::test]
    async fn delete_forwards_force_flag() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/properties/p1")
                    .query_param("force", "true");
                then.status(200).json_body(json!({ "meta": { "message": "Success" } }));
            })
            .await;

        client_for(server.base_url())
            .delete_property(&DeleteParams {
                id: "p1".to_string(),
                force: true,
            })
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
