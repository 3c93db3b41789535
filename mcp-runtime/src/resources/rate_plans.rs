use serde::{Deserialize, Serialize};
use serde_json::{Number, Value, json};

use super::{DeleteParams, UpdateParams, force_query, pagination_query, push_filter};
use crate::client::UpstreamClient;
use crate::error::ToolError;
use crate::util::path_segment;

/// Per-weekday restriction arrays carry exactly one entry per day.
const WEEKDAY_ARRAY_LEN: usize = 7;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListRatePlansParams {
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub room_type_id: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatePlanOptionsParams {
    #[serde(default)]
    pub property_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SellMode {
    PerRoom,
    PerPerson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateMode {
    Manual,
    Derived,
    Auto,
    Cascade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    None,
    Breakfast,
    Lunch,
    Dinner,
    AllInclusive,
}

/// Occupancy-based price point. A rate plan needs exactly one primary option.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RatePlanOption {
    pub occupancy: u32,
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_option: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRatePlanParams {
    pub property_id: String,
    pub room_type_id: String,
    pub title: String,
    pub options: Vec<RatePlanOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_mode: Option<SellMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_mode: Option<RateMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_set_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_rate_plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children_fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infant_fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_stay: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stay_arrival: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stay_through: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_to_arrival: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_to_departure: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sell: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_rate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_closed_to_arrival: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_closed_to_departure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_stop_sell: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_min_stay_arrival: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_min_stay_through: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_max_stay: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_availability_offset: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_max_sell: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit_max_availability: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_rate_settings: Option<Value>,
}

impl CreateRatePlanParams {
    fn validate(&self) -> Result<(), ToolError> {
        path_segment("property_id", &self.property_id)?;
        path_segment("room_type_id", &self.room_type_id)?;
        if self.title.trim().is_empty() {
            return Err(ToolError::validation("'title' must not be empty").with_field("title"));
        }
        if self.options.is_empty() {
            return Err(
                ToolError::validation("'options' needs at least one occupancy option")
                    .with_field("options"),
            );
        }
        let primaries = self.options.iter().filter(|o| o.is_primary).count();
        if primaries != 1 {
            return Err(ToolError::validation(format!(
                "'options' must contain exactly one primary option, found {primaries}"
            ))
            .with_field("options"));
        }

        let weekday_lengths = [
            ("max_stay", self.max_stay.as_ref().map(Vec::len)),
            ("min_stay_arrival", self.min_stay_arrival.as_ref().map(Vec::len)),
            ("min_stay_through", self.min_stay_through.as_ref().map(Vec::len)),
            ("closed_to_arrival", self.closed_to_arrival.as_ref().map(Vec::len)),
            ("closed_to_departure", self.closed_to_departure.as_ref().map(Vec::len)),
            ("stop_sell", self.stop_sell.as_ref().map(Vec::len)),
        ];
        for (field, len) in weekday_lengths {
            if let Some(len) = len {
                if len != WEEKDAY_ARRAY_LEN {
                    return Err(ToolError::validation(format!(
                        "'{field}' must have {WEEKDAY_ARRAY_LEN} entries (Monday..Sunday), got {len}"
                    ))
                    .with_field(field));
                }
            }
        }
        Ok(())
    }
}

impl UpstreamClient {
    pub async fn list_rate_plans(&self, params: &ListRatePlansParams) -> Result<Value, ToolError> {
        let mut query = pagination_query(params.page, params.limit);
        push_filter(&mut query, "property_id", params.property_id.as_deref());
        push_filter(&mut query, "room_type_id", params.room_type_id.as_deref());
        self.get("/rate_plans", &query).await
    }

    pub async fn get_rate_plan(&self, id: &str) -> Result<Value, ToolError> {
        let id = path_segment("id", id)?;
        self.get(&format!("/rate_plans/{id}"), &[]).await
    }

    pub async fn create_rate_plan(&self, params: &CreateRatePlanParams) -> Result<Value, ToolError> {
        params.validate()?;
        self.post("/rate_plans", &json!({ "rate_plan": params })).await
    }

    pub async fn update_rate_plan(&self, params: &UpdateParams) -> Result<Value, ToolError> {
        let id = path_segment("id", &params.id)?;
        let data = params.non_empty_data()?;
        self.put(&format!("/rate_plans/{id}"), &json!({ "rate_plan": data }))
            .await
    }

    pub async fn delete_rate_plan(&self, params: &DeleteParams) -> Result<Value, ToolError> {
        let id = path_segment("id", &params.id)?;
        self.delete(&format!("/rate_plans/{id}"), &force_query(params.force))
            .await
    }

    pub async fn rate_plan_options(&self, params: &RatePlanOptionsParams) -> Result<Value, ToolError> {
        let mut query = Vec::new();
        push_filter(&mut query, "property_id", params.property_id.as_deref());
        self.get("/rate_plans/options", &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(extra: Value) -> CreateRatePlanParams {
        let mut base = json!({
            "property_id": "p1",
            "room_type_id": "rt1",
            "title": "Standard",
            "options": [{ "occupancy": 2, "is_primary": true, "rate": 100 }]
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn exactly_one_primary_option_is_required() {
        assert!(plan(json!({})).validate().is_ok());
        let err = plan(json!({ "options": [
            { "occupancy": 1, "is_primary": false },
            { "occupancy": 2, "is_primary": false }
        ]}))
        .validate()
        .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("options"));
    }

    #[test]
    fn weekday_arrays_need_seven_entries() {
        let err = plan(json!({ "stop_sell": [false, false, true] }))
            .validate()
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("stop_sell"));
        assert!(plan(json!({ "min_stay_arrival": [1, 1, 1, 1, 2, 2, 1] })).validate().is_ok());
    }

    #[test]
    fn serialized_body_keeps_numeric_rate() {
        let value = serde_json::to_value(plan(json!({ "sell_mode": "per_person" }))).unwrap();
        assert_eq!(value["options"][0]["rate"], 100);
        assert_eq!(value["sell_mode"], "per_person");
        assert!(value.get("meal_type").is_none());
    }
}
