use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{DeleteParams, UpdateParams, force_query, pagination_query, push_filter};
use crate::client::UpstreamClient;
use crate::error::ToolError;
use crate::util::path_segment;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListRoomTypesParams {
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Room,
    Dorm,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRoomTypeParams {
    pub property_id: String,
    pub title: String,
    pub occ_adults: u32,
    pub occ_children: u32,
    pub occ_infants: u32,
    pub default_occupancy: u32,
    pub count_of_rooms: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_kind: Option<RoomKind>,
    /// Beds per dorm room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facilities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl CreateRoomTypeParams {
    fn validate(&self) -> Result<(), ToolError> {
        path_segment("property_id", &self.property_id)?;
        if self.title.trim().is_empty() {
            return Err(ToolError::validation("'title' must not be empty").with_field("title"));
        }
        if self.occ_adults == 0 {
            return Err(
                ToolError::validation("'occ_adults' must be at least 1").with_field("occ_adults"),
            );
        }
        if self.default_occupancy == 0 || self.default_occupancy > self.occ_adults {
            return Err(ToolError::validation(
                "'default_occupancy' must be between 1 and 'occ_adults'",
            )
            .with_field("default_occupancy"));
        }
        if self.room_kind == Some(RoomKind::Dorm) && self.capacity.is_none() {
            return Err(
                ToolError::validation("'capacity' is required for dorm rooms")
                    .with_field("capacity"),
            );
        }
        Ok(())
    }
}

impl UpstreamClient {
    pub async fn list_room_types(&self, params: &ListRoomTypesParams) -> Result<Value, ToolError> {
        let mut query = pagination_query(params.page, params.limit);
        push_filter(&mut query, "property_id", params.property_id.as_deref());
        self.get("/room_types", &query).await
    }

    pub async fn get_room_type(&self, id: &str) -> Result<Value, ToolError> {
        let id = path_segment("id", id)?;
        self.get(&format!("/room_types/{id}"), &[]).await
    }

    pub async fn create_room_type(&self, params: &CreateRoomTypeParams) -> Result<Value, ToolError> {
        params.validate()?;
        self.post("/room_types", &json!({ "room_type": params })).await
    }

    pub async fn update_room_type(&self, params: &UpdateParams) -> Result<Value, ToolError> {
        let id = path_segment("id", &params.id)?;
        let data = params.non_empty_data()?;
        self.put(&format!("/room_types/{id}"), &json!({ "room_type": data }))
            .await
    }

    pub async fn delete_room_type(&self, params: &DeleteParams) -> Result<Value, ToolError> {
        let id = path_segment("id", &params.id)?;
        self.delete(&format!("/room_types/{id}"), &force_query(params.force))
            .await
    }

    pub async fn room_type_options(&self) -> Result<Value, ToolError> {
        self.get("/room_types/options", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(extra: Value) -> CreateRoomTypeParams {
        let mut base = json!({
            "property_id": "p1",
            "title": "Double",
            "occ_adults": 2,
            "occ_children": 0,
            "occ_infants": 0,
            "default_occupancy": 2,
            "count_of_rooms": 5
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn dorms_need_capacity() {
        let err = room(json!({ "room_kind": "dorm" })).validate().unwrap_err();
        assert_eq!(err.field.as_deref(), Some("capacity"));
        assert!(room(json!({ "room_kind": "dorm", "capacity": 8 })).validate().is_ok());
    }

    #[test]
    fn default_occupancy_cannot_exceed_adults() {
        let err = room(json!({ "default_occupancy": 3 })).validate().unwrap_err();
        assert_eq!(err.field.as_deref(), Some("default_occupancy"));
    }

    #[test]
    fn unknown_room_kind_fails_to_parse() {
        let parsed = serde_json::from_value::<CreateRoomTypeParams>(json!({
            "property_id": "p1",
            "title": "Double",
            "occ_adults": 2,
            "occ_children": 0,
            "occ_infants": 0,
            "default_occupancy": 2,
            "count_of_rooms": 5,
            "room_kind": "suite"
        }));
        assert!(parsed.is_err());
    }
}
