use std::sync::LazyLock;

use serde::Serialize;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Properties,
    RoomTypes,
    RatePlans,
    Ari,
    Channels,
    System,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Properties,
        Category::RoomTypes,
        Category::RatePlans,
        Category::Ari,
        Category::Channels,
        Category::System,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Properties => "properties",
            Category::RoomTypes => "room_types",
            Category::RatePlans => "rate_plans",
            Category::Ari => "ari",
            Category::Channels => "channels",
            Category::System => "system",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::Properties => "Properties",
            Category::RoomTypes => "Room Types",
            Category::RatePlans => "Rate Plans",
            Category::Ari => "Availability, Rates & Inventory",
            Category::Channels => "Channels",
            Category::System => "System",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::Properties => "Create, read, update and delete hotel properties",
            Category::RoomTypes => "Manage the room types offered by a property",
            Category::RatePlans => "Manage rate plans, occupancy options and weekday restrictions",
            Category::Ari => "Query and bulk-update availability, rates and restrictions per date",
            Category::Channels => "Inspect and manage OTA channel connections, mappings and listings",
            Category::System => "Catalog and discovery helpers",
        }
    }

    pub fn parse(raw: &str) -> Option<Category> {
        let raw = raw.trim();
        Category::ALL.into_iter().find(|c| c.as_str() == raw)
    }
}

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    /// Read tools accept `truncate` / `max_depth` / `max_array_length`.
    pub read_only: bool,
    pub input_schema: Value,
}

impl ToolDefinition {
    fn new(
        name: &'static str,
        description: &'static str,
        category: Category,
        read_only: bool,
        input_schema: Value,
    ) -> Self {
        let input_schema = if read_only {
            with_shaping_properties(input_schema)
        } else {
            input_schema
        };
        Self {
            name,
            description,
            category,
            read_only,
            input_schema,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "category": self.category.as_str(),
            "read_only": self.read_only,
            "inputSchema": self.input_schema,
        })
    }
}

static TOOL_DEFINITIONS: LazyLock<Vec<ToolDefinition>> = LazyLock::new(build_definitions);

pub fn tool_definitions() -> &'static [ToolDefinition] {
    &TOOL_DEFINITIONS
}

pub fn find_tool(name: &str) -> Option<&'static ToolDefinition> {
    tool_definitions().iter().find(|tool| tool.name == name)
}

/// Closest known tool name, if any is reasonably close.
pub fn suggest_tool(name: &str) -> Option<&'static str> {
    tool_definitions()
        .iter()
        .map(|tool| (tool.name, strsim::jaro_winkler(name, tool.name)))
        .filter(|(_, score)| *score >= 0.85)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| name)
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn with_shaping_properties(mut schema: Value) -> Value {
    if let Some(props) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        props.insert(
            "truncate".to_string(),
            json!({ "type": "boolean", "description": "Return a size-bounded copy of the response" }),
        );
        props.insert(
            "max_depth".to_string(),
            json!({ "type": "integer", "minimum": 0, "description": "Nesting depth kept when truncating (default 3)" }),
        );
        props.insert(
            "max_array_length".to_string(),
            json!({ "type": "integer", "minimum": 0, "description": "Array elements kept when truncating (default 10)" }),
        );
    }
    schema
}

fn id_schema(description: &str) -> Value {
    object_schema(json!({ "id": { "type": "string", "description": description } }), &["id"])
}

fn delete_schema(force_description: &str) -> Value {
    object_schema(
        json!({
            "id": { "type": "string" },
            "force": { "type": "boolean", "description": force_description }
        }),
        &["id"],
    )
}

fn update_schema(data_properties: Value) -> Value {
    object_schema(
        json!({
            "id": { "type": "string" },
            "data": { "type": "object", "properties": data_properties, "minProperties": 1 }
        }),
        &["id", "data"],
    )
}

fn date_properties(mut props: Map<String, Value>) -> Value {
    for (key, description) in [
        ("date", "Single date (YYYY-MM-DD); takes precedence over any range"),
        ("date_from", "Range start (YYYY-MM-DD), requires date_to"),
        ("date_to", "Range end (YYYY-MM-DD), requires date_from"),
        ("date_gte", "Range start (YYYY-MM-DD), requires date_lte"),
        ("date_lte", "Range end (YYYY-MM-DD), requires date_gte"),
    ] {
        props.insert(
            key.to_string(),
            json!({ "type": "string", "format": "date", "description": description }),
        );
    }
    Value::Object(props)
}

fn pagination_properties() -> Value {
    json!({
        "page": { "type": "integer", "minimum": 1, "description": "Page number (default 1)" },
        "limit": { "type": "integer", "minimum": 1, "description": "Items per page (default 10)" }
    })
}

fn merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a), Value::Object(b)) => {
            a.extend(b);
            Value::Object(a)
        }
        (a, _) => a,
    }
}

fn photo_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "url": { "type": "string" },
                "position": { "type": "integer" },
                "description": { "type": "string" },
                "author": { "type": "string" },
                "kind": { "type": "string", "enum": ["photo", "ad", "menu"] }
            }
        }
    })
}

fn property_fields() -> Value {
    json!({
        "title": { "type": "string" },
        "currency": { "type": "string", "minLength": 3, "maxLength": 3 },
        "email": { "type": "string", "format": "email" },
        "phone": { "type": "string" },
        "zip_code": { "type": "string" },
        "country": { "type": "string", "minLength": 2, "maxLength": 2 },
        "state": { "type": "string" },
        "city": { "type": "string" },
        "address": { "type": "string" },
        "longitude": { "type": "string" },
        "latitude": { "type": "string" },
        "timezone": { "type": "string" },
        "property_type": { "type": "string" },
        "group_id": { "type": "string" },
        "facilities": { "type": "array", "items": { "type": "string" } },
        "website": { "type": "string" },
        "logo_url": { "type": "string" },
        "content": {
            "type": "object",
            "properties": {
                "description": { "type": "string" },
                "important_information": { "type": "string" },
                "photos": photo_schema()
            }
        },
        "settings": {
            "type": "object",
            "properties": {
                "allow_availability_autoupdate_on_confirmation": { "type": "boolean" },
                "allow_availability_autoupdate_on_modification": { "type": "boolean" },
                "allow_availability_autoupdate_on_cancellation": { "type": "boolean" },
                "min_stay_type": { "type": "string", "enum": ["arrival", "through", "both"] },
                "max_price": { "type": "number" },
                "min_price": { "type": "number" },
                "max_day_advance": { "type": "integer" },
                "cut_off_days": { "type": "integer" },
                "cut_off_time": { "type": "string" },
                "state_length": { "type": "integer" }
            }
        }
    })
}

fn room_type_fields() -> Value {
    json!({
        "property_id": { "type": "string" },
        "title": { "type": "string" },
        "occ_adults": { "type": "integer", "minimum": 1 },
        "occ_children": { "type": "integer", "minimum": 0 },
        "occ_infants": { "type": "integer", "minimum": 0 },
        "default_occupancy": { "type": "integer", "minimum": 1 },
        "count_of_rooms": { "type": "integer", "minimum": 0 },
        "room_kind": { "type": "string", "enum": ["room", "dorm"] },
        "capacity": { "type": "integer", "description": "Beds per dorm room" },
        "facilities": { "type": "array", "items": { "type": "string" } },
        "content": {
            "type": "object",
            "properties": {
                "description": { "type": "string" },
                "photos": photo_schema()
            }
        }
    })
}

fn weekday_array(item_type: &str) -> Value {
    json!({ "type": "array", "items": { "type": item_type }, "minItems": 7, "maxItems": 7 })
}

fn rate_plan_fields() -> Value {
    let mut fields = json!({
        "property_id": { "type": "string" },
        "room_type_id": { "type": "string" },
        "title": { "type": "string" },
        "sell_mode": { "type": "string", "enum": ["per_room", "per_person"] },
        "rate_mode": { "type": "string", "enum": ["manual", "derived", "auto", "cascade"] },
        "currency": { "type": "string" },
        "tax_set_id": { "type": "string" },
        "parent_rate_plan_id": { "type": "string" },
        "children_fee": { "type": "string" },
        "infant_fee": { "type": "string" },
        "meal_type": { "type": "string", "enum": ["none", "breakfast", "lunch", "dinner", "all_inclusive"] },
        "max_stay": weekday_array("integer"),
        "min_stay_arrival": weekday_array("integer"),
        "min_stay_through": weekday_array("integer"),
        "closed_to_arrival": weekday_array("boolean"),
        "closed_to_departure": weekday_array("boolean"),
        "stop_sell": weekday_array("boolean"),
        "options": {
            "type": "array",
            "minItems": 1,
            "items": {
                "type": "object",
                "properties": {
                    "occupancy": { "type": "integer", "description": "Number of guests" },
                    "is_primary": { "type": "boolean", "description": "Exactly one option must be primary" },
                    "rate": { "type": "number", "description": "Base rate amount" },
                    "derived_option": { "type": "object" }
                },
                "required": ["occupancy", "is_primary"]
            }
        },
        "auto_rate_settings": { "type": "object" }
    });
    if let Some(obj) = fields.as_object_mut() {
        for flag in [
            "inherit_rate",
            "inherit_closed_to_arrival",
            "inherit_closed_to_departure",
            "inherit_stop_sell",
            "inherit_min_stay_arrival",
            "inherit_min_stay_through",
            "inherit_max_stay",
            "inherit_availability_offset",
            "inherit_max_sell",
            "inherit_max_availability",
        ] {
            obj.insert(flag.to_string(), json!({ "type": "boolean" }));
        }
    }
    fields
}

fn ari_record_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "property_id": { "type": "string" },
            "rate_plan_id": { "type": "string" },
            "room_type_id": { "type": "string" },
            "date": { "type": "string", "format": "date", "description": "Single date update" },
            "date_from": { "type": "string", "format": "date", "description": "Range start date" },
            "date_to": { "type": "string", "format": "date", "description": "Range end date" },
            "days": {
                "type": "array",
                "items": { "type": "string", "enum": ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"] },
                "description": "Restrict a range to these weekdays"
            },
            "availability": { "type": "integer", "minimum": 0 },
            "rate": { "type": ["string", "number"] },
            "rates": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "occupancy": { "type": "integer" },
                        "rate": { "type": ["string", "number"] }
                    },
                    "required": ["occupancy", "rate"]
                }
            },
            "min_stay": { "type": "integer", "minimum": 0 },
            "min_stay_arrival": { "type": "integer", "minimum": 0 },
            "min_stay_through": { "type": "integer", "minimum": 0 },
            "max_stay": { "type": "integer", "minimum": 0 },
            "closed_to_arrival": { "type": "boolean" },
            "closed_to_departure": { "type": "boolean" },
            "stop_sell": { "type": "boolean" }
        },
        "required": ["property_id"],
        "additionalProperties": false
    })
}

fn build_definitions() -> Vec<ToolDefinition> {
    use Category::*;

    let restriction_names = channex_core::ari::Restriction::ALL
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(",");

    vec![
        // ── Properties ──
        ToolDefinition::new(
            "channex_list_properties",
            "List all properties in Channex",
            Properties,
            true,
            object_schema(
                merge(
                    pagination_properties(),
                    json!({
                        "filter": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string", "description": "Property ID" },
                                "title": { "type": "string", "description": "Property title" },
                                "is_active": { "type": "boolean", "description": "Active status" }
                            },
                            "additionalProperties": false
                        }
                    }),
                ),
                &[],
            ),
        ),
        ToolDefinition::new(
            "channex_get_property",
            "Get a specific property by ID",
            Properties,
            true,
            id_schema("Property ID"),
        ),
        ToolDefinition::new(
            "channex_create_property",
            "Create a new property",
            Properties,
            false,
            object_schema(property_fields(), &["title", "currency"]),
        ),
        ToolDefinition::new(
            "channex_update_property",
            "Update an existing property",
            Properties,
            false,
            update_schema(property_fields()),
        ),
        ToolDefinition::new(
            "channex_delete_property",
            "Delete a property",
            Properties,
            false,
            delete_schema("Force delete even if the property has channels"),
        ),
        ToolDefinition::new(
            "channex_get_property_options",
            "List properties as id/title pairs for pickers",
            Properties,
            true,
            object_schema(json!({}), &[]),
        ),
        // ── Room types ──
        ToolDefinition::new(
            "channex_list_room_types",
            "List room types",
            RoomTypes,
            true,
            object_schema(
                merge(
                    json!({ "property_id": { "type": "string" } }),
                    pagination_properties(),
                ),
                &[],
            ),
        ),
        ToolDefinition::new(
            "channex_get_room_type",
            "Get a specific room type",
            RoomTypes,
            true,
            id_schema("Room type ID"),
        ),
        ToolDefinition::new(
            "channex_create_room_type",
            "Create a new room type",
            RoomTypes,
            false,
            object_schema(
                room_type_fields(),
                &[
                    "property_id",
                    "title",
                    "occ_adults",
                    "occ_children",
                    "occ_infants",
                    "default_occupancy",
                    "count_of_rooms",
                ],
            ),
        ),
        ToolDefinition::new(
            "channex_update_room_type",
            "Update an existing room type",
            RoomTypes,
            false,
            update_schema(room_type_fields()),
        ),
        ToolDefinition::new(
            "channex_delete_room_type",
            "Delete a room type",
            RoomTypes,
            false,
            delete_schema("Force delete even if the room type has bookings"),
        ),
        ToolDefinition::new(
            "channex_get_room_type_options",
            "List room types as id/title pairs for pickers",
            RoomTypes,
            true,
            object_schema(json!({}), &[]),
        ),
        // ── Rate plans ──
        ToolDefinition::new(
            "channex_list_rate_plans",
            "List rate plans",
            RatePlans,
            true,
            object_schema(
                merge(
                    json!({
                        "property_id": { "type": "string" },
                        "room_type_id": { "type": "string" }
                    }),
                    pagination_properties(),
                ),
                &[],
            ),
        ),
        ToolDefinition::new(
            "channex_get_rate_plan",
            "Get a specific rate plan",
            RatePlans,
            true,
            id_schema("Rate plan ID"),
        ),
        ToolDefinition::new(
            "channex_create_rate_plan",
            "Create a new rate plan with occupancy options",
            RatePlans,
            false,
            object_schema(
                rate_plan_fields(),
                &["property_id", "room_type_id", "title", "options"],
            ),
        ),
        ToolDefinition::new(
            "channex_update_rate_plan",
            "Update an existing rate plan",
            RatePlans,
            false,
            update_schema(rate_plan_fields()),
        ),
        ToolDefinition::new(
            "channex_delete_rate_plan",
            "Delete a rate plan",
            RatePlans,
            false,
            delete_schema("Force delete even if the rate plan has bookings"),
        ),
        ToolDefinition::new(
            "channex_get_rate_plan_options",
            "List rate plans as id/title pairs, optionally for one property",
            RatePlans,
            true,
            object_schema(json!({ "property_id": { "type": "string" } }), &[]),
        ),
        // ── ARI ──
        ToolDefinition::new(
            "channex_get_availability",
            "Get availability per room type and date",
            Ari,
            true,
            object_schema(
                date_properties(
                    json!({ "property_id": { "type": "string" } })
                        .as_object()
                        .cloned()
                        .unwrap_or_default(),
                ),
                &["property_id"],
            ),
        ),
        ToolDefinition::new(
            "channex_get_restrictions",
            "Get rates and restrictions per rate plan and date",
            Ari,
            true,
            object_schema(
                date_properties(
                    json!({
                        "property_id": { "type": "string" },
                        "restrictions": {
                            "type": ["string", "array"],
                            "items": { "type": "string" },
                            "description": format!("Comma-separated string or array of: {restriction_names}")
                        }
                    })
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                ),
                &["property_id", "restrictions"],
            ),
        ),
        ToolDefinition::new(
            "channex_update_ari",
            "Bulk-update availability, rates and restrictions. The whole batch is validated first; one bad record rejects it.",
            Ari,
            false,
            object_schema(
                json!({
                    "values": { "type": "array", "minItems": 1, "items": ari_record_schema() }
                }),
                &["values"],
            ),
        ),
        // ── Channels ──
        ToolDefinition::new(
            "channex_test_channel_api",
            "Probe channel API endpoints and report which are accessible",
            Channels,
            true,
            object_schema(json!({}), &[]),
        ),
        ToolDefinition::new(
            "channex_check_existing_connection",
            "Check which properties already have a channel with the given code",
            Channels,
            true,
            object_schema(
                json!({
                    "channel_code": { "type": "string", "description": "Channel code (e.g. ABB, BDC)" },
                    "property_ids": { "type": "array", "items": { "type": "string" }, "minItems": 1 }
                }),
                &["channel_code", "property_ids"],
            ),
        ),
        ToolDefinition::new(
            "channex_list_channels",
            "List channel connections",
            Channels,
            true,
            object_schema(
                merge(
                    json!({
                        "property_id": { "type": "string", "description": "Filter by property ID" },
                        "channel_code": { "type": "string", "description": "Filter by channel code" },
                        "is_active": { "type": "boolean", "description": "Filter by active status" },
                        "fields": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Attribute names to keep on each channel (reduces size)"
                        }
                    }),
                    pagination_properties(),
                ),
                &[],
            ),
        ),
        ToolDefinition::new(
            "channex_get_channel_by_code",
            "Get channels by channel code, reduced to identifying fields",
            Channels,
            true,
            object_schema(
                json!({
                    "channel_code": { "type": "string", "description": "Channel code (e.g. ABB, BDC)" },
                    "property_id": { "type": "string", "description": "Only channels attached to this property" }
                }),
                &["channel_code"],
            ),
        ),
        ToolDefinition::new(
            "channex_get_channel",
            "Get details of a specific channel",
            Channels,
            true,
            id_schema("Channel ID"),
        ),
        ToolDefinition::new(
            "channex_create_channel",
            "Create a new channel connection",
            Channels,
            false,
            object_schema(
                json!({
                    "channel_code": { "type": "string" },
                    "title": { "type": "string" },
                    "property_ids": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                    "settings": {
                        "type": "object",
                        "properties": {
                            "min_stay_type": { "type": "string", "enum": ["arrival", "through"] },
                            "send_booking_notification_email": { "type": "boolean" }
                        }
                    }
                }),
                &["channel_code", "title", "property_ids"],
            ),
        ),
        ToolDefinition::new(
            "channex_update_channel",
            "Update channel settings",
            Channels,
            false,
            update_schema(json!({
                "title": { "type": "string" },
                "is_active": { "type": "boolean" },
                "property_ids": { "type": "array", "items": { "type": "string" } },
                "settings": { "type": "object" }
            })),
        ),
        ToolDefinition::new(
            "channex_delete_channel",
            "Delete a channel connection",
            Channels,
            false,
            id_schema("Channel ID"),
        ),
        ToolDefinition::new(
            "channex_get_channel_mappings",
            "Get mappings between channel listings and rate plans",
            Channels,
            true,
            object_schema(json!({ "channel_id": { "type": "string" } }), &["channel_id"]),
        ),
        ToolDefinition::new(
            "channex_update_channel_mapping",
            "Map a channel listing to a room type and rate plan",
            Channels,
            false,
            object_schema(
                json!({
                    "channel_id": { "type": "string" },
                    "mapping_id": { "type": "string" },
                    "data": {
                        "type": "object",
                        "minProperties": 1,
                        "properties": {
                            "room_type_id": { "type": "string" },
                            "rate_plan_id": { "type": "string" },
                            "is_mapped": { "type": "boolean" },
                            "settings": { "type": "object" }
                        }
                    }
                }),
                &["channel_id", "mapping_id", "data"],
            ),
        ),
        ToolDefinition::new(
            "channex_get_airbnb_listings",
            "Get Airbnb listings for a channel",
            Channels,
            true,
            object_schema(json!({ "channel_id": { "type": "string" } }), &["channel_id"]),
        ),
        ToolDefinition::new(
            "channex_update_airbnb_listing",
            "Update Airbnb listing pricing and availability settings",
            Channels,
            false,
            object_schema(
                json!({
                    "channel_id": { "type": "string" },
                    "listing_id": { "type": "string" },
                    "settings": {
                        "type": "object",
                        "properties": {
                            "price_settings": {
                                "type": "object",
                                "properties": {
                                    "currency": { "type": "string" },
                                    "default_daily_price": { "type": "number" },
                                    "default_weekend_price": { "type": "number" },
                                    "monthly_stay_discount": { "type": "number" },
                                    "weekly_stay_discount": { "type": "number" },
                                    "price_per_extra_guest": { "type": "number" },
                                    "guests_included": { "type": "integer" },
                                    "security_deposit": { "type": "number" },
                                    "cleaning_fee": { "type": "number" }
                                }
                            },
                            "availability_settings": {
                                "type": "object",
                                "properties": {
                                    "number_of_days": { "type": "integer" },
                                    "number_of_hours": { "type": "integer" },
                                    "preparation_time": { "type": "integer" },
                                    "max_nights": { "type": "integer" },
                                    "min_nights": { "type": "integer" },
                                    "checkin_dates": { "type": "array", "items": { "type": "string" } },
                                    "checkout_dates": { "type": "array", "items": { "type": "string" } }
                                }
                            }
                        }
                    }
                }),
                &["channel_id", "listing_id", "settings"],
            ),
        ),
        // ── System ──
        ToolDefinition::new(
            "channex_list_tools",
            "Catalog of all tools grouped by category, with input schemas",
            System,
            false,
            object_schema(
                json!({
                    "category": {
                        "type": "string",
                        "description": "Only list tools in this category",
                        "enum": Category::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>()
                    }
                }),
                &[],
            ),
        ),
    ]
}
