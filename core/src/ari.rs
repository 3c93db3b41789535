//! Availability / Rate / Inventory parameter normalization.
//!
//! The upstream accepts a single filter syntax (`filter[date]` or
//! `filter[date][gte]` + `filter[date][lte]`) while callers historically send
//! three different shapes. Everything here is pure: no I/O, no upstream calls,
//! so validation failures surface before anything leaves the process.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Envelope key the bulk ARI endpoint expects.
pub const UPDATE_ENVELOPE_KEY: &str = "values";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AriError {
    #[error("invalid date range: {reason}")]
    InvalidRange { field: &'static str, reason: String },
    #[error("'{field}' must be a date in YYYY-MM-DD format, got '{value}'")]
    InvalidDate { field: &'static str, value: String },
    #[error("'property_id' is required")]
    MissingPropertyId,
    #[error("at least one restriction kind is required")]
    EmptyRestrictions,
    #[error("unknown restriction '{0}'")]
    UnknownRestriction(String),
    #[error("at least one ARI record is required")]
    EmptyBatch,
    #[error("record {index} is invalid: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

impl AriError {
    /// Input field the error points at, when there is a single one.
    pub fn field(&self) -> Option<String> {
        match self {
            AriError::InvalidRange { field, .. } | AriError::InvalidDate { field, .. } => {
                Some((*field).to_string())
            }
            AriError::MissingPropertyId => Some("property_id".to_string()),
            AriError::EmptyRestrictions | AriError::UnknownRestriction(_) => {
                Some("restrictions".to_string())
            }
            AriError::EmptyBatch => Some(UPDATE_ENVELOPE_KEY.to_string()),
            AriError::InvalidRecord { index, .. } => Some(format!("{UPDATE_ENVELOPE_KEY}[{index}]")),
        }
    }

    /// Stable machine-readable kind, used as `details.kind` on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            AriError::InvalidRange { .. } => "invalid_range",
            AriError::InvalidDate { .. } => "invalid_date",
            AriError::MissingPropertyId => "missing_property_id",
            AriError::EmptyRestrictions => "empty_restrictions",
            AriError::UnknownRestriction(_) => "unknown_restriction",
            AriError::EmptyBatch => "empty_batch",
            AriError::InvalidRecord { .. } => "invalid_record",
        }
    }
}

// ── Date selection ──────────────────────────────────────────────────

/// Raw date parameters as callers send them. Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DateFilterInput {
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSelector {
    Single(NaiveDate),
    Range { from: NaiveDate, to: NaiveDate },
}

impl DateSelector {
    /// Render as upstream query pairs.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        match self {
            DateSelector::Single(date) => vec![("filter[date]".to_string(), date.to_string())],
            DateSelector::Range { from, to } => vec![
                ("filter[date][gte]".to_string(), from.to_string()),
                ("filter[date][lte]".to_string(), to.to_string()),
            ],
        }
    }
}

/// Resolve the caller's date parameters into at most one selector.
///
/// Precedence: `date` wins outright and every range field is ignored. Otherwise
/// `date_from`/`date_to` is checked before `date_gte`/`date_lte`. A pair with
/// only one end present is rejected rather than silently widened. No date
/// fields at all yields `None` (the upstream applies its own default window).
pub fn normalize_date_filter(input: &DateFilterInput) -> Result<Option<DateSelector>, AriError> {
    if let Some(raw) = present(&input.date) {
        return Ok(Some(DateSelector::Single(parse_date("date", raw)?)));
    }

    let pairs = [
        ("date_from", &input.date_from, "date_to", &input.date_to),
        ("date_gte", &input.date_gte, "date_lte", &input.date_lte),
    ];
    for (from_field, from, to_field, to) in pairs {
        match (present(from), present(to)) {
            (Some(from), Some(to)) => {
                let from = parse_date(from_field, from)?;
                let to = parse_date(to_field, to)?;
                if from > to {
                    return Err(AriError::InvalidRange {
                        field: from_field,
                        reason: format!("'{from_field}' ({from}) is after '{to_field}' ({to})"),
                    });
                }
                return Ok(Some(DateSelector::Range { from, to }));
            }
            (Some(_), None) => {
                return Err(AriError::InvalidRange {
                    field: to_field,
                    reason: format!("'{from_field}' was given without '{to_field}'"),
                });
            }
            (None, Some(_)) => {
                return Err(AriError::InvalidRange {
                    field: from_field,
                    reason: format!("'{to_field}' was given without '{from_field}'"),
                });
            }
            (None, None) => {}
        }
    }

    Ok(None)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, AriError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| AriError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

// ── Restrictions ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Restriction {
    Availability,
    Rate,
    MinStayArrival,
    MinStayThrough,
    MinStay,
    ClosedToArrival,
    ClosedToDeparture,
    StopSell,
    MaxStay,
    AvailabilityOffset,
    MaxAvailability,
}

impl Restriction {
    pub const ALL: [Restriction; 11] = [
        Restriction::Availability,
        Restriction::Rate,
        Restriction::MinStayArrival,
        Restriction::MinStayThrough,
        Restriction::MinStay,
        Restriction::ClosedToArrival,
        Restriction::ClosedToDeparture,
        Restriction::StopSell,
        Restriction::MaxStay,
        Restriction::AvailabilityOffset,
        Restriction::MaxAvailability,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Restriction::Availability => "availability",
            Restriction::Rate => "rate",
            Restriction::MinStayArrival => "min_stay_arrival",
            Restriction::MinStayThrough => "min_stay_through",
            Restriction::MinStay => "min_stay",
            Restriction::ClosedToArrival => "closed_to_arrival",
            Restriction::ClosedToDeparture => "closed_to_departure",
            Restriction::StopSell => "stop_sell",
            Restriction::MaxStay => "max_stay",
            Restriction::AvailabilityOffset => "availability_offset",
            Restriction::MaxAvailability => "max_availability",
        }
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Restriction {
    type Err = AriError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_lowercase();
        Restriction::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| AriError::UnknownRestriction(raw.trim().to_string()))
    }
}

/// Parse restriction names. Each entry may itself be comma-separated, so both
/// `["rate", "stop_sell"]` and `["rate,stop_sell"]` are accepted.
pub fn parse_restrictions<S: AsRef<str>>(names: &[S]) -> Result<Vec<Restriction>, AriError> {
    names
        .iter()
        .flat_map(|name| name.as_ref().split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(Restriction::from_str)
        .collect()
}

/// Build `filter[property_id]` + `filter[restrictions]` (comma-joined, first
/// occurrence wins on duplicates).
pub fn build_restrictions_filter(
    property_id: &str,
    restrictions: &[Restriction],
) -> Result<Vec<(String, String)>, AriError> {
    let property_id = property_id.trim();
    if property_id.is_empty() {
        return Err(AriError::MissingPropertyId);
    }
    if restrictions.is_empty() {
        return Err(AriError::EmptyRestrictions);
    }

    let mut unique: Vec<Restriction> = Vec::with_capacity(restrictions.len());
    for kind in restrictions {
        if !unique.contains(kind) {
            unique.push(*kind);
        }
    }
    let joined = unique
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(",");

    Ok(vec![
        ("filter[property_id]".to_string(), property_id.to_string()),
        ("filter[restrictions]".to_string(), joined),
    ])
}

/// Query for `GET /availability`.
pub fn availability_query(
    property_id: &str,
    dates: &DateFilterInput,
) -> Result<Vec<(String, String)>, AriError> {
    let property_id = property_id.trim();
    if property_id.is_empty() {
        return Err(AriError::MissingPropertyId);
    }
    let mut query = vec![("filter[property_id]".to_string(), property_id.to_string())];
    if let Some(selector) = normalize_date_filter(dates)? {
        query.extend(selector.query_pairs());
    }
    Ok(query)
}

/// Query for `GET /restrictions`.
pub fn restrictions_query(
    property_id: &str,
    restrictions: &[Restriction],
    dates: &DateFilterInput,
) -> Result<Vec<(String, String)>, AriError> {
    let mut query = build_restrictions_filter(property_id, restrictions)?;
    if let Some(selector) = normalize_date_filter(dates)? {
        query.extend(selector.query_pairs());
    }
    Ok(query)
}

// ── Bulk updates ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OccupancyRate {
    pub occupancy: u32,
    pub rate: Decimal,
}

/// One per-date update as forwarded to the bulk endpoint.
///
/// Unknown fields are rejected so that a typo (`stopsell`) cannot turn a
/// record into a silent no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AriRecord {
    pub property_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<Weekday>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rates: Option<Vec<OccupancyRate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stay: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stay_arrival: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stay_through: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_stay: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_to_arrival: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_to_departure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sell: Option<bool>,
}

impl AriRecord {
    pub fn has_mutable_field(&self) -> bool {
        self.availability.is_some()
            || self.rate.is_some()
            || self.rates.as_ref().is_some_and(|rates| !rates.is_empty())
            || self.min_stay.is_some()
            || self.min_stay_arrival.is_some()
            || self.min_stay_through.is_some()
            || self.max_stay.is_some()
            || self.closed_to_arrival.is_some()
            || self.closed_to_departure.is_some()
            || self.stop_sell.is_some()
    }

    fn validate(&self) -> Result<(), String> {
        if self.property_id.trim().is_empty() {
            return Err("'property_id' is required".to_string());
        }
        if !self.has_mutable_field() {
            return Err(
                "record carries no availability, rate or restriction field to update".to_string(),
            );
        }
        match (self.date_from, self.date_to) {
            (Some(from), Some(to)) if from > to => {
                return Err(format!("'date_from' ({from}) is after 'date_to' ({to})"));
            }
            (Some(_), None) => return Err("'date_from' was given without 'date_to'".to_string()),
            (None, Some(_)) => return Err("'date_to' was given without 'date_from'".to_string()),
            _ => {}
        }
        if self.rate.is_some_and(|rate| rate.is_sign_negative()) {
            return Err("'rate' must not be negative".to_string());
        }
        if let Some(rates) = &self.rates {
            if rates.iter().any(|entry| entry.rate.is_sign_negative()) {
                return Err("'rates[].rate' must not be negative".to_string());
            }
        }
        Ok(())
    }
}

/// Validate every record and wrap them as `{"values": [...]}`.
///
/// The first invalid record rejects the whole batch; nothing partial is ever
/// handed to the upstream.
pub fn build_update_payload(records: &[Value]) -> Result<Value, AriError> {
    if records.is_empty() {
        return Err(AriError::EmptyBatch);
    }

    let mut validated = Vec::with_capacity(records.len());
    for (index, raw) in records.iter().enumerate() {
        let record: AriRecord = serde_json::from_value(raw.clone()).map_err(|e| {
            AriError::InvalidRecord {
                index,
                reason: e.to_string(),
            }
        })?;
        record
            .validate()
            .map_err(|reason| AriError::InvalidRecord { index, reason })?;
        validated.push(record);
    }

    Ok(json!({ UPDATE_ENVELOPE_KEY: validated }))
}
