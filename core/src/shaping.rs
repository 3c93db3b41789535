//! Response size governor.
//!
//! Produces a bounded-size copy of arbitrary JSON so that large upstream
//! payloads fit in a tool-call context. Elided subtrees are replaced by
//! terminal `{"truncated": true, ...}` markers; untouched positions keep their
//! type and value. Truncating an already-truncated value with the same or
//! looser bounds returns it unchanged.

use serde::Serialize;
use serde_json::{Map, Value, json};

/// Strings longer than this many characters are cut.
pub const STRING_LIMIT: usize = 1000;
pub const STRING_SUFFIX: &str = "... [truncated]";
pub const DEFAULT_AUTO_TRUNCATE_CHARS: usize = 50_000;

const MARKER_KEYS: [&str; 4] = ["truncated", "type", "size", "remaining"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TruncationLimits {
    pub max_depth: usize,
    pub max_array_length: usize,
}

impl TruncationLimits {
    pub const DEFAULT: TruncationLimits = TruncationLimits {
        max_depth: 3,
        max_array_length: 10,
    };

    /// Single-channel lookups keep more array entries (property lists).
    pub const CHANNEL_LOOKUP: TruncationLimits = TruncationLimits {
        max_depth: 3,
        max_array_length: 20,
    };
}

impl Default for TruncationLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TruncationStats {
    pub subtrees_elided: usize,
    pub elements_elided: usize,
    pub strings_cut: usize,
}

impl TruncationStats {
    pub fn is_empty(&self) -> bool {
        self.subtrees_elided == 0 && self.elements_elided == 0 && self.strings_cut == 0
    }
}

pub fn truncate(value: &Value, limits: TruncationLimits) -> Value {
    truncate_with_stats(value, limits).0
}

pub fn truncate_with_stats(value: &Value, limits: TruncationLimits) -> (Value, TruncationStats) {
    let mut stats = TruncationStats::default();
    let out = truncate_at(value, 0, limits, &mut stats);
    (out, stats)
}

fn truncate_at(
    value: &Value,
    depth: usize,
    limits: TruncationLimits,
    stats: &mut TruncationStats,
) -> Value {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        Value::String(s) => Value::String(cut_string(s, stats)),
        Value::Object(map) if is_marker(map) => value.clone(),
        Value::Object(map) => {
            if depth >= limits.max_depth {
                stats.subtrees_elided += 1;
                return json!({ "truncated": true, "type": "object", "size": map.len() });
            }
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                out.insert(key.clone(), truncate_at(child, depth + 1, limits, stats));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            let (real, already_remaining) = split_trailing_marker(items);
            if depth >= limits.max_depth {
                stats.subtrees_elided += 1;
                return json!({
                    "truncated": true,
                    "type": "array",
                    "size": real.len() + already_remaining.unwrap_or(0)
                });
            }

            let keep = real.len().min(limits.max_array_length);
            let mut out: Vec<Value> = real[..keep]
                .iter()
                .map(|item| truncate_at(item, depth + 1, limits, stats))
                .collect();

            let newly_elided = real.len() - keep;
            let remaining = newly_elided + already_remaining.unwrap_or(0);
            stats.elements_elided += newly_elided;
            if remaining > 0 {
                out.push(json!({ "truncated": true, "remaining": remaining }));
            }
            Value::Array(out)
        }
    }
}

/// Keeps the first [`STRING_LIMIT`] characters and appends [`STRING_SUFFIX`].
///
/// Cutting an already-cut string reproduces it exactly, so it passes through
/// and is not counted again. An upstream string that happens to have that
/// shape is indistinguishable from governor output and gets the same result.
fn cut_string(s: &str, stats: &mut TruncationStats) -> String {
    if s.chars().count() <= STRING_LIMIT {
        return s.to_string();
    }
    let mut out: String = s.chars().take(STRING_LIMIT).collect();
    out.push_str(STRING_SUFFIX);
    if out != s {
        stats.strings_cut += 1;
    }
    out
}

/// `{"truncated": true}` plus only marker metadata keys.
fn is_marker(map: &Map<String, Value>) -> bool {
    map.get("truncated") == Some(&Value::Bool(true))
        && map.keys().all(|key| MARKER_KEYS.contains(&key.as_str()))
}

/// Split off a trailing `{"truncated": true, "remaining": n}` left by an
/// earlier pass.
fn split_trailing_marker(items: &[Value]) -> (&[Value], Option<usize>) {
    if let Some((last, rest)) = items.split_last() {
        if let Some(map) = last.as_object() {
            if is_marker(map) {
                if let Some(remaining) = map.get("remaining").and_then(Value::as_u64) {
                    return (rest, Some(remaining as usize));
                }
            }
        }
    }
    (items, None)
}

/// Character length of the compact JSON serialization.
pub fn serialized_char_count(value: &Value) -> usize {
    serde_json::to_string(value)
        .map(|s| s.chars().count())
        .unwrap_or(usize::MAX)
}

// ── Call-site policy ────────────────────────────────────────────────

const CHANNEL_ATTRIBUTES: [&str; 6] = [
    "channel_code",
    "title",
    "is_active",
    "properties",
    "created_at",
    "updated_at",
];

/// Reduce a channel resource to the fields needed to identify it.
///
/// `settings` is replaced by its key names and relationships by their counts.
/// Missing attributes stay `null` (`properties` defaults to `[]`).
pub fn essential_channel_fields(channel: &Value) -> Value {
    let attributes = channel.get("attributes");
    let attr = |key: &str| {
        attributes
            .and_then(|a| a.get(key))
            .cloned()
            .unwrap_or(Value::Null)
    };

    let mut slim_attributes = Map::new();
    for key in CHANNEL_ATTRIBUTES {
        let value = match (key, attr(key)) {
            ("properties", Value::Null) => Value::Array(Vec::new()),
            (_, value) => value,
        };
        slim_attributes.insert(key.to_string(), value);
    }
    let settings_keys: Vec<Value> = attributes
        .and_then(|a| a.get("settings"))
        .and_then(Value::as_object)
        .map(|settings| settings.keys().cloned().map(Value::String).collect())
        .unwrap_or_default();
    slim_attributes.insert("settings_keys".to_string(), Value::Array(settings_keys));

    let mut out = Map::new();
    out.insert("id".to_string(), channel.get("id").cloned().unwrap_or(Value::Null));
    out.insert("type".to_string(), channel.get("type").cloned().unwrap_or(Value::Null));
    out.insert("attributes".to_string(), Value::Object(slim_attributes));

    if let Some(relationships) = channel.get("relationships").filter(|r| r.is_object()) {
        let count = |name: &str| {
            relationships
                .get(name)
                .and_then(|r| r.get("data"))
                .and_then(Value::as_array)
                .map_or(0, Vec::len)
        };
        out.insert(
            "relationships".to_string(),
            json!({
                "properties": { "count": count("properties") },
                "mappings": { "count": count("mappings") }
            }),
        );
    }

    Value::Object(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapingPolicy {
    /// Responses whose serialization exceeds this many characters are
    /// truncated with default limits even when the caller did not ask.
    pub auto_threshold_chars: usize,
}

impl Default for ShapingPolicy {
    fn default() -> Self {
        Self {
            auto_threshold_chars: DEFAULT_AUTO_TRUNCATE_CHARS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationReason {
    Requested,
    SizeLimit,
}

/// Reported next to a shaped result so callers know data is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruncationNote {
    pub reason: TruncationReason,
    pub max_depth: usize,
    pub max_array_length: usize,
    pub original_chars: usize,
    pub shaped_chars: usize,
    #[serde(flatten)]
    pub stats: TruncationStats,
}

/// Apply explicit limits when given, else the automatic size trigger.
pub fn shape_response(
    value: Value,
    policy: ShapingPolicy,
    explicit: Option<TruncationLimits>,
) -> (Value, Option<TruncationNote>) {
    let original_chars = serialized_char_count(&value);
    let (limits, reason) = match explicit {
        Some(limits) => (limits, TruncationReason::Requested),
        None if original_chars > policy.auto_threshold_chars => {
            (TruncationLimits::DEFAULT, TruncationReason::SizeLimit)
        }
        None => return (value, None),
    };

    let (shaped, stats) = truncate_with_stats(&value, limits);
    let note = TruncationNote {
        reason,
        max_depth: limits.max_depth,
        max_array_length: limits.max_array_length,
        original_chars,
        shaped_chars: serialized_char_count(&shaped),
        stats,
    };
    (shaped, Some(note))
}
