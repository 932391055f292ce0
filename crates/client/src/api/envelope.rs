//! Tolerant readers for the backend's response envelopes.
//!
//! Listings arrive as a bare array or wrapped in `items`, `data` or
//! `results`; single items optionally under `data`.

use serde_json::Value;

const ITEM_KEYS: [&str; 3] = ["items", "data", "results"];
const TOTAL_KEYS: [&str; 3] = ["total", "count", "totalCount"];

pub(crate) fn extract_items(body: &Value) -> &[Value] {
    if let Some(items) = body.as_array() {
        return items;
    }
    ITEM_KEYS
        .iter()
        .find_map(|key| body.get(key)?.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Declared total, or `fallback` when the envelope carries none.
pub(crate) fn extract_total(body: &Value, fallback: usize) -> u64 {
    TOTAL_KEYS
        .iter()
        .find_map(|key| body.get(key)?.as_u64())
        .unwrap_or(fallback as u64)
}

/// `data` when present and non-null, else the body itself.
pub(crate) fn single_item(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => data,
            Some(data) => {
                map.insert("data".to_string(), data);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}
