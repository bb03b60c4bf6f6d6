//! Loose-JSON extraction helpers
//!
//! The upstream gateway sends heterogeneously-typed payloads: ids arrive
//! as strings or numbers, timestamps as integers or floats, and whole
//! sub-objects appear or disappear between events. Every helper here is
//! total — wrong types yield a zero value, never an error.

use serde_json::{Map, Value};

/// The string value, or `""` for anything that is not a string.
#[must_use]
pub fn get_str(value: &Value) -> &str {
    value.as_str().unwrap_or_default()
}

/// Owned variant of [`get_str`].
#[must_use]
pub fn get_string(value: &Value) -> String {
    get_str(value).to_string()
}

/// String form of a value that may arrive as a JSON string or number.
///
/// Snowflake ids in particular show up both ways depending on the event.
#[must_use]
pub fn get_string_lossy(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Numeric value as `i64`, accepting integer, floating, and
/// numeric-string forms; anything else is 0.
#[must_use]
pub fn get_i64(value: &Value) -> i64 {
    opt_i64(value).unwrap_or(0)
}

/// [`get_i64`] that distinguishes "absent/invalid" from a literal zero.
#[must_use]
pub fn opt_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| u as i64))
            .or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The boolean value, or false for anything that is not a boolean.
#[must_use]
pub fn get_bool(value: &Value) -> bool {
    value.as_bool().unwrap_or(false)
}

/// Safe descent through nested objects.
///
/// Returns `None` as soon as a key is missing or an intermediate value is
/// not an object.
#[must_use]
pub fn get_nested<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}

/// A copy of the value's object form, or `None` for non-objects.
///
/// The original marshal/unmarshal round-trip collapses to a clone once
/// everything is already a [`Value`].
#[must_use]
pub fn to_object(value: &Value) -> Option<Map<String, Value>> {
    value.as_object().cloned()
}

/// The first non-empty string in the list, or `""`.
#[must_use]
pub fn first_non_empty<'a>(values: &[&'a str]) -> &'a str {
    values.iter().find(|v| !v.is_empty()).copied().unwrap_or("")
}

/// String field of an object, tolerating numeric ids.
#[must_use]
pub fn field_string(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).map(get_string_lossy).unwrap_or_default()
}

/// Integer field of an object.
#[must_use]
pub fn field_i64(map: &Map<String, Value>, key: &str) -> i64 {
    map.get(key).map(get_i64).unwrap_or(0)
}

/// Boolean field of an object.
#[must_use]
pub fn field_bool(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).map(get_bool).unwrap_or(false)
}
