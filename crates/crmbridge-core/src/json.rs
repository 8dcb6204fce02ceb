// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Accessors for loosely-typed vendor JSON.
//!
//! Vendor ids arrive as numbers in one payload and strings in the next, and
//! optional strings are as likely to be `""` as absent. These helpers fold
//! all of that into `Option<String>`.

use serde_json::Value;

/// Reads an id that may be a JSON number or string.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads `value[key]` as an id.
pub fn id_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(id_string)
}

/// Reads `value[key]` as a non-empty string.
pub fn str_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Returns `value[key]` when it is a JSON object.
pub fn object_field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| v.is_object())
}

/// Reads `value[key]` as a boolean, accepting `1`/`0` and `"true"`.
pub fn bool_field(value: &Value, key: &str) -> Option<bool> {
    match value.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Returns `value` if it is a scalar (string, number, bool) rendered as text.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
