// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp normalization for vendor payloads.
//!
//! Both vendors send near-ISO-8601 strings with assorted suffixes; the chat
//! vendor also sends epoch seconds. Everything is normalized into a naive
//! local timestamp with at most microsecond precision. Unparseable input
//! yields the current local time instead of an error.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike};
use serde_json::Value;

/// Text format used for every timestamp column in storage.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Current local time, truncated to microseconds.
pub fn now() -> NaiveDateTime {
    truncate_micros(Local::now().naive_local())
}

/// Normalizes a JSON timestamp value.
///
/// Returns `None` for null, missing, and empty-string input. Any other input
/// that cannot be parsed falls back to [`now`].
pub fn normalize(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(n.as_f64().and_then(from_epoch).unwrap_or_else(now)),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(normalize_str(s)),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Some(now()),
    }
}

/// Normalizes an optional JSON field, treating absence like null.
pub fn normalize_opt(value: Option<&Value>) -> Option<NaiveDateTime> {
    value.and_then(normalize)
}

/// Normalizes a timestamp string, falling back to [`now`] on failure.
pub fn normalize_str(raw: &str) -> NaiveDateTime {
    parse_lenient(raw).unwrap_or_else(|| {
        tracing::debug!(raw, "unparseable timestamp, using current time");
        now()
    })
}

fn from_epoch(secs: f64) -> Option<NaiveDateTime> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let utc = DateTime::from_timestamp(whole as i64, nanos)?;
    Some(truncate_micros(utc.with_timezone(&Local).naive_local()))
}

fn parse_lenient(raw: &str) -> Option<NaiveDateTime> {
    let mut s = raw.trim().to_string();

    if s.ends_with('Z') || s.ends_with('z') {
        s.pop();
    }
    if let Some(pos) = s.find('+') {
        s.truncate(pos);
    }
    if s.matches('-').count() >= 3 {
        if let Some(pos) = s.rfind('-') {
            let suffix = &s[pos + 1..];
            if suffix.contains(':') && suffix.len() <= 6 {
                s.truncate(pos);
            }
        }
    }
    let s = s.replace('T', " ");
    let s = truncate_fraction(&s);

    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(truncate_micros)
}

/// Cuts a fractional-seconds component down to six digits.
fn truncate_fraction(s: &str) -> String {
    let Some(dot) = s.rfind('.') else {
        return s.to_string();
    };
    let digits = s[dot + 1..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digits <= 6 {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..dot + 7]);
    out.push_str(&s[dot + 1 + digits..]);
    out
}

fn truncate_micros(ts: NaiveDateTime) -> NaiveDateTime {
    let nanos = ts.nanosecond();
    ts.with_nanosecond(nanos - nanos % 1_000).unwrap_or(ts)
}

/// Formats a timestamp for storage.
pub fn to_storage(ts: &NaiveDateTime) -> String {
    ts.format(STORAGE_FORMAT).to_string()
}

/// Parses a stored timestamp. Rows written by other tools may omit the
/// fraction, so the lenient parser is used without the `now` fallback.
pub fn from_storage(raw: &str) -> Option<NaiveDateTime> {
    parse_lenient(raw)
}
