// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable rendering of survey answers.
//!
//! Question keys look like `contactinfo01ab` and option values like
//! `months13aaaaa`. Both are matched against fixed pattern tables; anything
//! unmatched is shown as-is.

use crmbridge_core::json::scalar_text;
use crmbridge_core::types::SurveyResponse;
use serde::Serialize;
use serde_json::Value;

/// Checked in order; the first pattern contained in the cleaned key wins.
const FIELD_LABELS: &[(&str, &str)] = &[
    ("contactinfo", "Contact Information"),
    ("projectdesc", "Project Description"),
    ("timeline", "Timeline"),
    ("projecttype", "Project Type"),
    ("budget", "Budget"),
    ("company", "Company"),
    ("email", "Email"),
    ("phone", "Phone"),
    ("name", "Name"),
    ("message", "Message"),
    ("feedback", "Feedback"),
    ("rating", "Rating"),
    ("comment", "Comment"),
    ("notes", "Notes"),
    ("requirements", "Requirements"),
    ("priority", "Priority"),
    ("deadline", "Deadline"),
    ("industry", "Industry"),
    ("size", "Size"),
    ("website", "Website"),
    ("referral", "Referral"),
    ("source", "Source"),
];

const VALUE_LABELS: &[(&str, &str)] = &[
    ("asap000000001", "ASAP"),
    ("asap", "ASAP"),
    ("months13aaaaa", "1-3 Months"),
    ("months36aaaaa", "3-6 Months"),
    ("months6plus", "6+ Months"),
    ("betriebseinr01", "Betriebseinrichtung"),
    ("webdesign", "Web Design"),
    ("development", "Development"),
    ("consulting", "Consulting"),
    ("support", "Support"),
    ("other", "Other"),
];

/// Positional labels of a packed contact answer.
const CONTACT_PARTS: &[&str] = &["First Name", "Last Name", "Email", "Phone", "Company"];

/// One labelled element of a packed contact answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelledPart {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DisplayValue {
    Text(String),
    Parts(Vec<LabelledPart>),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayField {
    pub key: String,
    pub label: String,
    pub value: DisplayValue,
}

/// A stored response together with its labelled answers.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    #[serde(flatten)]
    pub response: SurveyResponse,
    pub fields: Vec<DisplayField>,
}

impl ResponseView {
    pub fn new(response: SurveyResponse) -> Self {
        let fields = display_fields(&response.data);
        Self { response, fields }
    }
}

/// Labels every answer in payload order.
pub fn display_fields(data: &Value) -> Vec<DisplayField> {
    let Some(answers) = data.as_object() else {
        return Vec::new();
    };
    answers
        .iter()
        .map(|(key, value)| DisplayField {
            key: key.clone(),
            label: field_label(key),
            value: format_value(value, key),
        })
        .collect()
}

/// Label for a question key.
pub fn field_label(key: &str) -> String {
    let clean: String = key
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    FIELD_LABELS
        .iter()
        .find(|(pattern, _)| clean.contains(pattern))
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| title_case(&key.replace(['_', '-'], " ")))
}

/// Translation of a single option value, if it is a known one.
pub fn value_label(raw: &str) -> Option<&'static str> {
    let lower = raw.to_lowercase();
    VALUE_LABELS
        .iter()
        .find(|(pattern, _)| lower == *pattern)
        .or_else(|| {
            VALUE_LABELS
                .iter()
                .find(|(pattern, _)| lower.contains(pattern))
        })
        .map(|(_, label)| *label)
}

fn format_value(value: &Value, key: &str) -> DisplayValue {
    match value {
        Value::Null => DisplayValue::Empty,
        Value::Array(items) if key.to_lowercase().contains("contact") => {
            let parts: Vec<LabelledPart> = items
                .iter()
                .enumerate()
                .filter(|(_, v)| is_truthy(v))
                .map(|(i, v)| LabelledPart {
                    label: CONTACT_PARTS
                        .get(i)
                        .map(|l| (*l).to_string())
                        .unwrap_or_else(|| format!("Field {}", i + 1)),
                    value: plain_text(v),
                })
                .collect();
            if parts.is_empty() {
                DisplayValue::Empty
            } else {
                DisplayValue::Parts(parts)
            }
        }
        Value::Array(items) => {
            let formatted: Vec<String> = items
                .iter()
                .filter(|v| is_truthy(v))
                .filter_map(format_single)
                .collect();
            if formatted.is_empty() {
                DisplayValue::Empty
            } else {
                DisplayValue::Text(formatted.join(", "))
            }
        }
        other => format_single(other).map_or(DisplayValue::Empty, DisplayValue::Text),
    }
}

fn format_single(value: &Value) -> Option<String> {
    let text = plain_text(value);
    if text.is_empty() {
        return None;
    }
    Some(value_label(&text).map_or(text, str::to_string))
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => scalar_text(other).unwrap_or_else(|| other.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}
