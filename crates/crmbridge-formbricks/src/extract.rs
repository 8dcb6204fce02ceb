// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact details from free-form survey answers.
//!
//! Survey question keys are a question label plus a random suffix, so the
//! contact fields cannot be addressed by name. Three passes run in order and
//! a field filled by an earlier pass is never overwritten by a later one:
//!
//! 1. A packed contact question: the first answer whose key contains
//!    `contact` or `info` and whose value is an array of at least three
//!    scalars, laid out as `[first, last, email, phone, company]`.
//! 2. Well-known flat keys (`email`, `fullName`, `phoneNumber`, ...).
//! 3. For email only, any string answer that looks like an address.
//!
//! The first matching answer wins, in the order the payload lists them.

use serde_json::{Map, Value};

const EMAIL_KEYS: &[&str] = &[
    "email",
    "e-mail",
    "emailAddress",
    "email_address",
    "contact_email",
];
const NAME_KEYS: &[&str] = &[
    "name",
    "fullName",
    "full_name",
    "firstName",
    "first_name",
    "contact_name",
];
const PHONE_KEYS: &[&str] = &[
    "phone",
    "phoneNumber",
    "phone_number",
    "mobile",
    "telephone",
    "contact_phone",
];

const PACKED_MIN_LEN: usize = 3;

/// Contact details found in a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ExtractedContact {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }

    fn fill(slot: &mut Option<String>, value: Option<String>) {
        if slot.is_none() {
            *slot = value;
        }
    }
}

/// Runs all three passes over a response's answer map.
///
/// Non-object input yields an empty result.
pub fn extract_contact(data: &Value) -> ExtractedContact {
    let Some(answers) = data.as_object() else {
        return ExtractedContact::default();
    };

    let mut found = packed_contact(answers).unwrap_or_default();

    ExtractedContact::fill(
        &mut found.email,
        first_string(answers, EMAIL_KEYS, |v| v.contains('@')),
    );
    ExtractedContact::fill(&mut found.name, first_string(answers, NAME_KEYS, |_| true));
    ExtractedContact::fill(&mut found.phone, first_string(answers, PHONE_KEYS, |_| true));

    if found.email.is_none() {
        found.email = answers
            .values()
            .filter_map(Value::as_str)
            .find(|s| looks_like_email(s))
            .map(str::to_string);
    }
    found
}

/// Whether a key names a packed contact question.
pub fn is_contact_key(key: &str) -> bool {
    let key = key.to_lowercase();
    key.contains("contact") || key.contains("info")
}

fn packed_contact(answers: &Map<String, Value>) -> Option<ExtractedContact> {
    let parts = answers.iter().find_map(|(key, value)| {
        let parts = value.as_array()?;
        (is_contact_key(key) && parts.len() >= PACKED_MIN_LEN && parts.iter().all(is_scalar))
            .then_some(parts)
    })?;

    let part = |i: usize| {
        parts
            .get(i)
            .and_then(part_text)
            .filter(|s| !s.is_empty())
    };

    let name = match (part(0), part(1)) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (first, last) => first.or(last),
    };
    Some(ExtractedContact {
        name,
        email: part(2).filter(|e| e.contains('@')),
        phone: part(3),
    })
}

fn first_string(
    answers: &Map<String, Value>,
    keys: &[&str],
    accept: impl Fn(&str) -> bool,
) -> Option<String> {
    keys.iter()
        .filter_map(|key| answers.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|v| !v.is_empty() && accept(v))
        .map(str::to_string)
}

fn looks_like_email(s: &str) -> bool {
    s.split_once('@')
        .is_some_and(|(_, domain)| domain.contains('.'))
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn part_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn packed_contact_array_wins() {
        let data = json!({
            "contactinfo01ab": ["Ada", "Lovelace", "ada@example.com", "+44 20 7946 0000", "Engines Ltd"],
            "email": "other@example.com",
        });
        let found = extract_contact(&data);
        assert_eq!(found.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(found.email.as_deref(), Some("ada@example.com"));
        assert_eq!(found.phone.as_deref(), Some("+44 20 7946 0000"));
    }

    #[test]
    fn packed_array_without_email_falls_through() {
        let data = json!({
            "ContactInfoX9": ["Ada", "", "not-an-email"],
            "emailAddress": "ada@example.com",
            "phoneNumber": "555-0100",
        });
        let found = extract_contact(&data);
        assert_eq!(found.name.as_deref(), Some("Ada"));
        assert_eq!(found.email.as_deref(), Some("ada@example.com"));
        assert_eq!(found.phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn short_or_unrelated_arrays_are_ignored() {
        let data = json!({
            "contact": ["Ada", "Lovelace"],
            "services": ["a@b.co", "x", "y"],
            "fullName": "Grace Hopper",
        });
        let found = extract_contact(&data);
        assert_eq!(found.name.as_deref(), Some("Grace Hopper"));
        assert_eq!(found.email, None);
    }

    #[test]
    fn flat_keys_follow_priority() {
        let data = json!({
            "first_name": "Second",
            "name": "First",
            "email": "no-at-sign",
            "contact_email": "c@example.com",
        });
        let found = extract_contact(&data);
        assert_eq!(found.name.as_deref(), Some("First"));
        assert_eq!(found.email.as_deref(), Some("c@example.com"));
    }

    #[test]
    fn any_address_like_string_is_the_last_resort() {
        let data = json!({
            "q1": "user@localhost",
            "q2": "reach me at me@example.org",
            "score": 9,
        });
        assert_eq!(
            extract_contact(&data).email.as_deref(),
            Some("reach me at me@example.org")
        );
    }

    #[test]
    fn non_object_data_is_empty() {
        assert!(extract_contact(&json!(["a@b.co"])).is_empty());
        assert!(extract_contact(&Value::Null).is_empty());
    }
}
