// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed Formbricks webhook events.

use chrono::NaiveDateTime;
use crmbridge_core::json::{bool_field, id_field};
use crmbridge_core::time;
use serde_json::{Value, json};

/// Triggers Formbricks is asked to deliver.
pub const TRIGGERS: [&str; 3] = ["responseCreated", "responseUpdated", "responseFinished"];

/// The response object carried under `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePayload {
    pub response_id: String,
    pub survey_id: Option<String>,
    /// The respondent's answers, keyed by question id.
    pub data: Value,
    pub created_at: Option<NaiveDateTime>,
    pub finished: bool,
    pub finished_at: Option<NaiveDateTime>,
}

/// One inbound Formbricks webhook.
#[derive(Debug, Clone, PartialEq)]
pub enum FormbricksEvent {
    ResponseCreated(ResponsePayload),
    ResponseUpdated(ResponsePayload),
    ResponseFinished(ResponsePayload),
    /// A recognized event that carries nothing to act on.
    Skipped {
        event: String,
        reason: &'static str,
    },
    Unknown(String),
}

impl FormbricksEvent {
    /// Resolves a payload whose trigger is `event_type`.
    pub fn parse(event_type: &str, payload: &Value) -> Self {
        if !TRIGGERS.contains(&event_type) {
            return Self::Unknown(event_type.to_string());
        }
        let Some(response) = parse_response(payload.get("data").unwrap_or(&Value::Null)) else {
            return Self::Skipped {
                event: event_type.to_string(),
                reason: "response without id",
            };
        };
        match event_type {
            "responseCreated" => Self::ResponseCreated(response),
            "responseUpdated" => Self::ResponseUpdated(response),
            _ => Self::ResponseFinished(response),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::ResponseCreated(_) => "responseCreated",
            Self::ResponseUpdated(_) => "responseUpdated",
            Self::ResponseFinished(_) => "responseFinished",
            Self::Skipped { event, .. } => event,
            Self::Unknown(event) => event,
        }
    }
}

/// The trigger name of a delivery, read from `webhookEvent` or `event`.
pub fn event_type(payload: &Value) -> Option<&str> {
    ["webhookEvent", "event"]
        .iter()
        .filter_map(|key| payload.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Reads a response object as sent in webhooks and by the management API.
///
/// The id may be `id` or `responseId`. Returns `None` without one.
pub fn parse_response(object: &Value) -> Option<ResponsePayload> {
    let response_id = id_field(object, "id").or_else(|| id_field(object, "responseId"))?;
    let finished = bool_field(object, "finished").unwrap_or(false);
    Some(ResponsePayload {
        response_id,
        survey_id: id_field(object, "surveyId"),
        data: object
            .get("data")
            .filter(|d| !d.is_null())
            .cloned()
            .unwrap_or_else(|| json!({})),
        created_at: time::normalize_opt(object.get("createdAt")),
        finished,
        finished_at: if finished {
            time::normalize_opt(object.get("finishedAt"))
        } else {
            None
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_webhook_event_or_event() {
        assert_eq!(
            event_type(&json!({"webhookEvent": "responseFinished", "event": "x"})),
            Some("responseFinished")
        );
        assert_eq!(event_type(&json!({"event": "responseCreated"})), Some("responseCreated"));
        assert_eq!(event_type(&json!({"webhookEvent": ""})), None);
        assert_eq!(event_type(&json!({})), None);
    }

    #[test]
    fn parses_response_fields() {
        let payload = json!({
            "webhookEvent": "responseUpdated",
            "data": {
                "responseId": 42,
                "surveyId": "srv1",
                "createdAt": "2026-03-01T10:00:00.000Z",
                "finished": true,
                "finishedAt": "2026-03-01T10:05:00.000Z",
                "data": {"q1": "yes"}
            }
        });
        let FormbricksEvent::ResponseUpdated(response) =
            FormbricksEvent::parse("responseUpdated", &payload)
        else {
            panic!("expected ResponseUpdated");
        };
        assert_eq!(response.response_id, "42");
        assert_eq!(response.survey_id.as_deref(), Some("srv1"));
        assert_eq!(response.data, json!({"q1": "yes"}));
        assert!(response.finished);
        assert_eq!(
            response.finished_at.map(|t| t.to_string()).as_deref(),
            Some("2026-03-01 10:05:00")
        );
    }

    #[test]
    fn finished_at_ignored_while_unfinished() {
        let response = parse_response(&json!({
            "id": "r1",
            "finished": false,
            "finishedAt": "2026-03-01T10:05:00Z"
        }))
        .unwrap();
        assert_eq!(response.finished_at, None);
        assert_eq!(response.data, json!({}));
    }

    #[test]
    fn missing_id_is_skipped_and_unknown_is_kept() {
        assert!(matches!(
            FormbricksEvent::parse("responseCreated", &json!({"data": {}})),
            FormbricksEvent::Skipped { .. }
        ));
        let unknown = FormbricksEvent::parse("displayCreated", &json!({}));
        assert_eq!(unknown, FormbricksEvent::Unknown("displayCreated".into()));
        assert_eq!(unknown.name(), "displayCreated");
    }
}
