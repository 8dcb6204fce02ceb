// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed Chatwoot webhook events.
//!
//! Chatwoot nests the same information differently per event and per
//! version: the conversation may sit at the root or under `conversation`,
//! the contact under `sender`, `meta.sender`, or the conversation's
//! `meta.sender`. All of that is resolved here, once, so the reconcilers
//! only see explicit optional fields.

use chrono::NaiveDateTime;
use crmbridge_core::BridgeError;
use crmbridge_core::json::{id_field, object_field, str_field};
use crmbridge_core::time;
use crmbridge_core::types::{ConversationStatus, MessageType, SenderType};
use crmbridge_crm::RemoteContact;
use serde_json::Value;

/// Event names Chatwoot is asked to deliver.
pub const SUBSCRIPTIONS: [&str; 6] = [
    "conversation_created",
    "conversation_updated",
    "conversation_status_changed",
    "message_created",
    "contact_created",
    "contact_updated",
];

/// A conversation as described by a created/updated event.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationPayload {
    pub conversation_id: String,
    /// Raw status string; absent means `open`.
    pub status: Option<String>,
    pub inbox_id: Option<String>,
    pub inbox_name: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub contact: Option<RemoteContact>,
}

/// A status transition reported by `conversation_status_changed`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub conversation_id: String,
    pub status: ConversationStatus,
}

/// A message reported by `message_created`.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePayload {
    pub conversation_id: String,
    pub message_id: String,
    pub content: String,
    pub message_type: MessageType,
    pub sender_type: SenderType,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    /// The conversation's contact, when the payload identifies one.
    pub contact: Option<RemoteContact>,
}

/// One inbound Chatwoot webhook, resolved from its raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatwootEvent {
    ConversationCreated(ConversationPayload),
    ConversationUpdated(ConversationPayload),
    ConversationStatusChanged(StatusChange),
    MessageCreated(MessagePayload),
    ContactCreated(RemoteContact),
    ContactUpdated(RemoteContact),
    /// A recognized event that carries nothing to act on.
    Skipped {
        event: String,
        reason: &'static str,
    },
    /// An event type this bridge does not handle.
    Unknown(String),
}

impl ChatwootEvent {
    /// Resolves a payload whose `event` discriminator is `event_type`.
    ///
    /// Fails only when a recognized event carries a value that cannot be
    /// interpreted, such as an unknown conversation status.
    pub fn parse(event_type: &str, payload: &Value) -> Result<Self, BridgeError> {
        let skipped = |reason| Self::Skipped {
            event: event_type.to_string(),
            reason,
        };

        let event = match event_type {
            "conversation_created" | "conversation_updated" => {
                let conversation = conversation_object(payload);
                let Some(parsed) = parse_conversation(payload, conversation) else {
                    return Ok(skipped("conversation without id"));
                };
                if event_type == "conversation_created" {
                    Self::ConversationCreated(parsed)
                } else {
                    Self::ConversationUpdated(parsed)
                }
            }
            "conversation_status_changed" => {
                let conversation = conversation_object(payload);
                let (Some(conversation_id), Some(raw)) = (
                    id_field(conversation, "id"),
                    str_field(conversation, "status"),
                ) else {
                    return Ok(skipped("status change without id or status"));
                };
                let status = raw.parse::<ConversationStatus>().map_err(|_| {
                    BridgeError::InvalidPayload(format!("unknown conversation status: {raw}"))
                })?;
                Self::ConversationStatusChanged(StatusChange {
                    conversation_id,
                    status,
                })
            }
            "message_created" => match parse_message(payload) {
                Some(message) => Self::MessageCreated(message),
                None => return Ok(skipped("message without conversation or content")),
            },
            "contact_created" | "contact_updated" => {
                let Some(contact) = contact_object(payload).map(contact_from) else {
                    return Ok(skipped("contact without id"));
                };
                if event_type == "contact_created" {
                    Self::ContactCreated(contact)
                } else {
                    Self::ContactUpdated(contact)
                }
            }
            other => Self::Unknown(other.to_string()),
        };
        Ok(event)
    }

    /// The wire name of this event.
    pub fn name(&self) -> &str {
        match self {
            Self::ConversationCreated(_) => "conversation_created",
            Self::ConversationUpdated(_) => "conversation_updated",
            Self::ConversationStatusChanged(_) => "conversation_status_changed",
            Self::MessageCreated(_) => "message_created",
            Self::ContactCreated(_) => "contact_created",
            Self::ContactUpdated(_) => "contact_updated",
            Self::Skipped { event, .. } => event,
            Self::Unknown(event) => event,
        }
    }
}

/// Builds a contact view from a Chatwoot contact or sender object.
pub fn contact_from(value: &Value) -> RemoteContact {
    RemoteContact {
        id: id_field(value, "id"),
        name: str_field(value, "name"),
        email: str_field(value, "email"),
        phone: str_field(value, "phone_number").or_else(|| str_field(value, "phone")),
    }
}

fn conversation_object(payload: &Value) -> &Value {
    match object_field(payload, "conversation") {
        Some(conversation) if non_empty_object(conversation) => conversation,
        _ => payload,
    }
}

fn parse_conversation(payload: &Value, conversation: &Value) -> Option<ConversationPayload> {
    let conversation_id = id_field(conversation, "id")?;
    let contact = [
        object_field(payload, "sender"),
        payload.pointer("/meta/sender"),
        conversation.pointer("/meta/sender"),
    ]
    .into_iter()
    .flatten()
    .find(|v| non_empty_object(v))
    .map(contact_from);

    Some(ConversationPayload {
        conversation_id,
        status: str_field(conversation, "status"),
        inbox_id: id_field(conversation, "inbox_id"),
        inbox_name: inbox_name(conversation),
        created_at: time::normalize_opt(conversation.get("created_at")),
        updated_at: time::normalize_opt(conversation.get("updated_at")),
        contact,
    })
}

/// Inbox name from `meta.channel` or `meta.inbox`, each either a string or
/// an object with a `name`.
fn inbox_name(conversation: &Value) -> Option<String> {
    let meta = conversation.get("meta")?;
    let inbox = meta
        .get("channel")
        .filter(|v| !is_blank(v))
        .or_else(|| meta.get("inbox"))?;
    match inbox {
        Value::Object(_) => str_field(inbox, "name"),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn parse_message(payload: &Value) -> Option<MessagePayload> {
    let content = str_field(payload, "content").or_else(|| {
        payload
            .get("message")
            .and_then(|m| str_field(m, "content"))
    })?;
    let conversation = object_field(payload, "conversation").filter(|c| non_empty_object(c))?;
    let conversation_id = id_field(conversation, "id")?;
    let message_id = id_field(payload, "id")?;

    let sender = object_field(payload, "sender");
    let sender_type = sender
        .and_then(|s| str_field(s, "type"))
        .map(|t| SenderType::from_vendor(&t))
        .unwrap_or_default();

    let contact = conversation
        .pointer("/meta/sender")
        .filter(|v| non_empty_object(v))
        .or(sender.filter(|_| sender_type == SenderType::Contact))
        .map(contact_from);

    Some(MessagePayload {
        conversation_id,
        message_id,
        content,
        message_type: payload
            .get("message_type")
            .map(MessageType::from_value)
            .unwrap_or_default(),
        sender_type,
        sender_id: sender.and_then(|s| id_field(s, "id")),
        sender_name: sender.and_then(|s| str_field(s, "name")),
        created_at: time::normalize_opt(payload.get("created_at")),
        contact,
    })
}

fn contact_object(payload: &Value) -> Option<&Value> {
    match object_field(payload, "contact") {
        Some(contact) if non_empty_object(contact) => Some(contact),
        _ if payload.get("id").is_some_and(|v| !v.is_null()) => Some(payload),
        _ => None,
    }
}

fn non_empty_object(value: &Value) -> bool {
    value.as_object().is_some_and(|o| !o.is_empty())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversation_at_root_with_channel_string() {
        let payload = json!({
            "event": "conversation_created",
            "id": 42,
            "status": "pending",
            "inbox_id": 3,
            "meta": {
                "channel": "Channel::WebWidget",
                "sender": {"id": 9, "name": "Ada", "email": "ada@example.com"}
            },
            "created_at": 1700000000
        });
        let ChatwootEvent::ConversationCreated(c) =
            ChatwootEvent::parse("conversation_created", &payload).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(c.conversation_id, "42");
        assert_eq!(c.status.as_deref(), Some("pending"));
        assert_eq!(c.inbox_id.as_deref(), Some("3"));
        assert_eq!(c.inbox_name.as_deref(), Some("Channel::WebWidget"));
        assert!(c.created_at.is_some());
        let contact = c.contact.unwrap();
        assert_eq!(contact.id.as_deref(), Some("9"));
        assert_eq!(contact.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn conversation_nested_with_inbox_object() {
        let payload = json!({
            "conversation": {
                "id": "7",
                "meta": {"inbox": {"name": "Support"}, "sender": {"id": 1}}
            },
            "sender": {"id": 2, "name": "From Root"}
        });
        let ChatwootEvent::ConversationUpdated(c) =
            ChatwootEvent::parse("conversation_updated", &payload).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(c.inbox_name.as_deref(), Some("Support"));
        assert_eq!(c.contact.unwrap().id.as_deref(), Some("2"));
    }

    #[test]
    fn status_change_parses_and_rejects_unknown() {
        let ok = json!({"conversation": {"id": 5, "status": "resolved"}});
        assert_eq!(
            ChatwootEvent::parse("conversation_status_changed", &ok).unwrap(),
            ChatwootEvent::ConversationStatusChanged(StatusChange {
                conversation_id: "5".into(),
                status: ConversationStatus::Resolved,
            })
        );

        let bad = json!({"conversation": {"id": 5, "status": "snoozed"}});
        assert!(matches!(
            ChatwootEvent::parse("conversation_status_changed", &bad),
            Err(BridgeError::InvalidPayload(_))
        ));

        let missing = json!({"conversation": {"id": 5}});
        assert!(matches!(
            ChatwootEvent::parse("conversation_status_changed", &missing).unwrap(),
            ChatwootEvent::Skipped { .. }
        ));
    }

    #[test]
    fn message_reads_nested_content_and_sender() {
        let payload = json!({
            "id": 100,
            "message": {"content": "hello"},
            "message_type": "incoming",
            "conversation": {"id": 8, "meta": {"sender": {"id": 4, "email": "c@example.com"}}},
            "sender": {"id": 4, "name": "Cy", "type": "contact"},
            "created_at": "2025-12-20T23:27:30.601234567Z"
        });
        let ChatwootEvent::MessageCreated(m) =
            ChatwootEvent::parse("message_created", &payload).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(m.content, "hello");
        assert_eq!(m.conversation_id, "8");
        assert_eq!(m.message_id, "100");
        assert_eq!(m.sender_type, SenderType::Contact);
        assert_eq!(m.sender_name.as_deref(), Some("Cy"));
        assert_eq!(m.contact.unwrap().email.as_deref(), Some("c@example.com"));
    }

    #[test]
    fn agent_message_does_not_become_contact() {
        let payload = json!({
            "id": 1,
            "content": "on it",
            "message_type": 1,
            "conversation": {"id": 8},
            "sender": {"id": 2, "name": "Agent", "type": "user"}
        });
        let ChatwootEvent::MessageCreated(m) =
            ChatwootEvent::parse("message_created", &payload).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(m.sender_type, SenderType::Agent);
        assert_eq!(m.message_type, MessageType::Outgoing);
        assert!(m.contact.is_none());
    }

    #[test]
    fn empty_message_is_skipped() {
        let payload = json!({"id": 1, "content": "", "conversation": {"id": 8}});
        assert!(matches!(
            ChatwootEvent::parse("message_created", &payload).unwrap(),
            ChatwootEvent::Skipped { .. }
        ));
        let no_conv = json!({"id": 1, "content": "hi"});
        assert!(matches!(
            ChatwootEvent::parse("message_created", &no_conv).unwrap(),
            ChatwootEvent::Skipped { .. }
        ));
    }

    #[test]
    fn contact_at_root_or_nested() {
        let root = json!({"id": 11, "name": "Root", "phone_number": "+1555"});
        let ChatwootEvent::ContactUpdated(c) =
            ChatwootEvent::parse("contact_updated", &root).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(c.id.as_deref(), Some("11"));
        assert_eq!(c.phone.as_deref(), Some("+1555"));

        let nested = json!({"contact": {"id": 12, "email": "n@example.com"}});
        let event = ChatwootEvent::parse("contact_created", &nested).unwrap();
        assert_eq!(event.name(), "contact_created");

        let empty = json!({"event": "contact_created"});
        assert!(matches!(
            ChatwootEvent::parse("contact_created", &empty).unwrap(),
            ChatwootEvent::Skipped { .. }
        ));
    }

    #[test]
    fn unknown_event_is_preserved() {
        let event = ChatwootEvent::parse("webwidget_triggered", &json!({})).unwrap();
        assert_eq!(event, ChatwootEvent::Unknown("webwidget_triggered".into()));
        assert_eq!(event.name(), "webwidget_triggered");
    }
}
