// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain records shared by the store traits, reconcilers, and API surface.
//!
//! Customer, Lead, Issue, and Comment belong to the business application;
//! crmbridge only reads them and writes the vendor link fields plus core
//! name/email/phone. Conversation, Survey, and SurveyResponse are mirrors of
//! remote records keyed by their remote ids.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which business entity a contact resolved to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum EntityKind {
    Customer,
    Lead,
}

/// A resolved reference to a Customer or Lead record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRef {
    pub kind: EntityKind,
    pub name: String,
}

impl ContactRef {
    pub fn customer(name: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Customer,
            name: name.into(),
        }
    }

    pub fn lead(name: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Lead,
            name: name.into(),
        }
    }
}

/// Columns a Customer or Lead can be looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Email,
    Mobile,
    ChatwootContactId,
    FormbricksResponseId,
}

impl ContactField {
    /// Column name in both the customers and leads tables.
    pub fn column(self) -> &'static str {
        match self {
            Self::Email => "email_id",
            Self::Mobile => "mobile_no",
            Self::ChatwootContactId => "chatwoot_contact_id",
            Self::FormbricksResponseId => "formbricks_response_id",
        }
    }
}

/// A business customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub customer_name: String,
    pub customer_type: String,
    pub customer_group: Option<String>,
    pub territory: Option<String>,
    pub email_id: Option<String>,
    pub mobile_no: Option<String>,
    pub chatwoot_contact_id: Option<String>,
    pub formbricks_contact_id: Option<String>,
}

/// Lifecycle status of a Lead.
pub const LEAD_STATUS_OPEN: &str = "Lead";
pub const LEAD_STATUS_CONVERTED: &str = "Converted";

/// A sales lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub name: String,
    pub lead_name: String,
    pub email_id: Option<String>,
    pub mobile_no: Option<String>,
    pub source: Option<String>,
    pub status: String,
    pub chatwoot_contact_id: Option<String>,
    pub chatwoot_conversation_id: Option<String>,
    pub formbricks_contact_id: Option<String>,
    pub formbricks_response_id: Option<String>,
    pub lead_score: Option<i64>,
}

/// A support ticket that may mirror a chat conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub name: String,
    pub subject: String,
    pub raised_by: String,
    pub description: String,
    pub issue_type: Option<String>,
    pub customer: Option<String>,
    pub chatwoot_conversation_id: Option<String>,
}

/// Comment type for user-authored comments; other types are system notes.
pub const COMMENT_TYPE_COMMENT: &str = "Comment";

/// A comment attached to a business record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_comment_type")]
    pub comment_type: String,
    pub reference_doctype: String,
    pub reference_name: String,
    pub content: String,
    #[serde(default)]
    pub owner: String,
}

fn default_comment_type() -> String {
    COMMENT_TYPE_COMMENT.to_string()
}

/// Status of a chat conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    Open,
    Resolved,
    Pending,
}

/// Direction/kind of a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Incoming,
    Outgoing,
    Activity,
}

impl MessageType {
    /// Maps the vendor's string or numeric message type.
    ///
    /// The webhook payloads send strings; the REST API sends 0/1/2.
    pub fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(1) => Self::Outgoing,
                Some(2) => Self::Activity,
                _ => Self::Incoming,
            },
            serde_json::Value::String(s) => s.parse().unwrap_or_default(),
            _ => Self::Incoming,
        }
    }
}

/// Who authored a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    #[default]
    Contact,
    Agent,
    Bot,
}

impl SenderType {
    /// Maps the vendor's sender type string. Human agents arrive as `user`.
    pub fn from_vendor(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "agent" | "user" => Self::Agent,
            "agent_bot" | "bot" => Self::Bot,
            _ => Self::Contact,
        }
    }
}

/// One message inside a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: String,
    pub content: String,
    pub message_type: MessageType,
    pub sender_type: SenderType,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Local mirror of a remote chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    pub status: ConversationStatus,
    pub inbox_id: Option<String>,
    pub inbox_name: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub customer: Option<String>,
    pub lead: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Ordered by insertion; loaded with the conversation.
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    /// A fresh open conversation stamped with the given time.
    pub fn new(conversation_id: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            status: ConversationStatus::Open,
            inbox_id: None,
            inbox_name: None,
            contact_name: None,
            contact_email: None,
            customer: None,
            lead: None,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        }
    }

    pub fn has_message(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.message_id == message_id)
    }

    /// Applies a resolved contact link.
    pub fn link(&mut self, contact: &ContactRef) {
        match contact.kind {
            EntityKind::Customer => self.customer = Some(contact.name.clone()),
            EntityKind::Lead => self.lead = Some(contact.name.clone()),
        }
    }
}

/// Local mirror of a remote survey definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub survey_id: String,
    pub name: String,
    pub status: String,
    pub survey_type: String,
    pub questions: serde_json::Value,
}

/// One respondent's survey submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    /// Local record name, derived from `response_id`.
    pub name: String,
    pub response_id: String,
    /// Link to a synced survey (its remote `survey_id`).
    pub survey: Option<String>,
    pub data: serde_json::Value,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub finished: bool,
    pub finished_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub customer: Option<String>,
    pub lead: Option<String>,
}

impl SurveyResponse {
    pub fn new(response_id: impl Into<String>) -> Self {
        let response_id = response_id.into();
        Self {
            name: response_record_name(&response_id),
            response_id,
            survey: None,
            data: serde_json::Value::Object(Default::default()),
            contact_name: None,
            contact_email: None,
            contact_phone: None,
            finished: false,
            finished_at: None,
            created_at: None,
            customer: None,
            lead: None,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.customer.is_some() || self.lead.is_some()
    }

    pub fn link(&mut self, contact: &ContactRef) {
        match contact.kind {
            EntityKind::Customer => self.customer = Some(contact.name.clone()),
            EntityKind::Lead => self.lead = Some(contact.name.clone()),
        }
    }
}

/// Deterministic local record name for a survey response.
///
/// Two deliveries of the same response always target the same row, so the
/// uniqueness constraint on the name catches concurrent inserts.
pub fn response_record_name(response_id: &str) -> String {
    format!("FBR-{response_id}")
}

/// The two external services.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Integration {
    Chatwoot,
    Formbricks,
}

/// Mutable per-integration state kept next to the static configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationState {
    pub integration: Integration,
    pub last_sync: Option<NaiveDateTime>,
    pub webhook_registered: bool,
    pub sync_status: Option<String>,
}

impl IntegrationState {
    pub fn new(integration: Integration) -> Self {
        Self {
            integration,
            last_sync: None,
            webhook_registered: false,
            sync_status: None,
        }
    }
}
