// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation reconciler.
//!
//! Keeps the local conversation mirrors in step with Chatwoot: upserts on
//! created/updated events, status changes for known conversations only,
//! message appends deduplicated by message id, and the retention sweep
//! that drops old resolved conversations.
//!
//! Message dedup is a read-then-append without a uniqueness constraint, so
//! two concurrent deliveries of the same message can both append it.

use chrono::Duration;
use crmbridge_config::ChatwootConfig;
use crmbridge_core::json::{id_field, id_string, str_field};
use crmbridge_core::types::{
    ChatMessage, Conversation, ConversationStatus, MessageType, SenderType,
};
use crmbridge_core::{BridgeError, ConversationStore, Store, SweepReport, time};
use crmbridge_crm::{RemoteContact, link_chat_contact, maybe_create_lead_from_conversation};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::ChatwootClient;
use crate::events::{ConversationPayload, MessagePayload, StatusChange, contact_from};

/// Creates or updates a conversation from a created/updated event.
pub async fn upsert_conversation<S>(
    store: &S,
    payload: &ConversationPayload,
) -> Result<Conversation, BridgeError>
where
    S: Store + ?Sized,
{
    let now = time::now();
    let mut conversation = match store.get_conversation(&payload.conversation_id).await? {
        Some(existing) => existing,
        None => Conversation::new(&payload.conversation_id, now),
    };

    conversation.status = match payload.status.as_deref() {
        None => ConversationStatus::Open,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(
                conversation_id = %payload.conversation_id,
                status = raw,
                "unknown conversation status, treating as open"
            );
            ConversationStatus::Open
        }),
    };
    if payload.inbox_id.is_some() {
        conversation.inbox_id = payload.inbox_id.clone();
    }
    if payload.inbox_name.is_some() {
        conversation.inbox_name = payload.inbox_name.clone();
    }

    if let Some(contact) = &payload.contact {
        conversation.contact_name = contact.name.clone();
        conversation.contact_email = contact.email.clone();
        if contact.id.is_some()
            && let Some(linked) = link_chat_contact(store, contact).await?
        {
            conversation.link(&linked);
        }
    }

    if let Some(created_at) = payload.created_at {
        conversation.created_at = created_at;
    }
    conversation.updated_at = payload.updated_at.unwrap_or(now);

    store.save_conversation(&conversation).await?;
    debug!(
        conversation_id = %conversation.conversation_id,
        status = %conversation.status,
        "conversation upserted"
    );
    Ok(conversation)
}

/// Applies a status change. Returns false when the conversation is unknown;
/// this event never creates a conversation.
pub async fn apply_status_change<S>(store: &S, change: &StatusChange) -> Result<bool, BridgeError>
where
    S: Store + ?Sized,
{
    let Some(mut conversation) = store.get_conversation(&change.conversation_id).await? else {
        debug!(conversation_id = %change.conversation_id, "status change for unknown conversation");
        return Ok(false);
    };
    conversation.status = change.status;
    conversation.updated_at = time::now();
    store.save_conversation(&conversation).await?;
    Ok(true)
}

/// Appends an inbound message, creating the conversation if needed.
///
/// Returns false when the message id is already present. An unlinked
/// conversation with a known contact is offered to lead promotion.
pub async fn add_message<S>(
    store: &S,
    settings: &ChatwootConfig,
    message: &MessagePayload,
) -> Result<bool, BridgeError>
where
    S: Store + ?Sized,
{
    let record = ChatMessage {
        message_id: message.message_id.clone(),
        content: message.content.clone(),
        message_type: message.message_type,
        sender_type: message.sender_type,
        sender_id: message.sender_id.clone(),
        sender_name: message.sender_name.clone(),
        created_at: message.created_at.unwrap_or_else(time::now),
    };
    let Some(mut conversation) = append_message(
        store,
        &message.conversation_id,
        record,
        message.contact.as_ref(),
    )
    .await?
    else {
        debug!(
            conversation_id = %message.conversation_id,
            message_id = %message.message_id,
            "duplicate message ignored"
        );
        return Ok(false);
    };

    if conversation.customer.is_none()
        && conversation.lead.is_none()
        && let Some(contact) = &message.contact
        && let Some(lead) =
            maybe_create_lead_from_conversation(store, settings, contact, &conversation.conversation_id)
                .await?
    {
        conversation.link(&lead);
        store.save_conversation(&conversation).await?;
    }
    Ok(true)
}

/// Appends `message` unless its id is already present.
///
/// Returns the updated conversation, or `None` for a duplicate. A missing
/// conversation is created open, with `contact` copied and linked.
async fn append_message<S>(
    store: &S,
    conversation_id: &str,
    message: ChatMessage,
    contact: Option<&RemoteContact>,
) -> Result<Option<Conversation>, BridgeError>
where
    S: Store + ?Sized,
{
    let now = time::now();
    let mut conversation = match store.get_conversation(conversation_id).await? {
        Some(existing) => existing,
        None => {
            let mut fresh = Conversation::new(conversation_id, now);
            if let Some(contact) = contact {
                fresh.contact_name = contact.name.clone();
                fresh.contact_email = contact.email.clone();
                if contact.id.is_some()
                    && let Some(linked) = link_chat_contact(store, contact).await?
                {
                    fresh.link(&linked);
                }
            }
            fresh
        }
    };

    if conversation.has_message(&message.message_id) {
        return Ok(None);
    }

    conversation.updated_at = now;
    store.save_conversation(&conversation).await?;
    store.append_message(conversation_id, &message).await?;
    conversation.messages.push(message);
    Ok(Some(conversation))
}

/// Deletes resolved conversations idle for longer than the retention period.
///
/// Does nothing when the integration is disabled or the retention is zero or
/// negative, or when the retention period cannot be represented as a date.
/// A failed delete is logged and counted; the sweep continues.
pub async fn sweep_resolved<S>(
    store: &S,
    settings: &ChatwootConfig,
) -> Result<SweepReport, BridgeError>
where
    S: ConversationStore + ?Sized,
{
    let mut report = SweepReport::default();
    if !settings.enabled {
        debug!("chatwoot disabled, skipping conversation sweep");
        return Ok(report);
    }
    let retention_days = settings.conversation_retention_days;
    if retention_days <= 0 {
        debug!(retention_days, "conversation retention disabled");
        return Ok(report);
    }

    let Some(cutoff) =
        Duration::try_days(retention_days).and_then(|period| time::now().checked_sub_signed(period))
    else {
        warn!(retention_days, "retention period out of range, nothing to sweep");
        return Ok(report);
    };
    let stale = store.list_stale_resolved(cutoff).await?;
    report.candidates = stale.len();

    for conversation_id in stale {
        match store.delete_conversation(&conversation_id).await {
            Ok(true) => report.deleted += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "failed to delete conversation");
                report.failed += 1;
            }
        }
    }

    info!(
        retention_days,
        deleted = report.deleted,
        failed = report.failed,
        "conversation sweep finished"
    );
    Ok(report)
}

/// Sends an agent reply and records it locally as an outgoing message.
pub async fn send_reply<S>(
    store: &S,
    client: &ChatwootClient,
    conversation_id: &str,
    content: &str,
    sender_name: Option<&str>,
) -> Result<ChatMessage, BridgeError>
where
    S: Store + ?Sized,
{
    let content = content.trim();
    if content.is_empty() {
        return Err(BridgeError::Validation("reply content is empty".into()));
    }

    let result = client
        .send_message(conversation_id, content, "outgoing", false)
        .await?;
    let message_id = id_field(&result, "id").ok_or_else(|| {
        BridgeError::Internal(format!(
            "chatwoot accepted a message for conversation {conversation_id} but returned no id"
        ))
    })?;

    let message = ChatMessage {
        message_id,
        content: content.to_string(),
        message_type: MessageType::Outgoing,
        sender_type: SenderType::Agent,
        sender_id: None,
        sender_name: sender_name.map(str::to_string),
        created_at: time::normalize_opt(result.get("created_at")).unwrap_or_else(time::now),
    };
    append_message(store, conversation_id, message.clone(), None).await?;
    info!(conversation_id, message_id = %message.message_id, "reply sent");
    Ok(message)
}

/// Sets the status remotely, then locally if the conversation is mirrored.
pub async fn set_status<S>(
    store: &S,
    client: &ChatwootClient,
    conversation_id: &str,
    status: ConversationStatus,
) -> Result<(), BridgeError>
where
    S: Store + ?Sized,
{
    client
        .toggle_status(conversation_id, &status.to_string())
        .await?;
    let change = StatusChange {
        conversation_id: conversation_id.to_string(),
        status,
    };
    apply_status_change(store, &change).await?;
    Ok(())
}

/// Pulls the remote message list and appends any ids missing locally.
///
/// Returns the number of messages added.
pub async fn refresh_messages<S>(
    store: &S,
    client: &ChatwootClient,
    conversation_id: &str,
) -> Result<usize, BridgeError>
where
    S: Store + ?Sized,
{
    let Some(conversation) = store.get_conversation(conversation_id).await? else {
        return Err(BridgeError::NotFound {
            entity: "conversation",
            key: conversation_id.to_string(),
        });
    };

    let listing = client.get_messages(conversation_id).await?;
    let remote = listing
        .get("payload")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut added = 0;
    let mut known: Vec<String> = conversation
        .messages
        .iter()
        .map(|m| m.message_id.clone())
        .collect();
    for item in &remote {
        let Some(message) = message_from_api(item) else {
            continue;
        };
        if known.contains(&message.message_id) {
            continue;
        }
        known.push(message.message_id.clone());
        store.append_message(conversation_id, &message).await?;
        added += 1;
    }

    if added > 0 {
        let mut conversation = conversation;
        conversation.updated_at = time::now();
        store.save_conversation(&conversation).await?;
    }
    debug!(conversation_id, added, "messages refreshed");
    Ok(added)
}

/// Converts a message object from the REST API.
pub fn message_from_api(item: &Value) -> Option<ChatMessage> {
    let message_id = item.get("id").and_then(id_string)?;
    let sender = item.get("sender");
    Some(ChatMessage {
        message_id,
        content: str_field(item, "content").unwrap_or_default(),
        message_type: item
            .get("message_type")
            .map(MessageType::from_value)
            .unwrap_or_default(),
        sender_type: sender
            .and_then(|s| str_field(s, "type"))
            .map(|t| SenderType::from_vendor(&t))
            .unwrap_or_default(),
        sender_id: sender.and_then(|s| id_field(s, "id")),
        sender_name: sender.map(contact_from).and_then(|c| c.name),
        created_at: time::normalize_opt(item.get("created_at")).unwrap_or_else(time::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmbridge_core::types::{ContactField, Customer};
    use crmbridge_core::{ContactStore, ConversationStore};
    use crmbridge_storage::SqliteStore;

    fn payload(id: &str) -> ConversationPayload {
        ConversationPayload {
            conversation_id: id.into(),
            status: None,
            inbox_id: Some("1".into()),
            inbox_name: Some("Website".into()),
            created_at: None,
            updated_at: None,
            contact: Some(RemoteContact {
                id: Some("55".into()),
                name: Some("Dana".into()),
                email: Some("dana@example.com".into()),
                phone: None,
            }),
        }
    }

    fn message(conversation_id: &str, message_id: &str) -> MessagePayload {
        MessagePayload {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
            content: "hello".into(),
            message_type: MessageType::Incoming,
            sender_type: SenderType::Contact,
            sender_id: Some("55".into()),
            sender_name: Some("Dana".into()),
            created_at: None,
            contact: None,
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        upsert_conversation(&store, &payload("10")).await.unwrap();
        let mut again = payload("10");
        again.status = Some("pending".into());
        upsert_conversation(&store, &again).await.unwrap();

        let stored = store.get_conversation("10").await.unwrap().unwrap();
        assert_eq!(stored.status, ConversationStatus::Pending);
        assert_eq!(stored.inbox_name.as_deref(), Some("Website"));
        assert_eq!(stored.contact_email.as_deref(), Some("dana@example.com"));
    }

    #[tokio::test]
    async fn upsert_links_existing_customer_by_email() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert_customer(&Customer {
                name: "CUST-9".into(),
                customer_name: "Dana".into(),
                customer_type: "Individual".into(),
                email_id: Some("dana@example.com".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let conversation = upsert_conversation(&store, &payload("11")).await.unwrap();
        assert_eq!(conversation.customer.as_deref(), Some("CUST-9"));
        let linked = store
            .find_customer(ContactField::ChatwootContactId, "55")
            .await
            .unwrap();
        assert!(linked.is_some());
    }

    #[tokio::test]
    async fn unknown_status_falls_back_to_open() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut odd = payload("12");
        odd.status = Some("snoozed".into());
        let conversation = upsert_conversation(&store, &odd).await.unwrap();
        assert_eq!(conversation.status, ConversationStatus::Open);
    }

    #[tokio::test]
    async fn status_change_never_creates() {
        let store = SqliteStore::in_memory().await.unwrap();
        let change = StatusChange {
            conversation_id: "404".into(),
            status: ConversationStatus::Resolved,
        };
        assert!(!apply_status_change(&store, &change).await.unwrap());
        assert!(store.get_conversation("404").await.unwrap().is_none());

        upsert_conversation(&store, &payload("404")).await.unwrap();
        assert!(apply_status_change(&store, &change).await.unwrap());
        let stored = store.get_conversation("404").await.unwrap().unwrap();
        assert_eq!(stored.status, ConversationStatus::Resolved);
    }

    #[tokio::test]
    async fn message_creates_conversation_and_dedups() {
        let store = SqliteStore::in_memory().await.unwrap();
        let settings = ChatwootConfig::default();

        assert!(add_message(&store, &settings, &message("20", "m1")).await.unwrap());
        assert!(!add_message(&store, &settings, &message("20", "m1")).await.unwrap());
        assert!(add_message(&store, &settings, &message("20", "m2")).await.unwrap());

        let stored = store.get_conversation("20").await.unwrap().unwrap();
        assert_eq!(stored.status, ConversationStatus::Open);
        let ids: Vec<_> = stored.messages.iter().map(|m| m.message_id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2"]);
    }

    #[tokio::test]
    async fn message_promotes_unlinked_contact_to_lead() {
        let store = SqliteStore::in_memory().await.unwrap();
        let settings = ChatwootConfig {
            auto_create_lead: true,
            ..Default::default()
        };
        let mut incoming = message("21", "m1");
        incoming.contact = Some(RemoteContact {
            id: Some("77".into()),
            name: Some("Eli".into()),
            email: Some("eli@example.com".into()),
            phone: None,
        });

        add_message(&store, &settings, &incoming).await.unwrap();
        let stored = store.get_conversation("21").await.unwrap().unwrap();
        let lead_name = stored.lead.expect("conversation linked to new lead");
        let lead = store.get_lead(&lead_name).await.unwrap().unwrap();
        assert_eq!(lead.chatwoot_conversation_id.as_deref(), Some("21"));
        assert_eq!(lead.email_id.as_deref(), Some("eli@example.com"));
    }

    async fn resolved_at(store: &SqliteStore, id: &str, days_ago: i64) {
        let mut conversation = Conversation::new(id, time::now());
        conversation.status = ConversationStatus::Resolved;
        conversation.updated_at = time::now() - Duration::days(days_ago);
        store.save_conversation(&conversation).await.unwrap();
    }

    #[tokio::test]
    async fn sweep_honours_retention_window() {
        let store = SqliteStore::in_memory().await.unwrap();
        resolved_at(&store, "old", 91).await;
        resolved_at(&store, "recent", 89).await;

        let settings = ChatwootConfig {
            enabled: true,
            ..Default::default()
        };
        let report = sweep_resolved(&store, &settings).await.unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.failed, 0);
        assert!(store.get_conversation("old").await.unwrap().is_none());
        assert!(store.get_conversation("recent").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn zero_retention_deletes_nothing() {
        let store = SqliteStore::in_memory().await.unwrap();
        resolved_at(&store, "ancient", 4000).await;
        let settings = ChatwootConfig {
            enabled: true,
            conversation_retention_days: 0,
            ..Default::default()
        };
        let report = sweep_resolved(&store, &settings).await.unwrap();
        assert_eq!(report, SweepReport::default());
        assert!(store.get_conversation("ancient").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn huge_retention_sweeps_nothing() {
        let store = SqliteStore::in_memory().await.unwrap();
        resolved_at(&store, "ancient", 4000).await;
        let settings = ChatwootConfig {
            enabled: true,
            conversation_retention_days: 200_000_000_000,
            ..Default::default()
        };
        let report = sweep_resolved(&store, &settings).await.unwrap();
        assert_eq!(report, SweepReport::default());
        assert!(store.get_conversation("ancient").await.unwrap().is_some());

        let settings = ChatwootConfig {
            conversation_retention_days: i64::MAX,
            ..settings
        };
        let report = sweep_resolved(&store, &settings).await.unwrap();
        assert_eq!(report, SweepReport::default());
    }

    /// Delegates to SQLite but refuses to delete one conversation.
    struct FailingDelete {
        inner: SqliteStore,
        fail_on: &'static str,
    }

    #[async_trait::async_trait]
    impl ConversationStore for FailingDelete {
        async fn get_conversation(
            &self,
            conversation_id: &str,
        ) -> Result<Option<Conversation>, BridgeError> {
            self.inner.get_conversation(conversation_id).await
        }

        async fn save_conversation(&self, conversation: &Conversation) -> Result<(), BridgeError> {
            self.inner.save_conversation(conversation).await
        }

        async fn append_message(
            &self,
            conversation_id: &str,
            message: &ChatMessage,
        ) -> Result<(), BridgeError> {
            self.inner.append_message(conversation_id, message).await
        }

        async fn list_stale_resolved(
            &self,
            cutoff: chrono::NaiveDateTime,
        ) -> Result<Vec<String>, BridgeError> {
            self.inner.list_stale_resolved(cutoff).await
        }

        async fn delete_conversation(&self, conversation_id: &str) -> Result<bool, BridgeError> {
            if conversation_id == self.fail_on {
                return Err(BridgeError::Internal("disk full".into()));
            }
            self.inner.delete_conversation(conversation_id).await
        }
    }

    #[tokio::test]
    async fn failed_delete_is_counted_and_sweep_continues() {
        let inner = SqliteStore::in_memory().await.unwrap();
        resolved_at(&inner, "stuck", 100).await;
        resolved_at(&inner, "gone", 100).await;
        let store = FailingDelete {
            inner,
            fail_on: "stuck",
        };

        let settings = ChatwootConfig {
            enabled: true,
            ..Default::default()
        };
        let report = sweep_resolved(&store, &settings).await.unwrap();
        assert_eq!(report.candidates, 2);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.failed, 1);
        assert!(store.get_conversation("gone").await.unwrap().is_none());
        assert!(store.get_conversation("stuck").await.unwrap().is_some());
    }

    #[test]
    fn api_message_conversion() {
        let item = serde_json::json!({
            "id": 5,
            "content": null,
            "message_type": 1,
            "sender": {"id": 2, "name": "Agent Smith", "type": "user"},
            "created_at": 1700000000
        });
        let message = message_from_api(&item).unwrap();
        assert_eq!(message.message_id, "5");
        assert_eq!(message.content, "");
        assert_eq!(message.message_type, MessageType::Outgoing);
        assert_eq!(message.sender_type, SenderType::Agent);
        assert_eq!(message.sender_name.as_deref(), Some("Agent Smith"));
        assert!(message_from_api(&serde_json::json!({"content": "x"})).is_none());
    }
}
