// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation mirror and message queries.

use chrono::NaiveDateTime;
use crmbridge_core::types::{ChatMessage, Conversation};
use crmbridge_core::{BridgeError, time};
use rusqlite::{OptionalExtension, params};

use super::{ts, ts_opt};
use crate::database::{Database, map_tr_err};

/// Loads a conversation and its messages in insertion order.
pub async fn get_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<Conversation>, BridgeError> {
    let id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            let header = conn
                .query_row(
                    "SELECT conversation_id, status, inbox_id, inbox_name, contact_name, \
                     contact_email, customer, lead, created_at, updated_at \
                     FROM conversations WHERE conversation_id = ?1",
                    params![id],
                    |row| {
                        let status: String = row.get(1)?;
                        Ok(Conversation {
                            conversation_id: row.get(0)?,
                            status: status.parse().unwrap_or_default(),
                            inbox_id: row.get(2)?,
                            inbox_name: row.get(3)?,
                            contact_name: row.get(4)?,
                            contact_email: row.get(5)?,
                            customer: row.get(6)?,
                            lead: row.get(7)?,
                            created_at: ts(row.get(8)?),
                            updated_at: ts(row.get(9)?),
                            messages: Vec::new(),
                        })
                    },
                )
                .optional()?;

            let Some(mut conversation) = header else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT message_id, content, message_type, sender_type, sender_id, \
                 sender_name, created_at \
                 FROM conversation_messages WHERE conversation_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![id], |row| {
                let message_type: String = row.get(2)?;
                let sender_type: String = row.get(3)?;
                Ok(ChatMessage {
                    message_id: row.get(0)?,
                    content: row.get(1)?,
                    message_type: message_type.parse().unwrap_or_default(),
                    sender_type: sender_type.parse().unwrap_or_default(),
                    sender_id: row.get(4)?,
                    sender_name: row.get(5)?,
                    created_at: ts(row.get(6)?),
                })
            })?;
            for row in rows {
                conversation.messages.push(row?);
            }
            Ok(Some(conversation))
        })
        .await
        .map_err(map_tr_err)
}

/// Inserts or replaces the conversation header. Messages are untouched.
pub async fn save_conversation(db: &Database, c: &Conversation) -> Result<(), BridgeError> {
    let conversation_id = c.conversation_id.clone();
    let status = c.status.to_string();
    let inbox_id = c.inbox_id.clone();
    let inbox_name = c.inbox_name.clone();
    let contact_name = c.contact_name.clone();
    let contact_email = c.contact_email.clone();
    let customer = c.customer.clone();
    let lead = c.lead.clone();
    let created_at = time::to_storage(&c.created_at);
    let updated_at = time::to_storage(&c.updated_at);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversations (conversation_id, status, inbox_id, inbox_name, \
                 contact_name, contact_email, customer, lead, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
                 ON CONFLICT(conversation_id) DO UPDATE SET \
                 status = excluded.status, inbox_id = excluded.inbox_id, \
                 inbox_name = excluded.inbox_name, contact_name = excluded.contact_name, \
                 contact_email = excluded.contact_email, customer = excluded.customer, \
                 lead = excluded.lead, updated_at = excluded.updated_at",
                params![
                    conversation_id,
                    status,
                    inbox_id,
                    inbox_name,
                    contact_name,
                    contact_email,
                    customer,
                    lead,
                    created_at,
                    updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Appends one message row. Fails if the conversation row does not exist.
pub async fn append_message(
    db: &Database,
    conversation_id: &str,
    m: &ChatMessage,
) -> Result<(), BridgeError> {
    let conversation_id = conversation_id.to_string();
    let message_id = m.message_id.clone();
    let content = m.content.clone();
    let message_type = m.message_type.to_string();
    let sender_type = m.sender_type.to_string();
    let sender_id = m.sender_id.clone();
    let sender_name = m.sender_name.clone();
    let created_at = time::to_storage(&m.created_at);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversation_messages (conversation_id, message_id, content, \
                 message_type, sender_type, sender_id, sender_name, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    conversation_id,
                    message_id,
                    content,
                    message_type,
                    sender_type,
                    sender_id,
                    sender_name,
                    created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Ids of resolved conversations with `updated_at` strictly before `cutoff`.
pub async fn list_stale_resolved(
    db: &Database,
    cutoff: NaiveDateTime,
) -> Result<Vec<String>, BridgeError> {
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT conversation_id, updated_at FROM conversations WHERE status = 'resolved'",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut ids = Vec::new();
            for row in rows {
                let (id, updated_at) = row?;
                // Compare parsed values; stored text may lack the fraction.
                if ts_opt(Some(updated_at)).is_some_and(|updated| updated < cutoff) {
                    ids.push(id);
                }
            }
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes a conversation; messages go with it through the cascade.
pub async fn delete_conversation(db: &Database, conversation_id: &str) -> Result<bool, BridgeError> {
    let id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let n = conn.execute(
                "DELETE FROM conversations WHERE conversation_id = ?1",
                params![id],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crmbridge_core::types::{ConversationStatus, MessageType, SenderType};

    fn message(id: &str) -> ChatMessage {
        ChatMessage {
            message_id: id.into(),
            content: format!("hello {id}"),
            message_type: MessageType::Incoming,
            sender_type: SenderType::Contact,
            sender_id: Some("9".into()),
            sender_name: Some("Pat".into()),
            created_at: time::now(),
        }
    }

    #[tokio::test]
    async fn conversation_round_trip_with_messages() {
        let db = Database::open_in_memory().await.unwrap();
        let mut conv = Conversation::new("101", time::now());
        conv.inbox_name = Some("Website".into());
        conv.status = ConversationStatus::Pending;
        save_conversation(&db, &conv).await.unwrap();
        append_message(&db, "101", &message("1")).await.unwrap();
        append_message(&db, "101", &message("2")).await.unwrap();

        let loaded = get_conversation(&db, "101").await.unwrap().unwrap();
        assert_eq!(loaded.status, ConversationStatus::Pending);
        assert_eq!(loaded.inbox_name.as_deref(), Some("Website"));
        let ids: Vec<_> = loaded.messages.iter().map(|m| m.message_id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(loaded.messages[0].sender_name.as_deref(), Some("Pat"));
    }

    #[tokio::test]
    async fn save_updates_existing_header() {
        let db = Database::open_in_memory().await.unwrap();
        let mut conv = Conversation::new("5", time::now());
        save_conversation(&db, &conv).await.unwrap();
        conv.status = ConversationStatus::Resolved;
        conv.customer = Some("Acme".into());
        save_conversation(&db, &conv).await.unwrap();
        let loaded = get_conversation(&db, "5").await.unwrap().unwrap();
        assert_eq!(loaded.status, ConversationStatus::Resolved);
        assert_eq!(loaded.customer.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn message_requires_conversation() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(append_message(&db, "missing", &message("1")).await.is_err());
    }

    #[tokio::test]
    async fn stale_listing_and_cascade_delete() {
        let db = Database::open_in_memory().await.unwrap();
        let now = time::now();

        let mut old = Conversation::new("old", now - Duration::days(100));
        old.status = ConversationStatus::Resolved;
        save_conversation(&db, &old).await.unwrap();
        append_message(&db, "old", &message("m")).await.unwrap();

        let mut open_old = Conversation::new("open-old", now - Duration::days(100));
        open_old.status = ConversationStatus::Open;
        save_conversation(&db, &open_old).await.unwrap();

        let mut recent = Conversation::new("recent", now - Duration::days(1));
        recent.status = ConversationStatus::Resolved;
        save_conversation(&db, &recent).await.unwrap();

        let stale = list_stale_resolved(&db, now - Duration::days(90)).await.unwrap();
        assert_eq!(stale, vec!["old".to_string()]);

        assert!(delete_conversation(&db, "old").await.unwrap());
        assert!(!delete_conversation(&db, "old").await.unwrap());
        assert!(get_conversation(&db, "old").await.unwrap().is_none());

        let orphaned: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM conversation_messages WHERE conversation_id = 'old'",
                    [],
                    |r| r.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(orphaned, 0);
    }
}
