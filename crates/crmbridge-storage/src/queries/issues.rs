// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Issue, comment, and user-token queries.

use crmbridge_core::types::{Comment, Issue};
use crmbridge_core::{BridgeError, time};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, is_constraint_violation, map_tr_err};

const ISSUE_COLUMNS: &str =
    "name, subject, raised_by, description, issue_type, customer, chatwoot_conversation_id";

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        name: row.get(0)?,
        subject: row.get(1)?,
        raised_by: row.get(2)?,
        description: row.get(3)?,
        issue_type: row.get(4)?,
        customer: row.get(5)?,
        chatwoot_conversation_id: row.get(6)?,
    })
}

pub async fn get_issue(db: &Database, name: &str) -> Result<Option<Issue>, BridgeError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Issue>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE name = ?1"),
                params![name],
                issue_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn find_issue_by_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<Issue>, BridgeError> {
    let id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Issue>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE chatwoot_conversation_id = ?1"),
                params![id],
                issue_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Inserts an issue. A second issue for the same conversation id is a
/// `Duplicate`.
pub async fn insert_issue(db: &Database, issue: &Issue) -> Result<(), BridgeError> {
    let i = issue.clone();
    let key = i.name.clone();
    let now = time::to_storage(&time::now());
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO issues (name, subject, raised_by, description, issue_type, \
                 customer, chatwoot_conversation_id, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    i.name,
                    i.subject,
                    i.raised_by,
                    i.description,
                    i.issue_type,
                    i.customer,
                    i.chatwoot_conversation_id,
                    now,
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;
    if inserted {
        Ok(())
    } else {
        Err(BridgeError::Duplicate { entity: "issue", key })
    }
}

pub async fn insert_comment(db: &Database, comment: &Comment) -> Result<(), BridgeError> {
    let c = comment.clone();
    let now = time::to_storage(&time::now());
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO comments (name, comment_type, reference_doctype, reference_name, \
                 content, owner, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    c.name,
                    c.comment_type,
                    c.reference_doctype,
                    c.reference_name,
                    c.content,
                    c.owner,
                    now,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_comments(
    db: &Database,
    reference_doctype: &str,
    reference_name: &str,
) -> Result<Vec<Comment>, BridgeError> {
    let doctype = reference_doctype.to_string();
    let name = reference_name.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Comment>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT name, comment_type, reference_doctype, reference_name, content, owner \
                 FROM comments WHERE reference_doctype = ?1 AND reference_name = ?2 \
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt.query_map(params![doctype, name], |row| {
                Ok(Comment {
                    name: row.get(0)?,
                    comment_type: row.get(1)?,
                    reference_doctype: row.get(2)?,
                    reference_name: row.get(3)?,
                    content: row.get(4)?,
                    owner: row.get(5)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn user_chat_token(db: &Database, user: &str) -> Result<Option<String>, BridgeError> {
    let user = user.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            let token: Option<Option<String>> = conn
                .query_row(
                    "SELECT chatwoot_api_token FROM users WHERE name = ?1",
                    params![user],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(token.flatten().filter(|t| !t.trim().is_empty()))
        })
        .await
        .map_err(map_tr_err)
}

/// Creates the user row if needed and stores their personal chat token.
pub async fn set_user_chat_token(
    db: &Database,
    user: &str,
    token: Option<&str>,
) -> Result<(), BridgeError> {
    let user = user.to_string();
    let token = token.map(str::to_string);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO users (name, chatwoot_api_token) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET chatwoot_api_token = excluded.chatwoot_api_token",
                params![user, token],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
