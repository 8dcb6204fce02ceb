// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Issue mirroring in both directions.
//!
//! Inbound chat messages land on the conversation's Issue as comments whose
//! content starts with `<strong>{icon} {sender}:</strong>`. Those three
//! icon prefixes double as echo markers: a comment carrying one is never
//! sent back to Chatwoot.

use std::sync::LazyLock;

use crmbridge_config::ChatwootConfig;
use crmbridge_core::types::{COMMENT_TYPE_COMMENT, Comment, Conversation, Issue, SenderType};
use crmbridge_core::{BridgeError, Store};
use crmbridge_crm::RemoteContact;
use crmbridge_crm::naming::{COMMENT_PREFIX, ISSUE_PREFIX, new_record_name};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::client::ChatwootClient;
use crate::events::MessagePayload;

/// Reference doctype of comments that can mirror to Chatwoot.
pub const ISSUE_DOCTYPE: &str = "Issue";

/// Owner recorded on comments mirrored in from Chatwoot.
pub const MIRROR_OWNER: &str = "chatwoot";

/// Prefixes that mark a comment as mirrored from Chatwoot.
pub const ECHO_MARKERS: [&str; 3] = ["<strong>🤖", "<strong>👤", "<strong>💬"];

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static BLOCK_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</li>").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").unwrap());

/// Icon shown before the sender name of a mirrored message.
pub fn sender_icon(sender: SenderType) -> &'static str {
    match sender {
        SenderType::Agent => "👤",
        SenderType::Bot => "🤖",
        SenderType::Contact => "💬",
    }
}

/// HTML body of a mirrored chat message.
pub fn format_mirror_comment(sender: SenderType, sender_name: Option<&str>, content: &str) -> String {
    format!(
        "<p><strong>{} {}:</strong></p><p>{}</p>",
        sender_icon(sender),
        sender_name.unwrap_or("Unknown"),
        content
    )
}

/// True if `content` was produced by the inbound mirror.
pub fn has_echo_marker(content: &str) -> bool {
    ECHO_MARKERS.iter().any(|marker| content.contains(marker))
}

/// Reduces comment HTML to plain text.
pub fn html_to_text(html: &str) -> String {
    let with_breaks = BLOCK_END.replace_all(html, "\n");
    let stripped = TAG.replace_all(&with_breaks, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    BLANK_LINES.replace_all(decoded.trim(), "\n").into_owned()
}

/// Creates the Issue for a new conversation unless one already exists.
///
/// Returns the Issue name, existing or new.
pub async fn create_issue_for_conversation<S>(
    store: &S,
    settings: &ChatwootConfig,
    conversation: &Conversation,
    contact: Option<&RemoteContact>,
) -> Result<String, BridgeError>
where
    S: Store + ?Sized,
{
    let conversation_id = &conversation.conversation_id;
    if let Some(existing) = store.find_issue_by_conversation(conversation_id).await? {
        return Ok(existing.name);
    }

    let contact_name = contact
        .and_then(|c| c.name.as_deref())
        .unwrap_or("Unknown");
    let contact_email = contact.and_then(|c| c.email.as_deref());
    let inbox = conversation.inbox_name.as_deref().unwrap_or("Chatwoot");

    let mut subject = format!("[{inbox}] Conversation with {contact_name}");
    if let Some(email) = contact_email {
        subject.push_str(&format!(" ({email})"));
    }

    let link = format!(
        "{}/app/accounts/{}/conversations/{}",
        settings.api_url.as_deref().unwrap_or_default().trim_end_matches('/'),
        settings.account_id.as_deref().unwrap_or_default(),
        conversation_id
    );
    let description = format!(
        "<p>New conversation from Chatwoot</p>\n\
         <p><strong>Contact:</strong> {contact_name}</p>\n\
         <p><strong>Email:</strong> {}</p>\n\
         <p><strong>Inbox:</strong> {inbox}</p>\n\
         <p><a href=\"{link}\">View in Chatwoot</a></p>",
        contact_email.unwrap_or("N/A")
    );

    let issue = Issue {
        name: new_record_name(ISSUE_PREFIX),
        subject,
        raised_by: contact_email.unwrap_or_default().to_string(),
        description,
        issue_type: settings.issue_type.clone().filter(|t| !t.trim().is_empty()),
        customer: conversation.customer.clone(),
        chatwoot_conversation_id: Some(conversation_id.clone()),
    };

    match store.insert_issue(&issue).await {
        Ok(()) => {
            info!(issue = %issue.name, conversation_id = %conversation_id, "issue created from conversation");
            Ok(issue.name)
        }
        Err(e) if e.is_duplicate() => {
            // Lost a race with another delivery of the same conversation.
            store
                .find_issue_by_conversation(conversation_id)
                .await?
                .map(|existing| existing.name)
                .ok_or(e)
        }
        Err(e) => Err(e),
    }
}

/// Adds an inbound chat message to the conversation's Issue, if it has one.
///
/// Returns the new comment name.
pub async fn mirror_message_to_issue<S>(
    store: &S,
    message: &MessagePayload,
) -> Result<Option<String>, BridgeError>
where
    S: Store + ?Sized,
{
    let Some(issue) = store
        .find_issue_by_conversation(&message.conversation_id)
        .await?
    else {
        return Ok(None);
    };

    let comment = Comment {
        name: new_record_name(COMMENT_PREFIX),
        comment_type: COMMENT_TYPE_COMMENT.to_string(),
        reference_doctype: ISSUE_DOCTYPE.to_string(),
        reference_name: issue.name.clone(),
        content: format_mirror_comment(
            message.sender_type,
            message.sender_name.as_deref(),
            &message.content,
        ),
        owner: MIRROR_OWNER.to_string(),
    };
    store.insert_comment(&comment).await?;
    debug!(issue = %issue.name, message_id = %message.message_id, "message mirrored to issue");
    Ok(Some(comment.name))
}

/// What happened to a local comment offered to the outbound mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentSync {
    Sent { conversation_id: String },
    Skipped(&'static str),
}

/// Sends a user comment on a linked Issue to its Chatwoot conversation.
///
/// The comment owner's personal token is used when one is configured. After
/// sending, the conversation is reopened.
pub async fn send_comment_to_chatwoot<S>(
    store: &S,
    settings: &ChatwootConfig,
    client: &ChatwootClient,
    comment: &Comment,
) -> Result<CommentSync, BridgeError>
where
    S: Store + ?Sized,
{
    if comment.reference_doctype != ISSUE_DOCTYPE {
        return Ok(CommentSync::Skipped("not an issue comment"));
    }
    if comment.comment_type != COMMENT_TYPE_COMMENT {
        return Ok(CommentSync::Skipped("system comment"));
    }
    let Some(issue) = store.get_issue(&comment.reference_name).await? else {
        warn!(issue = %comment.reference_name, "comment references unknown issue");
        return Ok(CommentSync::Skipped("issue not found"));
    };
    let Some(conversation_id) = issue.chatwoot_conversation_id.filter(|id| !id.is_empty()) else {
        return Ok(CommentSync::Skipped("issue has no conversation"));
    };
    if !settings.enabled {
        return Ok(CommentSync::Skipped("chatwoot disabled"));
    }
    if has_echo_marker(&comment.content) {
        return Ok(CommentSync::Skipped("mirrored from chatwoot"));
    }

    let text = html_to_text(&comment.content);
    if text.is_empty() {
        return Ok(CommentSync::Skipped("empty comment"));
    }

    let user_client = if comment.owner.is_empty() {
        None
    } else {
        store
            .user_chat_token(&comment.owner)
            .await?
            .filter(|t| !t.trim().is_empty())
            .map(|token| client.with_token(token))
    };
    let sender = user_client.as_ref().unwrap_or(client);

    sender
        .send_message(&conversation_id, &text, "outgoing", false)
        .await?;
    sender.toggle_status(&conversation_id, "open").await?;
    info!(
        issue = %issue.name,
        conversation_id = %conversation_id,
        personal_token = user_client.is_some(),
        "issue comment sent to chatwoot"
    );
    Ok(CommentSync::Sent { conversation_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_format_per_sender() {
        assert_eq!(
            format_mirror_comment(SenderType::Agent, Some("Sam"), "hi"),
            "<p><strong>👤 Sam:</strong></p><p>hi</p>"
        );
        assert!(format_mirror_comment(SenderType::Bot, None, "x").starts_with("<p><strong>🤖 Unknown:"));
        assert!(format_mirror_comment(SenderType::Contact, Some("C"), "x").contains("<strong>💬 C:"));
    }

    #[test]
    fn every_mirrored_comment_carries_a_marker() {
        for sender in [SenderType::Agent, SenderType::Bot, SenderType::Contact] {
            assert!(has_echo_marker(&format_mirror_comment(sender, Some("n"), "m")));
        }
        assert!(!has_echo_marker("<p>Plain reply</p>"));
        assert!(!has_echo_marker("<strong>Bold</strong>"));
    }

    #[test]
    fn html_is_reduced_to_text() {
        assert_eq!(html_to_text("<p>Hello <b>there</b></p><p>Line 2</p>"), "Hello there\nLine 2");
        assert_eq!(html_to_text("a &amp; b&nbsp;&lt;c&gt;"), "a & b <c>");
        assert_eq!(html_to_text("<p><br></p>"), "");
        assert_eq!(html_to_text("one<br/>two"), "one\ntwo");
    }
}
