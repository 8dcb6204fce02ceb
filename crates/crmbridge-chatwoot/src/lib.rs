// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chatwoot integration for crmbridge.
//!
//! [`ChatwootIntegration`] ties the API client, the webhook reconcilers, and
//! the periodic jobs to one store and one configuration. Webhook handling
//! goes through [`ChatwootIntegration::handle_event`]; operator actions
//! (reply, status, refresh, sync, sweep) are methods on the same type.

pub mod client;
pub mod contact;
pub mod conversation;
pub mod events;
pub mod issue_sync;
pub mod registration;

use std::sync::Arc;

use crmbridge_config::model::non_empty;
use crmbridge_config::{ChatwootConfig, ServerConfig};
use crmbridge_core::types::{ChatMessage, Comment, ConversationStatus, IntegrationState};
use crmbridge_core::{BridgeError, EventOutcome, Store, SweepReport, SyncReport};
use crmbridge_crm::naming::{COMMENT_PREFIX, new_record_name};
use serde_json::Value;
use tracing::{debug, error, warn};

pub use client::ChatwootClient;
pub use contact::ContactPush;
pub use events::ChatwootEvent;
pub use issue_sync::CommentSync;

/// Chatwoot integration bound to a store and a configuration.
#[derive(Clone)]
pub struct ChatwootIntegration {
    store: Arc<dyn Store>,
    settings: ChatwootConfig,
    client: Option<ChatwootClient>,
}

impl ChatwootIntegration {
    /// Creates the integration. The API client is built only when all
    /// connection fields are configured.
    pub fn new(store: Arc<dyn Store>, settings: ChatwootConfig) -> Result<Self, BridgeError> {
        let client = if has_connection(&settings) {
            Some(ChatwootClient::from_config(&settings)?)
        } else {
            None
        };
        Ok(Self {
            store,
            settings,
            client,
        })
    }

    pub fn settings(&self) -> &ChatwootConfig {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Shared secret for webhook signatures, if configured.
    pub fn webhook_secret(&self) -> Option<&str> {
        non_empty(&self.settings.webhook_secret)
    }

    /// The API client, or an error when the integration cannot call out.
    fn client(&self) -> Result<&ChatwootClient, BridgeError> {
        if !self.settings.enabled {
            return Err(BridgeError::Disabled("chatwoot"));
        }
        self.client.as_ref().ok_or_else(|| {
            BridgeError::Config("chatwoot connection settings are incomplete".into())
        })
    }

    /// Routes one webhook delivery to its reconciler.
    pub async fn handle_event(
        &self,
        event_type: &str,
        payload: &Value,
    ) -> Result<EventOutcome, BridgeError> {
        let store = self.store.as_ref();
        match ChatwootEvent::parse(event_type, payload)? {
            ChatwootEvent::ConversationCreated(parsed) => {
                let conversation = conversation::upsert_conversation(store, &parsed).await?;
                if self.settings.sync_conversations_as_issues
                    && let Err(e) = issue_sync::create_issue_for_conversation(
                        store,
                        &self.settings,
                        &conversation,
                        parsed.contact.as_ref(),
                    )
                    .await
                {
                    error!(
                        conversation_id = %conversation.conversation_id,
                        error = %e,
                        "failed to create issue from conversation"
                    );
                }
            }
            ChatwootEvent::ConversationUpdated(parsed) => {
                conversation::upsert_conversation(store, &parsed).await?;
            }
            ChatwootEvent::ConversationStatusChanged(change) => {
                if !conversation::apply_status_change(store, &change).await? {
                    return Ok(EventOutcome::Skipped("unknown conversation"));
                }
            }
            ChatwootEvent::MessageCreated(message) => {
                let appended = conversation::add_message(store, &self.settings, &message).await?;
                if !appended {
                    return Ok(EventOutcome::Skipped("duplicate message"));
                }
                if let Err(e) = issue_sync::mirror_message_to_issue(store, &message).await {
                    error!(
                        conversation_id = %message.conversation_id,
                        error = %e,
                        "failed to mirror message to issue"
                    );
                }
            }
            ChatwootEvent::ContactCreated(contact) => {
                contact::handle_contact_created(store, &self.settings, &contact).await?;
            }
            ChatwootEvent::ContactUpdated(contact) => {
                contact::handle_contact_updated(store, &contact).await?;
            }
            ChatwootEvent::Skipped { event, reason } => {
                debug!(event = %event, reason, "chatwoot event skipped");
                return Ok(EventOutcome::Skipped(reason));
            }
            ChatwootEvent::Unknown(event) => {
                warn!(event = %event, "unhandled chatwoot event type");
                return Ok(EventOutcome::Unrecognized);
            }
        }
        Ok(EventOutcome::Processed)
    }

    /// Checks the configured credentials against the account endpoint.
    pub async fn test_connection(&self) -> Result<(), BridgeError> {
        self.client
            .as_ref()
            .ok_or_else(|| {
                BridgeError::Config("chatwoot connection settings are incomplete".into())
            })?
            .test_connection()
            .await
    }

    /// Registers or removes the remote webhook to match `enabled`.
    pub async fn apply_settings(
        &self,
        server: &ServerConfig,
    ) -> Result<IntegrationState, BridgeError> {
        registration::apply_settings(
            self.store.as_ref(),
            &self.settings,
            server,
            self.client.as_ref(),
        )
        .await
    }

    /// Registers the webhook now, regardless of the stored state.
    pub async fn register_webhook(
        &self,
        server: &ServerConfig,
    ) -> Result<IntegrationState, BridgeError> {
        registration::register_webhook(self.store.as_ref(), self.client()?, server).await
    }

    /// Deletes resolved conversations past the retention period.
    pub async fn sweep_conversations(&self) -> Result<SweepReport, BridgeError> {
        conversation::sweep_resolved(self.store.as_ref(), &self.settings).await
    }

    /// Pulls remote contacts and applies the contact policy.
    pub async fn sync_contacts(&self) -> Result<SyncReport, BridgeError> {
        contact::sync_contacts(self.store.as_ref(), &self.settings, self.client()?).await
    }

    /// Pushes a locally saved Customer to Chatwoot.
    pub async fn push_customer(&self, name: &str) -> Result<ContactPush, BridgeError> {
        contact::push_customer(self.store.as_ref(), self.client()?, name).await
    }

    /// Pushes a locally saved Lead to Chatwoot.
    pub async fn push_lead(&self, name: &str) -> Result<ContactPush, BridgeError> {
        contact::push_lead(self.store.as_ref(), self.client()?, name).await
    }

    /// Stores a new local comment and mirrors it to the linked conversation.
    pub async fn record_comment(&self, mut comment: Comment) -> Result<CommentSync, BridgeError> {
        if comment.name.is_empty() {
            comment.name = new_record_name(COMMENT_PREFIX);
        }
        self.store.insert_comment(&comment).await?;

        let Some(client) = self.client.as_ref() else {
            return Ok(CommentSync::Skipped("chatwoot not configured"));
        };
        issue_sync::send_comment_to_chatwoot(self.store.as_ref(), &self.settings, client, &comment)
            .await
    }

    /// Sends an agent reply to a conversation.
    pub async fn send_reply(
        &self,
        conversation_id: &str,
        content: &str,
        sender_name: Option<&str>,
    ) -> Result<ChatMessage, BridgeError> {
        conversation::send_reply(
            self.store.as_ref(),
            self.client()?,
            conversation_id,
            content,
            sender_name,
        )
        .await
    }

    /// Sets a conversation's status remotely and locally.
    pub async fn set_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
    ) -> Result<(), BridgeError> {
        conversation::set_status(self.store.as_ref(), self.client()?, conversation_id, status).await
    }

    /// Pulls a conversation's messages and appends the missing ones.
    pub async fn refresh_messages(&self, conversation_id: &str) -> Result<usize, BridgeError> {
        conversation::refresh_messages(self.store.as_ref(), self.client()?, conversation_id).await
    }
}

fn has_connection(settings: &ChatwootConfig) -> bool {
    non_empty(&settings.api_url).is_some()
        && non_empty(&settings.account_id).is_some()
        && non_empty(&settings.api_access_token).is_some()
}
