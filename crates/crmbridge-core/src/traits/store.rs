// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store traits implemented by the SQLite backend.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::BridgeError;
use crate::types::{
    ChatMessage, Comment, ContactField, Conversation, Customer, Integration, IntegrationState,
    Issue, Lead, Survey, SurveyResponse,
};

/// Customer, Lead, and lead-source lookups.
///
/// Lookups by a non-unique column return whichever row the backend finds
/// first; callers must not assume any ordering among multiple matches.
#[async_trait]
pub trait ContactStore: Send + Sync + 'static {
    async fn get_customer(&self, name: &str) -> Result<Option<Customer>, BridgeError>;

    async fn find_customer(
        &self,
        field: ContactField,
        value: &str,
    ) -> Result<Option<Customer>, BridgeError>;

    /// Inserts a new customer. Fails with `Duplicate` if the name is taken.
    async fn insert_customer(&self, customer: &Customer) -> Result<(), BridgeError>;

    async fn update_customer(&self, customer: &Customer) -> Result<(), BridgeError>;

    async fn get_lead(&self, name: &str) -> Result<Option<Lead>, BridgeError>;

    async fn find_lead(&self, field: ContactField, value: &str)
    -> Result<Option<Lead>, BridgeError>;

    /// Inserts a new lead. Fails with `Duplicate` if the name is taken.
    async fn insert_lead(&self, lead: &Lead) -> Result<(), BridgeError>;

    async fn update_lead(&self, lead: &Lead) -> Result<(), BridgeError>;

    /// Whether `source` exists in the lead-source lookup table.
    async fn lead_source_exists(&self, source: &str) -> Result<bool, BridgeError>;
}

/// Conversation mirrors and their messages.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    /// Loads a conversation together with its messages in insertion order.
    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Conversation>, BridgeError>;

    /// Inserts or updates the conversation row. Messages are not touched.
    async fn save_conversation(&self, conversation: &Conversation) -> Result<(), BridgeError>;

    /// Appends a message. No uniqueness check happens here; callers dedup by
    /// id against the loaded conversation first.
    async fn append_message(
        &self,
        conversation_id: &str,
        message: &ChatMessage,
    ) -> Result<(), BridgeError>;

    /// Ids of resolved conversations last updated before `cutoff`.
    async fn list_stale_resolved(&self, cutoff: NaiveDateTime)
    -> Result<Vec<String>, BridgeError>;

    /// Deletes a conversation and its messages. Returns false if absent.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<bool, BridgeError>;
}

/// Survey definitions and responses.
#[async_trait]
pub trait SurveyStore: Send + Sync + 'static {
    async fn get_survey(&self, survey_id: &str) -> Result<Option<Survey>, BridgeError>;

    /// Inserts or updates by `survey_id`.
    async fn save_survey(&self, survey: &Survey) -> Result<(), BridgeError>;

    async fn get_response(&self, response_id: &str)
    -> Result<Option<SurveyResponse>, BridgeError>;

    /// Inserts a new response. A concurrent insert of the same `response_id`
    /// surfaces as `BridgeError::Duplicate`.
    async fn insert_response(&self, response: &SurveyResponse) -> Result<(), BridgeError>;

    async fn update_response(&self, response: &SurveyResponse) -> Result<(), BridgeError>;
}

/// Support issues, their comments, and per-user chat tokens.
#[async_trait]
pub trait IssueStore: Send + Sync + 'static {
    async fn get_issue(&self, name: &str) -> Result<Option<Issue>, BridgeError>;

    async fn find_issue_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Issue>, BridgeError>;

    async fn insert_issue(&self, issue: &Issue) -> Result<(), BridgeError>;

    async fn insert_comment(&self, comment: &Comment) -> Result<(), BridgeError>;

    /// Comments attached to a record, oldest first.
    async fn list_comments(
        &self,
        reference_doctype: &str,
        reference_name: &str,
    ) -> Result<Vec<Comment>, BridgeError>;

    /// The personal chat API token configured for a user, if any.
    async fn user_chat_token(&self, user: &str) -> Result<Option<String>, BridgeError>;
}

/// Mutable per-integration state.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Returns the stored state, or a fresh default when none exists yet.
    async fn integration_state(
        &self,
        integration: Integration,
    ) -> Result<IntegrationState, BridgeError>;

    async fn save_integration_state(&self, state: &IntegrationState) -> Result<(), BridgeError>;
}

/// Every store trait at once, for sharing a single backend as `Arc<dyn Store>`.
pub trait Store: ContactStore + ConversationStore + SurveyStore + IssueStore + StateStore {}

impl<T> Store for T where T: ContactStore + ConversationStore + SurveyStore + IssueStore + StateStore {}
