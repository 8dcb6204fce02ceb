// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the store traits.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::debug;

use crmbridge_config::StorageConfig;
use crmbridge_core::types::{
    ChatMessage, Comment, ContactField, Conversation, Customer, Integration, IntegrationState,
    Issue, Lead, Survey, SurveyResponse,
};
use crmbridge_core::{
    BridgeError, ContactStore, ConversationStore, IssueStore, StateStore, SurveyStore,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store. Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Opens the database at the configured path and runs migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, BridgeError> {
        let db = Database::open(&config.database_path).await?;
        debug!(path = %config.database_path, "SQLite store initialized");
        Ok(Self { db })
    }

    /// A store over a private in-memory database.
    pub async fn in_memory() -> Result<Self, BridgeError> {
        Ok(Self {
            db: Database::open_in_memory().await?,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Flushes the WAL before shutdown.
    pub async fn close(&self) -> Result<(), BridgeError> {
        self.db.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl ContactStore for SqliteStore {
    async fn get_customer(&self, name: &str) -> Result<Option<Customer>, BridgeError> {
        queries::contacts::get_customer(&self.db, name).await
    }

    async fn find_customer(
        &self,
        field: ContactField,
        value: &str,
    ) -> Result<Option<Customer>, BridgeError> {
        queries::contacts::find_customer(&self.db, field, value).await
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), BridgeError> {
        queries::contacts::insert_customer(&self.db, customer).await
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), BridgeError> {
        queries::contacts::update_customer(&self.db, customer).await
    }

    async fn get_lead(&self, name: &str) -> Result<Option<Lead>, BridgeError> {
        queries::contacts::get_lead(&self.db, name).await
    }

    async fn find_lead(
        &self,
        field: ContactField,
        value: &str,
    ) -> Result<Option<Lead>, BridgeError> {
        queries::contacts::find_lead(&self.db, field, value).await
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<(), BridgeError> {
        queries::contacts::insert_lead(&self.db, lead).await
    }

    async fn update_lead(&self, lead: &Lead) -> Result<(), BridgeError> {
        queries::contacts::update_lead(&self.db, lead).await
    }

    async fn lead_source_exists(&self, source: &str) -> Result<bool, BridgeError> {
        queries::contacts::lead_source_exists(&self.db, source).await
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Conversation>, BridgeError> {
        queries::conversations::get_conversation(&self.db, conversation_id).await
    }

    async fn save_conversation(&self, conversation: &Conversation) -> Result<(), BridgeError> {
        queries::conversations::save_conversation(&self.db, conversation).await
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        message: &ChatMessage,
    ) -> Result<(), BridgeError> {
        queries::conversations::append_message(&self.db, conversation_id, message).await
    }

    async fn list_stale_resolved(
        &self,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<String>, BridgeError> {
        queries::conversations::list_stale_resolved(&self.db, cutoff).await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<bool, BridgeError> {
        queries::conversations::delete_conversation(&self.db, conversation_id).await
    }
}

#[async_trait]
impl SurveyStore for SqliteStore {
    async fn get_survey(&self, survey_id: &str) -> Result<Option<Survey>, BridgeError> {
        queries::surveys::get_survey(&self.db, survey_id).await
    }

    async fn save_survey(&self, survey: &Survey) -> Result<(), BridgeError> {
        queries::surveys::save_survey(&self.db, survey).await
    }

    async fn get_response(
        &self,
        response_id: &str,
    ) -> Result<Option<SurveyResponse>, BridgeError> {
        queries::surveys::get_response(&self.db, response_id).await
    }

    async fn insert_response(&self, response: &SurveyResponse) -> Result<(), BridgeError> {
        queries::surveys::insert_response(&self.db, response).await
    }

    async fn update_response(&self, response: &SurveyResponse) -> Result<(), BridgeError> {
        queries::surveys::update_response(&self.db, response).await
    }
}

#[async_trait]
impl IssueStore for SqliteStore {
    async fn get_issue(&self, name: &str) -> Result<Option<Issue>, BridgeError> {
        queries::issues::get_issue(&self.db, name).await
    }

    async fn find_issue_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Issue>, BridgeError> {
        queries::issues::find_issue_by_conversation(&self.db, conversation_id).await
    }

    async fn insert_issue(&self, issue: &Issue) -> Result<(), BridgeError> {
        queries::issues::insert_issue(&self.db, issue).await
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), BridgeError> {
        queries::issues::insert_comment(&self.db, comment).await
    }

    async fn list_comments(
        &self,
        reference_doctype: &str,
        reference_name: &str,
    ) -> Result<Vec<Comment>, BridgeError> {
        queries::issues::list_comments(&self.db, reference_doctype, reference_name).await
    }

    async fn user_chat_token(&self, user: &str) -> Result<Option<String>, BridgeError> {
        queries::issues::user_chat_token(&self.db, user).await
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn integration_state(
        &self,
        integration: Integration,
    ) -> Result<IntegrationState, BridgeError> {
        queries::state::integration_state(&self.db, integration).await
    }

    async fn save_integration_state(&self, state: &IntegrationState) -> Result<(), BridgeError> {
        queries::state::save_integration_state(&self.db, state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crmbridge_core::Store;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_at_configured_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");
        let config = StorageConfig {
            database_path: path.to_str().unwrap().to_string(),
        };
        let store = SqliteStore::open(&config).await.unwrap();
        assert!(path.exists());
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn usable_as_shared_trait_object() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().await.unwrap());
        assert!(store.get_customer("nobody").await.unwrap().is_none());
        assert!(store.lead_source_exists("Survey").await.unwrap());
    }
}
