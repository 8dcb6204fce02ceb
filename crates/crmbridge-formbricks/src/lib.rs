// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Formbricks integration for crmbridge.
//!
//! Survey responses arrive as webhooks and are mirrored locally, linked to a
//! Customer or Lead by email, and may create a Lead when finished. Survey
//! definitions are pulled on demand.

pub mod client;
pub mod display;
pub mod events;
pub mod extract;
pub mod registration;
pub mod response;
pub mod survey;

use std::sync::Arc;

use crmbridge_config::model::non_empty;
use crmbridge_config::{FormbricksConfig, ServerConfig};
use crmbridge_core::types::{IntegrationState, SurveyResponse};
use crmbridge_core::{BridgeError, EventOutcome, Store, SyncReport};
use serde_json::Value;
use tracing::{debug, warn};

pub use client::FormbricksClient;
pub use display::ResponseView;
pub use events::FormbricksEvent;
pub use extract::{ExtractedContact, extract_contact};

/// Formbricks integration bound to a store and a configuration.
#[derive(Clone)]
pub struct FormbricksIntegration {
    store: Arc<dyn Store>,
    settings: FormbricksConfig,
    client: Option<FormbricksClient>,
}

impl FormbricksIntegration {
    pub fn new(store: Arc<dyn Store>, settings: FormbricksConfig) -> Result<Self, BridgeError> {
        let has_connection =
            non_empty(&settings.api_url).is_some() && non_empty(&settings.api_key).is_some();
        let client = if has_connection {
            Some(FormbricksClient::from_config(&settings)?)
        } else {
            None
        };
        Ok(Self {
            store,
            settings,
            client,
        })
    }

    pub fn settings(&self) -> &FormbricksConfig {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Shared secret for `X-Formbricks-Signature`, if configured.
    pub fn webhook_secret(&self) -> Option<&str> {
        non_empty(&self.settings.webhook_secret)
    }

    fn client(&self) -> Result<&FormbricksClient, BridgeError> {
        if !self.settings.enabled {
            return Err(BridgeError::Disabled("formbricks"));
        }
        self.client.as_ref().ok_or_else(|| {
            BridgeError::Config("formbricks connection settings are incomplete".into())
        })
    }

    /// Routes one webhook delivery to the response reconciler.
    pub async fn handle_event(
        &self,
        event_type: &str,
        payload: &Value,
    ) -> Result<EventOutcome, BridgeError> {
        let store = self.store.as_ref();
        match FormbricksEvent::parse(event_type, payload) {
            FormbricksEvent::ResponseCreated(response)
            | FormbricksEvent::ResponseUpdated(response) => {
                response::upsert_response(store, &response).await?;
            }
            FormbricksEvent::ResponseFinished(response) => {
                response::finalize_response(store, &self.settings, &response).await?;
            }
            FormbricksEvent::Skipped { event, reason } => {
                debug!(event = %event, reason, "formbricks event skipped");
                return Ok(EventOutcome::Skipped(reason));
            }
            FormbricksEvent::Unknown(event) => {
                warn!(event = %event, "unhandled formbricks event type");
                return Ok(EventOutcome::Unrecognized);
            }
        }
        Ok(EventOutcome::Processed)
    }

    pub async fn test_connection(&self) -> Result<(), BridgeError> {
        self.client
            .as_ref()
            .ok_or_else(|| {
                BridgeError::Config("formbricks connection settings are incomplete".into())
            })?
            .test_connection()
            .await
    }

    /// Registers the remote webhook if enabled and not yet registered.
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

    pub async fn register_webhook(
        &self,
        server: &ServerConfig,
    ) -> Result<IntegrationState, BridgeError> {
        registration::register_webhook(self.store.as_ref(), self.client()?, server).await
    }

    /// Pulls survey definitions into the local mirror.
    pub async fn sync_surveys(&self) -> Result<SyncReport, BridgeError> {
        survey::sync_surveys(self.store.as_ref(), self.client()?).await
    }

    /// Fetches one response from the API and reconciles it like a webhook.
    pub async fn pull_response(&self, response_id: &str) -> Result<SurveyResponse, BridgeError> {
        let raw = self.client()?.response(response_id).await?;
        let object = raw.get("data").filter(|d| d.is_object()).unwrap_or(&raw);
        let parsed = events::parse_response(object).ok_or_else(|| {
            BridgeError::InvalidPayload(format!("response {response_id} has no id"))
        })?;
        response::upsert_response(self.store.as_ref(), &parsed).await
    }

    /// A stored response with its answers labelled for display.
    pub async fn response_view(&self, response_id: &str) -> Result<ResponseView, BridgeError> {
        let response = self
            .store
            .get_response(response_id)
            .await?
            .ok_or_else(|| BridgeError::NotFound {
                entity: "survey response",
                key: response_id.to_string(),
            })?;
        Ok(ResponseView::new(response))
    }
}
