// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot operator commands.
//!
//! Each command prints its result as JSON on stdout so cron jobs and
//! scripts can consume it. Failures propagate and the process exits
//! non-zero.

use std::sync::Arc;

use crmbridge_chatwoot::ChatwootIntegration;
use crmbridge_config::{CrmBridgeConfig, ServerConfig};
use crmbridge_core::{BridgeError, Store};
use crmbridge_formbricks::FormbricksIntegration;
use crmbridge_storage::SqliteStore;
use serde::Serialize;
use tracing::{info, warn};

use crate::Service;

/// The store and both integrations, opened from configuration.
pub struct Bridge {
    store: SqliteStore,
    chatwoot: ChatwootIntegration,
    formbricks: FormbricksIntegration,
}

impl Bridge {
    pub async fn open(config: &CrmBridgeConfig) -> Result<Self, BridgeError> {
        let store = SqliteStore::open(&config.storage).await?;
        Self::with_store(store, config)
    }

    fn with_store(store: SqliteStore, config: &CrmBridgeConfig) -> Result<Self, BridgeError> {
        let shared: Arc<dyn Store> = Arc::new(store.clone());
        Ok(Self {
            chatwoot: ChatwootIntegration::new(shared.clone(), config.chatwoot.clone())?,
            formbricks: FormbricksIntegration::new(shared, config.formbricks.clone())?,
            store,
        })
    }

    pub async fn close(&self) {
        if let Err(e) = self.store.close().await {
            warn!(error = %e, "failed to checkpoint database");
        }
    }

    pub async fn sync_contacts(&self) -> Result<(), BridgeError> {
        let report = self.chatwoot.sync_contacts().await?;
        info!(?report, "contact sync finished");
        print_json(&report)
    }

    pub async fn sync_surveys(&self) -> Result<(), BridgeError> {
        let report = self.formbricks.sync_surveys().await?;
        info!(?report, "survey sync finished");
        print_json(&report)
    }

    pub async fn sweep_conversations(&self) -> Result<(), BridgeError> {
        let report = self.chatwoot.sweep_conversations().await?;
        info!(?report, "conversation sweep finished");
        print_json(&report)
    }

    /// Registers the webhook of each enabled integration. Fails if any
    /// registration fails, after attempting all of them.
    pub async fn register_webhooks(&self, server: &ServerConfig) -> Result<(), BridgeError> {
        let mut states = Vec::new();
        let mut first_error = None;

        if self.chatwoot.is_enabled() {
            match self.chatwoot.register_webhook(server).await {
                Ok(state) => states.push(state),
                Err(e) => {
                    warn!(error = %e, "chatwoot webhook registration failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if self.formbricks.is_enabled() {
            match self.formbricks.register_webhook(server).await {
                Ok(state) => states.push(state),
                Err(e) => {
                    warn!(error = %e, "formbricks webhook registration failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        print_json(&states)?;
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn test_connection(&self, service: Service) -> Result<(), BridgeError> {
        let label = match service {
            Service::Chatwoot => {
                self.chatwoot.test_connection().await?;
                "chatwoot"
            }
            Service::Formbricks => {
                self.formbricks.test_connection().await?;
                "formbricks"
            }
        };
        println!("{label}: connection ok");
        Ok(())
    }

    pub async fn convert_lead(&self, name: &str) -> Result<(), BridgeError> {
        let customer = crmbridge_crm::convert_lead_to_customer(
            &self.store,
            name,
            self.chatwoot.settings().customer_group.as_deref(),
        )
        .await?;
        info!(lead = name, customer = %customer.name, "lead converted");
        print_json(&customer)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), BridgeError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| BridgeError::Internal(format!("failed to render output: {e}")))?;
    println!("{text}");
    Ok(())
}
