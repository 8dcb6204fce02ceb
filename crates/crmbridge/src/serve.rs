// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `crmbridge serve` command implementation.
//!
//! Opens the store, builds both integrations, reconciles webhook
//! registrations with the configuration, and serves the gateway until a
//! shutdown signal arrives.

use std::sync::Arc;

use crmbridge_chatwoot::ChatwootIntegration;
use crmbridge_config::CrmBridgeConfig;
use crmbridge_core::{BridgeError, Store};
use crmbridge_formbricks::FormbricksIntegration;
use crmbridge_gateway::{AuthConfig, GatewayState, start_server};
use crmbridge_storage::SqliteStore;
use tracing::{info, warn};

use crate::shutdown;

/// Runs the `crmbridge serve` command.
pub async fn run_serve(config: CrmBridgeConfig) -> Result<(), BridgeError> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting crmbridge serve");

    let store = SqliteStore::open(&config.storage).await?;
    let shared: Arc<dyn Store> = Arc::new(store.clone());

    let chatwoot = ChatwootIntegration::new(shared.clone(), config.chatwoot.clone())?;
    let formbricks = FormbricksIntegration::new(shared.clone(), config.formbricks.clone())?;

    // Registration failures are recorded in integration state; serving
    // webhooks does not depend on them.
    match chatwoot.apply_settings(&config.server).await {
        Ok(state) => info!(
            registered = state.webhook_registered,
            status = ?state.sync_status,
            "chatwoot settings applied"
        ),
        Err(e) => warn!(error = %e, "failed to apply chatwoot settings"),
    }
    match formbricks.apply_settings(&config.server).await {
        Ok(state) => info!(
            registered = state.webhook_registered,
            status = ?state.sync_status,
            "formbricks settings applied"
        ),
        Err(e) => warn!(error = %e, "failed to apply formbricks settings"),
    }

    if config.server.api_token.is_none() {
        warn!("server.api_token is not set -- the /v1 internal API will reject every request");
    }

    let state = GatewayState {
        store: shared,
        chatwoot,
        formbricks,
        auth: AuthConfig {
            bearer_token: config.server.api_token.clone(),
        },
    };

    let result = start_server(&config.server, state, shutdown::shutdown_signal()).await;

    if let Err(e) = store.close().await {
        warn!(error = %e, "failed to checkpoint database on shutdown");
    }
    info!("crmbridge stopped");
    result
}
