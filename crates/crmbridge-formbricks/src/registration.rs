// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook registration against Formbricks.

use crmbridge_config::{FormbricksConfig, ServerConfig};
use crmbridge_core::types::{Integration, IntegrationState};
use crmbridge_core::{BridgeError, Store};
use tracing::{error, info, warn};

use crate::client::FormbricksClient;
use crate::events::TRIGGERS;

/// Path Formbricks delivers webhooks to.
pub const WEBHOOK_PATH: &str = "/webhook/survey";

/// Registers the bridge's webhook for all surveys and records the result.
pub async fn register_webhook<S>(
    store: &S,
    client: &FormbricksClient,
    server: &ServerConfig,
) -> Result<IntegrationState, BridgeError>
where
    S: Store + ?Sized,
{
    let mut state = store.integration_state(Integration::Formbricks).await?;
    let Some(callback) = server.callback_url(WEBHOOK_PATH) else {
        return Err(BridgeError::Config(
            "server.public_url is required to register webhooks".into(),
        ));
    };

    match client.register_webhook(&callback, &TRIGGERS, &[]).await {
        Ok(_) => {
            state.webhook_registered = true;
            state.sync_status = Some("Webhook registered successfully".into());
            store.save_integration_state(&state).await?;
            info!(url = %callback, "formbricks webhook registered");
            Ok(state)
        }
        Err(e) => {
            state.sync_status = Some(format!("Webhook registration failed: {e}"));
            store.save_integration_state(&state).await?;
            Err(e)
        }
    }
}

/// Registers the webhook when the integration is enabled and none is
/// registered yet. Failures are logged and recorded, not returned.
pub async fn apply_settings<S>(
    store: &S,
    settings: &FormbricksConfig,
    server: &ServerConfig,
    client: Option<&FormbricksClient>,
) -> Result<IntegrationState, BridgeError>
where
    S: Store + ?Sized,
{
    let state = store.integration_state(Integration::Formbricks).await?;
    if !settings.enabled || state.webhook_registered {
        return Ok(state);
    }
    let Some(client) = client else {
        warn!("formbricks enabled without connection settings, webhook not registered");
        return Ok(state);
    };
    match register_webhook(store, client, server).await {
        Ok(registered) => Ok(registered),
        Err(e) => {
            error!(error = %e, "formbricks webhook registration failed");
            store.integration_state(Integration::Formbricks).await
        }
    }
}
