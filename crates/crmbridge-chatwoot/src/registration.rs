// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook registration against Chatwoot.

use crmbridge_config::{ChatwootConfig, ServerConfig};
use crmbridge_core::types::{Integration, IntegrationState};
use crmbridge_core::{BridgeError, Store};
use tracing::{error, info, warn};

use crate::client::ChatwootClient;
use crate::events::SUBSCRIPTIONS;

/// Path Chatwoot delivers webhooks to.
pub const WEBHOOK_PATH: &str = "/webhook/chat";

/// Registers the bridge's webhook and records the result.
///
/// Failures are returned to the caller and also recorded in `sync_status`.
pub async fn register_webhook<S>(
    store: &S,
    client: &ChatwootClient,
    server: &ServerConfig,
) -> Result<IntegrationState, BridgeError>
where
    S: Store + ?Sized,
{
    let mut state = store.integration_state(Integration::Chatwoot).await?;
    let Some(callback) = server.callback_url(WEBHOOK_PATH) else {
        return Err(BridgeError::Config(
            "server.public_url is required to register webhooks".into(),
        ));
    };

    match client.register_webhook(&callback, &SUBSCRIPTIONS).await {
        Ok(_) => {
            state.webhook_registered = true;
            state.sync_status = Some("Webhook registered successfully".into());
            store.save_integration_state(&state).await?;
            info!(url = %callback, "chatwoot webhook registered");
            Ok(state)
        }
        Err(e) => {
            state.sync_status = Some(format!("Webhook registration failed: {e}"));
            store.save_integration_state(&state).await?;
            Err(e)
        }
    }
}

/// Brings the remote webhook in line with the `enabled` flag.
///
/// An enabled integration without a registered webhook registers one; a
/// disabled integration with one removes it. Failures are logged and leave
/// the stored state as it was, so the next start retries.
pub async fn apply_settings<S>(
    store: &S,
    settings: &ChatwootConfig,
    server: &ServerConfig,
    client: Option<&ChatwootClient>,
) -> Result<IntegrationState, BridgeError>
where
    S: Store + ?Sized,
{
    let mut state = store.integration_state(Integration::Chatwoot).await?;

    if settings.enabled && !state.webhook_registered {
        let Some(client) = client else {
            warn!("chatwoot enabled without connection settings, webhook not registered");
            return Ok(state);
        };
        match register_webhook(store, client, server).await {
            Ok(registered) => return Ok(registered),
            Err(e) => {
                error!(error = %e, "chatwoot webhook registration failed");
                return store.integration_state(Integration::Chatwoot).await;
            }
        }
    }

    if !settings.enabled && state.webhook_registered {
        let (Some(client), Some(public_url)) = (client, server.public_url.as_deref()) else {
            warn!("cannot unregister chatwoot webhook without connection settings and public_url");
            return Ok(state);
        };
        match client.unregister_webhook(public_url.trim_end_matches('/')).await {
            Ok(removed) => {
                state.webhook_registered = false;
                state.sync_status = Some(if removed {
                    "Webhook unregistered".into()
                } else {
                    "No matching webhook found".into()
                });
                store.save_integration_state(&state).await?;
                info!(removed, "chatwoot webhook unregistered");
            }
            Err(e) => error!(error = %e, "chatwoot webhook unregistration failed"),
        }
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmbridge_core::StateStore;
    use crmbridge_storage::SqliteStore;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server_config() -> ServerConfig {
        ServerConfig {
            public_url: Some("https://bridge.example.com/".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn enabling_registers_all_subscriptions() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/2/webhooks"))
            .and(body_json(json!({
                "url": "https://bridge.example.com/webhook/chat",
                "subscriptions": SUBSCRIPTIONS,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"payload": {"id": 1}})))
            .expect(1)
            .mount(&mock)
            .await;

        let store = SqliteStore::in_memory().await.unwrap();
        let client = ChatwootClient::new(mock.uri(), "2", "t").unwrap();
        let settings = ChatwootConfig {
            enabled: true,
            ..Default::default()
        };

        let state = apply_settings(&store, &settings, &server_config(), Some(&client))
            .await
            .unwrap();
        assert!(state.webhook_registered);

        // Already registered: no second POST.
        apply_settings(&store, &settings, &server_config(), Some(&client))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_registration_is_recorded_not_raised() {
        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/accounts/2/webhooks"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&mock)
            .await;

        let store = SqliteStore::in_memory().await.unwrap();
        let client = ChatwootClient::new(mock.uri(), "2", "t").unwrap();
        let settings = ChatwootConfig {
            enabled: true,
            ..Default::default()
        };
        let state = apply_settings(&store, &settings, &server_config(), Some(&client))
            .await
            .unwrap();
        assert!(!state.webhook_registered);
        assert!(
            state
                .sync_status
                .unwrap()
                .starts_with("Webhook registration failed")
        );
    }

    #[tokio::test]
    async fn disabling_unregisters() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/2/webhooks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "payload": [{"id": 6, "url": "https://bridge.example.com/webhook/chat"}]
            })))
            .mount(&mock)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/accounts/2/webhooks/6"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock)
            .await;

        let store = SqliteStore::in_memory().await.unwrap();
        let mut state = IntegrationState::new(Integration::Chatwoot);
        state.webhook_registered = true;
        store.save_integration_state(&state).await.unwrap();

        let client = ChatwootClient::new(mock.uri(), "2", "t").unwrap();
        let state = apply_settings(
            &store,
            &ChatwootConfig::default(),
            &server_config(),
            Some(&client),
        )
        .await
        .unwrap();
        assert!(!state.webhook_registered);
    }

    #[tokio::test]
    async fn register_requires_public_url() {
        let store = SqliteStore::in_memory().await.unwrap();
        let client = ChatwootClient::new("http://127.0.0.1:9", "2", "t").unwrap();
        let err = register_webhook(&store, &client, &ServerConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }
}
