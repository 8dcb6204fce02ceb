// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end tests of the HTTP surface.
//!
//! `TestHarness` wires an in-memory SQLite store to both integrations and
//! the gateway router. Tests keep a typed handle on the store for
//! assertions while the integrations share it through `Arc<dyn Store>`.

use std::sync::Arc;

use axum::Router;
use crmbridge_chatwoot::ChatwootIntegration;
use crmbridge_config::{ChatwootConfig, FormbricksConfig};
use crmbridge_core::{BridgeError, Store};
use crmbridge_formbricks::FormbricksIntegration;
use crmbridge_gateway::{AuthConfig, GatewayState, build_router};
use crmbridge_storage::SqliteStore;

/// Token configured by [`TestHarnessBuilder::with_api_token`] when tests
/// do not care about its value.
pub const TEST_API_TOKEN: &str = "test-api-token";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    chatwoot: ChatwootConfig,
    formbricks: FormbricksConfig,
    api_token: Option<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            chatwoot: ChatwootConfig {
                enabled: true,
                ..ChatwootConfig::default()
            },
            formbricks: FormbricksConfig {
                enabled: true,
                ..FormbricksConfig::default()
            },
            api_token: Some(TEST_API_TOKEN.to_string()),
        }
    }

    /// Replace the Chatwoot settings.
    pub fn with_chatwoot(mut self, settings: ChatwootConfig) -> Self {
        self.chatwoot = settings;
        self
    }

    /// Replace the Formbricks settings.
    pub fn with_formbricks(mut self, settings: FormbricksConfig) -> Self {
        self.formbricks = settings;
        self
    }

    /// Set or clear the internal API bearer token.
    pub fn with_api_token(mut self, token: Option<&str>) -> Self {
        self.api_token = token.map(str::to_string);
        self
    }

    /// Build the harness on a fresh in-memory database.
    pub async fn build(self) -> Result<TestHarness, BridgeError> {
        let store = SqliteStore::in_memory().await?;
        let shared: Arc<dyn Store> = Arc::new(store.clone());

        let chatwoot = ChatwootIntegration::new(shared.clone(), self.chatwoot)?;
        let formbricks = FormbricksIntegration::new(shared.clone(), self.formbricks)?;

        let state = GatewayState {
            store: shared,
            chatwoot,
            formbricks,
            auth: AuthConfig {
                bearer_token: self.api_token,
            },
        };

        Ok(TestHarness { store, state })
    }
}

/// A complete bridge backed by an in-memory store.
pub struct TestHarness {
    /// Typed store handle for seeding and assertions.
    pub store: SqliteStore,
    /// Gateway state shared by every router built from this harness.
    pub state: GatewayState,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with both integrations enabled and no remote connection.
    pub async fn new() -> Result<Self, BridgeError> {
        Self::builder().build().await
    }

    /// A fresh router over the shared state.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn chatwoot(&self) -> &ChatwootIntegration {
        &self.state.chatwoot
    }

    pub fn formbricks(&self) -> &FormbricksIntegration {
        &self.state.formbricks
    }
}
