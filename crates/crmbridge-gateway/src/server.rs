// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router and listener for the bridge's HTTP surface.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use crmbridge_chatwoot::ChatwootIntegration;
use crmbridge_config::ServerConfig;
use crmbridge_core::{BridgeError, Store};
use crmbridge_formbricks::FormbricksIntegration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::{handlers, webhook};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<dyn Store>,
    pub chatwoot: ChatwootIntegration,
    pub formbricks: FormbricksIntegration,
    pub auth: AuthConfig,
}

/// Builds the full router.
///
/// - `GET /health` and the two webhook routes are unauthenticated; webhooks
///   carry their own signatures.
/// - Everything under `/v1` needs the bearer token.
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/webhook/chat", post(webhook::chatwoot_webhook))
        .route("/webhook/survey", post(webhook::formbricks_webhook))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/hooks/customers/{name}", post(handlers::customer_saved))
        .route("/v1/hooks/leads/{name}", post(handlers::lead_saved))
        .route("/v1/hooks/comments", post(handlers::comment_created))
        .route("/v1/leads/{name}/convert", post(handlers::convert_lead))
        .route("/v1/conversations/{id}/messages", post(handlers::send_reply))
        .route("/v1/conversations/{id}/status", post(handlers::set_status))
        .route(
            "/v1/conversations/{id}/refresh",
            post(handlers::refresh_messages),
        )
        .route("/v1/responses/{response_id}", get(handlers::get_response))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds `host:port` and serves until `shutdown` resolves.
pub async fn start_server<F>(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: F,
) -> Result<(), BridgeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BridgeError::Internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("crmbridge listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| BridgeError::Internal(format!("server error: {e}")))?;

    Ok(())
}
