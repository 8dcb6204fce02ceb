// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handlers for the internal API and the health endpoint.
//!
//! Host mutation hooks (`/v1/hooks/*`) never fail the caller's save: remote
//! problems are logged and the hook answers 202. Manual actions return
//! their errors.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crmbridge_chatwoot::{CommentSync, ContactPush};
use crmbridge_core::BridgeError;
use crmbridge_core::types::{ChatMessage, Comment, ConversationStatus, Customer};
use crmbridge_formbricks::ResponseView;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`BridgeError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BridgeError::InvalidPayload(_) | BridgeError::Validation(_) => StatusCode::BAD_REQUEST,
            BridgeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            BridgeError::NotFound { .. } => StatusCode::NOT_FOUND,
            BridgeError::Duplicate { .. } | BridgeError::Disabled(_) => StatusCode::CONFLICT,
            BridgeError::Remote { .. } => StatusCode::BAD_GATEWAY,
            BridgeError::Config(_) | BridgeError::Storage { .. } | BridgeError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "internal API request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub chatwoot_enabled: bool,
    pub formbricks_enabled: bool,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chatwoot_enabled: state.chatwoot.is_enabled(),
        formbricks_enabled: state.formbricks.is_enabled(),
    })
}

/// POST /v1/hooks/customers/{name}
pub async fn customer_saved(
    State(state): State<GatewayState>,
    Path(name): Path<String>,
) -> (StatusCode, Json<Value>) {
    let result = state.chatwoot.push_customer(&name).await;
    accepted("customer", &name, result)
}

/// POST /v1/hooks/leads/{name}
pub async fn lead_saved(
    State(state): State<GatewayState>,
    Path(name): Path<String>,
) -> (StatusCode, Json<Value>) {
    let result = state.chatwoot.push_lead(&name).await;
    accepted("lead", &name, result)
}

fn accepted(
    kind: &str,
    name: &str,
    result: Result<ContactPush, BridgeError>,
) -> (StatusCode, Json<Value>) {
    let (outcome, contact_id) = match result {
        Ok(push) => {
            debug!(kind, name, outcome = ?push, "contact push finished");
            match push {
                ContactPush::AlreadyLinked => ("already_linked", None),
                ContactPush::LinkedExisting(id) => ("linked_existing", Some(id)),
                ContactPush::Created(id) => ("created", Some(id)),
                ContactPush::NoRemoteId => ("no_remote_id", None),
            }
        }
        Err(BridgeError::Disabled(_)) => ("disabled", None),
        Err(e) => {
            error!(kind, name, error = %e, "failed to push contact to chatwoot");
            ("failed", None)
        }
    };
    (
        StatusCode::ACCEPTED,
        Json(json!({"status": "accepted", "outcome": outcome, "contact_id": contact_id})),
    )
}

/// POST /v1/hooks/comments
///
/// Stores the comment, then offers it to the outbound mirror. A remote
/// failure is logged and still answers 202.
pub async fn comment_created(
    State(state): State<GatewayState>,
    Json(comment): Json<Comment>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let body = match state.chatwoot.record_comment(comment).await {
        Ok(CommentSync::Sent { conversation_id }) => {
            json!({"status": "sent", "conversation_id": conversation_id})
        }
        Ok(CommentSync::Skipped(reason)) => json!({"status": "skipped", "reason": reason}),
        Err(e @ BridgeError::Remote { .. }) => {
            error!(error = %e, "failed to mirror comment to chatwoot");
            json!({"status": "failed", "reason": e.to_string()})
        }
        Err(e) => return Err(e.into()),
    };
    Ok((StatusCode::ACCEPTED, Json(body)))
}

/// POST /v1/leads/{name}/convert
pub async fn convert_lead(
    State(state): State<GatewayState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let customer = crmbridge_crm::convert_lead_to_customer(
        state.store.as_ref(),
        &name,
        state.chatwoot.settings().customer_group.as_deref(),
    )
    .await?;
    info!(lead = %name, customer = %customer.name, "lead converted via API");
    Ok((StatusCode::CREATED, Json(customer)))
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub content: String,
    #[serde(default)]
    pub sender_name: Option<String>,
}

/// POST /v1/conversations/{id}/messages
pub async fn send_reply(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    Json(body): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    if body.content.trim().is_empty() {
        return Err(BridgeError::Validation("content must not be empty".into()).into());
    }
    let message = state
        .chatwoot
        .send_reply(&conversation_id, &body.content, body.sender_name.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ConversationStatus,
}

/// POST /v1/conversations/{id}/status
pub async fn set_status(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .chatwoot
        .set_status(&conversation_id, body.status)
        .await?;
    Ok(Json(json!({
        "conversation_id": conversation_id,
        "status": body.status,
    })))
}

/// POST /v1/conversations/{id}/refresh
pub async fn refresh_messages(
    State(state): State<GatewayState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let added = state.chatwoot.refresh_messages(&conversation_id).await?;
    Ok(Json(json!({
        "conversation_id": conversation_id,
        "added": added,
    })))
}

/// GET /v1/responses/{response_id}
pub async fn get_response(
    State(state): State<GatewayState>,
    Path(response_id): Path<String>,
) -> Result<Json<ResponseView>, ApiError> {
    Ok(Json(state.formbricks.response_view(&response_id).await?))
}
