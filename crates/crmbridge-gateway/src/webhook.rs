// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook dispatch shared by both vendors.
//!
//! Every delivery goes through the same steps in the same order: parse the
//! body, refuse empty payloads, answer softly when the integration is off,
//! verify the signature when a secret is set, read the event type, log the
//! payload, and hand it to the integration. Only malformed bodies and bad
//! signatures get a non-2xx status. Handler failures answer 200 with an
//! error body so the vendor does not retry a delivery that will fail again.

use async_trait::async_trait;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use crmbridge_chatwoot::ChatwootIntegration;
use crmbridge_core::{BridgeError, EventOutcome};
use crmbridge_formbricks::FormbricksIntegration;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::server::GatewayState;
use crate::signature;

pub const CHATWOOT_SIGNATURE_HEADER: &str = "x-chatwoot-webhook-signature";
pub const FORMBRICKS_SIGNATURE_HEADER: &str = "x-formbricks-signature";

/// A vendor integration that accepts webhook deliveries.
#[async_trait]
pub trait WebhookSource: Send + Sync {
    /// Display name used in responses and logs.
    fn label(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    fn webhook_secret(&self) -> Option<&str>;

    fn signature_header(&self) -> &'static str;

    /// The event discriminator of a parsed payload.
    fn event_type<'a>(&self, payload: &'a Value) -> Option<&'a str>;

    async fn handle(&self, event_type: &str, payload: &Value)
    -> Result<EventOutcome, BridgeError>;
}

#[async_trait]
impl WebhookSource for ChatwootIntegration {
    fn label(&self) -> &'static str {
        "Chatwoot"
    }

    fn is_enabled(&self) -> bool {
        ChatwootIntegration::is_enabled(self)
    }

    fn webhook_secret(&self) -> Option<&str> {
        ChatwootIntegration::webhook_secret(self)
    }

    fn signature_header(&self) -> &'static str {
        CHATWOOT_SIGNATURE_HEADER
    }

    fn event_type<'a>(&self, payload: &'a Value) -> Option<&'a str> {
        payload
            .get("event")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    async fn handle(
        &self,
        event_type: &str,
        payload: &Value,
    ) -> Result<EventOutcome, BridgeError> {
        self.handle_event(event_type, payload).await
    }
}

#[async_trait]
impl WebhookSource for FormbricksIntegration {
    fn label(&self) -> &'static str {
        "Formbricks"
    }

    fn is_enabled(&self) -> bool {
        FormbricksIntegration::is_enabled(self)
    }

    fn webhook_secret(&self) -> Option<&str> {
        FormbricksIntegration::webhook_secret(self)
    }

    fn signature_header(&self) -> &'static str {
        FORMBRICKS_SIGNATURE_HEADER
    }

    fn event_type<'a>(&self, payload: &'a Value) -> Option<&'a str> {
        crmbridge_formbricks::events::event_type(payload)
    }

    async fn handle(
        &self,
        event_type: &str,
        payload: &Value,
    ) -> Result<EventOutcome, BridgeError> {
        self.handle_event(event_type, payload).await
    }
}

/// POST /webhook/chat
pub async fn chatwoot_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(&state.chatwoot, &headers, &body).await
}

/// POST /webhook/survey
pub async fn formbricks_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(&state.formbricks, &headers, &body).await
}

/// Runs one delivery through the shared dispatch steps.
pub async fn dispatch<W>(source: &W, headers: &HeaderMap, body: &[u8]) -> Response
where
    W: WebhookSource + ?Sized,
{
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(source = source.label(), error = %e, "webhook body is not JSON");
                return rejection(StatusCode::BAD_REQUEST, "Invalid JSON payload");
            }
        }
    };
    if is_empty_payload(&payload) {
        return rejection(StatusCode::BAD_REQUEST, "Empty payload");
    }

    if !source.is_enabled() {
        return soft_error(&format!("{} integration is disabled", source.label()));
    }

    if let Some(secret) = source.webhook_secret() {
        let provided = headers
            .get(source.signature_header())
            .and_then(|v| v.to_str().ok());
        if let Err(e) = signature::verify(secret, body, provided) {
            warn!(source = source.label(), error = %e, "webhook signature rejected");
            return rejection(StatusCode::UNAUTHORIZED, "Invalid webhook signature");
        }
    }

    let Some(event_type) = source.event_type(&payload) else {
        return soft_error("No event type in payload");
    };

    info!(source = source.label(), event = event_type, payload = %payload, "webhook received");

    match source.handle(event_type, &payload).await {
        Ok(outcome) => Json(json!({
            "status": "success",
            "event": event_type,
            "result": outcome,
        }))
        .into_response(),
        Err(e) => {
            error!(
                source = source.label(),
                event = event_type,
                error = %e,
                payload = %payload,
                "error processing webhook"
            );
            soft_error(&e.to_string())
        }
    }
}

fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn soft_error(message: &str) -> Response {
    Json(json!({"status": "error", "message": message})).into_response()
}

fn rejection(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"status": "error", "message": message}))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Records what reached the handler.
    struct FakeSource {
        enabled: bool,
        secret: Option<String>,
        fail: bool,
        seen: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                enabled: true,
                secret: None,
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WebhookSource for FakeSource {
        fn label(&self) -> &'static str {
            "Fake"
        }
        fn is_enabled(&self) -> bool {
            self.enabled
        }
        fn webhook_secret(&self) -> Option<&str> {
            self.secret.as_deref()
        }
        fn signature_header(&self) -> &'static str {
            "x-fake-signature"
        }
        fn event_type<'a>(&self, payload: &'a Value) -> Option<&'a str> {
            payload.get("event").and_then(Value::as_str)
        }
        async fn handle(&self, event_type: &str, _: &Value) -> Result<EventOutcome, BridgeError> {
            self.seen.lock().unwrap().push(event_type.to_string());
            if self.fail {
                Err(BridgeError::InvalidPayload("boom".into()))
            } else {
                Ok(EventOutcome::Processed)
            }
        }
    }

    async fn run(source: &FakeSource, headers: HeaderMap, body: &[u8]) -> (StatusCode, Value) {
        let response = dispatch(source, &headers, body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn malformed_and_empty_bodies_are_400() {
        let source = FakeSource::new();
        let (status, body) = run(&source, HeaderMap::new(), b"{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid JSON payload");

        for empty in [&b""[..], b"null", b"{}", b"  "] {
            let (status, body) = run(&source, HeaderMap::new(), empty).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "Empty payload");
        }
        assert!(source.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabled_is_a_soft_error_even_when_unsigned() {
        let source = FakeSource {
            enabled: false,
            secret: Some("k".into()),
            ..FakeSource::new()
        };
        let (status, body) = run(&source, HeaderMap::new(), br#"{"event":"x"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Fake integration is disabled");
    }

    #[tokio::test]
    async fn signature_is_checked_before_event_type() {
        let source = FakeSource {
            secret: Some("k".into()),
            ..FakeSource::new()
        };
        let payload = br#"{"no_event": true}"#;
        let (status, _) = run(&source, HeaderMap::new(), payload).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-fake-signature",
            signature::sign("k", payload).unwrap().parse().unwrap(),
        );
        let (status, body) = run(&source, headers, payload).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "No event type in payload");
    }

    #[tokio::test]
    async fn handler_outcomes() {
        let source = FakeSource::new();
        let (status, body) = run(&source, HeaderMap::new(), br#"{"event":"ping"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["event"], "ping");
        assert_eq!(body["result"]["outcome"], "processed");

        let failing = FakeSource {
            fail: true,
            ..FakeSource::new()
        };
        let (status, body) = run(&failing, HeaderMap::new(), br#"{"event":"ping"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "invalid payload: boom");
    }

    #[tokio::test]
    #[traced_test]
    async fn payload_is_logged_before_dispatch() {
        let source = FakeSource {
            fail: true,
            ..FakeSource::new()
        };
        run(&source, HeaderMap::new(), br#"{"event":"ping","marker":"m-42"}"#).await;
        assert!(logs_contain("webhook received"));
        assert!(logs_contain("m-42"));
        assert!(logs_contain("error processing webhook"));
    }
}
