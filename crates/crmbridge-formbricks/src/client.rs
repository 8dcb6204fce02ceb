// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Formbricks management API.
//!
//! Calls go to `{api_url}/api/v1/{endpoint}` with the key in the
//! `x-api-key` header. A failed call is logged with its method, URL, and the
//! response body, then returned. There is no retry.

use std::fmt;
use std::time::Duration;

use crmbridge_config::FormbricksConfig;
use crmbridge_config::model::non_empty;
use crmbridge_core::BridgeError;
use reqwest::{Method, Url};
use serde_json::{Value, json};
use tracing::{debug, error};

/// Service name carried by `BridgeError::Remote`.
pub const SERVICE: &str = "formbricks";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for list endpoints.
pub const PAGE_LIMIT: u32 = 100;

/// Formbricks API client bound to one environment.
#[derive(Clone)]
pub struct FormbricksClient {
    http: reqwest::Client,
    api_url: String,
    environment_id: Option<String>,
    api_key: String,
}

impl fmt::Debug for FormbricksClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormbricksClient")
            .field("api_url", &self.api_url)
            .field("environment_id", &self.environment_id)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl FormbricksClient {
    pub fn new(
        api_url: impl Into<String>,
        environment_id: Option<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BridgeError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            environment_id,
            api_key: api_key.into(),
        })
    }

    /// Builds a client from configuration. `api_url` and `api_key` are required.
    pub fn from_config(config: &FormbricksConfig) -> Result<Self, BridgeError> {
        let (Some(api_url), Some(api_key)) = (non_empty(&config.api_url), non_empty(&config.api_key))
        else {
            return Err(BridgeError::Config(
                "formbricks.api_url and formbricks.api_key are required".into(),
            ));
        };
        Self::new(
            api_url,
            non_empty(&config.environment_id).map(str::to_string),
            api_key,
        )
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn environment_id(&self) -> Option<&str> {
        self.environment_id.as_deref()
    }

    fn url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Url, BridgeError> {
        let raw = format!("{}/api/v1/{}", self.api_url, endpoint);
        let parsed = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        parsed.map_err(|e| BridgeError::Config(format!("invalid formbricks URL {raw}: {e}")))
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, BridgeError> {
        let url = self.url(endpoint, params)?;
        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .header("x-api-key", &self.api_key);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            error!(method = %method, url = %url, error = %e, "formbricks request failed");
            remote_error(&method, &url, None, e.to_string())
        })?;

        let status = response.status();
        debug!(method = %method, url = %url, status = %status, "formbricks response");
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            error!(
                method = %method,
                url = %url,
                status = %status,
                request = ?body,
                response_body = %body_text,
                "formbricks request failed"
            );
            let message = if body_text.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {body_text}")
            };
            return Err(remote_error(&method, &url, Some(status.as_u16()), message));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| remote_error(&method, &url, Some(status.as_u16()), e.to_string()))?;
        if bytes.is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            remote_error(
                &method,
                &url,
                Some(status.as_u16()),
                format!("invalid JSON response: {e}"),
            )
        })
    }

    /// Lists surveys to prove the key works.
    pub async fn test_connection(&self) -> Result<(), BridgeError> {
        self.request(Method::GET, "management/surveys", &[], None)
            .await
            .map(|_| ())
    }

    /// Registers a webhook. An empty `survey_ids` subscribes to every survey.
    pub async fn register_webhook(
        &self,
        url: &str,
        triggers: &[&str],
        survey_ids: &[String],
    ) -> Result<Value, BridgeError> {
        let mut body = json!({
            "url": url,
            "triggers": triggers,
            "surveyIds": survey_ids,
        });
        if let Some(environment_id) = self.environment_id.as_deref() {
            body["environmentId"] = json!(environment_id);
        }
        self.request(Method::POST, "webhooks", &[], Some(&body))
            .await
    }

    pub async fn list_webhooks(&self) -> Result<Value, BridgeError> {
        self.request(Method::GET, "webhooks", &[], None).await
    }

    pub async fn delete_webhook(&self, webhook_id: &str) -> Result<Value, BridgeError> {
        self.request(Method::DELETE, &format!("webhooks/{webhook_id}"), &[], None)
            .await
    }

    /// One page of survey definitions, as the raw `{"data": [...]}` envelope.
    pub async fn surveys(&self, limit: u32, offset: u32) -> Result<Value, BridgeError> {
        let params = [("limit", limit.to_string()), ("offset", offset.to_string())];
        self.request(Method::GET, "management/surveys", &params, None)
            .await
    }

    pub async fn survey(&self, survey_id: &str) -> Result<Value, BridgeError> {
        self.request(
            Method::GET,
            &format!("management/surveys/{survey_id}"),
            &[],
            None,
        )
        .await
    }

    pub async fn responses(
        &self,
        survey_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Value, BridgeError> {
        let params = [("limit", limit.to_string()), ("offset", offset.to_string())];
        self.request(
            Method::GET,
            &format!("management/surveys/{survey_id}/responses"),
            &params,
            None,
        )
        .await
    }

    pub async fn response(&self, response_id: &str) -> Result<Value, BridgeError> {
        self.request(
            Method::GET,
            &format!("management/responses/{response_id}"),
            &[],
            None,
        )
        .await
    }

    pub async fn contacts(&self, limit: u32, offset: u32) -> Result<Value, BridgeError> {
        let params = [("limit", limit.to_string()), ("offset", offset.to_string())];
        self.request(Method::GET, "management/contacts", &params, None)
            .await
    }

    pub async fn contact(&self, contact_id: &str) -> Result<Value, BridgeError> {
        self.request(
            Method::GET,
            &format!("management/contacts/{contact_id}"),
            &[],
            None,
        )
        .await
    }
}

/// The `data` array of a list envelope, empty when absent.
pub fn data_items(envelope: &Value) -> Vec<Value> {
    envelope
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn remote_error(method: &Method, url: &Url, status: Option<u16>, message: String) -> BridgeError {
    BridgeError::Remote {
        service: SERVICE,
        method: method.to_string(),
        url: url.to_string(),
        status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_api_key_and_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/management/surveys"))
            .and(header("x-api-key", "key-1"))
            .and(query_param("limit", "100"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "s1"}]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = FormbricksClient::new(format!("{}/", server.uri()), None, "key-1").unwrap();
        let page = client.surveys(PAGE_LIMIT, 0).await.unwrap();
        assert_eq!(data_items(&page).len(), 1);
    }

    #[tokio::test]
    async fn webhook_body_carries_environment_and_empty_survey_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/webhooks"))
            .and(body_json(json!({
                "url": "https://bridge.example.com/webhook/survey",
                "triggers": ["responseFinished"],
                "surveyIds": [],
                "environmentId": "env-7",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "w1"}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = FormbricksClient::new(server.uri(), Some("env-7".into()), "k").unwrap();
        client
            .register_webhook(
                "https://bridge.example.com/webhook/survey",
                &["responseFinished"],
                &[],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn error_carries_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/management/responses/r1"))
            .respond_with(ResponseTemplate::new(403).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = FormbricksClient::new(server.uri(), None, "bad").unwrap();
        let err = client.response("r1").await.unwrap_err();
        match err {
            BridgeError::Remote {
                service,
                status,
                message,
                ..
            } => {
                assert_eq!(service, SERVICE);
                assert_eq!(status, Some(403));
                assert!(message.contains("invalid api key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn from_config_requires_key() {
        let config = FormbricksConfig {
            api_url: Some("https://forms.example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            FormbricksClient::from_config(&config),
            Err(BridgeError::Config(_))
        ));
    }
}
