// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Chatwoot application API.
//!
//! Every account-scoped call goes to
//! `{api_url}/api/v1/accounts/{account_id}/{endpoint}` with the access token
//! in the `api_access_token` header. Requests are attempted once; failures
//! are logged with method and URL and returned to the caller.

use std::fmt;
use std::time::Duration;

use crmbridge_config::ChatwootConfig;
use crmbridge_config::model::non_empty;
use crmbridge_core::BridgeError;
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error};

/// Service name carried by `BridgeError::Remote`.
pub const SERVICE: &str = "chatwoot";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fields for creating a remote contact.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewContact {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "phone_number", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_attributes: Option<Value>,
}

/// Chatwoot API client bound to one account and one access token.
#[derive(Clone)]
pub struct ChatwootClient {
    http: reqwest::Client,
    api_url: String,
    account_id: String,
    token: String,
}

impl fmt::Debug for ChatwootClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatwootClient")
            .field("api_url", &self.api_url)
            .field("account_id", &self.account_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl ChatwootClient {
    /// Creates a client for the given instance, account, and token.
    pub fn new(
        api_url: impl Into<String>,
        account_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BridgeError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            account_id: account_id.into(),
            token: token.into(),
        })
    }

    /// Builds a client from configuration, failing if a connection field is missing.
    pub fn from_config(config: &ChatwootConfig) -> Result<Self, BridgeError> {
        let (Some(api_url), Some(account_id), Some(token)) = (
            non_empty(&config.api_url),
            non_empty(&config.account_id),
            non_empty(&config.api_access_token),
        ) else {
            return Err(BridgeError::Config(
                "chatwoot.api_url, chatwoot.account_id and chatwoot.api_access_token are required"
                    .into(),
            ));
        };
        Self::new(api_url, account_id, token)
    }

    /// A copy of this client that authenticates with another token.
    ///
    /// Used to send messages under a user's personal identity. The HTTP
    /// connection pool is shared.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..self.clone()
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Browser link to a conversation in the agent dashboard.
    pub fn conversation_link(&self, conversation_id: &str) -> String {
        format!(
            "{}/app/accounts/{}/conversations/{}",
            self.api_url, self.account_id, conversation_id
        )
    }

    fn account_url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Url, BridgeError> {
        let raw = format!(
            "{}/api/v1/accounts/{}/{}",
            self.api_url, self.account_id, endpoint
        );
        let parsed = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        parsed.map_err(|e| BridgeError::Config(format!("invalid chatwoot URL {raw}: {e}")))
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, BridgeError> {
        let url = self.account_url(endpoint, params)?;
        self.send(method, url, body).await
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, BridgeError> {
        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .header("api_access_token", &self.token);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            error!(method = %method, url = %url, error = %e, "chatwoot request failed");
            remote_error(&method, &url, None, e.to_string())
        })?;

        let status = response.status();
        debug!(method = %method, url = %url, status = %status, "chatwoot response");
        if !status.is_success() {
            error!(method = %method, url = %url, status = %status, "chatwoot request failed");
            return Err(remote_error(
                &method,
                &url,
                Some(status.as_u16()),
                format!("HTTP {status}"),
            ));
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

    /// Fetches the account record to prove the credentials work.
    pub async fn test_connection(&self) -> Result<(), BridgeError> {
        let raw = format!("{}/api/v1/accounts/{}", self.api_url, self.account_id);
        let url = Url::parse(&raw)
            .map_err(|e| BridgeError::Config(format!("invalid chatwoot URL {raw}: {e}")))?;
        self.send(Method::GET, url, None).await.map(|_| ())
    }

    // --- webhooks ---

    pub async fn register_webhook(
        &self,
        url: &str,
        subscriptions: &[&str],
    ) -> Result<Value, BridgeError> {
        let body = json!({ "url": url, "subscriptions": subscriptions });
        self.request(Method::POST, "webhooks", &[], Some(&body)).await
    }

    pub async fn list_webhooks(&self) -> Result<Value, BridgeError> {
        self.request(Method::GET, "webhooks", &[], None).await
    }

    pub async fn delete_webhook(&self, webhook_id: &str) -> Result<Value, BridgeError> {
        self.request(Method::DELETE, &format!("webhooks/{webhook_id}"), &[], None)
            .await
    }

    /// Deletes the first registered webhook whose URL contains `public_url`.
    ///
    /// Returns false when no such webhook exists.
    pub async fn unregister_webhook(&self, public_url: &str) -> Result<bool, BridgeError> {
        let listing = self.list_webhooks().await?;
        let hooks = listing
            .get("payload")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for hook in hooks {
            let url = hook.get("url").and_then(Value::as_str).unwrap_or_default();
            if url.contains(public_url)
                && let Some(id) = crmbridge_core::json::id_field(&hook, "id")
            {
                self.delete_webhook(&id).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    // --- contacts ---

    pub async fn list_contacts(&self, page: u32) -> Result<Value, BridgeError> {
        let params = [("page", page.to_string()), ("sort", "name".to_string())];
        self.request(Method::GET, "contacts", &params, None).await
    }

    pub async fn get_contact(&self, contact_id: &str) -> Result<Value, BridgeError> {
        self.request(Method::GET, &format!("contacts/{contact_id}"), &[], None)
            .await
    }

    pub async fn create_contact(&self, contact: &NewContact) -> Result<Value, BridgeError> {
        let body = serde_json::to_value(contact)
            .map_err(|e| BridgeError::Internal(format!("contact serialization: {e}")))?;
        self.request(Method::POST, "contacts", &[], Some(&body)).await
    }

    pub async fn update_contact(
        &self,
        contact_id: &str,
        changes: &Value,
    ) -> Result<Value, BridgeError> {
        self.request(
            Method::PUT,
            &format!("contacts/{contact_id}"),
            &[],
            Some(changes),
        )
        .await
    }

    /// Searches contacts and returns the `payload` array.
    pub async fn search_contacts(&self, query: &str) -> Result<Vec<Value>, BridgeError> {
        let params = [("q", query.to_string())];
        let result = self
            .request(Method::GET, "contacts/search", &params, None)
            .await?;
        Ok(result
            .get("payload")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    // --- conversations ---

    pub async fn list_conversations(&self, status: &str, page: u32) -> Result<Value, BridgeError> {
        let params = [("status", status.to_string()), ("page", page.to_string())];
        self.request(Method::GET, "conversations", &params, None)
            .await
    }

    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Value, BridgeError> {
        self.request(
            Method::GET,
            &format!("conversations/{conversation_id}"),
            &[],
            None,
        )
        .await
    }

    pub async fn create_conversation(
        &self,
        contact_id: &str,
        inbox_id: &str,
        message: Option<&str>,
    ) -> Result<Value, BridgeError> {
        let mut body = json!({ "contact_id": contact_id, "inbox_id": inbox_id });
        if let Some(message) = message {
            body["message"] = json!({ "content": message });
        }
        self.request(Method::POST, "conversations", &[], Some(&body))
            .await
    }

    pub async fn get_messages(&self, conversation_id: &str) -> Result<Value, BridgeError> {
        self.request(
            Method::GET,
            &format!("conversations/{conversation_id}/messages"),
            &[],
            None,
        )
        .await
    }

    /// Posts a message. `private` messages are agent-only notes.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
        message_type: &str,
        private: bool,
    ) -> Result<Value, BridgeError> {
        let body = json!({
            "content": content,
            "message_type": message_type,
            "private": private,
        });
        self.request(
            Method::POST,
            &format!("conversations/{conversation_id}/messages"),
            &[],
            Some(&body),
        )
        .await
    }

    pub async fn toggle_status(
        &self,
        conversation_id: &str,
        status: &str,
    ) -> Result<Value, BridgeError> {
        let body = json!({ "status": status });
        self.request(
            Method::POST,
            &format!("conversations/{conversation_id}/toggle_status"),
            &[],
            Some(&body),
        )
        .await
    }

    pub async fn assign_conversation(
        &self,
        conversation_id: &str,
        assignee_id: Option<&str>,
        team_id: Option<&str>,
    ) -> Result<Value, BridgeError> {
        let mut body = json!({});
        if let Some(assignee) = assignee_id {
            body["assignee_id"] = json!(assignee);
        }
        if let Some(team) = team_id {
            body["team_id"] = json!(team);
        }
        self.request(
            Method::POST,
            &format!("conversations/{conversation_id}/assignments"),
            &[],
            Some(&body),
        )
        .await
    }

    pub async fn add_labels(
        &self,
        conversation_id: &str,
        labels: &[String],
    ) -> Result<Value, BridgeError> {
        let body = json!({ "labels": labels });
        self.request(
            Method::POST,
            &format!("conversations/{conversation_id}/labels"),
            &[],
            Some(&body),
        )
        .await
    }

    // --- account metadata ---

    pub async fn inboxes(&self) -> Result<Value, BridgeError> {
        self.request(Method::GET, "inboxes", &[], None).await
    }

    pub async fn inbox(&self, inbox_id: &str) -> Result<Value, BridgeError> {
        self.request(Method::GET, &format!("inboxes/{inbox_id}"), &[], None)
            .await
    }

    pub async fn agents(&self) -> Result<Value, BridgeError> {
        self.request(Method::GET, "agents", &[], None).await
    }

    pub async fn teams(&self) -> Result<Value, BridgeError> {
        self.request(Method::GET, "teams", &[], None).await
    }

    pub async fn labels(&self) -> Result<Value, BridgeError> {
        self.request(Method::GET, "labels", &[], None).await
    }
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

/// The id of a contact returned by `create_contact` (`payload.contact.id`).
pub fn created_contact_id(result: &Value) -> Option<String> {
    result
        .pointer("/payload/contact/id")
        .and_then(crmbridge_core::json::id_string)
}
