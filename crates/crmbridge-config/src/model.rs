// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! rejected at startup with a suggestion instead of being silently ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level crmbridge configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrmBridgeConfig {
    /// HTTP listener and internal API settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Chat vendor integration.
    #[serde(default)]
    pub chatwoot: ChatwootConfig,

    /// Survey vendor integration.
    #[serde(default)]
    pub formbricks: FormbricksConfig,
}

/// HTTP listener configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used as the webhook callback prefix.
    #[serde(default)]
    pub public_url: Option<String>,

    /// Bearer token for the `/v1` internal API. When unset every internal
    /// request is rejected.
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
            api_token: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("public_url", &self.public_url)
            .field("api_token", &redact(&self.api_token))
            .finish()
    }
}

impl ServerConfig {
    /// Callback URL for a webhook path such as `/webhook/chat`.
    pub fn callback_url(&self, path: &str) -> Option<String> {
        self.public_url
            .as_deref()
            .map(|base| format!("{}{}", base.trim_end_matches('/'), path))
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8085
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("crmbridge").join("crmbridge.db"))
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "crmbridge.db".to_string())
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level for crmbridge crates (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// What to do with a chat contact that matches no Customer or Lead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPolicy {
    /// Link to existing records only; never create.
    #[default]
    LinkOnly,
    /// Create a Lead or Customer according to the auto-create flags.
    AutoCreate,
}

/// Chat vendor configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatwootConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the chat instance, e.g. `https://chat.example.com`.
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub account_id: Option<String>,

    #[serde(default)]
    pub api_access_token: Option<String>,

    /// Shared secret for `X-Chatwoot-Webhook-Signature`. Unset skips the check.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    #[serde(default)]
    pub auto_create_customer: bool,

    #[serde(default)]
    pub auto_create_lead: bool,

    #[serde(default)]
    pub contact_policy: ContactPolicy,

    /// Customer group for auto-created customers.
    #[serde(default)]
    pub customer_group: Option<String>,

    #[serde(default = "default_chat_lead_source")]
    pub lead_source: String,

    #[serde(default)]
    pub sync_conversations_as_issues: bool,

    #[serde(default)]
    pub issue_type: Option<String>,

    /// Resolved conversations older than this are swept. Zero or negative
    /// disables the sweep.
    #[serde(default = "default_retention_days")]
    pub conversation_retention_days: i64,
}

impl Default for ChatwootConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: None,
            account_id: None,
            api_access_token: None,
            webhook_secret: None,
            auto_create_customer: false,
            auto_create_lead: false,
            contact_policy: ContactPolicy::default(),
            customer_group: None,
            lead_source: default_chat_lead_source(),
            sync_conversations_as_issues: false,
            issue_type: None,
            conversation_retention_days: default_retention_days(),
        }
    }
}

impl fmt::Debug for ChatwootConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatwootConfig")
            .field("enabled", &self.enabled)
            .field("api_url", &self.api_url)
            .field("account_id", &self.account_id)
            .field("api_access_token", &redact(&self.api_access_token))
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("auto_create_customer", &self.auto_create_customer)
            .field("auto_create_lead", &self.auto_create_lead)
            .field("contact_policy", &self.contact_policy)
            .field("customer_group", &self.customer_group)
            .field("lead_source", &self.lead_source)
            .field(
                "sync_conversations_as_issues",
                &self.sync_conversations_as_issues,
            )
            .field("issue_type", &self.issue_type)
            .field(
                "conversation_retention_days",
                &self.conversation_retention_days,
            )
            .finish()
    }
}

fn default_chat_lead_source() -> String {
    "Chat".to_string()
}

fn default_retention_days() -> i64 {
    90
}

/// Survey vendor configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FormbricksConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the survey instance, e.g. `https://app.formbricks.com`.
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub environment_id: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Shared secret for `X-Formbricks-Signature`. Unset skips the check.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    #[serde(default)]
    pub auto_create_lead: bool,

    #[serde(default = "default_survey_lead_source")]
    pub lead_source: String,

    /// Surveys whose finished responses may create leads. Empty allows all.
    #[serde(default)]
    pub lead_survey_ids: Vec<String>,
}

impl Default for FormbricksConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: None,
            environment_id: None,
            api_key: None,
            webhook_secret: None,
            auto_create_lead: false,
            lead_source: default_survey_lead_source(),
            lead_survey_ids: Vec::new(),
        }
    }
}

impl fmt::Debug for FormbricksConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormbricksConfig")
            .field("enabled", &self.enabled)
            .field("api_url", &self.api_url)
            .field("environment_id", &self.environment_id)
            .field("api_key", &redact(&self.api_key))
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("auto_create_lead", &self.auto_create_lead)
            .field("lead_source", &self.lead_source)
            .field("lead_survey_ids", &self.lead_survey_ids)
            .finish()
    }
}

fn default_survey_lead_source() -> String {
    "Survey".to_string()
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

/// Treats `Some("")` like `None`.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secrets() {
        let cfg = ChatwootConfig {
            api_access_token: Some("tok-123".into()),
            webhook_secret: Some("shh".into()),
            ..Default::default()
        };
        let out = format!("{cfg:?}");
        assert!(!out.contains("tok-123"));
        assert!(!out.contains("shh"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn callback_url_joins_without_double_slash() {
        let server = ServerConfig {
            public_url: Some("https://bridge.example.com/".into()),
            ..Default::default()
        };
        assert_eq!(
            server.callback_url("/webhook/chat").as_deref(),
            Some("https://bridge.example.com/webhook/chat")
        );
        assert_eq!(ServerConfig::default().callback_url("/x"), None);
    }

    #[test]
    fn non_empty_filters_blank() {
        assert_eq!(non_empty(&Some("  ".into())), None);
        assert_eq!(non_empty(&Some("a".into())), Some("a"));
        assert_eq!(non_empty(&None), None);
    }
}
