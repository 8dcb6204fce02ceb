// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Checks rules serde cannot express: connection fields required once an
//! integration is enabled, the auto-create exclusivity rule, and basic shape
//! of hosts, URLs, and paths. All failures are collected.

use crate::diagnostic::ConfigError;
use crate::model::{ChatwootConfig, CrmBridgeConfig, FormbricksConfig, non_empty};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validates a deserialized configuration.
pub fn validate_config(config: &CrmBridgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("server.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if let Some(url) = non_empty(&config.server.public_url) {
        check_url("server.public_url", url, &mut errors);
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "logging.level `{}` must be one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    validate_chatwoot(&config.chatwoot, &mut errors);
    validate_formbricks(&config.formbricks, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Upper bound for `chatwoot.conversation_retention_days` (about a century).
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Chat settings rules. Exposed separately so settings can be re-checked
/// before a registration run.
pub fn validate_chatwoot(config: &ChatwootConfig, errors: &mut Vec<ConfigError>) {
    if config.auto_create_customer && config.auto_create_lead {
        errors.push(ConfigError::validation(
            "chatwoot.auto_create_customer and chatwoot.auto_create_lead cannot both be enabled",
        ));
    }
    if config.conversation_retention_days > MAX_RETENTION_DAYS {
        errors.push(ConfigError::validation(format!(
            "chatwoot.conversation_retention_days must be at most {MAX_RETENTION_DAYS}, got {}",
            config.conversation_retention_days
        )));
    }

    if !config.enabled {
        return;
    }
    require(&config.api_url, "chatwoot.api_url", errors);
    require(&config.account_id, "chatwoot.account_id", errors);
    require(&config.api_access_token, "chatwoot.api_access_token", errors);
    if let Some(url) = non_empty(&config.api_url) {
        check_url("chatwoot.api_url", url, errors);
    }
}

/// Survey settings rules.
pub fn validate_formbricks(config: &FormbricksConfig, errors: &mut Vec<ConfigError>) {
    if !config.enabled {
        return;
    }
    require(&config.api_url, "formbricks.api_url", errors);
    require(&config.api_key, "formbricks.api_key", errors);
    if let Some(url) = non_empty(&config.api_url) {
        check_url("formbricks.api_url", url, errors);
    }
}

fn require(value: &Option<String>, key: &str, errors: &mut Vec<ConfigError>) {
    if non_empty(value).is_none() {
        errors.push(ConfigError::validation(format!(
            "{key} is required when the integration is enabled"
        )));
    }
}

fn check_url(key: &str, url: &str, errors: &mut Vec<ConfigError>) {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ConfigError::validation(format!(
            "{key} `{url}` must start with http:// or https://"
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &CrmBridgeConfig) -> Vec<String> {
        match validate_config(config) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&CrmBridgeConfig::default()).is_ok());
    }

    #[test]
    fn both_auto_create_flags_are_rejected() {
        let mut config = CrmBridgeConfig::default();
        config.chatwoot.auto_create_customer = true;
        config.chatwoot.auto_create_lead = true;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("cannot both be enabled"));
    }

    #[test]
    fn retention_days_are_bounded() {
        let mut config = CrmBridgeConfig::default();
        config.chatwoot.conversation_retention_days = MAX_RETENTION_DAYS;
        assert!(validate_config(&config).is_ok());

        config.chatwoot.conversation_retention_days = 200_000_000_000;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("conversation_retention_days must be at most 36500"));
    }

    #[test]
    fn either_auto_create_flag_alone_is_fine() {
        let mut config = CrmBridgeConfig::default();
        config.chatwoot.auto_create_lead = true;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn enabled_integrations_need_credentials() {
        let mut config = CrmBridgeConfig::default();
        config.chatwoot.enabled = true;
        config.formbricks.enabled = true;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 5, "{msgs:?}");
        assert!(msgs.iter().any(|m| m.contains("chatwoot.account_id")));
        assert!(msgs.iter().any(|m| m.contains("formbricks.api_key")));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = CrmBridgeConfig::default();
        config.server.host = "bad host!".into();
        config.storage.database_path = " ".into();
        config.logging.level = "loud".into();
        assert_eq!(messages(&config).len(), 3);
    }

    #[test]
    fn urls_need_a_scheme() {
        let mut config = CrmBridgeConfig::default();
        config.formbricks.enabled = true;
        config.formbricks.api_url = Some("app.formbricks.com".into());
        config.formbricks.api_key = Some("k".into());
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("http://"));
    }
}
