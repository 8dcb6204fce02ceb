// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order, later wins: compiled defaults, `/etc/crmbridge/crmbridge.toml`,
//! the user config dir, `./crmbridge.toml`, then `CRMBRIDGE_*` variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CrmBridgeConfig;

const SYSTEM_CONFIG: &str = "/etc/crmbridge/crmbridge.toml";
const LOCAL_CONFIG: &str = "crmbridge.toml";

/// Top-level sections that env var names are mapped into.
const SECTIONS: &[&str] = &["server", "storage", "logging", "chatwoot", "formbricks"];

/// Load configuration from the standard file hierarchy with env overrides.
pub fn load_config() -> Result<CrmBridgeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<CrmBridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrmBridgeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<CrmBridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrmBridgeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(CrmBridgeConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment.merge(Toml::file(LOCAL_CONFIG)).merge(env_provider())
}

/// Every path [`load_config`] reads, most general first.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
    paths.extend(user_config_path());
    paths.push(PathBuf::from(LOCAL_CONFIG));
    paths
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("crmbridge").join(LOCAL_CONFIG))
}

/// Env provider mapping `CRMBRIDGE_CHATWOOT_API_URL` to `chatwoot.api_url`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys such as `api_access_token` keep their underscores.
fn env_provider() -> Env {
    Env::prefixed("CRMBRIDGE_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_only_after_section() {
        assert_eq!(
            map_env_key("chatwoot_api_access_token"),
            "chatwoot.api_access_token"
        );
        assert_eq!(map_env_key("server_public_url"), "server.public_url");
        assert_eq!(
            map_env_key("formbricks_lead_survey_ids"),
            "formbricks.lead_survey_ids"
        );
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "crmbridge.toml",
                "[chatwoot]\napi_url = \"https://file.example.com\"\n",
            )?;
            jail.set_env("CRMBRIDGE_CHATWOOT_API_URL", "https://env.example.com");
            jail.set_env("CRMBRIDGE_SERVER_PORT", "9999");
            let config = load_config_from_path(Path::new("crmbridge.toml"))?;
            assert_eq!(
                config.chatwoot.api_url.as_deref(),
                Some("https://env.example.com")
            );
            assert_eq!(config.server.port, 9999);
            Ok(())
        });
    }

    #[test]
    fn config_paths_end_with_local_file() {
        let paths = config_paths();
        assert_eq!(paths.first(), Some(&PathBuf::from(SYSTEM_CONFIG)));
        assert_eq!(paths.last(), Some(&PathBuf::from(LOCAL_CONFIG)));
    }
}
